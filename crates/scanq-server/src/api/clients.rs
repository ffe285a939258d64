use axum::{extract::State, Extension, Json};
use rust_decimal::Decimal;
use scanq_core::SheetKind;
use serde::Serialize;

use crate::middleware::RequestId;

use super::{ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct ClientItem {
    name: String,
    slug: String,
    approved_rate: Decimal,
    partial_rate: Decimal,
    /// `false` when the spreadsheet URL env var is unset.
    configured: bool,
    sheets: Vec<SheetItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct SheetItem {
    name: String,
    slug: String,
    kind: SheetKind,
}

pub(super) async fn list_clients(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<ClientItem>>> {
    let defaults = state.config.rates();
    let data = state
        .catalog
        .clients
        .iter()
        .map(|client| {
            let rates = client.rates(defaults);
            ClientItem {
                name: client.name.clone(),
                slug: client.slug(),
                approved_rate: rates.approved,
                partial_rate: rates.partial,
                configured: client.spreadsheet_url(|key| std::env::var(key)).is_ok(),
                sheets: client
                    .sheets
                    .iter()
                    .map(|sheet| SheetItem {
                        name: sheet.name.clone(),
                        slug: sheet.slug(),
                        kind: sheet.kind,
                    })
                    .collect(),
            }
        })
        .collect();

    Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    })
}

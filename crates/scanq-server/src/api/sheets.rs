//! Per-sheet read endpoints: summary, weekly breakdown, records, CSV report.
//!
//! Each request loads the sheet (through the shared TTL cache), applies the
//! range filter from the query string and renders. A failed fetch still
//! answers `200` with empty data and `meta.load_error` set.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::NaiveDate;
use scanq_core::{
    render_summary_csv, summarize, weekly_breakdown, NormalizedRecord, PaymentRates,
    QualityStatus, QualitySummary, RangeFilter, WeekBucket,
};
use scanq_sheets::{load_sheet, DroppedRow, NormalizeOptions, SheetLoad};
use serde::{Deserialize, Serialize};

use crate::middleware::{RequestId, Session};

use super::{ApiError, ApiResponse, AppState, ErrorCode, ResponseMeta};

#[derive(Debug, Default, Deserialize)]
pub(super) struct RangeQuery {
    pub from_id: Option<u32>,
    pub to_id: Option<u32>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

impl RangeQuery {
    pub(super) fn to_filter(&self) -> Result<RangeFilter, String> {
        let has_id = self.from_id.is_some() || self.to_id.is_some();
        let has_date = self.from_date.is_some() || self.to_date.is_some();
        if has_id && has_date {
            return Err("id and date bounds cannot be combined".to_owned());
        }

        let filter = match (self.from_id, self.to_id, self.from_date, self.to_date) {
            (None, None, None, None) => RangeFilter::All,
            (Some(start), Some(end), None, None) => RangeFilter::Ids { start, end },
            (None, None, Some(start), Some(end)) => RangeFilter::Dates { start, end },
            _ => return Err("range bounds must be given in pairs".to_owned()),
        };
        filter.validate().map_err(|e| e.to_string())?;
        Ok(filter)
    }
}

struct LoadedSheet {
    client: String,
    sheet: String,
    rates: PaymentRates,
    filter: RangeFilter,
    load: SheetLoad,
}

impl LoadedSheet {
    fn selected(&self) -> Vec<&NormalizedRecord> {
        self.filter.apply(&self.load.batch.records)
    }
}

async fn load_for_request(
    state: &AppState,
    req_id: &str,
    session: &Session,
    (client_key, sheet_key): (&str, &str),
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> Result<LoadedSheet, ApiError> {
    let Query(query) =
        query.map_err(|e| ApiError::new(req_id, ErrorCode::ValidationError, e.body_text()))?;
    let filter = query
        .to_filter()
        .map_err(|msg| ApiError::new(req_id, ErrorCode::ValidationError, msg))?;

    let client = state
        .catalog
        .find(client_key)
        .ok_or_else(|| {
            ApiError::new(req_id, ErrorCode::NotFound, format!("client {client_key} not found"))
        })?;
    let sheet = client.find_sheet(sheet_key).ok_or_else(|| {
        ApiError::new(
            req_id,
            ErrorCode::NotFound,
            format!("sheet {sheet_key} not found for client {}", client.slug()),
        )
    })?;

    tracing::debug!(
        principal = %session.principal,
        client = %client.name,
        sheet = %sheet.name,
        filter = %filter.describe(),
        "loading sheet"
    );

    let load = match client.spreadsheet_url(|key| std::env::var(key)) {
        Ok(url) => {
            let options = NormalizeOptions::for_sheet(sheet, &state.config);
            load_sheet(&state.sheets, &url, &sheet.name, &options).await
        }
        Err(e) => {
            tracing::warn!(
                client = %client.name,
                error = %e,
                "spreadsheet URL unavailable; check your configuration"
            );
            SheetLoad::failed(&sheet.name, e.to_string())
        }
    };

    Ok(LoadedSheet {
        client: client.slug(),
        sheet: sheet.slug(),
        rates: client.rates(state.config.rates()),
        filter,
        load,
    })
}

fn summarize_or_500<'a>(
    req_id: &str,
    records: impl IntoIterator<Item = &'a NormalizedRecord>,
    rates: PaymentRates,
) -> Result<QualitySummary, ApiError> {
    summarize(records, rates).map_err(|e| {
        tracing::error!(error = %e, "summary could not be computed");
        ApiError::new(req_id, ErrorCode::InternalError, e.to_string())
    })
}

#[derive(Debug, Serialize)]
pub(super) struct SummaryData {
    client: String,
    sheet: String,
    filter: RangeFilter,
    #[serde(flatten)]
    summary: QualitySummary,
}

pub(super) async fn get_summary(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(session): Extension<Session>,
    Path((client, sheet)): Path<(String, String)>,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<SummaryData>>, ApiError> {
    let loaded = load_for_request(&state, &req_id.0, &session, (&client, &sheet), query).await?;
    let summary = summarize_or_500(&req_id.0, loaded.selected(), loaded.rates)?;

    Ok(Json(ApiResponse {
        data: SummaryData {
            summary,
            filter: loaded.filter,
            client: loaded.client,
            sheet: loaded.sheet,
        },
        meta: ResponseMeta::new(req_id.0).with_load_error(loaded.load.error),
    }))
}

/// Chart legend entry: how a status is labelled and coloured.
#[derive(Debug, Serialize)]
pub(super) struct StatusLegendItem {
    status: String,
    label: String,
    color: &'static str,
}

#[derive(Debug, Serialize)]
pub(super) struct WeeklyData {
    weeks: Vec<WeekBucket>,
    legend: Vec<StatusLegendItem>,
}

fn legend_for(weeks: &[WeekBucket]) -> Vec<StatusLegendItem> {
    let mut statuses = vec![
        QualityStatus::Approved,
        QualityStatus::PartiallyApproved,
        QualityStatus::Reproved,
    ];
    for week in weeks {
        for label in week.counts.keys() {
            let status = QualityStatus::normalize(label);
            if !statuses.contains(&status) {
                statuses.push(status);
            }
        }
    }
    statuses
        .into_iter()
        .map(|status| StatusLegendItem {
            status: status.as_str().to_owned(),
            label: status.display_label().to_owned(),
            color: status.color_hex(),
        })
        .collect()
}

pub(super) async fn get_weekly(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(session): Extension<Session>,
    Path((client, sheet)): Path<(String, String)>,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<WeeklyData>>, ApiError> {
    let loaded = load_for_request(&state, &req_id.0, &session, (&client, &sheet), query).await?;
    let weeks = weekly_breakdown(loaded.selected());
    let legend = legend_for(&weeks);

    Ok(Json(ApiResponse {
        data: WeeklyData { weeks, legend },
        meta: ResponseMeta::new(req_id.0).with_load_error(loaded.load.error),
    }))
}

#[derive(Debug, Serialize)]
pub(super) struct RecordsData {
    naming_column: Option<String>,
    status_column: Option<String>,
    records: Vec<NormalizedRecord>,
    dropped: Vec<DroppedRow>,
}

pub(super) async fn get_records(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(session): Extension<Session>,
    Path((client, sheet)): Path<(String, String)>,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<RecordsData>>, ApiError> {
    let loaded = load_for_request(&state, &req_id.0, &session, (&client, &sheet), query).await?;
    let records = loaded.selected().into_iter().cloned().collect();
    let batch = loaded.load.batch;

    Ok(Json(ApiResponse {
        data: RecordsData {
            naming_column: batch.naming_column,
            status_column: batch.status_column,
            records,
            dropped: batch.dropped,
        },
        meta: ResponseMeta::new(req_id.0).with_load_error(loaded.load.error),
    }))
}

pub(super) async fn get_report_csv(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(session): Extension<Session>,
    Path((client, sheet)): Path<(String, String)>,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let loaded = load_for_request(&state, &req_id.0, &session, (&client, &sheet), query).await?;
    let records = loaded.selected();
    let summary = summarize_or_500(&req_id.0, records.iter().copied(), loaded.rates)?;
    let weeks = weekly_breakdown(records.iter().copied());

    let title = format!("{} / {}", loaded.client, loaded.sheet);
    let body = render_summary_csv(&title, &loaded.filter, &summary, &weeks).map_err(|e| {
        tracing::error!(error = %e, "report rendering failed");
        ApiError::new(req_id.0.clone(), ErrorCode::InternalError, "report rendering failed")
    })?;

    let disposition = format!(
        "attachment; filename=\"{}-{}-summary.csv\"",
        loaded.client, loaded.sheet
    );
    let mut response = (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response();
    if let Some(err) = loaded.load.error {
        if let Ok(value) = header::HeaderValue::from_str(&err) {
            response.headers_mut().insert("x-load-error", value);
        }
    }
    Ok(response)
}

//! Fetch-then-normalize entry point used by the CLI and the server.

use serde::Serialize;

use crate::client::SheetsClient;
use crate::normalize::{normalize_table, NormalizeOptions, NormalizedBatch};

/// Outcome of loading one sheet. A failed fetch is an empty batch with
/// `error` set, never an `Err`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SheetLoad {
    pub sheet: String,
    pub batch: NormalizedBatch,
    pub error: Option<String>,
}

impl SheetLoad {
    #[must_use]
    pub fn failed(sheet: &str, error: impl Into<String>) -> Self {
        Self {
            sheet: sheet.to_owned(),
            batch: NormalizedBatch::default(),
            error: Some(error.into()),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub async fn load_sheet(
    client: &SheetsClient,
    spreadsheet_url: &str,
    sheet: &str,
    options: &NormalizeOptions,
) -> SheetLoad {
    match client.fetch_table(spreadsheet_url, sheet).await {
        Ok(table) => {
            let batch = normalize_table(&table, options);
            tracing::info!(
                sheet,
                rows = table.len(),
                records = batch.records.len(),
                dropped = batch.dropped.len(),
                naming_column = batch.naming_column.as_deref().unwrap_or(""),
                "sheet loaded"
            );
            SheetLoad {
                sheet: sheet.to_owned(),
                batch,
                error: None,
            }
        }
        Err(e) => {
            tracing::warn!(sheet, error = %e, "sheet fetch failed; returning empty batch");
            SheetLoad::failed(sheet, e.to_string())
        }
    }
}

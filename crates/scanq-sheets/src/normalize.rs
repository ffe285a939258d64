//! Row normalization from a fetched [`RawTable`] to [`NormalizedRecord`]s.
//!
//! Identifier parsing is delegated to [`crate::parse`]; this module handles
//! column selection, the batch-level sequence fallback, and the
//! drop-and-report policy for rows without a usable date.

use chrono::Weekday;
use scanq_core::clients::{DEFAULT_NAMING_COLUMNS, DEFAULT_STATUS_COLUMNS};
use scanq_core::{AppConfig, NormalizedRecord, QualityStatus, RawTable, SequenceFallback, SheetConfig};
use serde::Serialize;

use crate::parse::{parse_identifier, ParsedIdentifier};

/// Ordered list of acceptable header names for one logical column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSelection {
    pub preferred: Vec<String>,
}

impl ColumnSelection {
    #[must_use]
    pub fn new<I, S>(preferred: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            preferred: preferred.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn naming_default() -> Self {
        Self::new(DEFAULT_NAMING_COLUMNS)
    }

    #[must_use]
    pub fn status_default() -> Self {
        Self::new(DEFAULT_STATUS_COLUMNS)
    }

    /// Index of the first preferred name present in the header.
    #[must_use]
    pub fn find(&self, table: &RawTable) -> Option<usize> {
        self.preferred
            .iter()
            .find_map(|name| table.column_index(name.trim()))
    }

    /// Like [`Self::find`], falling back to the first column.
    #[must_use]
    pub fn resolve(&self, table: &RawTable) -> Option<usize> {
        self.find(table)
            .or_else(|| (!table.headers.is_empty()).then_some(0))
    }
}

#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    pub naming: ColumnSelection,
    pub status: ColumnSelection,
    pub week_start: Weekday,
    pub sequence_fallback: SequenceFallback,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            naming: ColumnSelection::naming_default(),
            status: ColumnSelection::status_default(),
            week_start: Weekday::Mon,
            sequence_fallback: SequenceFallback::default(),
        }
    }
}

impl NormalizeOptions {
    /// Options for one catalog sheet under the application's settings.
    #[must_use]
    pub fn for_sheet(sheet: &SheetConfig, config: &AppConfig) -> Self {
        Self {
            naming: ColumnSelection::new(sheet.naming_columns()),
            status: ColumnSelection::new(sheet.status_columns()),
            week_start: config.week_start,
            sequence_fallback: config.sequence_fallback,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DropReason {
    NoDate,
    InvalidDate { token: String },
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropReason::NoDate => write!(f, "no YYYY_MM_DD date"),
            DropReason::InvalidDate { token } => write!(f, "invalid date {token}"),
        }
    }
}

/// A row excluded from the batch because no scan date could be recovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedRow {
    pub row_number: usize,
    pub identifier_text: String,
    #[serde(flatten)]
    pub reason: DropReason,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedBatch {
    pub records: Vec<NormalizedRecord>,
    pub dropped: Vec<DroppedRow>,
    pub naming_column: Option<String>,
    /// `None` when statuses were read from the identifier text.
    pub status_column: Option<String>,
}

/// Normalizes every row of `table`.
///
/// Rows whose cells are all empty are skipped silently. Rows without a valid
/// date are dropped and reported in [`NormalizedBatch::dropped`].
#[must_use]
pub fn normalize_table(table: &RawTable, options: &NormalizeOptions) -> NormalizedBatch {
    let Some(naming_idx) = options.naming.resolve(table) else {
        return NormalizedBatch::default();
    };
    let status_idx = options.status.find(table).filter(|i| *i != naming_idx);

    let parsed: Vec<(usize, String, ParsedIdentifier)> = table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| !row.iter().all(scanq_core::CellValue::is_empty))
        .map(|(idx, _)| {
            let text = table.cell(idx, naming_idx).to_string();
            let parsed = parse_identifier(&text);
            (idx + 1, text, parsed)
        })
        .collect();

    let use_row_position = options.sequence_fallback == SequenceFallback::RowPosition
        && parsed.iter().all(|(_, _, p)| p.sequence_number.is_none());

    let mut batch = NormalizedBatch {
        naming_column: Some(table.headers[naming_idx].clone()),
        status_column: status_idx.map(|i| table.headers[i].clone()),
        ..NormalizedBatch::default()
    };

    for (row_number, text, parsed) in parsed {
        let Some(scan_date) = parsed.scan_date else {
            let reason = match parsed.date_token {
                Some(token) => DropReason::InvalidDate { token },
                None => DropReason::NoDate,
            };
            tracing::warn!(row_number, identifier = %text, %reason, "dropping row without a usable scan date");
            batch.dropped.push(DroppedRow {
                row_number,
                identifier_text: text,
                reason,
            });
            continue;
        };

        let sequence_number = match parsed.sequence_number {
            Some(n) => n,
            None if use_row_position => u32::try_from(row_number).unwrap_or(u32::MAX),
            None => 0,
        };

        let status_text = match status_idx {
            Some(i) => table.cell(row_number - 1, i).to_string(),
            None => text.clone(),
        };

        batch.records.push(NormalizedRecord::new(
            row_number,
            text,
            scan_date,
            sequence_number,
            QualityStatus::normalize(&status_text),
            options.week_start,
        ));
    }

    batch
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;

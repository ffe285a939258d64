use chrono::{Datelike, Days, NaiveDate, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One spreadsheet cell as delivered by the source.
///
/// CSV exports only ever produce [`CellValue::Text`] and [`CellValue::Empty`];
/// the Sheets values API can deliver pre-typed numbers and booleans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Builds a cell from raw text, mapping empty strings to [`CellValue::Empty`].
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        if text.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(text.to_string())
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Bool(_) | CellValue::Number(_) => false,
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(true) => write!(f, "TRUE"),
            CellValue::Bool(false) => write!(f, "FALSE"),
            // Integral floats print without the trailing `.0` so that an
            // identifier typed as a number stringifies the way it was entered.
            #[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(s) => write!(f, "{s}"),
        }
    }
}

/// A fetched worksheet: a trimmed header plus rows in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    /// Builds a table, trimming surrounding whitespace from every header.
    #[must_use]
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let headers = headers.into_iter().map(|h| h.trim().to_string()).collect();
        Self { headers, rows }
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// The cell at `(row, column)`; cells past the end of a short row read as empty.
    #[must_use]
    pub fn cell(&self, row: usize, column: usize) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&EMPTY)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Quality-review outcome for one scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QualityStatus {
    Approved,
    PartiallyApproved,
    Reproved,
    /// A raw status no rule recognized, kept exactly as it arrived.
    Other(String),
}

impl QualityStatus {
    /// Maps a raw, possibly misspelled status onto the closed set.
    ///
    /// Rules are checked in order on the uppercased text and the first match
    /// wins: `PARTIAL`, then `REP`, then `APP`. `"PARTIALLY REPROVED"` is
    /// therefore partially approved, and `"REPPROVED"` is reproved.
    #[must_use]
    pub fn normalize(raw: &str) -> Self {
        let upper = raw.to_uppercase();
        if upper.contains("PARTIAL") {
            QualityStatus::PartiallyApproved
        } else if upper.contains("REP") {
            QualityStatus::Reproved
        } else if upper.contains("APP") {
            QualityStatus::Approved
        } else {
            QualityStatus::Other(raw.to_string())
        }
    }

    /// Canonical label; for [`QualityStatus::Other`] the raw string itself.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            QualityStatus::Approved => "APPROVED",
            QualityStatus::PartiallyApproved => "PARTIALLY_APPROVED",
            QualityStatus::Reproved => "REPROVED",
            QualityStatus::Other(raw) => raw,
        }
    }

    #[must_use]
    pub fn display_label(&self) -> &str {
        match self {
            QualityStatus::Approved => "Approved",
            QualityStatus::PartiallyApproved => "Partially approved",
            QualityStatus::Reproved => "Reproved",
            QualityStatus::Other(raw) if raw.trim().is_empty() => "Unknown",
            QualityStatus::Other(raw) => raw,
        }
    }

    /// Chart colour used by the dashboard for this status.
    #[must_use]
    pub fn color_hex(&self) -> &'static str {
        match self {
            QualityStatus::Approved => "#28a745",
            QualityStatus::PartiallyApproved => "#ff8c00",
            QualityStatus::Reproved => "#dc3545",
            QualityStatus::Other(_) => "#6c757d",
        }
    }

    #[must_use]
    pub fn is_recognized(&self) -> bool {
        !matches!(self, QualityStatus::Other(_))
    }
}

impl std::fmt::Display for QualityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for QualityStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for QualityStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(QualityStatus::normalize(&raw))
    }
}

/// First day of the week containing `date`, for weeks starting on `week_start`.
#[must_use]
pub fn week_start_of(date: NaiveDate, week_start: Weekday) -> NaiveDate {
    let offset = (7 + date.weekday().num_days_from_monday()
        - week_start.num_days_from_monday())
        % 7;
    // Only the first representable dates lack six predecessors; clamp there.
    date.checked_sub_days(Days::new(u64::from(offset)))
        .unwrap_or(date)
}

/// One scan after normalization.
///
/// Fields are read-only: `week_start` is derived from `scan_date` at
/// construction and must stay consistent with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    row_number: usize,
    identifier_text: String,
    scan_date: NaiveDate,
    sequence_number: u32,
    quality_status: QualityStatus,
    week_start: NaiveDate,
}

impl NormalizedRecord {
    #[must_use]
    pub fn new(
        row_number: usize,
        identifier_text: String,
        scan_date: NaiveDate,
        sequence_number: u32,
        quality_status: QualityStatus,
        week_start: Weekday,
    ) -> Self {
        Self {
            row_number,
            identifier_text,
            scan_date,
            sequence_number,
            quality_status,
            week_start: week_start_of(scan_date, week_start),
        }
    }

    /// 1-based position of the source row within its batch.
    #[must_use]
    pub fn row_number(&self) -> usize {
        self.row_number
    }

    #[must_use]
    pub fn identifier_text(&self) -> &str {
        &self.identifier_text
    }

    #[must_use]
    pub fn scan_date(&self) -> NaiveDate {
        self.scan_date
    }

    #[must_use]
    pub fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    #[must_use]
    pub fn quality_status(&self) -> &QualityStatus {
        &self.quality_status
    }

    /// Start of the calendar week containing [`Self::scan_date`].
    #[must_use]
    pub fn week_start(&self) -> NaiveDate {
        self.week_start
    }
}

/// Per-status payment rates, in the client's currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRates {
    pub approved: Decimal,
    pub partial: Decimal,
}

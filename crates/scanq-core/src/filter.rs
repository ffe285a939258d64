//! Range filters over normalized records.
//!
//! ID and date ranges are separate variants, so one query can never combine
//! them. Filtering only reads already-normalized fields.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::records::NormalizedRecord;
use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RangeFilter {
    #[default]
    All,
    /// Inclusive bounds on `sequence_number`.
    Ids { start: u32, end: u32 },
    /// Inclusive bounds on `scan_date`.
    Dates { start: NaiveDate, end: NaiveDate },
}

impl RangeFilter {
    /// Rejects inverted bounds.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRange`] when `start > end`.
    pub fn validate(&self) -> Result<(), CoreError> {
        match *self {
            RangeFilter::Ids { start, end } if start > end => Err(CoreError::InvalidRange(
                format!("id range start {start} is after end {end}"),
            )),
            RangeFilter::Dates { start, end } if start > end => Err(CoreError::InvalidRange(
                format!("date range start {start} is after end {end}"),
            )),
            _ => Ok(()),
        }
    }

    #[must_use]
    pub fn matches(&self, record: &NormalizedRecord) -> bool {
        match *self {
            RangeFilter::All => true,
            RangeFilter::Ids { start, end } => (start..=end).contains(&record.sequence_number()),
            RangeFilter::Dates { start, end } => (start..=end).contains(&record.scan_date()),
        }
    }

    /// Borrows the records inside the range, preserving order.
    #[must_use]
    pub fn apply<'a>(&self, records: &'a [NormalizedRecord]) -> Vec<&'a NormalizedRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }

    /// Human-readable description used in reports.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            RangeFilter::All => "all records".to_string(),
            RangeFilter::Ids { start, end } => format!("ids {start}-{end}"),
            RangeFilter::Dates { start, end } => format!("dates {start} to {end}"),
        }
    }
}

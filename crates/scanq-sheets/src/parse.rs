//! Identifier parsing: pulls the scan date and sequence number out of the
//! free-text naming cell (`Pat_2024_06_10_305_APPROVED`, `IMG 2024_01_03 0042.stl`).
//!
//! Parsing never fails. Fields that cannot be recovered come back as `None`
//! and the caller decides what to do with the row.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

// ASCII classes: `\d` would also match non-ASCII digits.
static DATE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]{4})_([0-9]{2})_([0-9]{2})").expect("valid date token regex")
});
static SEQUENCE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{3,5}").expect("valid sequence regex"));

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedIdentifier {
    /// The first `YYYY_MM_DD` token found, whether or not it is a real date.
    pub date_token: Option<String>,
    pub scan_date: Option<NaiveDate>,
    pub sequence_number: Option<u32>,
}

impl ParsedIdentifier {
    /// A date-shaped token was present but named no calendar day.
    #[must_use]
    pub fn has_invalid_date(&self) -> bool {
        self.date_token.is_some() && self.scan_date.is_none()
    }
}

/// Extracts `(scan_date, sequence_number)` from one identifier.
///
/// The date token is removed before the sequence search so that its digits
/// can never be read back as the sequence number.
#[must_use]
pub fn parse_identifier(text: &str) -> ParsedIdentifier {
    let Some(caps) = DATE_TOKEN.captures(text) else {
        return ParsedIdentifier {
            date_token: None,
            scan_date: None,
            sequence_number: parse_sequence(text),
        };
    };

    let whole = caps.get(0).map_or("", |m| m.as_str());
    let scan_date = match (
        caps[1].parse::<i32>(),
        caps[2].parse::<u32>(),
        caps[3].parse::<u32>(),
    ) {
        (Ok(y), Ok(m), Ok(d)) => NaiveDate::from_ymd_opt(y, m, d),
        _ => None,
    };

    let remainder = DATE_TOKEN.replace(text, "");
    ParsedIdentifier {
        date_token: Some(whole.to_string()),
        scan_date,
        sequence_number: parse_sequence(&remainder),
    }
}

fn parse_sequence(text: &str) -> Option<u32> {
    SEQUENCE_RUN
        .find(text)
        .and_then(|m| m.as_str().parse::<u32>().ok())
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;

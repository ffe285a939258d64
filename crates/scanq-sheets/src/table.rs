//! Decoding of fetched sheet bodies into [`RawTable`]s.

use scanq_core::{CellValue, RawTable};
use serde::Deserialize;

use crate::error::SheetsError;

/// Decodes a CSV export. The first record is the header; ragged rows are kept
/// as-is and read their missing cells as empty.
///
/// # Errors
///
/// Returns [`SheetsError::Csv`] when the body is not valid CSV.
pub fn parse_csv_table(body: &str, context: &str) -> Result<RawTable, SheetsError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut records = reader.records();
    let headers = match records.next() {
        Some(header) => header
            .map_err(|source| SheetsError::Csv {
                context: context.to_owned(),
                source,
            })?
            .iter()
            .map(str::to_owned)
            .collect(),
        None => return Ok(RawTable::default()),
    };

    let rows = records
        .map(|record| {
            record
                .map(|r| r.iter().map(CellValue::from_text).collect())
                .map_err(|source| SheetsError::Csv {
                    context: context.to_owned(),
                    source,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RawTable::new(headers, rows))
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Decodes a Sheets v4 `values.get` response rendered with
/// `UNFORMATTED_VALUE`, keeping numbers and booleans typed.
///
/// # Errors
///
/// Returns [`SheetsError::Deserialize`] when the body is not a value range.
pub fn parse_values_json(body: &str, context: &str) -> Result<RawTable, SheetsError> {
    let range: ValueRange =
        serde_json::from_str(body).map_err(|source| SheetsError::Deserialize {
            context: context.to_owned(),
            source,
        })?;

    let mut rows = range.values.into_iter();
    let Some(header) = rows.next() else {
        return Ok(RawTable::default());
    };
    let headers = header.iter().map(|v| json_cell(v).to_string()).collect();
    let rows = rows.map(|row| row.iter().map(json_cell).collect()).collect();

    Ok(RawTable::new(headers, rows))
}

fn json_cell(value: &serde_json::Value) -> CellValue {
    match value {
        serde_json::Value::Null => CellValue::Empty,
        serde_json::Value::Bool(b) => CellValue::Bool(*b),
        serde_json::Value::Number(n) => n.as_f64().map_or(CellValue::Empty, CellValue::Number),
        serde_json::Value::String(s) => CellValue::from_text(s),
        other => CellValue::Text(other.to_string()),
    }
}

//! Downloadable CSV summary report.
//!
//! Layout: a `metric,value` block followed by one row per week, with a column
//! per status label seen anywhere in the breakdown.

use std::collections::BTreeSet;
use std::io::Write;

use crate::filter::RangeFilter;
use crate::summary::{QualitySummary, WeekBucket};
use crate::CoreError;

/// Writes the report for `title` (usually `"<client> / <sheet>"`) to `writer`.
///
/// # Errors
///
/// Returns [`CoreError::Report`] if the underlying writer fails.
pub fn write_summary_csv<W: Write>(
    writer: W,
    title: &str,
    filter: &RangeFilter,
    summary: &QualitySummary,
    weeks: &[WeekBucket],
) -> Result<(), CoreError> {
    let mut csv = csv::WriterBuilder::new().flexible(true).from_writer(writer);
    let report_err = |e: csv::Error| CoreError::Report(e.to_string());

    let metrics: [(&str, String); 11] = [
        ("report", title.to_string()),
        ("filter", filter.describe()),
        ("total", summary.total.to_string()),
        ("approved_count", summary.approved_count.to_string()),
        ("partial_count", summary.partial_count.to_string()),
        ("reproved_count", summary.reproved_count.to_string()),
        ("other_count", summary.other_count.to_string()),
        ("weighted_equivalent", summary.weighted_equivalent.to_string()),
        ("approved_rate", summary.rates.approved.to_string()),
        ("partial_rate", summary.rates.partial.to_string()),
        ("total_earnings", summary.total_earnings.to_string()),
    ];

    csv.write_record(["metric", "value"]).map_err(report_err)?;
    for (metric, value) in &metrics {
        csv.write_record([*metric, value.as_str()]).map_err(report_err)?;
    }

    if !weeks.is_empty() {
        let labels: BTreeSet<&str> = weeks
            .iter()
            .flat_map(|w| w.counts.keys().map(String::as_str))
            .collect();

        let mut header = vec!["week_start"];
        header.extend(labels.iter().copied());
        header.push("total");
        csv.write_record(&header).map_err(report_err)?;

        for week in weeks {
            let mut row = vec![week.week_start.to_string()];
            row.extend(
                labels
                    .iter()
                    .map(|l| week.counts.get(*l).copied().unwrap_or(0).to_string()),
            );
            row.push(week.total.to_string());
            csv.write_record(&row).map_err(report_err)?;
        }
    }

    csv.flush().map_err(|e| CoreError::Report(e.to_string()))?;
    Ok(())
}

/// Renders the report into a `String`.
///
/// # Errors
///
/// Returns [`CoreError::Report`] if rendering fails.
pub fn render_summary_csv(
    title: &str,
    filter: &RangeFilter,
    summary: &QualitySummary,
    weeks: &[WeekBucket],
) -> Result<String, CoreError> {
    let mut buf = Vec::new();
    write_summary_csv(&mut buf, title, filter, summary, weeks)?;
    String::from_utf8(buf).map_err(|e| CoreError::Report(e.to_string()))
}

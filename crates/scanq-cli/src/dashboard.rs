//! Sheet commands: `summary`, `weekly`, `records`, `report`.
//!
//! Every command loads one catalog sheet, applies the range filter and then
//! renders. A failed fetch is reported as a warning and rendered as an empty
//! sheet, matching what the API returns.

use std::path::Path;

use anyhow::{anyhow, bail, Context};
use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use scanq_core::{
    load_clients, summarize, weekly_breakdown, write_summary_csv, AppConfig, NormalizedRecord,
    PaymentRates, RangeFilter,
};
use scanq_sheets::{load_sheet, NormalizeOptions, SheetLoad, SheetsClient};
use serde::Serialize;

/// Sheet selection, range filter and rate overrides shared by sheet commands.
#[derive(Debug, Clone, Args)]
pub(crate) struct SheetArgs {
    /// Client name or slug (see `scanq clients`)
    #[arg(long)]
    pub client: String,
    /// Sheet name or slug
    #[arg(long)]
    pub sheet: String,
    /// First sequence number to include
    #[arg(long, requires = "to_id", conflicts_with_all = ["from_date", "to_date"])]
    pub from_id: Option<u32>,
    /// Last sequence number to include
    #[arg(long, requires = "from_id")]
    pub to_id: Option<u32>,
    /// First scan date to include (YYYY-MM-DD)
    #[arg(long, requires = "to_date", conflicts_with_all = ["from_id", "to_id"])]
    pub from_date: Option<NaiveDate>,
    /// Last scan date to include (YYYY-MM-DD)
    #[arg(long, requires = "from_date")]
    pub to_date: Option<NaiveDate>,
    /// Override the approved-scan rate
    #[arg(long)]
    pub approved_rate: Option<Decimal>,
    /// Override the partially-approved rate
    #[arg(long)]
    pub partial_rate: Option<Decimal>,
}

impl SheetArgs {
    pub(crate) fn range_filter(&self) -> anyhow::Result<RangeFilter> {
        let filter = match (self.from_id, self.to_id, self.from_date, self.to_date) {
            (None, None, None, None) => RangeFilter::All,
            (Some(start), Some(end), None, None) => RangeFilter::Ids { start, end },
            (None, None, Some(start), Some(end)) => RangeFilter::Dates { start, end },
            _ => bail!("use either --from-id/--to-id or --from-date/--to-date, each as a pair"),
        };
        filter.validate()?;
        Ok(filter)
    }

    pub(crate) fn apply_rate_overrides(&self, mut rates: PaymentRates) -> anyhow::Result<PaymentRates> {
        if let Some(approved) = self.approved_rate {
            rates.approved = approved;
        }
        if let Some(partial) = self.partial_rate {
            rates.partial = partial;
        }
        if rates.approved.is_sign_negative() || rates.partial.is_sign_negative() {
            bail!("payment rates must not be negative");
        }
        Ok(rates)
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
    fn title(&self) -> String {
        format!("{} / {}", self.client, self.sheet)
    }

    fn selected(&self) -> Vec<&NormalizedRecord> {
        self.filter.apply(&self.load.batch.records)
    }

    fn warn_if_failed(&self) {
        if let Some(err) = &self.load.error {
            eprintln!("warning: no data loaded for {}: {err}", self.title());
        }
    }
}

async fn load_selected(config: &AppConfig, args: &SheetArgs) -> anyhow::Result<LoadedSheet> {
    let catalog = load_clients(&config.clients_path).with_context(|| {
        format!(
            "failed to load client catalog from {}",
            config.clients_path.display()
        )
    })?;
    let client = catalog.find(&args.client).ok_or_else(|| {
        anyhow!(
            "unknown client \"{}\"; run `scanq clients` to list configured clients",
            args.client
        )
    })?;
    let sheet = client.find_sheet(&args.sheet).ok_or_else(|| {
        anyhow!(
            "client \"{}\" has no sheet \"{}\"",
            client.name,
            args.sheet
        )
    })?;

    let filter = args.range_filter()?;
    let rates = args.apply_rate_overrides(client.rates(config.rates()))?;

    let load = match client.spreadsheet_url(|k| std::env::var(k)) {
        Ok(url) => {
            let sheets = SheetsClient::from_config(config)?;
            let options = NormalizeOptions::for_sheet(sheet, config);
            load_sheet(&sheets, &url, &sheet.name, &options).await
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
        client: client.name.clone(),
        sheet: sheet.name.clone(),
        rates,
        filter,
        load,
    })
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    client: &'a str,
    sheet: &'a str,
    filter: RangeFilter,
    load_error: Option<&'a str>,
    data: T,
}

fn print_json<T: Serialize>(loaded: &LoadedSheet, data: T) -> anyhow::Result<()> {
    let envelope = Envelope {
        client: &loaded.client,
        sheet: &loaded.sheet,
        filter: loaded.filter,
        load_error: loaded.load.error.as_deref(),
        data,
    };
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

/// Prints aggregate counts and earnings for the selected range.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded, the client or sheet is
/// unknown, or the range is invalid. Fetch failures are only warned about.
pub(crate) async fn run_summary(
    config: &AppConfig,
    args: &SheetArgs,
    json: bool,
) -> anyhow::Result<()> {
    let loaded = load_selected(config, args).await?;
    let summary = summarize(loaded.selected(), loaded.rates)?;

    if json {
        return print_json(&loaded, &summary);
    }

    loaded.warn_if_failed();
    println!("{} ({})", loaded.title(), loaded.filter.describe());
    println!("{:<22}{}", "Total scans", summary.total);
    println!("{:<22}{}", "Approved", summary.approved_count);
    println!("{:<22}{}", "Partially approved", summary.partial_count);
    println!("{:<22}{}", "Reproved", summary.reproved_count);
    if summary.other_count > 0 {
        println!("{:<22}{}", "Unrecognized status", summary.other_count);
    }
    println!("{:<22}{}", "Weighted equivalent", summary.weighted_equivalent);
    println!(
        "{:<22}{} approved / {} partial",
        "Rates", summary.rates.approved, summary.rates.partial
    );
    println!("{:<22}{}", "Total earnings", summary.total_earnings.round_dp(2));
    Ok(())
}

/// Prints status counts per week.
///
/// # Errors
///
/// See [`run_summary`].
pub(crate) async fn run_weekly(
    config: &AppConfig,
    args: &SheetArgs,
    json: bool,
) -> anyhow::Result<()> {
    let loaded = load_selected(config, args).await?;
    let weeks = weekly_breakdown(loaded.selected());

    if json {
        return print_json(&loaded, &weeks);
    }

    loaded.warn_if_failed();
    if weeks.is_empty() {
        println!("no records for {} ({})", loaded.title(), loaded.filter.describe());
        return Ok(());
    }

    let mut labels: Vec<&str> = weeks
        .iter()
        .flat_map(|w| w.counts.keys().map(String::as_str))
        .collect();
    labels.sort_unstable();
    labels.dedup();

    let mut header = format!("{:<12}", "WEEK");
    for label in &labels {
        header.push_str(&format!("{label:>20}"));
    }
    header.push_str(&format!("{:>8}", "TOTAL"));
    println!("{header}");

    for week in &weeks {
        let mut line = format!("{:<12}", week.week_start.to_string());
        for label in &labels {
            let count = week.counts.get(*label).copied().unwrap_or(0);
            line.push_str(&format!("{count:>20}"));
        }
        line.push_str(&format!("{:>8}", week.total));
        println!("{line}");
    }
    Ok(())
}

/// Prints the normalized records, optionally followed by dropped rows.
///
/// # Errors
///
/// See [`run_summary`].
pub(crate) async fn run_records(
    config: &AppConfig,
    args: &SheetArgs,
    json: bool,
    show_dropped: bool,
) -> anyhow::Result<()> {
    let loaded = load_selected(config, args).await?;
    let records = loaded.selected();

    if json {
        #[derive(Serialize)]
        struct Records<'a> {
            naming_column: Option<&'a str>,
            status_column: Option<&'a str>,
            records: &'a [&'a NormalizedRecord],
            #[serde(skip_serializing_if = "Option::is_none")]
            dropped: Option<&'a [scanq_sheets::DroppedRow]>,
        }
        let batch = &loaded.load.batch;
        return print_json(
            &loaded,
            Records {
                naming_column: batch.naming_column.as_deref(),
                status_column: batch.status_column.as_deref(),
                records: &records,
                dropped: show_dropped.then_some(batch.dropped.as_slice()),
            },
        );
    }

    loaded.warn_if_failed();
    println!(
        "{:<6}{:<12}{:<8}{:<12}{:<20}IDENTIFIER",
        "ROW", "DATE", "ID", "WEEK", "STATUS"
    );
    for r in &records {
        println!(
            "{:<6}{:<12}{:<8}{:<12}{:<20}{}",
            r.row_number(),
            r.scan_date().to_string(),
            r.sequence_number(),
            r.week_start().to_string(),
            r.quality_status().display_label(),
            r.identifier_text()
        );
    }
    println!("{} record(s)", records.len());

    if show_dropped && !loaded.load.batch.dropped.is_empty() {
        println!();
        println!("{:<6}{:<28}IDENTIFIER", "ROW", "REASON");
        for d in &loaded.load.batch.dropped {
            println!(
                "{:<6}{:<28}{}",
                d.row_number,
                d.reason.to_string(),
                d.identifier_text
            );
        }
    }
    Ok(())
}

/// Writes the CSV summary report to `out`.
///
/// # Errors
///
/// See [`run_summary`]; also fails if `out` cannot be written.
pub(crate) async fn run_report(
    config: &AppConfig,
    args: &SheetArgs,
    out: &Path,
) -> anyhow::Result<()> {
    let loaded = load_selected(config, args).await?;
    loaded.warn_if_failed();

    let records = loaded.selected();
    let summary = summarize(records.iter().copied(), loaded.rates)?;
    let weeks = weekly_breakdown(records.iter().copied());

    let file = std::fs::File::create(out)
        .with_context(|| format!("failed to create {}", out.display()))?;
    write_summary_csv(file, &loaded.title(), &loaded.filter, &summary, &weeks)?;

    tracing::info!(path = %out.display(), records = records.len(), "report written");
    println!("wrote {}", out.display());
    Ok(())
}

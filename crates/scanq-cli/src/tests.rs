use chrono::NaiveDate;
use rust_decimal::Decimal;
use scanq_core::RangeFilter;

use super::*;

fn sheet_args(cli: Cli) -> SheetArgs {
    match cli.command {
        Some(
            Commands::Summary { sheet, .. }
            | Commands::Weekly { sheet, .. }
            | Commands::Records { sheet, .. }
            | Commands::Report { sheet, .. },
        ) => sheet,
        other => panic!("expected a sheet command, got {other:?}"),
    }
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["scanq"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn parses_clients_command() {
    let cli = Cli::try_parse_from(["scanq", "clients"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Clients)));
}

#[test]
fn parses_summary_with_json() {
    let cli = Cli::try_parse_from([
        "scanq", "summary", "--client", "granit", "--sheet", "cast-granit", "--json",
    ])
    .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Summary { ref sheet, json: true })
            if sheet.client == "granit" && sheet.sheet == "cast-granit"
    ));
}

#[test]
fn summary_requires_client_and_sheet() {
    assert!(Cli::try_parse_from(["scanq", "summary", "--client", "granit"]).is_err());
    assert!(Cli::try_parse_from(["scanq", "summary", "--sheet", "cast"]).is_err());
}

#[test]
fn id_range_parses_to_filter() {
    let cli = Cli::try_parse_from([
        "scanq", "weekly", "--client", "granit", "--sheet", "cast", "--from-id", "306",
        "--to-id", "307",
    ])
    .unwrap();
    let filter = sheet_args(cli).range_filter().unwrap();
    assert_eq!(filter, RangeFilter::Ids { start: 306, end: 307 });
}

#[test]
fn date_range_parses_to_filter() {
    let cli = Cli::try_parse_from([
        "scanq",
        "records",
        "--client",
        "cruz",
        "--sheet",
        "patients-cruz",
        "--from-date",
        "2024-06-01",
        "--to-date",
        "2024-06-30",
    ])
    .unwrap();
    let filter = sheet_args(cli).range_filter().unwrap();
    assert_eq!(
        filter,
        RangeFilter::Dates {
            start: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        }
    );
}

#[test]
fn no_bounds_means_all_records() {
    let cli =
        Cli::try_parse_from(["scanq", "summary", "--client", "c", "--sheet", "s"]).unwrap();
    assert_eq!(sheet_args(cli).range_filter().unwrap(), RangeFilter::All);
}

#[test]
fn id_and_date_bounds_conflict() {
    let result = Cli::try_parse_from([
        "scanq",
        "summary",
        "--client",
        "c",
        "--sheet",
        "s",
        "--from-id",
        "1",
        "--to-id",
        "2",
        "--from-date",
        "2024-06-01",
        "--to-date",
        "2024-06-30",
    ]);
    assert!(result.is_err());
}

#[test]
fn half_open_range_is_rejected() {
    let result = Cli::try_parse_from([
        "scanq", "summary", "--client", "c", "--sheet", "s", "--from-id", "1",
    ]);
    assert!(result.is_err());
}

#[test]
fn inverted_range_fails_validation() {
    let cli = Cli::try_parse_from([
        "scanq", "summary", "--client", "c", "--sheet", "s", "--from-id", "9", "--to-id", "1",
    ])
    .unwrap();
    assert!(sheet_args(cli).range_filter().is_err());
}

#[test]
fn invalid_date_is_a_parse_error() {
    let result = Cli::try_parse_from([
        "scanq",
        "summary",
        "--client",
        "c",
        "--sheet",
        "s",
        "--from-date",
        "2024-02-30",
        "--to-date",
        "2024-03-01",
    ]);
    assert!(result.is_err());
}

#[test]
fn rate_overrides_replace_defaults() {
    let cli = Cli::try_parse_from([
        "scanq",
        "summary",
        "--client",
        "c",
        "--sheet",
        "s",
        "--approved-rate",
        "0.60",
    ])
    .unwrap();
    let defaults = scanq_core::PaymentRates {
        approved: Decimal::new(50, 2),
        partial: Decimal::new(25, 2),
    };
    let rates = sheet_args(cli).apply_rate_overrides(defaults).unwrap();
    assert_eq!(rates.approved, Decimal::new(60, 2));
    assert_eq!(rates.partial, Decimal::new(25, 2));
}

#[test]
fn negative_rate_override_is_rejected() {
    let cli = Cli::try_parse_from([
        "scanq",
        "summary",
        "--client",
        "c",
        "--sheet",
        "s",
        "--partial-rate=-1",
    ])
    .unwrap();
    let defaults = scanq_core::PaymentRates {
        approved: Decimal::new(50, 2),
        partial: Decimal::new(25, 2),
    };
    assert!(sheet_args(cli).apply_rate_overrides(defaults).is_err());
}

#[test]
fn parses_records_show_dropped() {
    let cli = Cli::try_parse_from([
        "scanq",
        "records",
        "--client",
        "c",
        "--sheet",
        "s",
        "--show-dropped",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Records {
            show_dropped: true,
            json: false,
            ..
        })
    ));
}

#[test]
fn report_requires_out() {
    assert!(Cli::try_parse_from(["scanq", "report", "--client", "c", "--sheet", "s"]).is_err());
    let cli = Cli::try_parse_from([
        "scanq", "report", "--client", "c", "--sheet", "s", "--out", "summary.csv",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Report { ref out, .. }) if out == std::path::Path::new("summary.csv")
    ));
}

mod clients;
mod dashboard;

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::dashboard::SheetArgs;

#[derive(Debug, Parser)]
#[command(name = "scanq")]
#[command(about = "Scan-quality summaries from Google Sheets")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List configured clients and their sheets
    Clients,
    /// Show approved/partial/reproved counts and earnings
    Summary {
        #[command(flatten)]
        sheet: SheetArgs,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show status counts per calendar week
    Weekly {
        #[command(flatten)]
        sheet: SheetArgs,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show the normalized records
    Records {
        #[command(flatten)]
        sheet: SheetArgs,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
        /// Also list rows dropped for lacking a valid date
        #[arg(long)]
        show_dropped: bool,
    },
    /// Write the CSV summary report
    Report {
        #[command(flatten)]
        sheet: SheetArgs,
        /// Output file
        #[arg(long)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = scanq_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Clients) => clients::run_clients(&config)?,
        Some(Commands::Summary { sheet, json }) => {
            dashboard::run_summary(&config, &sheet, json).await?;
        }
        Some(Commands::Weekly { sheet, json }) => {
            dashboard::run_weekly(&config, &sheet, json).await?;
        }
        Some(Commands::Records {
            sheet,
            json,
            show_dropped,
        }) => dashboard::run_records(&config, &sheet, json, show_dropped).await?,
        Some(Commands::Report { sheet, out }) => {
            dashboard::run_report(&config, &sheet, &out).await?;
        }
        None => Cli::command().print_help()?,
    }

    Ok(())
}

#[cfg(test)]
mod tests;

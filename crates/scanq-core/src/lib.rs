//! Domain types and pure logic for scan-quality records.
//!
//! Everything here is transport-agnostic: tables arrive as [`RawTable`]s,
//! leave as [`NormalizedRecord`]s, and are summarized by [`summarize`] and
//! [`weekly_breakdown`].

pub mod app_config;
pub mod clients;
pub mod config;
pub mod filter;
pub mod records;
pub mod report;
pub mod summary;

pub use app_config::{AppConfig, Environment, SequenceFallback};
pub use clients::{load_clients, ClientConfig, ClientsFile, SheetConfig, SheetKind};
pub use config::{build_app_config, load_app_config, load_app_config_from_env};
pub use filter::RangeFilter;
pub use records::{
    week_start_of, CellValue, NormalizedRecord, PaymentRates, QualityStatus, RawTable,
};
pub use report::{render_summary_csv, write_summary_csv};
pub use summary::{summarize, weekly_breakdown, QualitySummary, WeekBucket};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read clients file {path}: {source}")]
    ClientsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse clients file: {0}")]
    ClientsFileParse(#[from] serde_yaml::Error),

    #[error("clients config validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("failed to render report: {0}")]
    Report(String),

    #[error("arithmetic overflow computing {0}; check the configured payment rates")]
    Overflow(&'static str),
}

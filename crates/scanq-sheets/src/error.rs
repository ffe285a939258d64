use thiserror::Error;

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid spreadsheet URL \"{url}\": {reason}")]
    InvalidSpreadsheetUrl { url: String, reason: String },

    #[error("sheet not found: {url}")]
    NotFound { url: String },

    #[error("access denied to {url}: {reason}")]
    AccessDenied { url: String, reason: String },

    #[error("rate limited by Google Sheets (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("CSV decoding error for {context}: {source}")]
    Csv {
        context: String,
        #[source]
        source: csv::Error,
    },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

//! HTTP transport for Google Sheets worksheets.
//!
//! Two transports are supported. Without an API key the public CSV export
//! (`gviz/tq?tqx=out:csv`) is used, which requires the sheet to be shared by
//! link. With an API key the Sheets v4 `values` endpoint is used, which keeps
//! numbers and booleans typed.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode, Url};
use scanq_core::{AppConfig, RawTable};

use crate::cache::TtlCache;
use crate::error::SheetsError;
use crate::retry::RetryPolicy;
use crate::table::{parse_csv_table, parse_values_json};

pub const GOOGLE_SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

/// Fetches worksheets as [`RawTable`]s, memoizing successful fetches for the
/// configured TTL.
pub struct SheetsClient {
    client: Client,
    retry: RetryPolicy,
    api_key: Option<String>,
    api_base: String,
    cache: TtlCache<(String, String), Arc<RawTable>>,
}

impl SheetsClient {
    /// Creates a client with the given timeout, `User-Agent`, retry policy and
    /// cache lifetime. A zero `cache_ttl` disables caching.
    ///
    /// # Errors
    ///
    /// Returns [`SheetsError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_ms: u64,
        cache_ttl: Duration,
    ) -> Result<Self, SheetsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            retry: RetryPolicy::new(max_retries, backoff_base_ms),
            api_key: None,
            api_base: GOOGLE_SHEETS_API_BASE.to_owned(),
            cache: TtlCache::new(cache_ttl),
        })
    }

    /// Builds a client from the `SCANQ_SHEETS_*`, `SCANQ_CACHE_TTL_SECS` and
    /// `SCANQ_GOOGLE_API_KEY` settings.
    ///
    /// # Errors
    ///
    /// See [`Self::new`].
    pub fn from_config(config: &AppConfig) -> Result<Self, SheetsError> {
        let client = Self::new(
            config.sheets_request_timeout_secs,
            &config.sheets_user_agent,
            config.sheets_max_retries,
            config.sheets_retry_backoff_base_ms,
            Duration::from_secs(config.cache_ttl_secs),
        )?;
        Ok(match &config.google_api_key {
            Some(key) => client.with_api_key(key.clone()),
            None => client,
        })
    }

    /// Switches to the Sheets v4 values transport.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Overrides the Sheets API origin.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_owned();
        self
    }

    /// Builds the public CSV export URL for `sheet` of the spreadsheet at
    /// `spreadsheet_url` (any URL containing `/spreadsheets/d/{id}`).
    ///
    /// # Errors
    ///
    /// Returns [`SheetsError::InvalidSpreadsheetUrl`] when no spreadsheet id
    /// can be found.
    pub fn export_url(spreadsheet_url: &str, sheet: &str) -> Result<String, SheetsError> {
        let (origin, id) = spreadsheet_parts(spreadsheet_url)?;
        let mut url = parse_url(
            &format!("{origin}/spreadsheets/d/{id}/gviz/tq"),
            spreadsheet_url,
        )?;
        url.query_pairs_mut()
            .append_pair("tqx", "out:csv")
            .append_pair("sheet", sheet);
        Ok(url.to_string())
    }

    /// Builds the Sheets v4 `values.get` URL for the whole of `sheet`.
    ///
    /// # Errors
    ///
    /// Returns [`SheetsError::InvalidSpreadsheetUrl`] when no spreadsheet id
    /// can be found.
    pub fn values_url(
        &self,
        spreadsheet_url: &str,
        sheet: &str,
        api_key: &str,
    ) -> Result<String, SheetsError> {
        let (_, id) = spreadsheet_parts(spreadsheet_url)?;
        let mut url = parse_url(&self.api_base, spreadsheet_url)?;
        // A bare sheet name is a valid A1 range once quoted.
        let range = format!("'{}'", sheet.replace('\'', "''"));
        url.path_segments_mut()
            .map_err(|()| SheetsError::InvalidSpreadsheetUrl {
                url: self.api_base.clone(),
                reason: "API base cannot carry a path".to_owned(),
            })?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", id.as_str(), "values", range.as_str()]);
        url.query_pairs_mut()
            .append_pair("valueRenderOption", "UNFORMATTED_VALUE")
            .append_pair("key", api_key);
        Ok(url.to_string())
    }

    /// Fetches `sheet`, serving it from the cache while the cached copy is
    /// younger than the TTL.
    ///
    /// # Errors
    ///
    /// - [`SheetsError::InvalidSpreadsheetUrl`] if the URL has no spreadsheet id.
    /// - [`SheetsError::NotFound`] on 404.
    /// - [`SheetsError::AccessDenied`] on 401/403, or when the export returns
    ///   an HTML sign-in page instead of CSV.
    /// - [`SheetsError::RateLimited`] on 429 once retries are exhausted.
    /// - [`SheetsError::UnexpectedStatus`] for any other non-2xx status.
    /// - [`SheetsError::Http`] on transport failure.
    /// - [`SheetsError::Csv`] / [`SheetsError::Deserialize`] if the body does
    ///   not decode.
    pub async fn fetch_table(
        &self,
        spreadsheet_url: &str,
        sheet: &str,
    ) -> Result<Arc<RawTable>, SheetsError> {
        let key = (spreadsheet_url.to_owned(), sheet.to_owned());
        if let Some(table) = self.cache.get(&key).await {
            tracing::debug!(sheet, rows = table.len(), "sheet cache hit");
            return Ok(table);
        }

        let table = match &self.api_key {
            Some(api_key) => self.fetch_values(spreadsheet_url, sheet, api_key).await?,
            None => self.fetch_export(spreadsheet_url, sheet).await?,
        };
        let table = Arc::new(table);
        self.cache.insert(key, Arc::clone(&table)).await;
        Ok(table)
    }

    async fn fetch_export(&self, spreadsheet_url: &str, sheet: &str) -> Result<RawTable, SheetsError> {
        let url = Self::export_url(spreadsheet_url, sheet)?;
        let context = format!("sheet \"{sheet}\"");

        self.retry.run(|| {
            let url = url.clone();
            let context = context.clone();
            async move {
                let response = self
                    .client
                    .get(&url)
                    .header(reqwest::header::ACCEPT, "text/csv,*/*;q=0.8")
                    .send()
                    .await?;
                let response = check_status(response, &url)?;

                let is_html = response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(|ct| ct.starts_with("text/html"));
                let body = response.text().await?;
                if is_html || looks_like_html(&body) {
                    return Err(SheetsError::AccessDenied {
                        url,
                        reason: "received an HTML page instead of CSV; is the sheet shared by link?"
                            .to_owned(),
                    });
                }

                parse_csv_table(&body, &context)
            }
        })
        .await
    }

    async fn fetch_values(
        &self,
        spreadsheet_url: &str,
        sheet: &str,
        api_key: &str,
    ) -> Result<RawTable, SheetsError> {
        let url = self.values_url(spreadsheet_url, sheet, api_key)?;
        // Error messages never carry the key.
        let shown = url.split('?').next().unwrap_or_default().to_owned();
        let context = format!("sheet \"{sheet}\"");

        self.retry.run(|| {
            let url = url.clone();
            let shown = shown.clone();
            let context = context.clone();
            async move {
                let response = self
                    .client
                    .get(&url)
                    .header(reqwest::header::ACCEPT, "application/json")
                    .send()
                    .await
                    .map_err(reqwest::Error::without_url)?;
                let response = check_status(response, &shown)?;
                let body = response.text().await.map_err(reqwest::Error::without_url)?;
                parse_values_json(&body, &context)
            }
        })
        .await
    }
}

/// Maps non-2xx statuses to typed errors.
fn check_status(response: Response, url: &str) -> Result<Response, SheetsError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(60);
        return Err(SheetsError::RateLimited { retry_after_secs });
    }

    if status == StatusCode::NOT_FOUND {
        return Err(SheetsError::NotFound {
            url: url.to_owned(),
        });
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(SheetsError::AccessDenied {
            url: url.to_owned(),
            reason: format!("HTTP {}", status.as_u16()),
        });
    }

    if !status.is_success() {
        return Err(SheetsError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_owned(),
        });
    }

    Ok(response)
}

fn looks_like_html(body: &str) -> bool {
    let head: String = body
        .trim_start()
        .chars()
        .take(14)
        .collect::<String>()
        .to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

fn parse_url(raw: &str, spreadsheet_url: &str) -> Result<Url, SheetsError> {
    Url::parse(raw).map_err(|e| SheetsError::InvalidSpreadsheetUrl {
        url: spreadsheet_url.to_owned(),
        reason: e.to_string(),
    })
}

/// Splits a spreadsheet URL into its origin and spreadsheet id.
fn spreadsheet_parts(spreadsheet_url: &str) -> Result<(String, String), SheetsError> {
    let parsed = parse_url(spreadsheet_url.trim(), spreadsheet_url)?;
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(Iterator::collect)
        .unwrap_or_default();

    let id = segments
        .windows(3)
        .find(|w| w[0] == "spreadsheets" && w[1] == "d" && !w[2].is_empty())
        .map(|w| w[2].to_owned())
        .ok_or_else(|| SheetsError::InvalidSpreadsheetUrl {
            url: spreadsheet_url.to_owned(),
            reason: "expected a /spreadsheets/d/{id} path".to_owned(),
        })?;

    Ok((parsed.origin().ascii_serialization(), id))
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;

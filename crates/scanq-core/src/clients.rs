//! The client/sheet catalog: which spreadsheets exist and which tabs to read.
//!
//! Loaded from `config/clients.yaml`. This is the explicit list of known tabs;
//! nothing here discovers sheets by inspecting the spreadsheet itself.

use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::records::PaymentRates;
use crate::ConfigError;

/// Default preferred names for the column holding the free-text identifier.
pub const DEFAULT_NAMING_COLUMNS: [&str; 2] = ["Patient", "Cast"];

/// Default preferred names for the column holding the quality status.
pub const DEFAULT_STATUS_COLUMNS: [&str; 4] =
    ["Quality Check (um)", "Quality Check", "Quality", "Status"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetKind {
    Patient,
    Cast,
}

impl std::fmt::Display for SheetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetKind::Patient => write!(f, "patient"),
            SheetKind::Cast => write!(f, "cast"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetConfig {
    /// Worksheet (tab) name exactly as it appears in the spreadsheet.
    pub name: String,
    pub kind: SheetKind,
    /// Overrides [`DEFAULT_NAMING_COLUMNS`] for this sheet.
    #[serde(default)]
    pub naming_columns: Option<Vec<String>>,
    /// Overrides [`DEFAULT_STATUS_COLUMNS`] for this sheet.
    #[serde(default)]
    pub status_columns: Option<Vec<String>>,
}

impl SheetConfig {
    #[must_use]
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }

    /// Preferred naming-column names, in priority order.
    #[must_use]
    pub fn naming_columns(&self) -> Vec<String> {
        self.naming_columns.clone().unwrap_or_else(|| {
            DEFAULT_NAMING_COLUMNS
                .iter()
                .map(|s| (*s).to_string())
                .collect()
        })
    }

    /// Preferred status-column names, in priority order.
    #[must_use]
    pub fn status_columns(&self) -> Vec<String> {
        self.status_columns.clone().unwrap_or_else(|| {
            DEFAULT_STATUS_COLUMNS
                .iter()
                .map(|s| (*s).to_string())
                .collect()
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub name: String,
    #[serde(default)]
    pub spreadsheet_url: Option<String>,
    /// Name of an env var holding the spreadsheet URL, for URLs kept out of
    /// the checked-in catalog.
    #[serde(default)]
    pub spreadsheet_url_env: Option<String>,
    #[serde(default)]
    pub approved_rate: Option<Decimal>,
    #[serde(default)]
    pub partial_rate: Option<Decimal>,
    pub sheets: Vec<SheetConfig>,
}

impl ClientConfig {
    /// Generate a URL-safe slug from the client name.
    #[must_use]
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }

    /// Resolves the spreadsheet URL, reading `spreadsheet_url_env` through
    /// `lookup` when the URL is not inline.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] if the referenced env var is
    /// unset or blank.
    pub fn spreadsheet_url<F>(&self, lookup: F) -> Result<String, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        if let Some(url) = &self.spreadsheet_url {
            return Ok(url.clone());
        }
        let var = self.spreadsheet_url_env.as_deref().unwrap_or_default();
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    }

    /// Client rates, falling back to `defaults` for any rate not overridden.
    #[must_use]
    pub fn rates(&self, defaults: PaymentRates) -> PaymentRates {
        PaymentRates {
            approved: self.approved_rate.unwrap_or(defaults.approved),
            partial: self.partial_rate.unwrap_or(defaults.partial),
        }
    }

    /// Finds a sheet by slug or by exact (case-insensitive) tab name.
    #[must_use]
    pub fn find_sheet(&self, key: &str) -> Option<&SheetConfig> {
        self.sheets
            .iter()
            .find(|s| s.slug() == key || s.name.eq_ignore_ascii_case(key))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientsFile {
    pub clients: Vec<ClientConfig>,
}

impl ClientsFile {
    /// Finds a client by slug or by case-insensitive name.
    #[must_use]
    pub fn find(&self, key: &str) -> Option<&ClientConfig> {
        self.clients
            .iter()
            .find(|c| c.slug() == key || c.name.eq_ignore_ascii_case(key))
    }
}

/// Load and validate the client catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_clients(path: &Path) -> Result<ClientsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ClientsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let clients_file: ClientsFile = serde_yaml::from_str(&content)?;

    validate_clients(&clients_file)?;

    Ok(clients_file)
}

fn validate_clients(clients_file: &ClientsFile) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();
    let mut seen_slugs = HashSet::new();

    for client in &clients_file.clients {
        if client.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "client name must be non-empty".to_string(),
            ));
        }

        if !seen_names.insert(client.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate client name: '{}'",
                client.name
            )));
        }

        let slug = client.slug();
        if slug.is_empty() || !seen_slugs.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate or empty client slug: '{}' (from client '{}')",
                slug, client.name
            )));
        }

        match (&client.spreadsheet_url, &client.spreadsheet_url_env) {
            (Some(_), None) | (None, Some(_)) => {}
            _ => {
                return Err(ConfigError::Validation(format!(
                    "client '{}' must set exactly one of spreadsheet_url or spreadsheet_url_env",
                    client.name
                )));
            }
        }

        for (label, rate) in [
            ("approved_rate", client.approved_rate),
            ("partial_rate", client.partial_rate),
        ] {
            if rate.is_some_and(|r| r.is_sign_negative() && !r.is_zero()) {
                return Err(ConfigError::Validation(format!(
                    "client '{}' has negative {label}",
                    client.name
                )));
            }
        }

        validate_sheets(client)?;
    }

    Ok(())
}

fn validate_sheets(client: &ClientConfig) -> Result<(), ConfigError> {
    if client.sheets.is_empty() {
        return Err(ConfigError::Validation(format!(
            "client '{}' must list at least one sheet",
            client.name
        )));
    }

    let mut seen = HashSet::new();
    for sheet in &client.sheets {
        if sheet.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "client '{}' has a sheet with an empty name",
                client.name
            )));
        }
        if !seen.insert(sheet.slug()) {
            return Err(ConfigError::Validation(format!(
                "client '{}' has duplicate sheet '{}'",
                client.name, sheet.name
            )));
        }
        let empty_override = [&sheet.naming_columns, &sheet.status_columns]
            .into_iter()
            .any(|cols| cols.as_ref().is_some_and(Vec::is_empty));
        if empty_override {
            return Err(ConfigError::Validation(format!(
                "sheet '{}' of client '{}' has an empty column list",
                sheet.name, client.name
            )));
        }
    }

    Ok(())
}

fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else if c == ' ' || c == '_' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|&c| c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
#[path = "clients_test.rs"]
mod tests;

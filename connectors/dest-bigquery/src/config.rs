//! BigQuery connection settings, read from `export.warehouse.config`.

use std::time::Duration;

use serde::Deserialize;

use tablehop_types::error::{Result, TransferError};

pub const DEFAULT_BASE_URL: &str = "https://bigquery.googleapis.com";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Project that owns load jobs; also the default when the table id
    /// omits its project.
    #[serde(default)]
    pub project_id: Option<String>,
    /// OAuth2 bearer token with BigQuery write scope.
    pub access_token: String,
    /// Dataset location (e.g. `US`, `EU`). Required for job polling
    /// outside the default multi-regions.
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Config {
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        let config: Self = serde_json::from_value(value.clone()).map_err(|e| {
            TransferError::config("INVALID_CONFIG", format!("bigquery config: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.access_token.trim().is_empty() {
            return Err(TransferError::config(
                "INVALID_CONFIG",
                "bigquery access_token is empty",
            ));
        }
        if self
            .project_id
            .as_deref()
            .is_some_and(|p| p.trim().is_empty())
        {
            return Err(TransferError::config(
                "INVALID_CONFIG",
                "bigquery project_id is empty",
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(TransferError::config(
                "INVALID_CONFIG",
                "bigquery poll_interval_ms must be > 0",
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(TransferError::config(
                "INVALID_CONFIG",
                "bigquery request_timeout_secs must be > 0",
            ));
        }
        url::Url::parse(&self.base_url).map_err(|e| {
            TransferError::config(
                "INVALID_CONFIG",
                format!("bigquery base_url '{}': {e}", self.base_url),
            )
        })?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

//! PostgreSQL connection settings, read from the pipeline's `postgres` block.

use serde::Deserialize;

use tablehop_types::error::{Result, TransferError};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub database: String,
    /// Schema that unqualified destination tables are created in.
    #[serde(default = "default_schema")]
    pub schema: String,
}

fn default_port() -> u16 {
    5432
}

fn default_schema() -> String {
    "public".to_string()
}

impl Config {
    /// Deserialize and validate a connector config value.
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        let config: Self = serde_json::from_value(value.clone()).map_err(|e| {
            TransferError::config("INVALID_CONFIG", format!("postgres config: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(TransferError::config("INVALID_CONFIG", "postgres host is empty"));
        }
        if self.port == 0 {
            return Err(TransferError::config("INVALID_CONFIG", "postgres port must be > 0"));
        }
        if self.database.trim().is_empty() {
            return Err(TransferError::config(
                "INVALID_CONFIG",
                "postgres database is empty",
            ));
        }
        if self.schema.trim().is_empty() {
            return Err(TransferError::config("INVALID_CONFIG", "postgres schema is empty"));
        }
        Ok(())
    }
}

//! Pipeline YAML configuration types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::batcher::DEFAULT_BATCH_SIZE;
use crate::query::DEFAULT_CHUNK_SIZE;

pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 600;

/// Top-level pipeline file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub version: String,
    pub pipeline: String,
    /// Relational store connection, shared by both hops.
    pub postgres: serde_json::Value,
    #[serde(default)]
    pub ingest: Option<IngestConfig>,
    #[serde(default)]
    pub export: Option<ExportConfig>,
}

/// Columnar file -> relational table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub source_path: PathBuf,
    pub table: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

/// Relational query -> warehouse table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub source_table: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,
    pub warehouse: WarehouseConfig,
}

impl ExportConfig {
    /// The query to run: `query` when given, otherwise a full scan of
    /// `source_table`.
    pub fn effective_query(&self) -> Option<String> {
        match (&self.query, &self.source_table) {
            (Some(q), _) if !q.trim().is_empty() => Some(q.trim().to_string()),
            (_, Some(t)) if !t.trim().is_empty() => Some(format!("SELECT * FROM {}", t.trim())),
            _ => None,
        }
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
    /// `dataset.table` or `project.dataset.table`.
    pub table: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_job_timeout_secs() -> u64 {
    DEFAULT_JOB_TIMEOUT_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn export(query: Option<&str>, source_table: Option<&str>) -> ExportConfig {
        ExportConfig {
            source_table: source_table.map(str::to_string),
            query: query.map(str::to_string),
            chunk_size: DEFAULT_CHUNK_SIZE,
            job_timeout_secs: DEFAULT_JOB_TIMEOUT_SECS,
            warehouse: WarehouseConfig {
                table: "ds.t".into(),
                config: serde_json::Value::Null,
            },
        }
    }

    #[test]
    fn explicit_query_wins() {
        let cfg = export(Some("SELECT 1 "), Some("public.trips"));
        assert_eq!(cfg.effective_query().as_deref(), Some("SELECT 1"));
    }

    #[test]
    fn source_table_becomes_full_scan() {
        let cfg = export(None, Some("public_mart.fact_trips"));
        assert_eq!(
            cfg.effective_query().as_deref(),
            Some("SELECT * FROM public_mart.fact_trips")
        );
    }

    #[test]
    fn neither_yields_none() {
        assert!(export(Some("  "), None).effective_query().is_none());
    }
}

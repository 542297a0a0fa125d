//! Semantic validation of a parsed pipeline.

use anyhow::{bail, Result};

use crate::config::types::{ExportConfig, IngestConfig, PipelineConfig};

/// `name` or `schema.name`, unquoted SQL identifiers.
fn is_relation_name(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() <= 2
        && parts.iter().all(|p| {
            let mut chars = p.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        })
}

fn validate_ingest(ingest: &IngestConfig, errors: &mut Vec<String>) {
    if ingest.source_path.as_os_str().is_empty() {
        errors.push("ingest.source_path must not be empty".to_string());
    }
    if ingest.table.trim().is_empty() {
        errors.push("ingest.table must not be empty".to_string());
    }
    if ingest.batch_size == 0 {
        errors.push("ingest.batch_size must be at least 1".to_string());
    }
}

fn validate_export(export: &ExportConfig, errors: &mut Vec<String>) {
    if export.effective_query().is_none() {
        errors.push("export needs either `query` or `source_table`".to_string());
    }
    // a blank query falls back to source_table
    let query_blank = export.query.as_deref().map(str::trim).unwrap_or_default().is_empty();
    if let Some(table) = export.source_table.as_deref() {
        if query_blank && !is_relation_name(table.trim()) {
            errors.push(format!(
                "export.source_table '{table}' is not a table or schema.table name"
            ));
        }
    }
    if export.chunk_size == 0 {
        errors.push("export.chunk_size must be at least 1".to_string());
    }
    if export.job_timeout_secs == 0 {
        errors.push("export.job_timeout_secs must be at least 1".to_string());
    }

    let id = export.warehouse.table.trim();
    let parts: Vec<&str> = id.split('.').collect();
    if !(2..=3).contains(&parts.len()) || parts.iter().any(|p| p.trim().is_empty()) {
        errors.push(format!(
            "export.warehouse.table '{id}' must be dataset.table or project.dataset.table"
        ));
    }
}

/// Validate a parsed pipeline, reporting every problem at once.
///
/// # Errors
///
/// Fails with one message listing all validation failures.
pub fn validate_pipeline(config: &PipelineConfig) -> Result<()> {
    let mut errors = Vec::new();

    if config.version != "1.0" {
        errors.push(format!(
            "Unsupported pipeline version '{}', expected '1.0'",
            config.version
        ));
    }
    if config.pipeline.trim().is_empty() {
        errors.push("Pipeline name must not be empty".to_string());
    }
    if config.ingest.is_none() && config.export.is_none() {
        errors.push("Pipeline must define `ingest`, `export`, or both".to_string());
    }
    if let Some(ingest) = &config.ingest {
        validate_ingest(ingest, &mut errors);
    }
    if let Some(export) = &config.export {
        validate_export(export, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        bail!("Pipeline validation failed:\n  - {}", errors.join("\n  - "));
    }
}

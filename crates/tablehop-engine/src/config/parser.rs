//! Pipeline YAML loading with `${VAR}` environment substitution.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::config::types::PipelineConfig;

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var regex"));

/// Replace every `${NAME}` with the value of environment variable `NAME`.
///
/// # Errors
///
/// Fails listing every referenced variable that is unset.
pub fn substitute_env_vars(input: &str) -> Result<String> {
    let mut missing: Vec<String> = Vec::new();
    let out = ENV_VAR_RE.replace_all(input, |cap: &regex::Captures<'_>| {
        match std::env::var(&cap[1]) {
            Ok(val) => val,
            Err(_) => {
                if !missing.iter().any(|m| m == &cap[1]) {
                    missing.push(cap[1].to_string());
                }
                String::new()
            }
        }
    });

    if !missing.is_empty() {
        anyhow::bail!("Missing environment variable(s): {}", missing.join(", "));
    }
    Ok(out.into_owned())
}

/// Parse pipeline YAML text.
///
/// # Errors
///
/// Fails when substitution fails or the YAML does not match [`PipelineConfig`].
pub fn parse_pipeline_str(yaml: &str) -> Result<PipelineConfig> {
    let substituted = substitute_env_vars(yaml)?;
    serde_yaml::from_str(&substituted).context("Failed to parse pipeline YAML")
}

/// Read and parse a pipeline file.
///
/// # Errors
///
/// Fails when the file cannot be read or does not parse.
pub fn parse_pipeline(path: &Path) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read pipeline file: {}", path.display()))?;
    parse_pipeline_str(&content)
        .with_context(|| format!("Invalid pipeline file: {}", path.display()))
}

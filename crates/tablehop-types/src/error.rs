//! Structured error model for transfer operations.
//!
//! [`TransferError`] carries a failure category, the position inside the
//! transfer where it happened, and how much the failing hop had already
//! written. Construct via the category-specific factory methods.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad classification of a transfer failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Invalid transfer configuration.
    Config,
    /// Relational or warehouse endpoint could not be reached.
    Connection,
    /// Schema create/replace failed, or a batch does not match the
    /// bootstrapped schema.
    Schema,
    /// Columnar source unreadable or corrupt, or a result page could not be fetched.
    Read,
    /// Row append into the relational sink failed.
    Write,
    /// Warehouse load job reported an error or did not finish in time.
    LoadJob,
    /// Broken internal contract (e.g. chunks offered out of order).
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Config => "config",
            Self::Connection => "connection",
            Self::Schema => "schema",
            Self::Read => "read",
            Self::Write => "write",
            Self::LoadJob => "load_job",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Where in a transfer an error happened.
///
/// All positions are 1-based ordinals, matching what the transfer logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_group: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk: Option<u64>,
}

impl ErrorContext {
    pub fn is_empty(&self) -> bool {
        self.row_group.is_none() && self.batch.is_none() && self.chunk.is_none()
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        let mut parts = Vec::with_capacity(3);
        if let Some(rg) = self.row_group {
            parts.push(format!("row_group={rg}"));
        }
        if let Some(batch) = self.batch {
            parts.push(format!("batch={batch}"));
        }
        if let Some(chunk) = self.chunk {
            parts.push(format!("chunk={chunk}"));
        }
        write!(f, " ({})", parts.join(", "))
    }
}

/// Structured error from a transfer step.
///
/// Every `TransferError` is fatal to the hop that raised it; the caller
/// decides whether to re-run the whole hop. `safe_to_retry` tells it whether
/// doing so can duplicate rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("[{category}] {code}: {message}{context}")]
pub struct TransferError {
    pub category: ErrorCategory,
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub context: ErrorContext,
    /// Rows the failing hop had already persisted when the error surfaced.
    #[serde(default)]
    pub rows_written: u64,
    pub safe_to_retry: bool,
}

/// Convenience alias used across the engine and connectors.
pub type Result<T> = std::result::Result<T, TransferError>;

impl TransferError {
    fn new(category: ErrorCategory, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            category,
            code: code.into(),
            message: message.into(),
            context: ErrorContext::default(),
            rows_written: 0,
            safe_to_retry: true,
        }
    }

    /// Configuration error.
    #[must_use]
    pub fn config(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Config, code, message)
    }

    /// Endpoint unreachable or connection dropped.
    #[must_use]
    pub fn connection(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Connection, code, message)
    }

    /// Schema create/replace or schema mismatch.
    #[must_use]
    pub fn schema(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Schema, code, message)
    }

    /// Source or result-set read failure.
    #[must_use]
    pub fn read(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Read, code, message)
    }

    /// Relational append failure.
    #[must_use]
    pub fn write(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Write, code, message)
    }

    /// Warehouse load job failure or timeout.
    #[must_use]
    pub fn load_job(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::LoadJob, code, message)
    }

    /// Internal contract violation.
    #[must_use]
    pub fn internal(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Internal, code, message)
    }

    /// Attach the 1-based row-group ordinal.
    #[must_use]
    pub fn with_row_group(mut self, row_group: usize) -> Self {
        self.context.row_group = Some(row_group);
        self
    }

    /// Attach the 1-based batch ordinal within its row group.
    #[must_use]
    pub fn with_batch(mut self, batch: usize) -> Self {
        self.context.batch = Some(batch);
        self
    }

    /// Attach the 1-based chunk index.
    #[must_use]
    pub fn with_chunk(mut self, chunk: u64) -> Self {
        self.context.chunk = Some(chunk);
        self
    }

    /// Record how many rows the hop had persisted before failing.
    #[must_use]
    pub fn with_rows_written(mut self, rows: u64) -> Self {
        self.rows_written = rows;
        self
    }

    /// Override whether re-running the hop from scratch is safe.
    #[must_use]
    pub fn with_retry_safety(mut self, safe: bool) -> Self {
        self.safe_to_retry = safe;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factories_set_category() {
        assert_eq!(TransferError::config("X", "y").category, ErrorCategory::Config);
        assert_eq!(TransferError::connection("X", "y").category, ErrorCategory::Connection);
        assert_eq!(TransferError::schema("X", "y").category, ErrorCategory::Schema);
        assert_eq!(TransferError::read("X", "y").category, ErrorCategory::Read);
        assert_eq!(TransferError::write("X", "y").category, ErrorCategory::Write);
        assert_eq!(TransferError::load_job("X", "y").category, ErrorCategory::LoadJob);
    }

    #[test]
    fn fresh_errors_are_safe_to_retry() {
        let err = TransferError::read("CORRUPT_FOOTER", "bad magic");
        assert!(err.safe_to_retry);
        assert_eq!(err.rows_written, 0);
    }

    #[test]
    fn partial_write_can_disable_retry() {
        let err = TransferError::write("INSERT_FAILED", "boom")
            .with_rows_written(2_000)
            .with_retry_safety(false);
        assert_eq!(err.rows_written, 2_000);
        assert!(!err.safe_to_retry);
    }

    #[test]
    fn display_without_context() {
        let err = TransferError::config("BAD_BATCH_SIZE", "batch_size must be positive");
        assert_eq!(
            err.to_string(),
            "[config] BAD_BATCH_SIZE: batch_size must be positive"
        );
    }

    #[test]
    fn display_with_context() {
        let err = TransferError::write("INSERT_FAILED", "duplicate key")
            .with_row_group(2)
            .with_batch(3);
        assert_eq!(
            err.to_string(),
            "[write] INSERT_FAILED: duplicate key (row_group=2, batch=3)"
        );

        let err = TransferError::load_job("JOB_FAILED", "quota").with_chunk(2);
        assert_eq!(err.to_string(), "[load_job] JOB_FAILED: quota (chunk=2)");
    }

    #[test]
    fn serde_roundtrip() {
        let err = TransferError::schema("COLUMN_MISMATCH", "extra column")
            .with_row_group(4)
            .with_rows_written(10);
        let json = serde_json::to_string(&err).unwrap();
        let back: TransferError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }
}

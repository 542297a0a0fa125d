//! Per-hop run summaries.

use serde::Serialize;

/// Outcome of a completed ingest hop.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestSummary {
    pub row_groups: usize,
    pub batches: usize,
    pub rows_written: u64,
    pub duration_secs: f64,
}

/// Outcome of a completed export hop.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportSummary {
    pub chunks: u64,
    pub rows_loaded: u64,
    pub duration_secs: f64,
}

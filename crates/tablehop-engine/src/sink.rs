//! Relational destination seam for the ingest hop.

use arrow::record_batch::RecordBatch;

use tablehop_types::error::Result;

/// Row store that receives ingest batches.
///
/// Calls are independent: an append that fails partway may leave a prefix
/// of its rows persisted, and nothing already appended is rolled back.
#[allow(async_fn_in_trait)]
pub trait LoadSink {
    /// Create `table`, dropping any existing table of that name, with the
    /// columns of `empty` (a zero-row batch).
    async fn replace_schema(&mut self, table: &str, empty: &RecordBatch) -> Result<()>;

    /// Append `rows` to `table`, returning the number of rows inserted.
    async fn append(&mut self, table: &str, rows: &RecordBatch) -> Result<u64>;
}

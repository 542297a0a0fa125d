//! Columnar source seam for the ingest hop.

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;

use tablehop_types::error::Result;

/// Ordered sequence of row groups with a fixed file-level schema.
pub trait RowGroupSource {
    fn num_row_groups(&self) -> usize;

    /// File-level schema, before column-name normalization.
    fn schema(&self) -> SchemaRef;

    /// Read the whole row group at 0-based `index` into memory.
    fn read_row_group(&mut self, index: usize) -> Result<RecordBatch>;
}

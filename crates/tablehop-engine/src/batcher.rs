//! Row-group batching for the ingest hop.

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;

use tablehop_types::error::{Result, TransferError};

use crate::arrow_utils::normalize_columns;

/// Default number of rows per relational insert batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Ordered slice of one row group, at most `batch_size` rows.
#[derive(Debug, Clone)]
pub struct Batch {
    /// 0-based position of the source row group.
    pub row_group_index: usize,
    /// 1-based position of this batch inside its row group.
    pub batch_index: usize,
    pub rows: RecordBatch,
}

impl Batch {
    pub fn num_rows(&self) -> usize {
        self.rows.num_rows()
    }

    pub fn schema(&self) -> SchemaRef {
        self.rows.schema()
    }
}

/// Splits one row group into consecutive batches of at most `batch_size`
/// rows.
///
/// Column names are lower-cased once when the batcher is built; every batch
/// is a zero-copy slice sharing that normalized schema. Batches are produced
/// lazily and never span into another row group. A row group with no rows
/// yields no batches.
#[derive(Debug)]
pub struct RowGroupBatcher {
    row_group_index: usize,
    rows: RecordBatch,
    batch_size: usize,
    offset: usize,
    next_batch_index: usize,
}

impl RowGroupBatcher {
    pub fn new(row_group_index: usize, rows: &RecordBatch, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(TransferError::config(
                "INVALID_BATCH_SIZE",
                "batch_size must be at least 1",
            ));
        }
        let rows = normalize_columns(rows).map_err(|e| e.with_row_group(row_group_index + 1))?;
        Ok(Self {
            row_group_index,
            rows,
            batch_size,
            offset: 0,
            next_batch_index: 1,
        })
    }

    /// Normalized schema shared by every batch of this row group.
    pub fn schema(&self) -> SchemaRef {
        self.rows.schema()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.num_rows()
    }

    /// Total number of batches this row group splits into.
    pub fn batch_count(&self) -> usize {
        self.rows.num_rows().div_ceil(self.batch_size)
    }
}

impl Iterator for RowGroupBatcher {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        let total = self.rows.num_rows();
        if self.offset >= total {
            return None;
        }
        let len = self.batch_size.min(total - self.offset);
        let batch = Batch {
            row_group_index: self.row_group_index,
            batch_index: self.next_batch_index,
            rows: self.rows.slice(self.offset, len),
        };
        self.offset += len;
        self.next_batch_index += 1;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .rows
            .num_rows()
            .saturating_sub(self.offset)
            .div_ceil(self.batch_size);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RowGroupBatcher {}

//! Chunked reading of a query result for the export hop.

use arrow::record_batch::RecordBatch;

use tablehop_types::error::{Result, TransferError};

/// Default number of rows per warehouse load chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 50_000;

/// Server-side handle over an already-executed query.
#[allow(async_fn_in_trait)]
pub trait QueryCursor {
    /// Fetch up to `max_rows` further rows in query order.
    ///
    /// `None` or an empty batch means the result set is exhausted.
    async fn fetch(&mut self, max_rows: usize) -> Result<Option<RecordBatch>>;

    /// Release the cursor. Called once, after exhaustion or on abort.
    async fn close(&mut self) -> Result<()>;
}

/// Ordered slice of a query result set.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// 1-based, contiguous across the result set.
    pub index: u64,
    pub rows: RecordBatch,
}

impl Chunk {
    pub fn num_rows(&self) -> usize {
        self.rows.num_rows()
    }
}

/// Reject a chunk size the reader could never page with.
pub fn validate_chunk_size(chunk_size: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(TransferError::config(
            "INVALID_CHUNK_SIZE",
            "chunk_size must be at least 1",
        ));
    }
    Ok(())
}

/// Pages a query result into chunks of at most `chunk_size` rows.
pub struct ChunkedQueryReader<C> {
    cursor: C,
    chunk_size: usize,
    chunks_read: u64,
    rows_read: u64,
    exhausted: bool,
}

impl<C: QueryCursor> ChunkedQueryReader<C> {
    pub fn new(cursor: C, chunk_size: usize) -> Result<Self> {
        validate_chunk_size(chunk_size)?;
        Ok(Self {
            cursor,
            chunk_size,
            chunks_read: 0,
            rows_read: 0,
            exhausted: false,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunks_read(&self) -> u64 {
        self.chunks_read
    }

    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Next chunk, or `None` once the result set is exhausted.
    ///
    /// The cursor is closed as soon as an empty page is seen. A fetch error
    /// leaves the cursor open; call [`abort`](Self::abort) to release it.
    pub async fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        if self.exhausted {
            return Ok(None);
        }
        let next_index = self.chunks_read + 1;

        let page = self
            .cursor
            .fetch(self.chunk_size)
            .await
            .map_err(|e| e.with_chunk(next_index))?;

        let rows = match page {
            Some(rows) if rows.num_rows() > 0 => rows,
            _ => {
                self.exhausted = true;
                self.cursor.close().await?;
                tracing::debug!(
                    chunks = self.chunks_read,
                    total_rows = self.rows_read,
                    "Query result exhausted"
                );
                return Ok(None);
            }
        };

        if rows.num_rows() > self.chunk_size {
            return Err(TransferError::internal(
                "OVERSIZED_PAGE",
                format!(
                    "cursor returned {} rows for a {}-row fetch",
                    rows.num_rows(),
                    self.chunk_size
                ),
            )
            .with_chunk(next_index));
        }

        self.chunks_read = next_index;
        self.rows_read += rows.num_rows() as u64;
        Ok(Some(Chunk {
            index: next_index,
            rows,
        }))
    }

    /// Stop reading early and release the cursor.
    pub async fn abort(&mut self) -> Result<()> {
        if self.exhausted {
            return Ok(());
        }
        self.exhausted = true;
        self.cursor.close().await
    }

    pub fn into_inner(self) -> C {
        self.cursor
    }
}

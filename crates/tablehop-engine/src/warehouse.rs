//! Warehouse load jobs for the export hop.

use std::time::{Duration, Instant};

use arrow::record_batch::RecordBatch;

use tablehop_types::error::{Result, TransferError};
use tablehop_types::{disposition, TransferPhase, WriteDisposition};

use crate::query::{Chunk, ChunkedQueryReader, QueryCursor};
use crate::result::ExportSummary;

/// One chunk submitted as a warehouse load job.
#[derive(Debug, Clone, Copy)]
pub struct LoadJob<'a> {
    pub table: &'a str,
    pub write_disposition: WriteDisposition,
    pub chunk_index: u64,
    pub rows: &'a RecordBatch,
}

/// Identifies a submitted job for polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub job_id: String,
    pub location: Option<String>,
}

/// Statistics reported by a finished job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobOutcome {
    pub output_rows: Option<u64>,
}

/// Analytical warehouse accepting load jobs.
#[allow(async_fn_in_trait)]
pub trait Warehouse {
    async fn submit(&mut self, job: LoadJob<'_>) -> Result<JobHandle>;

    /// Block until the job finishes; an error if it finished unsuccessfully.
    async fn wait(&mut self, handle: &JobHandle) -> Result<JobOutcome>;
}

/// Loads chunks into one warehouse table, one synchronous job per chunk.
///
/// Chunk 1 truncates the table and every later chunk appends. Chunks must
/// arrive in ascending, gap-free order. The first failure moves the loader
/// to [`TransferPhase::Failed`] and every later call is refused.
pub struct WarehouseLoader<W> {
    warehouse: W,
    table: String,
    job_timeout: Option<Duration>,
    phase: TransferPhase,
    rows_loaded: u64,
    chunks_loaded: u64,
}

impl<W: Warehouse> WarehouseLoader<W> {
    pub fn new(warehouse: W, table: impl Into<String>) -> Self {
        Self {
            warehouse,
            table: table.into(),
            job_timeout: None,
            phase: TransferPhase::Init,
            rows_loaded: 0,
            chunks_loaded: 0,
        }
    }

    /// Fail a chunk whose job has not finished within `timeout`.
    #[must_use]
    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = Some(timeout);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn phase(&self) -> TransferPhase {
        self.phase
    }

    /// Rows from chunks whose jobs have reported success.
    pub fn rows_loaded(&self) -> u64 {
        self.rows_loaded
    }

    pub fn chunks_loaded(&self) -> u64 {
        self.chunks_loaded
    }

    pub fn warehouse(&self) -> &W {
        &self.warehouse
    }

    pub fn into_inner(self) -> W {
        self.warehouse
    }

    /// Submit `chunk` and wait for its job to finish.
    ///
    /// Returns the number of rows the chunk contributed.
    pub async fn load_chunk(&mut self, chunk: &Chunk) -> Result<u64> {
        if self.phase.is_terminal() {
            return Err(TransferError::internal(
                "LOADER_FINISHED",
                format!("loader is {}, cannot load chunk {}", self.phase, chunk.index),
            )
            .with_chunk(chunk.index)
            .with_rows_written(self.rows_loaded));
        }
        let expected = self.chunks_loaded + 1;
        if chunk.index != expected {
            let err = TransferError::internal(
                "CHUNK_OUT_OF_ORDER",
                format!("expected chunk {expected}, got chunk {}", chunk.index),
            );
            return Err(self.fail(err, chunk.index));
        }

        let write_disposition = disposition(chunk.index);
        let next_phase = match write_disposition {
            WriteDisposition::Truncate => TransferPhase::Bootstrap,
            WriteDisposition::Append => TransferPhase::SteadyAppend,
        };
        self.transition(next_phase)?;

        let job = LoadJob {
            table: &self.table,
            write_disposition,
            chunk_index: chunk.index,
            rows: &chunk.rows,
        };
        let handle = match self.warehouse.submit(job).await {
            Ok(handle) => handle,
            Err(e) => return Err(self.fail(e, chunk.index)),
        };
        tracing::debug!(
            chunk = chunk.index,
            job_id = %handle.job_id,
            disposition = %write_disposition,
            "Load job submitted"
        );

        let waited = match self.job_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.warehouse.wait(&handle)).await {
                Ok(res) => res,
                Err(_) => Err(TransferError::load_job(
                    "JOB_TIMEOUT",
                    format!(
                        "job {} did not finish within {}s",
                        handle.job_id,
                        limit.as_secs_f64()
                    ),
                )),
            },
            None => self.warehouse.wait(&handle).await,
        };
        let outcome = match waited {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.fail(e, chunk.index)),
        };

        let rows = chunk.num_rows() as u64;
        if let Some(reported) = outcome.output_rows {
            if reported != rows {
                tracing::warn!(
                    chunk = chunk.index,
                    job_id = %handle.job_id,
                    rows,
                    reported,
                    "Load job reported a different row count"
                );
            }
        }
        self.rows_loaded += rows;
        self.chunks_loaded = chunk.index;
        tracing::info!(
            chunk = chunk.index,
            rows,
            disposition = %write_disposition,
            total_rows = self.rows_loaded,
            job_id = %handle.job_id,
            table = %self.table,
            "Chunk loaded"
        );
        Ok(rows)
    }

    /// Drive `reader` to exhaustion, loading each chunk in order.
    ///
    /// The cursor is released on every exit path.
    pub async fn run<C: QueryCursor>(
        &mut self,
        reader: &mut ChunkedQueryReader<C>,
    ) -> Result<ExportSummary> {
        let start = Instant::now();
        loop {
            let chunk = match reader.next_chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    let index = e.context.chunk.unwrap_or(self.chunks_loaded + 1);
                    release(reader).await;
                    return Err(self.fail(e, index));
                }
            };
            if let Err(e) = self.load_chunk(&chunk).await {
                release(reader).await;
                return Err(e);
            }
        }

        if self.chunks_loaded == 0 {
            tracing::warn!(table = %self.table, "Query returned no rows; no load job submitted");
        }
        self.transition(TransferPhase::Done)?;

        let summary = ExportSummary {
            chunks: self.chunks_loaded,
            rows_loaded: self.rows_loaded,
            duration_secs: start.elapsed().as_secs_f64(),
        };
        tracing::info!(
            table = %self.table,
            chunks = summary.chunks,
            total_rows = summary.rows_loaded,
            "Export complete"
        );
        Ok(summary)
    }

    fn transition(&mut self, next: TransferPhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(TransferError::internal(
                "ILLEGAL_PHASE",
                format!("cannot move from {} to {next}", self.phase),
            ));
        }
        self.phase = next;
        Ok(())
    }

    fn fail(&mut self, err: TransferError, chunk_index: u64) -> TransferError {
        self.phase = TransferPhase::Failed;
        let mut err = err.with_rows_written(self.rows_loaded);
        if err.context.chunk.is_none() {
            err.context.chunk = Some(chunk_index);
        }
        tracing::error!(
            chunk = chunk_index,
            total_rows = self.rows_loaded,
            table = %self.table,
            error = %err,
            "Export failed"
        );
        err
    }
}

async fn release<C: QueryCursor>(reader: &mut ChunkedQueryReader<C>) {
    if let Err(e) = reader.abort().await {
        tracing::warn!(error = %e, "Failed to close query cursor");
    }
}

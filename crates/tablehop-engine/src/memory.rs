//! In-memory implementations of the engine seams.
//!
//! Each fake records what it was asked to do and can be told to fail at a
//! given point, so hop drivers can be exercised without a database or a
//! warehouse.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use arrow::array::Int64Array;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;

use tablehop_types::error::{Result, TransferError};
use tablehop_types::WriteDisposition;

use crate::query::QueryCursor;
use crate::sink::LoadSink;
use crate::source::RowGroupSource;
use crate::warehouse::{JobHandle, JobOutcome, LoadJob, Warehouse};

/// Single non-null Int64 column named `column`, values `start..start+len`.
pub fn int_batch(column: &str, start: i64, len: usize) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![Field::new(column, DataType::Int64, false)]));
    let values = Int64Array::from_iter_values(start..start + len as i64);
    RecordBatch::try_new(schema.clone(), vec![Arc::new(values)])
        .unwrap_or_else(|_| RecordBatch::new_empty(schema))
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Replace { table: String, columns: Vec<String> },
    Append { table: String, rows: usize },
}

/// Table store that keeps appended batches in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    tables: BTreeMap<String, Vec<RecordBatch>>,
    calls: Vec<SinkCall>,
    appends: usize,
    fail_replace: bool,
    fail_append_at: Option<usize>,
}

impl MemorySink {
    /// Make every `replace_schema` call fail.
    #[must_use]
    pub fn fail_replace(mut self) -> Self {
        self.fail_replace = true;
        self
    }

    /// Make the `n`th append call (1-based) fail.
    #[must_use]
    pub fn fail_append_at(mut self, n: usize) -> Self {
        self.fail_append_at = Some(n);
        self
    }

    pub fn calls(&self) -> &[SinkCall] {
        &self.calls
    }

    pub fn table_rows(&self, table: &str) -> usize {
        self.tables
            .get(table)
            .map_or(0, |batches| batches.iter().map(RecordBatch::num_rows).sum())
    }

    pub fn table_batches(&self, table: &str) -> &[RecordBatch] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or_default()
    }
}

impl LoadSink for MemorySink {
    async fn replace_schema(&mut self, table: &str, empty: &RecordBatch) -> Result<()> {
        if self.fail_replace {
            return Err(TransferError::schema(
                "DDL_FAILED",
                format!("cannot create table '{table}'"),
            ));
        }
        self.calls.push(SinkCall::Replace {
            table: table.to_string(),
            columns: empty
                .schema()
                .fields()
                .iter()
                .map(|f| f.name().clone())
                .collect(),
        });
        self.tables.insert(table.to_string(), Vec::new());
        Ok(())
    }

    async fn append(&mut self, table: &str, rows: &RecordBatch) -> Result<u64> {
        self.appends += 1;
        if self.fail_append_at == Some(self.appends) {
            return Err(TransferError::write(
                "INSERT_FAILED",
                format!("append #{} into '{table}' rejected", self.appends),
            ));
        }
        let Some(stored) = self.tables.get_mut(table) else {
            return Err(TransferError::write(
                "UNDEFINED_TABLE",
                format!("table '{table}' does not exist"),
            ));
        };
        stored.push(rows.clone());
        self.calls.push(SinkCall::Append {
            table: table.to_string(),
            rows: rows.num_rows(),
        });
        Ok(rows.num_rows() as u64)
    }
}

// ---------------------------------------------------------------------------
// Row-group source
// ---------------------------------------------------------------------------

/// Row groups held as record batches.
#[derive(Debug)]
pub struct MemoryRowGroupSource {
    schema: SchemaRef,
    groups: Vec<RecordBatch>,
    fail_read_at: Option<usize>,
}

impl MemoryRowGroupSource {
    pub fn new(schema: SchemaRef, groups: Vec<RecordBatch>) -> Self {
        Self {
            schema,
            groups,
            fail_read_at: None,
        }
    }

    /// One Int64 column; row group `i` holds `sizes[i]` rows, numbered
    /// consecutively across the file.
    pub fn with_sizes(column: &str, sizes: &[usize]) -> Self {
        let mut next = 0i64;
        let groups: Vec<RecordBatch> = sizes
            .iter()
            .map(|&n| {
                let batch = int_batch(column, next, n);
                next += n as i64;
                batch
            })
            .collect();
        Self::new(int_batch(column, 0, 0).schema(), groups)
    }

    /// Make reading the row group at 0-based `index` fail.
    #[must_use]
    pub fn fail_read_at(mut self, index: usize) -> Self {
        self.fail_read_at = Some(index);
        self
    }

    pub fn total_rows(&self) -> usize {
        self.groups.iter().map(RecordBatch::num_rows).sum()
    }
}

impl RowGroupSource for MemoryRowGroupSource {
    fn num_row_groups(&self) -> usize {
        self.groups.len()
    }

    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn read_row_group(&mut self, index: usize) -> Result<RecordBatch> {
        if self.fail_read_at == Some(index) {
            return Err(TransferError::read(
                "CORRUPT_ROW_GROUP",
                format!("row group {index} could not be decoded"),
            ));
        }
        self.groups.get(index).cloned().ok_or_else(|| {
            TransferError::read(
                "ROW_GROUP_OUT_OF_RANGE",
                format!("row group {index} of {}", self.groups.len()),
            )
        })
    }
}

// ---------------------------------------------------------------------------
// Query cursor
// ---------------------------------------------------------------------------

/// Cursor over a fully materialized result set.
#[derive(Debug)]
pub struct MemoryCursor {
    rows: RecordBatch,
    offset: usize,
    fetches: usize,
    closed: bool,
    fail_on_fetch: Option<usize>,
    ignore_limit: bool,
}

impl MemoryCursor {
    pub fn new(rows: RecordBatch) -> Self {
        Self {
            rows,
            offset: 0,
            fetches: 0,
            closed: false,
            fail_on_fetch: None,
            ignore_limit: false,
        }
    }

    /// Make the `n`th fetch (1-based) fail.
    #[must_use]
    pub fn fail_on_fetch(mut self, n: usize) -> Self {
        self.fail_on_fetch = Some(n);
        self
    }

    /// Return all remaining rows regardless of `max_rows`.
    #[must_use]
    pub fn ignore_limit(mut self) -> Self {
        self.ignore_limit = true;
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl QueryCursor for MemoryCursor {
    async fn fetch(&mut self, max_rows: usize) -> Result<Option<RecordBatch>> {
        if self.closed {
            return Err(TransferError::internal("CURSOR_CLOSED", "fetch after close"));
        }
        self.fetches += 1;
        if self.fail_on_fetch == Some(self.fetches) {
            return Err(TransferError::read(
                "FETCH_FAILED",
                format!("fetch #{} failed", self.fetches),
            ));
        }
        let remaining = self.rows.num_rows() - self.offset;
        if remaining == 0 {
            return Ok(None);
        }
        let len = if self.ignore_limit {
            remaining
        } else {
            remaining.min(max_rows)
        };
        let page = self.rows.slice(self.offset, len);
        self.offset += len;
        Ok(Some(page))
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Warehouse
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedJob {
    pub job_id: String,
    pub table: String,
    pub disposition: WriteDisposition,
    pub chunk_index: u64,
    pub rows: usize,
    pub done: bool,
}

/// Warehouse that applies truncate/append to in-memory row counts.
#[derive(Debug, Default)]
pub struct MemoryWarehouse {
    jobs: Vec<SubmittedJob>,
    tables: BTreeMap<String, usize>,
    fail_chunk: Option<u64>,
    hang_chunk: Option<u64>,
}

impl MemoryWarehouse {
    /// The job for chunk `index` reports an error when waited on.
    #[must_use]
    pub fn fail_chunk(mut self, index: u64) -> Self {
        self.fail_chunk = Some(index);
        self
    }

    /// The job for chunk `index` never finishes.
    #[must_use]
    pub fn hang_chunk(mut self, index: u64) -> Self {
        self.hang_chunk = Some(index);
        self
    }

    /// Seed `table` with existing rows, as left by an earlier run.
    #[must_use]
    pub fn with_table(mut self, table: &str, rows: usize) -> Self {
        self.tables.insert(table.to_string(), rows);
        self
    }

    pub fn jobs(&self) -> &[SubmittedJob] {
        &self.jobs
    }

    pub fn dispositions(&self) -> Vec<WriteDisposition> {
        self.jobs.iter().map(|j| j.disposition).collect()
    }

    pub fn table_rows(&self, table: &str) -> usize {
        self.tables.get(table).copied().unwrap_or(0)
    }
}

impl Warehouse for MemoryWarehouse {
    async fn submit(&mut self, job: LoadJob<'_>) -> Result<JobHandle> {
        let job_id = format!("job_{}", self.jobs.len() + 1);
        self.jobs.push(SubmittedJob {
            job_id: job_id.clone(),
            table: job.table.to_string(),
            disposition: job.write_disposition,
            chunk_index: job.chunk_index,
            rows: job.rows.num_rows(),
            done: false,
        });
        Ok(JobHandle {
            job_id,
            location: Some("memory".to_string()),
        })
    }

    async fn wait(&mut self, handle: &JobHandle) -> Result<JobOutcome> {
        let Some(pos) = self.jobs.iter().position(|j| j.job_id == handle.job_id) else {
            return Err(TransferError::load_job(
                "UNKNOWN_JOB",
                format!("no job {}", handle.job_id),
            ));
        };
        let chunk_index = self.jobs[pos].chunk_index;
        if self.hang_chunk == Some(chunk_index) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.fail_chunk == Some(chunk_index) {
            return Err(TransferError::load_job(
                "JOB_FAILED",
                format!("job {} rejected by warehouse", handle.job_id),
            ));
        }

        let job = &mut self.jobs[pos];
        job.done = true;
        let stored = self.tables.entry(job.table.clone()).or_insert(0);
        match job.disposition {
            WriteDisposition::Truncate => *stored = job.rows,
            WriteDisposition::Append => *stored += job.rows,
        }
        Ok(JobOutcome {
            output_rows: Some(job.rows as u64),
        })
    }
}

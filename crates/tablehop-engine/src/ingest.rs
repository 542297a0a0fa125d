//! Ingest hop driver: row groups -> batches -> relational sink.

use std::time::Instant;

use arrow::record_batch::RecordBatch;

use tablehop_types::error::{Result, TransferError};
use tablehop_types::TransferPhase;

use crate::arrow_utils::lowercase_schema;
use crate::batcher::RowGroupBatcher;
use crate::bootstrap::SchemaBootstrapper;
use crate::result::IngestSummary;
use crate::sink::LoadSink;
use crate::source::RowGroupSource;

/// Moves row groups into one destination table, batch by batch.
///
/// The destination schema is replaced exactly once, before the first
/// append. Batches are appended strictly in source order and nothing is
/// retried: the first failure moves the ingestor to `Failed` with the
/// rows already written recorded on the error.
pub struct Ingestor<K> {
    sink: K,
    batch_size: usize,
    bootstrapper: SchemaBootstrapper,
    phase: TransferPhase,
    row_groups: usize,
    batches: usize,
    rows_written: u64,
}

impl<K: LoadSink> Ingestor<K> {
    pub fn new(sink: K, table: impl Into<String>, batch_size: usize) -> Result<Self> {
        let table = table.into();
        if table.trim().is_empty() {
            return Err(TransferError::config(
                "MISSING_TABLE",
                "destination table name must not be empty",
            ));
        }
        if batch_size == 0 {
            return Err(TransferError::config(
                "INVALID_BATCH_SIZE",
                "batch_size must be at least 1",
            ));
        }
        Ok(Self {
            sink,
            batch_size,
            bootstrapper: SchemaBootstrapper::new(table),
            phase: TransferPhase::Init,
            row_groups: 0,
            batches: 0,
            rows_written: 0,
        })
    }

    pub fn table(&self) -> &str {
        self.bootstrapper.table()
    }

    pub fn phase(&self) -> TransferPhase {
        self.phase
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn bootstrapper(&self) -> &SchemaBootstrapper {
        &self.bootstrapper
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn into_inner(self) -> K {
        self.sink
    }

    /// Batch and append one row group. Returns the rows it contributed.
    pub async fn ingest_row_group(
        &mut self,
        row_group_index: usize,
        total_row_groups: usize,
        rows: &RecordBatch,
    ) -> Result<u64> {
        if self.phase.is_terminal() {
            return Err(TransferError::internal(
                "INGEST_FINISHED",
                format!("ingest is {}, cannot accept more row groups", self.phase),
            )
            .with_row_group(row_group_index + 1)
            .with_rows_written(self.rows_written));
        }
        let rg = row_group_index + 1;

        let batcher = match RowGroupBatcher::new(row_group_index, rows, self.batch_size) {
            Ok(b) => b,
            Err(e) => return Err(self.fail(e, rg, None)),
        };
        tracing::info!(
            row_group = rg,
            row_groups = total_row_groups,
            rows = batcher.num_rows(),
            batches = batcher.batch_count(),
            "Row group read"
        );

        let mut contributed = 0u64;
        for batch in batcher {
            let replaced = match self.bootstrapper.ensure(&mut self.sink, &batch).await {
                Ok(replaced) => replaced,
                Err(e) => return Err(self.fail(e, rg, Some(batch.batch_index))),
            };
            if replaced {
                self.transition(TransferPhase::Bootstrap)?;
            }

            let inserted = match self.sink.append(self.bootstrapper.table(), &batch.rows).await {
                Ok(n) => n,
                Err(e) => return Err(self.fail(e, rg, Some(batch.batch_index))),
            };
            self.transition(TransferPhase::SteadyAppend)?;
            self.rows_written += inserted;
            self.batches += 1;
            contributed += inserted;
            tracing::info!(
                row_group = rg,
                batch = batch.batch_index,
                rows = inserted,
                total_rows = self.rows_written,
                "Inserted batch"
            );
        }
        self.row_groups += 1;
        Ok(contributed)
    }

    /// Ingest every row group of `source` in order.
    ///
    /// When the source holds no rows at all the table is still created,
    /// from the file schema.
    pub async fn run<S: RowGroupSource>(&mut self, source: &mut S) -> Result<IngestSummary> {
        let start = Instant::now();
        let total = source.num_row_groups();
        tracing::info!(
            table = %self.table(),
            row_groups = total,
            batch_size = self.batch_size,
            "Starting ingest"
        );

        for index in 0..total {
            let rows = match source.read_row_group(index) {
                Ok(rows) => rows,
                Err(e) => return Err(self.fail(e, index + 1, None)),
            };
            self.ingest_row_group(index, total, &rows).await?;
        }

        if !self.bootstrapper.is_ready() {
            tracing::warn!(table = %self.table(), "Source has no rows; creating empty table");
            let schema = lowercase_schema(&source.schema());
            if let Err(e) = self.bootstrapper.ensure_schema(&mut self.sink, schema).await {
                self.phase = TransferPhase::Failed;
                tracing::error!(table = %self.table(), error = %e, "Ingest failed");
                return Err(e);
            }
            self.transition(TransferPhase::Bootstrap)?;
        }
        self.transition(TransferPhase::Done)?;

        let summary = IngestSummary {
            row_groups: self.row_groups,
            batches: self.batches,
            rows_written: self.rows_written,
            duration_secs: start.elapsed().as_secs_f64(),
        };
        tracing::info!(
            table = %self.table(),
            row_groups = summary.row_groups,
            batches = summary.batches,
            total_rows = summary.rows_written,
            "Ingest complete"
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

    fn fail(
        &mut self,
        err: TransferError,
        row_group: usize,
        batch: Option<usize>,
    ) -> TransferError {
        self.phase = TransferPhase::Failed;
        // a sink may report rows it persisted before failing mid-batch
        let persisted = self.rows_written + err.rows_written;
        let mut err = err
            .with_rows_written(persisted)
            .with_retry_safety(persisted == 0);
        if err.context.row_group.is_none() {
            err.context.row_group = Some(row_group);
        }
        if err.context.batch.is_none() {
            err.context.batch = batch;
        }
        tracing::error!(
            row_group,
            batch,
            total_rows = persisted,
            table = %self.table(),
            error = %err,
            "Ingest failed"
        );
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{int_batch, MemoryRowGroupSource, MemorySink, SinkCall};
    use tablehop_types::ErrorCategory;

    #[tokio::test]
    async fn replace_precedes_every_append() {
        let mut source = MemoryRowGroupSource::with_sizes("VendorID", &[2500, 0, 700]);
        let mut ingest = Ingestor::new(MemorySink::default(), "raw_trips", 1000).unwrap();
        let summary = ingest.run(&mut source).await.unwrap();

        assert_eq!(summary.row_groups, 3);
        assert_eq!(summary.batches, 4);
        assert_eq!(summary.rows_written, 3200);
        assert_eq!(ingest.phase(), TransferPhase::Done);

        let calls = ingest.sink().calls();
        assert!(matches!(calls[0], SinkCall::Replace { .. }));
        assert!(calls[1..]
            .iter()
            .all(|c| matches!(c, SinkCall::Append { .. })));
        assert_eq!(ingest.sink().table_rows("raw_trips"), 3200);
    }

    #[tokio::test]
    async fn all_empty_source_still_creates_table() {
        let mut source = MemoryRowGroupSource::with_sizes("VendorID", &[0, 0]);
        let mut ingest = Ingestor::new(MemorySink::default(), "raw_trips", 1000).unwrap();
        let summary = ingest.run(&mut source).await.unwrap();

        assert_eq!(summary.rows_written, 0);
        assert_eq!(summary.batches, 0);
        match ingest.sink().calls() {
            [SinkCall::Replace { columns, .. }] => {
                assert_eq!(columns, &vec!["vendorid".to_string()]);
            }
            other => panic!("unexpected calls {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_row_group_appends_nothing() {
        let mut ingest = Ingestor::new(MemorySink::default(), "raw_trips", 1000).unwrap();
        let written = ingest
            .ingest_row_group(0, 1, &int_batch("id", 0, 0))
            .await
            .unwrap();
        assert_eq!(written, 0);
        assert!(ingest.sink().calls().is_empty());
        assert_eq!(ingest.phase(), TransferPhase::Init);
    }

    #[tokio::test]
    async fn append_failure_reports_partial_progress() {
        let sink = MemorySink::default().fail_append_at(3);
        let mut source = MemoryRowGroupSource::with_sizes("id", &[2500]);
        let mut ingest = Ingestor::new(sink, "raw_trips", 1000).unwrap();

        let err = ingest.run(&mut source).await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::Write);
        assert_eq!(err.context.row_group, Some(1));
        assert_eq!(err.context.batch, Some(3));
        assert_eq!(err.rows_written, 2000);
        assert!(!err.safe_to_retry);
        assert_eq!(ingest.phase(), TransferPhase::Failed);
    }

    #[tokio::test]
    async fn schema_failure_is_safe_to_retry() {
        let sink = MemorySink::default().fail_replace();
        let mut source = MemoryRowGroupSource::with_sizes("id", &[10]);
        let mut ingest = Ingestor::new(sink, "raw_trips", 1000).unwrap();

        let err = ingest.run(&mut source).await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::Schema);
        assert!(err.safe_to_retry);
        assert_eq!(err.rows_written, 0);
    }

    #[tokio::test]
    async fn unreadable_row_group_stops_the_hop() {
        let mut source = MemoryRowGroupSource::with_sizes("id", &[10, 10, 10]).fail_read_at(1);
        let mut ingest = Ingestor::new(MemorySink::default(), "raw_trips", 1000).unwrap();

        let err = ingest.run(&mut source).await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::Read);
        assert_eq!(err.context.row_group, Some(2));
        assert_eq!(ingest.rows_written(), 10);
    }

    #[test]
    fn rejects_blank_table() {
        let err = Ingestor::new(MemorySink::default(), "  ", 10).err().unwrap();
        assert_eq!(err.category, ErrorCategory::Config);
    }
}

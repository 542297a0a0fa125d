//! One-time destination schema creation.

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;

use tablehop_types::error::{Result, TransferError};

use crate::arrow_utils::schema_mismatch;
use crate::batcher::Batch;
use crate::sink::LoadSink;

/// Whether the destination table has been created for this run.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SchemaState {
    #[default]
    Pending,
    Ready { schema: SchemaRef },
}

/// Replaces the destination table schema exactly once per run.
///
/// The first call to [`ensure`](Self::ensure) replaces the table using the
/// batch's schema projected to zero rows. Every later batch is checked
/// against that schema instead.
#[derive(Debug)]
pub struct SchemaBootstrapper {
    table: String,
    state: SchemaState,
}

impl SchemaBootstrapper {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            state: SchemaState::Pending,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn state(&self) -> &SchemaState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, SchemaState::Ready { .. })
    }

    /// Make sure the destination schema exists and matches `batch`.
    ///
    /// Returns `true` when this call performed the replace.
    pub async fn ensure<K: LoadSink>(&mut self, sink: &mut K, batch: &Batch) -> Result<bool> {
        match &self.state {
            SchemaState::Ready { schema } => {
                if let Some(diff) = schema_mismatch(schema, batch.rows.schema_ref()) {
                    return Err(TransferError::schema(
                        "SCHEMA_MISMATCH",
                        format!("batch does not match table '{}': {diff}", self.table),
                    ));
                }
                Ok(false)
            }
            SchemaState::Pending => {
                self.ensure_schema(sink, batch.schema()).await?;
                Ok(true)
            }
        }
    }

    /// Replace the table from `schema` if nothing has been created yet.
    ///
    /// No-op once the state is `Ready`.
    pub async fn ensure_schema<K: LoadSink>(
        &mut self,
        sink: &mut K,
        schema: SchemaRef,
    ) -> Result<()> {
        if self.is_ready() {
            return Ok(());
        }
        let empty = RecordBatch::new_empty(schema.clone());
        sink.replace_schema(&self.table, &empty).await?;
        tracing::info!(
            table = %self.table,
            columns = schema.fields().len(),
            "Destination schema replaced"
        );
        self.state = SchemaState::Ready { schema };
        Ok(())
    }
}

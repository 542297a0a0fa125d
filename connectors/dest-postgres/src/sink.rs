//! [`LoadSink`] over a PostgreSQL session.

use arrow::record_batch::RecordBatch;
use tokio_postgres::Client;

use tablehop_engine::LoadSink;
use tablehop_types::error::Result;

use crate::ddl::{qualified_table, replace_table};
use crate::insert::insert_batch;

/// Writes destination tables into one schema of the connected database.
pub struct PostgresSink<'a> {
    client: &'a Client,
    schema: String,
}

impl<'a> PostgresSink<'a> {
    pub fn new(client: &'a Client, schema: impl Into<String>) -> Self {
        Self {
            client,
            schema: schema.into(),
        }
    }

    pub fn qualified(&self, table: &str) -> String {
        qualified_table(&self.schema, table)
    }
}

impl LoadSink for PostgresSink<'_> {
    async fn replace_schema(&mut self, table: &str, empty: &RecordBatch) -> Result<()> {
        replace_table(self.client, &self.qualified(table), empty.schema_ref()).await
    }

    async fn append(&mut self, table: &str, rows: &RecordBatch) -> Result<u64> {
        insert_batch(self.client, &self.qualified(table), rows).await
    }
}

//! Server-side cursor implementing [`QueryCursor`].

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use tokio_postgres::Client;

use tablehop_engine::QueryCursor;
use tablehop_types::error::{Result, TransferError};

use crate::encode::rows_to_record_batch;
use crate::query::{export_select, normalize_query};
use crate::types::{arrow_schema, Column};

const CURSOR_NAME: &str = "tablehop_export";

fn pg_message(e: &tokio_postgres::Error) -> String {
    match e.as_db_error() {
        Some(db) => format!("{} (sqlstate={})", db.message(), db.code().code()),
        None => e.to_string(),
    }
}

/// Paged read of one query inside a read-only transaction.
///
/// The query runs once, when the cursor is declared; every fetch returns
/// the next rows of that single snapshot.
pub struct PostgresCursor<'a> {
    client: &'a Client,
    columns: Vec<Column>,
    schema: SchemaRef,
    open: bool,
    failed: bool,
}

impl<'a> PostgresCursor<'a> {
    pub async fn open(client: &'a Client, query: &str) -> Result<Self> {
        let statement = client.prepare(normalize_query(query)).await.map_err(|e| {
            TransferError::read(
                "QUERY_INVALID",
                format!("cannot prepare query: {}", pg_message(&e)),
            )
        })?;
        let columns: Vec<Column> = statement
            .columns()
            .iter()
            .map(|c| Column::new(c.name(), c.type_().name()))
            .collect();
        let schema = arrow_schema(&columns);
        let select = export_select(query, &columns);

        client
            .batch_execute("BEGIN READ ONLY ISOLATION LEVEL REPEATABLE READ")
            .await
            .map_err(|e| {
                TransferError::connection(
                    "BEGIN_FAILED",
                    format!("cannot begin: {}", pg_message(&e)),
                )
            })?;
        let declare = format!("DECLARE {CURSOR_NAME} NO SCROLL CURSOR FOR {select}");
        if let Err(e) = client.batch_execute(&declare).await {
            let _ = client.batch_execute("ROLLBACK").await;
            return Err(TransferError::read(
                "DECLARE_FAILED",
                format!("cannot open cursor: {}", pg_message(&e)),
            ));
        }
        tracing::debug!(columns = columns.len(), sql = %select, "Export cursor declared");

        Ok(Self {
            client,
            columns,
            schema,
            open: true,
            failed: false,
        })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }
}

impl QueryCursor for PostgresCursor<'_> {
    async fn fetch(&mut self, max_rows: usize) -> Result<Option<RecordBatch>> {
        if !self.open {
            return Err(TransferError::internal("CURSOR_CLOSED", "fetch on a closed cursor"));
        }
        let sql = format!("FETCH {max_rows} FROM {CURSOR_NAME}");
        let rows = match self.client.query(&sql, &[]).await {
            Ok(rows) => rows,
            Err(e) => {
                self.failed = true;
                return Err(TransferError::read(
                    "FETCH_FAILED",
                    format!("cursor fetch failed: {}", pg_message(&e)),
                ));
            }
        };
        tracing::debug!(requested = max_rows, rows = rows.len(), "Fetched page");
        if rows.is_empty() {
            return Ok(None);
        }
        rows_to_record_batch(&rows, &self.columns, &self.schema).map(Some)
    }

    async fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        let sql = if self.failed {
            "ROLLBACK".to_string()
        } else {
            format!("CLOSE {CURSOR_NAME}; COMMIT")
        };
        self.client.batch_execute(&sql).await.map_err(|e| {
            TransferError::connection(
                "CLOSE_FAILED",
                format!("cannot close cursor: {}", pg_message(&e)),
            )
        })
    }
}

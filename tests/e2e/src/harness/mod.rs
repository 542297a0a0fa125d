mod container;
mod parquet_file;

pub use parquet_file::{taxi_batch, write_parquet};

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use tokio_postgres::Client;

use dest_postgres::PostgresSink;
use source_parquet::ParquetRowGroupSource;
use source_postgres::PostgresCursor;
use tablehop_engine::memory::MemoryWarehouse;
use tablehop_engine::{ChunkedQueryReader, ExportSummary, IngestSummary, Ingestor, WarehouseLoader};

static NEXT_SCHEMA_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone)]
pub struct HarnessContext {
    pub postgres_host: String,
    pub postgres_port: u16,
    pub postgres_db: String,
    pub postgres_user: String,
    pub postgres_pass: String,
}

pub async fn bootstrap() -> Result<HarnessContext> {
    let postgres_port = container::shared_postgres_port()?;
    Ok(HarnessContext {
        postgres_host: "127.0.0.1".to_string(),
        postgres_port,
        postgres_db: "airflow".to_string(),
        postgres_user: "airflow".to_string(),
        postgres_pass: "airflow".to_string(),
    })
}

impl HarnessContext {
    pub fn postgres_config(&self, schema: &str) -> dest_postgres::Config {
        dest_postgres::Config {
            host: self.postgres_host.clone(),
            port: self.postgres_port,
            user: self.postgres_user.clone(),
            password: self.postgres_pass.clone(),
            database: self.postgres_db.clone(),
            schema: schema.to_string(),
        }
    }

    pub async fn connect(&self) -> Result<Client> {
        dest_postgres::connect(&self.postgres_config("public"))
            .await
            .context("failed to connect to test postgres")
    }

    /// Fresh schema per test so tests can share the container.
    pub async fn allocate_schema(&self, test_name: &str) -> Result<String> {
        let id = NEXT_SCHEMA_ID.fetch_add(1, Ordering::Relaxed);
        let schema = format!("th_{}_{}", sanitize_identifier(test_name), id);
        let client = self.connect().await?;
        client
            .execute(&format!("CREATE SCHEMA \"{schema}\""), &[])
            .await
            .with_context(|| format!("failed to create schema {schema}"))?;
        Ok(schema)
    }

    pub async fn drop_schema(&self, schema: &str) -> Result<()> {
        let client = self.connect().await?;
        client
            .execute(&format!("DROP SCHEMA IF EXISTS \"{schema}\" CASCADE"), &[])
            .await
            .with_context(|| format!("failed to drop schema {schema}"))?;
        Ok(())
    }

    pub async fn count_rows(&self, schema: &str, table: &str) -> Result<i64> {
        let client = self.connect().await?;
        let row = client
            .query_one(&format!("SELECT COUNT(*) FROM \"{schema}\".\"{table}\""), &[])
            .await
            .with_context(|| format!("failed to count {schema}.{table}"))?;
        Ok(row.get(0))
    }

    /// Column names in ordinal order.
    pub async fn column_names(&self, schema: &str, table: &str) -> Result<Vec<String>> {
        let client = self.connect().await?;
        let rows = client
            .query(
                "SELECT column_name::text FROM information_schema.columns \
                 WHERE table_schema = $1 AND table_name = $2 ORDER BY ordinal_position",
                &[&schema, &table],
            )
            .await
            .with_context(|| format!("failed to list columns of {schema}.{table}"))?;
        Ok(rows.iter().map(|r| r.get(0)).collect())
    }

    /// Ingest hop: Parquet file into `schema.table`.
    pub async fn ingest_parquet(
        &self,
        path: &Path,
        schema: &str,
        table: &str,
        batch_size: usize,
    ) -> Result<IngestSummary> {
        let client = self.connect().await?;
        let mut source = ParquetRowGroupSource::open(path)?;
        let sink = PostgresSink::new(&client, schema);
        let mut ingestor = Ingestor::new(sink, table, batch_size)?;
        Ok(ingestor.run(&mut source).await?)
    }

    /// Export hop against the real cursor, loading into an in-memory warehouse.
    pub async fn export_query(
        &self,
        query: &str,
        chunk_size: usize,
        warehouse_table: &str,
    ) -> Result<(ExportSummary, MemoryWarehouse)> {
        let client = self.connect().await?;
        let cursor = PostgresCursor::open(&client, query).await?;
        let mut reader = ChunkedQueryReader::new(cursor, chunk_size)?;
        let mut loader = WarehouseLoader::new(MemoryWarehouse::default(), warehouse_table);
        let summary = loader.run(&mut reader).await?;
        Ok((summary, loader.into_inner()))
    }
}

fn sanitize_identifier(input: &str) -> String {
    input
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

//! Wires the connectors into the engine's hop drivers.

use tokio_postgres::Client;

use dest_bigquery::BigQueryClient;
use dest_postgres::PostgresSink;
use source_parquet::ParquetRowGroupSource;
use source_postgres::PostgresCursor;
use tablehop_engine::config::{ExportConfig, IngestConfig, PipelineConfig};
use tablehop_engine::{
    validate_chunk_size, ChunkedQueryReader, ExportSummary, IngestSummary, Ingestor, Result,
    RowGroupSource, TransferError, WarehouseLoader,
};

/// Relational session shared by both hops.
pub struct Postgres {
    pub config: dest_postgres::Config,
    pub client: Client,
}

pub async fn connect_postgres(pipeline: &PipelineConfig) -> Result<Postgres> {
    let config = dest_postgres::Config::from_value(&pipeline.postgres)?;
    let client = dest_postgres::connect(&config).await?;
    Ok(Postgres { config, client })
}

/// Hop (a): Parquet file -> PostgreSQL table.
pub async fn run_ingest(pg: &Postgres, ingest: &IngestConfig) -> Result<IngestSummary> {
    let mut source = ParquetRowGroupSource::open(&ingest.source_path)?;
    tracing::info!(
        source = %ingest.source_path.display(),
        row_groups = source.num_row_groups(),
        rows = source.num_rows(),
        "Parquet source opened"
    );
    let sink = PostgresSink::new(&pg.client, pg.config.schema.clone());
    let mut ingestor = Ingestor::new(sink, ingest.table.clone(), ingest.batch_size)?;
    ingestor.run(&mut source).await
}

/// Hop (b): PostgreSQL query -> BigQuery table.
pub async fn run_export(pg: &Postgres, export: &ExportConfig) -> Result<ExportSummary> {
    let Some(query) = export.effective_query() else {
        return Err(TransferError::config(
            "MISSING_QUERY",
            "export needs `query` or `source_table`",
        ));
    };
    let bq_config = dest_bigquery::Config::from_value(&export.warehouse.config)?;
    let warehouse = BigQueryClient::new(&bq_config)?;
    // the cursor opens a transaction on the shared client
    validate_chunk_size(export.chunk_size)?;

    let cursor = PostgresCursor::open(&pg.client, &query).await?;
    tracing::info!(
        table = %export.warehouse.table,
        chunk_size = export.chunk_size,
        columns = cursor.columns().len(),
        "Starting export"
    );
    let mut reader = ChunkedQueryReader::new(cursor, export.chunk_size)?;
    let mut loader = WarehouseLoader::new(warehouse, export.warehouse.table.clone())
        .with_job_timeout(export.job_timeout());
    loader.run(&mut reader).await
}

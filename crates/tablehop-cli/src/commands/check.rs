use std::path::Path;

use anyhow::{Context, Result};

use dest_bigquery::BigQueryClient;
use source_parquet::ParquetRowGroupSource;
use tablehop_engine::config::{parser, validator};
use tablehop_engine::RowGroupSource;

use crate::orchestrator;

/// Execute the `check` command: validate the pipeline and probe every
/// endpoint it names.
pub async fn execute(pipeline_path: &Path) -> Result<()> {
    let config = parser::parse_pipeline(pipeline_path)
        .with_context(|| format!("Failed to parse pipeline: {}", pipeline_path.display()))?;
    validator::validate_pipeline(&config)?;
    println!("Pipeline structure: OK");

    let mut ok = true;

    match orchestrator::connect_postgres(&config).await {
        Ok(pg) => match dest_postgres::check(&pg.client).await {
            Ok(()) => print_status("PostgreSQL", Ok("connected".to_string())),
            Err(e) => {
                ok = false;
                print_status("PostgreSQL", Err(e.to_string()));
            }
        },
        Err(e) => {
            ok = false;
            print_status("PostgreSQL", Err(e.to_string()));
        }
    }

    if let Some(ingest) = &config.ingest {
        let status = ParquetRowGroupSource::open(&ingest.source_path)
            .map(|source| {
                format!(
                    "{} row group(s), {} row(s)",
                    source.num_row_groups(),
                    source.num_rows()
                )
            })
            .map_err(|e| e.to_string());
        ok &= status.is_ok();
        print_status("Parquet source", status);
    }

    if let Some(export) = &config.export {
        let status = match dest_bigquery::Config::from_value(&export.warehouse.config)
            .and_then(|cfg| BigQueryClient::new(&cfg))
        {
            Ok(client) => client
                .check(&export.warehouse.table)
                .await
                .map(|exists| {
                    if exists {
                        "table exists".to_string()
                    } else {
                        "table will be created by the first load".to_string()
                    }
                })
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        ok &= status.is_ok();
        print_status("BigQuery", status);
    }

    if ok {
        println!("\nAll checks passed.");
        Ok(())
    } else {
        anyhow::bail!("One or more checks failed")
    }
}

fn print_status(label: &str, status: std::result::Result<String, String>) {
    let (word, message) = match status {
        Ok(m) => ("OK", m),
        Err(m) => ("FAILED", m),
    };
    println!("{:18} {}", format!("{label}:"), word);
    if !message.is_empty() {
        println!("  {message}");
    }
}

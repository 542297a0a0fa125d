use std::path::Path;

use anyhow::{Context, Result};

use tablehop_engine::config::{parser, validator};
use tablehop_engine::{ExportSummary, IngestSummary, TransferError};

use crate::orchestrator;
use crate::Hop;

/// Execute the `run` command: parse, validate, then run the selected hops
/// in order, stopping at the first failure.
pub async fn execute(pipeline_path: &Path, hop: Hop) -> Result<()> {
    let config = parser::parse_pipeline(pipeline_path)
        .with_context(|| format!("Failed to parse pipeline: {}", pipeline_path.display()))?;
    validator::validate_pipeline(&config)?;

    let ingest = match hop {
        Hop::Ingest | Hop::All => config.ingest.as_ref(),
        Hop::Export => None,
    };
    let export = match hop {
        Hop::Export | Hop::All => config.export.as_ref(),
        Hop::Ingest => None,
    };
    if ingest.is_none() && export.is_none() {
        anyhow::bail!(
            "Pipeline '{}' does not configure the requested hop",
            config.pipeline
        );
    }

    tracing::info!(
        pipeline = config.pipeline,
        ingest = ingest.is_some(),
        export = export.is_some(),
        "Pipeline validated"
    );

    let pg = orchestrator::connect_postgres(&config)
        .await
        .context("Failed to connect to PostgreSQL")?;

    if let Some(ingest) = ingest {
        let summary = orchestrator::run_ingest(&pg, ingest)
            .await
            .map_err(|e| hop_failed("Ingest", e))?;
        print_ingest(&ingest.table, &summary);
    }
    if let Some(export) = export {
        let summary = orchestrator::run_export(&pg, export)
            .await
            .map_err(|e| hop_failed("Export", e))?;
        print_export(&export.warehouse.table, &summary);
    }

    println!("\nPipeline '{}' completed successfully.", config.pipeline);
    Ok(())
}

fn hop_failed(hop: &str, err: TransferError) -> anyhow::Error {
    eprintln!("{hop} failed after writing {} row(s).", err.rows_written);
    if err.safe_to_retry {
        eprintln!("  Re-running the hop is safe.");
    } else {
        eprintln!("  Re-running the hop will duplicate the rows already written.");
    }
    anyhow::Error::new(err).context(format!("{hop} hop failed"))
}

fn print_ingest(table: &str, summary: &IngestSummary) {
    println!("Ingest into '{table}' completed.");
    println!("  Row groups:      {}", summary.row_groups);
    println!("  Batches:         {}", summary.batches);
    println!("  Rows written:    {}", summary.rows_written);
    println!("  Duration:        {:.2}s", summary.duration_secs);
    if summary.duration_secs > 0.0 {
        println!(
            "  Throughput:      {:.0} rows/sec",
            summary.rows_written as f64 / summary.duration_secs
        );
    }
}

fn print_export(table: &str, summary: &ExportSummary) {
    println!("Export into '{table}' completed.");
    println!("  Chunks:          {}", summary.chunks);
    println!("  Rows loaded:     {}", summary.rows_loaded);
    println!("  Duration:        {:.2}s", summary.duration_secs);
}

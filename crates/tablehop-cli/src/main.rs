mod commands;
mod logging;
mod orchestrator;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "tablehop",
    version,
    about = "Chunked Parquet -> PostgreSQL -> BigQuery transfers"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

/// Which hops of a pipeline to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Hop {
    /// Parquet file -> PostgreSQL table
    Ingest,
    /// PostgreSQL query -> BigQuery table
    Export,
    /// Every configured hop, ingest first
    All,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the hops of a pipeline
    Run {
        /// Path to pipeline YAML file
        pipeline: PathBuf,
        /// Hop to run
        #[arg(long, value_enum, default_value_t = Hop::All)]
        hop: Hop,
    },
    /// Validate pipeline configuration and connectivity
    Check {
        /// Path to pipeline YAML file
        pipeline: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command {
        Commands::Run { pipeline, hop } => commands::run::execute(&pipeline, hop).await,
        Commands::Check { pipeline } => commands::check::execute(&pipeline).await,
    }
}

//! BigQuery destination for the export hop.
//!
//! [`BigQueryClient`] implements the engine's `Warehouse` seam: each chunk
//! becomes one newline-delimited JSON load job, uploaded with
//! `uploadType=multipart` and polled until done.

pub mod client;
pub mod config;
pub mod job;
pub mod ndjson;
pub mod schema;
pub mod table;

pub use client::BigQueryClient;
pub use config::Config;
pub use table::TableRef;

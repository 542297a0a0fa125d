//! Core transfer engine for tablehop pipelines.
//!
//! Two hops share one pattern, bounded-chunk iteration plus a destination
//! write:
//!
//! - **ingest**: row groups of a columnar file are split into batches
//!   ([`batcher`]), the destination schema is bootstrapped once
//!   ([`bootstrap`]), and every batch is appended to a [`sink::LoadSink`]
//!   ([`ingest`]).
//! - **export**: a query result is paged into chunks ([`query`]) and each
//!   chunk is loaded into the warehouse as its own job, truncating on the
//!   first chunk and appending afterwards ([`warehouse`]).
//!
//! Collaborators (file reader, relational client, warehouse client) are
//! injected through the traits in [`source`], [`sink`], [`query`] and
//! [`warehouse`].

pub mod arrow_utils;
pub mod batcher;
pub mod bootstrap;
pub mod config;
pub mod ingest;
pub mod memory;
pub mod query;
pub mod result;
pub mod sink;
pub mod source;
pub mod warehouse;

pub use batcher::{Batch, RowGroupBatcher, DEFAULT_BATCH_SIZE};
pub use bootstrap::{SchemaBootstrapper, SchemaState};
pub use ingest::Ingestor;
pub use query::{
    validate_chunk_size, Chunk, ChunkedQueryReader, QueryCursor, DEFAULT_CHUNK_SIZE,
};
pub use result::{ExportSummary, IngestSummary};
pub use sink::LoadSink;
pub use source::RowGroupSource;
pub use warehouse::{JobHandle, JobOutcome, LoadJob, Warehouse, WarehouseLoader};

pub use tablehop_types::error::{Result, TransferError};
pub use tablehop_types::{disposition, TransferPhase, WriteDisposition};

//! PostgreSQL destination for the ingest hop.
//!
//! Tables are replaced with `DROP TABLE IF EXISTS` + `CREATE TABLE` in one
//! transaction and filled with multi-value `INSERT` statements.

pub mod client;
pub mod config;
pub mod ddl;
pub mod insert;
pub mod sink;
pub mod type_map;
pub mod typed_col;

pub use client::{check, connect};
pub use config::Config;
pub use sink::PostgresSink;

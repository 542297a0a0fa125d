//! Shared tablehop value types: the transfer error model, warehouse write
//! dispositions, and the per-hop transfer phase.
//!
//! This crate carries no I/O and no Arrow dependency so connectors and the
//! engine can agree on it cheaply.

pub mod disposition;
pub mod error;
pub mod phase;

pub use disposition::{disposition, WriteDisposition};
pub use error::{ErrorCategory, ErrorContext, TransferError};
pub use phase::TransferPhase;

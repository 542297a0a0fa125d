//! Pipeline configuration: YAML types, parsing, and validation.

pub mod parser;
pub mod types;
pub mod validator;

pub use parser::{parse_pipeline, parse_pipeline_str, substitute_env_vars};
pub use types::{ExportConfig, IngestConfig, PipelineConfig, WarehouseConfig};
pub use validator::validate_pipeline;

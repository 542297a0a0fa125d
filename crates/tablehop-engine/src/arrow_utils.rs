//! Arrow schema normalization and comparison helpers.

use std::collections::HashSet;
use std::sync::Arc;

use arrow::datatypes::{Field, Schema, SchemaRef};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};

use tablehop_types::error::{Result, TransferError};

/// Copy of `schema` with every field name lower-cased.
pub fn lowercase_schema(schema: &Schema) -> SchemaRef {
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|f| f.as_ref().clone().with_name(f.name().to_lowercase()))
        .collect();
    Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone()))
}

/// Re-label `batch` with lower-cased column names. Column data is shared.
///
/// Fails with a schema error when two columns collapse onto the same name.
pub fn normalize_columns(batch: &RecordBatch) -> Result<RecordBatch> {
    let schema = lowercase_schema(batch.schema_ref());

    let mut seen = HashSet::with_capacity(schema.fields().len());
    for field in schema.fields() {
        if !seen.insert(field.name().as_str()) {
            return Err(TransferError::schema(
                "DUPLICATE_COLUMN",
                format!(
                    "column '{}' appears more than once after lower-casing",
                    field.name()
                ),
            ));
        }
    }

    let options = RecordBatchOptions::new().with_row_count(Some(batch.num_rows()));
    RecordBatch::try_new_with_options(schema, batch.columns().to_vec(), &options).map_err(|e| {
        TransferError::schema(
            "NORMALIZE_FAILED",
            format!("failed to relabel columns: {e}"),
        )
    })
}

/// Describe how `actual` differs from `expected`, comparing column names and
/// types in order. Returns `None` when they match. Nullability is ignored.
pub fn schema_mismatch(expected: &Schema, actual: &Schema) -> Option<String> {
    if expected.fields().len() != actual.fields().len() {
        return Some(format!(
            "expected {} columns [{}], found {} [{}]",
            expected.fields().len(),
            column_names(expected).join(", "),
            actual.fields().len(),
            column_names(actual).join(", ")
        ));
    }

    for (pos, (want, got)) in expected.fields().iter().zip(actual.fields()).enumerate() {
        if want.name() != got.name() {
            return Some(format!(
                "column {pos} is '{}', expected '{}'",
                got.name(),
                want.name()
            ));
        }
        if want.data_type() != got.data_type() {
            return Some(format!(
                "column '{}' has type {}, expected {}",
                got.name(),
                got.data_type(),
                want.data_type()
            ));
        }
    }
    None
}

pub fn column_names(schema: &Schema) -> Vec<&str> {
    schema.fields().iter().map(|f| f.name().as_str()).collect()
}

//! PostgreSQL result column -> Arrow type resolution.

use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use std::sync::Arc;

/// One column of the exported result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub pg_type: String,
    pub arrow_type: DataType,
    /// SQL type the column is cast to in the SELECT, when it has no native
    /// decoder.
    pub cast: Option<&'static str>,
}

impl Column {
    pub fn new(name: &str, pg_type: &str) -> Self {
        let (arrow_type, cast) = resolve(pg_type);
        Self {
            name: name.to_string(),
            pg_type: pg_type.to_string(),
            arrow_type,
            cast,
        }
    }

    pub fn is_json(&self) -> bool {
        self.pg_type == "json" || self.pg_type == "jsonb"
    }
}

/// Arrow type for a PostgreSQL type name, plus the cast it needs (if any).
pub fn resolve(pg_type: &str) -> (DataType, Option<&'static str>) {
    match pg_type {
        "int2" | "smallint" => (DataType::Int16, None),
        "int4" | "integer" => (DataType::Int32, None),
        "int8" | "bigint" => (DataType::Int64, None),
        "float4" | "real" => (DataType::Float32, None),
        "float8" | "double precision" => (DataType::Float64, None),
        "bool" | "boolean" => (DataType::Boolean, None),
        "text" | "varchar" | "bpchar" | "name" | "json" | "jsonb" => {
            (DataType::Utf8, None)
        }
        "timestamp" => (DataType::Timestamp(TimeUnit::Microsecond, None), None),
        "timestamptz" => (
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            None,
        ),
        "date" => (DataType::Date32, None),
        "bytea" => (DataType::Binary, None),
        // keep aggregates numeric downstream
        "numeric" => (DataType::Float64, Some("double precision")),
        // money has no direct cast to float8
        "money" => (DataType::Float64, Some("numeric::double precision")),
        _ => (DataType::Utf8, Some("text")),
    }
}

pub fn arrow_schema(columns: &[Column]) -> SchemaRef {
    let fields: Vec<Field> = columns
        .iter()
        .map(|c| Field::new(&c.name, c.arrow_type.clone(), true))
        .collect();
    Arc::new(Schema::new(fields))
}

//! Arrow -> PostgreSQL column type mapping.

use arrow::datatypes::DataType;

/// Column type used when creating the destination table.
///
/// Anything without a closer match is stored as `TEXT`.
pub fn arrow_to_pg_type(dt: &DataType) -> &'static str {
    match dt {
        DataType::Boolean => "BOOLEAN",
        DataType::Int8 | DataType::Int16 | DataType::UInt8 => "SMALLINT",
        DataType::Int32 | DataType::UInt16 => "INTEGER",
        DataType::Int64 | DataType::UInt32 => "BIGINT",
        DataType::Float32 => "REAL",
        DataType::Float64 | DataType::Decimal128(_, _) => "DOUBLE PRECISION",
        DataType::Date32 | DataType::Date64 => "DATE",
        DataType::Timestamp(_, None) => "TIMESTAMP",
        DataType::Timestamp(_, Some(_)) => "TIMESTAMPTZ",
        DataType::Binary | DataType::LargeBinary => "BYTEA",
        _ => "TEXT",
    }
}

//! Arrow schema to BigQuery table schema.

use arrow::datatypes::{DataType, Schema};
use serde::{Deserialize, Serialize};

use tablehop_types::error::{Result, TransferError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableFieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub mode: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub fields: Vec<TableFieldSchema>,
}

/// BigQuery column type for an Arrow type, or `None` when the type has no
/// flat JSON encoding BigQuery can load.
pub fn arrow_to_bq_type(dt: &DataType) -> Option<&'static str> {
    let ty = match dt {
        DataType::Boolean => "BOOL",
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => "INT64",
        // u64 may not fit; arrow-json writes it as a plain number either way
        DataType::UInt64 => "NUMERIC",
        DataType::Float16 | DataType::Float32 | DataType::Float64 => "FLOAT64",
        DataType::Decimal128(precision, scale) => {
            let integer_digits = i16::from(*precision) - i16::from(*scale);
            if *scale <= 9 && integer_digits <= 29 {
                "NUMERIC"
            } else {
                "BIGNUMERIC"
            }
        }
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => "STRING",
        // arrow-json writes binary as hex text
        DataType::Binary | DataType::LargeBinary | DataType::FixedSizeBinary(_) => "STRING",
        DataType::Date32 | DataType::Date64 => "DATE",
        DataType::Timestamp(_, None) => "DATETIME",
        DataType::Timestamp(_, Some(_)) => "TIMESTAMP",
        DataType::Time32(_) | DataType::Time64(_) => "TIME",
        _ => return None,
    };
    Some(ty)
}

/// Every column NULLABLE, names as they appear in the result set.
pub fn table_schema(schema: &Schema) -> Result<TableSchema> {
    let fields = schema
        .fields()
        .iter()
        .map(|field| {
            let Some(ty) = arrow_to_bq_type(field.data_type()) else {
                return Err(TransferError::schema(
                    "UNSUPPORTED_TYPE",
                    format!(
                        "column '{}' has type {} which cannot be loaded into BigQuery",
                        field.name(),
                        field.data_type()
                    ),
                ));
            };
            Ok(TableFieldSchema {
                name: field.name().clone(),
                field_type: ty.to_string(),
                mode: "NULLABLE".to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(TableSchema { fields })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{Field, TimeUnit};

    #[test]
    fn scalar_types_map() {
        assert_eq!(arrow_to_bq_type(&DataType::Int32), Some("INT64"));
        assert_eq!(arrow_to_bq_type(&DataType::Float64), Some("FLOAT64"));
        assert_eq!(arrow_to_bq_type(&DataType::Utf8), Some("STRING"));
        assert_eq!(arrow_to_bq_type(&DataType::Boolean), Some("BOOL"));
        assert_eq!(arrow_to_bq_type(&DataType::Date32), Some("DATE"));
    }

    #[test]
    fn timestamps_split_on_timezone() {
        assert_eq!(
            arrow_to_bq_type(&DataType::Timestamp(TimeUnit::Microsecond, None)),
            Some("DATETIME")
        );
        assert_eq!(
            arrow_to_bq_type(&DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))),
            Some("TIMESTAMP")
        );
    }

    #[test]
    fn wide_decimals_use_bignumeric() {
        assert_eq!(arrow_to_bq_type(&DataType::Decimal128(10, 2)), Some("NUMERIC"));
        assert_eq!(arrow_to_bq_type(&DataType::Decimal128(38, 20)), Some("BIGNUMERIC"));
    }

    #[test]
    fn nested_column_rejected() {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new(
                "tags",
                DataType::List(Field::new("item", DataType::Utf8, true).into()),
                true,
            ),
        ]);
        let err = table_schema(&schema).unwrap_err();
        assert_eq!(err.code, "UNSUPPORTED_TYPE");
        assert!(err.message.contains("tags"));
    }

    #[test]
    fn all_fields_nullable() {
        let schema = Schema::new(vec![
            Field::new("trip_id", DataType::Int64, false),
            Field::new("zone", DataType::Utf8, true),
        ]);
        let ts = table_schema(&schema).unwrap();
        assert_eq!(ts.fields.len(), 2);
        assert!(ts.fields.iter().all(|f| f.mode == "NULLABLE"));
        assert_eq!(ts.fields[0].name, "trip_id");
    }
}

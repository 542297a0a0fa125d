//! `tokio_postgres::Row` pages -> Arrow record batches.

use std::sync::Arc;

use arrow::array::{
    ArrayRef, BinaryBuilder, BooleanArray, Date32Array, Float32Array, Float64Array, Int16Array,
    Int32Array, Int64Array, StringBuilder, TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, SchemaRef};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tokio_postgres::types::FromSql;
use tokio_postgres::Row;

use tablehop_types::error::{Result, TransferError};

use crate::types::Column;

fn get<'a, T: FromSql<'a>>(row: &'a Row, idx: usize, col: &Column) -> Result<Option<T>> {
    row.try_get::<_, Option<T>>(idx).map_err(|e| {
        TransferError::read(
            "DECODE_FAILED",
            format!("column '{}' ({}): {e}", col.name, col.pg_type),
        )
    })
}

fn collect<'a, T: FromSql<'a>>(
    rows: &'a [Row],
    idx: usize,
    col: &Column,
) -> Result<Vec<Option<T>>> {
    rows.iter().map(|row| get::<T>(row, idx, col)).collect()
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    (date - epoch).num_days() as i32
}

fn encode_column(rows: &[Row], idx: usize, col: &Column) -> Result<ArrayRef> {
    Ok(match &col.arrow_type {
        DataType::Int16 => Arc::new(Int16Array::from(collect::<i16>(rows, idx, col)?)),
        DataType::Int32 => Arc::new(Int32Array::from(collect::<i32>(rows, idx, col)?)),
        DataType::Int64 => Arc::new(Int64Array::from(collect::<i64>(rows, idx, col)?)),
        DataType::Float32 => Arc::new(Float32Array::from(collect::<f32>(rows, idx, col)?)),
        DataType::Float64 => Arc::new(Float64Array::from(collect::<f64>(rows, idx, col)?)),
        DataType::Boolean => Arc::new(BooleanArray::from(collect::<bool>(rows, idx, col)?)),
        DataType::Date32 => {
            let values: Vec<Option<i32>> = collect::<NaiveDate>(rows, idx, col)?
                .into_iter()
                .map(|d| d.map(days_since_epoch))
                .collect();
            Arc::new(Date32Array::from(values))
        }
        DataType::Timestamp(_, None) => {
            let values: Vec<Option<i64>> = collect::<NaiveDateTime>(rows, idx, col)?
                .into_iter()
                .map(|dt| dt.map(|dt| dt.and_utc().timestamp_micros()))
                .collect();
            Arc::new(TimestampMicrosecondArray::from(values))
        }
        DataType::Timestamp(_, Some(tz)) => {
            let values: Vec<Option<i64>> = collect::<DateTime<Utc>>(rows, idx, col)?
                .into_iter()
                .map(|dt| dt.map(|dt| dt.timestamp_micros()))
                .collect();
            Arc::new(TimestampMicrosecondArray::from(values).with_timezone(tz.clone()))
        }
        DataType::Binary => {
            let mut builder = BinaryBuilder::with_capacity(rows.len(), rows.len() * 32);
            for value in collect::<&[u8]>(rows, idx, col)? {
                builder.append_option(value);
            }
            Arc::new(builder.finish())
        }
        _ if col.is_json() => {
            let mut builder = StringBuilder::with_capacity(rows.len(), rows.len() * 64);
            for value in collect::<serde_json::Value>(rows, idx, col)? {
                builder.append_option(value.map(|v| v.to_string()));
            }
            Arc::new(builder.finish())
        }
        _ => {
            let mut builder = StringBuilder::with_capacity(rows.len(), rows.len() * 16);
            for value in collect::<&str>(rows, idx, col)? {
                builder.append_option(value);
            }
            Arc::new(builder.finish())
        }
    })
}

/// Encode one FETCH page. `columns` and `schema` describe the cursor's
/// (already cast) result shape.
pub fn rows_to_record_batch(
    rows: &[Row],
    columns: &[Column],
    schema: &SchemaRef,
) -> Result<RecordBatch> {
    let arrays: Vec<ArrayRef> = columns
        .iter()
        .enumerate()
        .map(|(idx, col)| encode_column(rows, idx, col))
        .collect::<Result<_>>()?;
    RecordBatch::try_new(Arc::clone(schema), arrays).map_err(|e| {
        TransferError::read("ENCODE_FAILED", format!("cannot build record batch: {e}"))
    })
}

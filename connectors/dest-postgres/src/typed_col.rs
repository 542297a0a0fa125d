//! Typed Arrow column access for INSERT parameter binding.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, BinaryArray, BooleanArray, Date32Array, Decimal128Array,
    Float32Array, Float64Array, Int16Array, Int32Array, Int64Array, Int8Array, StringArray,
    TimestampMicrosecondArray, UInt16Array, UInt32Array, UInt8Array,
};
use arrow::compute::cast;
use arrow::datatypes::{
    DataType, Date32Type, Decimal128Type, Float32Type, Float64Type, Int16Type, Int32Type,
    Int64Type, Int8Type, TimeUnit, TimestampMicrosecondType, UInt16Type, UInt32Type, UInt8Type,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tokio_postgres::types::ToSql;

use tablehop_types::error::{Result, TransferError};

/// Bring a column into one of the layouts [`TypedCol`] binds directly.
///
/// Timestamps become microsecond precision, `Date64` becomes `Date32`,
/// large variants become their 32-bit offset forms, and anything else
/// without a native PostgreSQL binding is rendered as text.
pub fn prepare_column(name: &str, col: &ArrayRef) -> Result<ArrayRef> {
    let target = match col.data_type() {
        DataType::Boolean
        | DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::Float32
        | DataType::Float64
        | DataType::Decimal128(_, _)
        | DataType::Utf8
        | DataType::Date32
        | DataType::Binary
        | DataType::Timestamp(TimeUnit::Microsecond, _) => return Ok(Arc::clone(col)),
        DataType::Timestamp(_, tz) => DataType::Timestamp(TimeUnit::Microsecond, tz.clone()),
        DataType::Date64 => DataType::Date32,
        DataType::LargeBinary => DataType::Binary,
        _ => DataType::Utf8,
    };
    cast(col.as_ref(), &target).map_err(|e| {
        TransferError::write(
            "UNSUPPORTED_TYPE",
            format!(
                "column '{name}' of type {} cannot be written as {target}: {e}",
                col.data_type()
            ),
        )
    })
}

/// Column resolved to its concrete array type once per batch.
pub enum TypedCol<'a> {
    Boolean(&'a BooleanArray),
    Int8(&'a Int8Array),
    Int16(&'a Int16Array),
    Int32(&'a Int32Array),
    Int64(&'a Int64Array),
    UInt8(&'a UInt8Array),
    UInt16(&'a UInt16Array),
    UInt32(&'a UInt32Array),
    Float32(&'a Float32Array),
    Float64(&'a Float64Array),
    Decimal(&'a Decimal128Array, i8),
    Utf8(&'a StringArray),
    Date32(&'a Date32Array),
    TimestampMicros(&'a TimestampMicrosecondArray),
    TimestampMicrosTz(&'a TimestampMicrosecondArray),
    Binary(&'a BinaryArray),
}

impl<'a> TypedCol<'a> {
    /// Resolve a column produced by [`prepare_column`].
    pub fn from_array(name: &str, col: &'a ArrayRef) -> Result<Self> {
        Ok(match col.data_type() {
            DataType::Boolean => Self::Boolean(col.as_boolean()),
            DataType::Int8 => Self::Int8(col.as_primitive::<Int8Type>()),
            DataType::Int16 => Self::Int16(col.as_primitive::<Int16Type>()),
            DataType::Int32 => Self::Int32(col.as_primitive::<Int32Type>()),
            DataType::Int64 => Self::Int64(col.as_primitive::<Int64Type>()),
            DataType::UInt8 => Self::UInt8(col.as_primitive::<UInt8Type>()),
            DataType::UInt16 => Self::UInt16(col.as_primitive::<UInt16Type>()),
            DataType::UInt32 => Self::UInt32(col.as_primitive::<UInt32Type>()),
            DataType::Float32 => Self::Float32(col.as_primitive::<Float32Type>()),
            DataType::Float64 => Self::Float64(col.as_primitive::<Float64Type>()),
            DataType::Decimal128(_, scale) => {
                Self::Decimal(col.as_primitive::<Decimal128Type>(), *scale)
            }
            DataType::Utf8 => Self::Utf8(col.as_string::<i32>()),
            DataType::Date32 => Self::Date32(col.as_primitive::<Date32Type>()),
            DataType::Timestamp(TimeUnit::Microsecond, None) => {
                Self::TimestampMicros(col.as_primitive::<TimestampMicrosecondType>())
            }
            DataType::Timestamp(TimeUnit::Microsecond, Some(_)) => {
                Self::TimestampMicrosTz(col.as_primitive::<TimestampMicrosecondType>())
            }
            DataType::Binary => Self::Binary(col.as_binary::<i32>()),
            other => {
                return Err(TransferError::write(
                    "UNSUPPORTED_TYPE",
                    format!("column '{name}' has unprepared type {other}"),
                ))
            }
        })
    }
}

/// One bound INSERT parameter.
#[derive(Debug)]
pub enum SqlParamValue<'a> {
    Boolean(Option<bool>),
    Int16(Option<i16>),
    Int32(Option<i32>),
    Int64(Option<i64>),
    Float32(Option<f32>),
    Float64(Option<f64>),
    Text(Option<&'a str>),
    Date(Option<NaiveDate>),
    Timestamp(Option<NaiveDateTime>),
    TimestampTz(Option<DateTime<Utc>>),
    Bytes(Option<&'a [u8]>),
}

impl SqlParamValue<'_> {
    pub fn as_tosql(&self) -> &(dyn ToSql + Sync) {
        match self {
            Self::Boolean(v) => v,
            Self::Int16(v) => v,
            Self::Int32(v) => v,
            Self::Int64(v) => v,
            Self::Float32(v) => v,
            Self::Float64(v) => v,
            Self::Text(v) => v,
            Self::Date(v) => v,
            Self::Timestamp(v) => v,
            Self::TimestampTz(v) => v,
            Self::Bytes(v) => v,
        }
    }
}

fn micros_to_datetime(micros: i64) -> Option<DateTime<Utc>> {
    let secs = micros.div_euclid(1_000_000);
    let nsecs = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    DateTime::from_timestamp(secs, nsecs)
}

fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1970, 1, 1)
        .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(i64::from(days))))
}

macro_rules! opt {
    ($arr:expr, $row:expr, $f:expr) => {
        if $arr.is_null($row) {
            None
        } else {
            Some($f($arr.value($row)))
        }
    };
}

/// Parameter for `row` of `col`. Nulls bind as typed `NULL`.
pub fn sql_param_value<'a>(col: &TypedCol<'a>, row: usize) -> SqlParamValue<'a> {
    match *col {
        TypedCol::Boolean(a) => SqlParamValue::Boolean(opt!(a, row, |v| v)),
        TypedCol::Int8(a) => SqlParamValue::Int16(opt!(a, row, i16::from)),
        TypedCol::Int16(a) => SqlParamValue::Int16(opt!(a, row, |v| v)),
        TypedCol::Int32(a) => SqlParamValue::Int32(opt!(a, row, |v| v)),
        TypedCol::Int64(a) => SqlParamValue::Int64(opt!(a, row, |v| v)),
        TypedCol::UInt8(a) => SqlParamValue::Int16(opt!(a, row, i16::from)),
        TypedCol::UInt16(a) => SqlParamValue::Int32(opt!(a, row, i32::from)),
        TypedCol::UInt32(a) => SqlParamValue::Int64(opt!(a, row, i64::from)),
        TypedCol::Float32(a) => SqlParamValue::Float32(opt!(a, row, |v| v)),
        TypedCol::Float64(a) => SqlParamValue::Float64(opt!(a, row, |v| v)),
        TypedCol::Decimal(a, scale) => SqlParamValue::Float64(opt!(a, row, |v: i128| {
            v as f64 / 10f64.powi(i32::from(scale))
        })),
        TypedCol::Utf8(a) => SqlParamValue::Text(opt!(a, row, |v| v)),
        TypedCol::Date32(a) => SqlParamValue::Date(opt!(a, row, days_to_date).flatten()),
        TypedCol::TimestampMicros(a) => SqlParamValue::Timestamp(
            opt!(a, row, micros_to_datetime)
                .flatten()
                .map(|dt| dt.naive_utc()),
        ),
        TypedCol::TimestampMicrosTz(a) => {
            SqlParamValue::TimestampTz(opt!(a, row, micros_to_datetime).flatten())
        }
        TypedCol::Binary(a) => SqlParamValue::Bytes(opt!(a, row, |v| v)),
    }
}

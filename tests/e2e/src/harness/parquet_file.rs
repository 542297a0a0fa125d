use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use tempfile::NamedTempFile;

/// Taxi-trip shaped rows with mixed-case column names.
pub fn taxi_batch(rows: usize) -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("VendorID", DataType::Int64, false),
        Field::new(
            "tpep_Pickup_Datetime",
            DataType::Timestamp(TimeUnit::Microsecond, None),
            true,
        ),
        Field::new("Trip_Distance", DataType::Float64, true),
        Field::new("Store_And_Fwd_Flag", DataType::Utf8, true),
    ]));
    let ids: Vec<i64> = (0..rows as i64).collect();
    let pickup: Vec<Option<i64>> = ids
        .iter()
        .map(|i| (i % 7 != 0).then_some(1_735_689_600_000_000 + i * 60_000_000))
        .collect();
    let distance: Vec<f64> = ids.iter().map(|i| *i as f64 / 4.0).collect();
    let flag: Vec<Option<&str>> = ids
        .iter()
        .map(|i| match i % 3 {
            0 => Some("N"),
            1 => Some("Y"),
            _ => None,
        })
        .collect();
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(TimestampMicrosecondArray::from(pickup)),
            Arc::new(Float64Array::from(distance)),
            Arc::new(StringArray::from(flag)),
        ],
    )
    .context("failed to build taxi batch")
}

/// Write `rows` taxi rows, `row_group_size` rows per row group.
pub fn write_parquet(rows: usize, row_group_size: usize) -> Result<NamedTempFile> {
    let file = NamedTempFile::new().context("failed to create parquet temp file")?;
    let batch = taxi_batch(rows)?;
    let props = WriterProperties::builder()
        .set_max_row_group_size(row_group_size)
        .build();
    let mut writer = ArrowWriter::try_new(file.reopen()?, batch.schema(), Some(props))
        .context("failed to create parquet writer")?;
    writer.write(&batch).context("failed to write parquet rows")?;
    writer.close().context("failed to finish parquet file")?;
    Ok(file)
}

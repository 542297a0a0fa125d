//! Parquet file as an ordered sequence of row groups.

use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::compute::concat_batches;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::{ArrowReaderMetadata, ParquetRecordBatchReaderBuilder};

use tablehop_engine::RowGroupSource;
use tablehop_types::error::{Result, TransferError};

/// Reads one whole row group at a time; the footer is parsed once on open.
pub struct ParquetRowGroupSource {
    path: PathBuf,
    metadata: ArrowReaderMetadata,
}

impl ParquetRowGroupSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = open_file(&path)?;
        let metadata = ArrowReaderMetadata::load(&file, Default::default()).map_err(|e| {
            TransferError::read(
                "INVALID_PARQUET",
                format!("cannot read parquet footer of {}: {e}", path.display()),
            )
        })?;
        tracing::debug!(
            path = %path.display(),
            row_groups = metadata.metadata().num_row_groups(),
            rows = metadata.metadata().file_metadata().num_rows(),
            "Opened parquet source"
        );
        Ok(Self { path, metadata })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Row count from the footer, without reading any data pages.
    pub fn num_rows(&self) -> u64 {
        u64::try_from(self.metadata.metadata().file_metadata().num_rows()).unwrap_or(0)
    }

    pub fn row_group_rows(&self, index: usize) -> Option<usize> {
        let md = self.metadata.metadata();
        (index < md.num_row_groups())
            .then(|| usize::try_from(md.row_group(index).num_rows()).unwrap_or(0))
    }
}

impl RowGroupSource for ParquetRowGroupSource {
    fn num_row_groups(&self) -> usize {
        self.metadata.metadata().num_row_groups()
    }

    fn schema(&self) -> SchemaRef {
        self.metadata.schema().clone()
    }

    fn read_row_group(&mut self, index: usize) -> Result<RecordBatch> {
        let Some(rows) = self.row_group_rows(index) else {
            return Err(TransferError::read(
                "ROW_GROUP_OUT_OF_RANGE",
                format!(
                    "row group {index} requested, {} has {}",
                    self.path.display(),
                    self.num_row_groups()
                ),
            ));
        };
        let decode_error = |e: &dyn std::fmt::Display| {
            TransferError::read(
                "ROW_GROUP_DECODE_FAILED",
                format!("row group {index} of {}: {e}", self.path.display()),
            )
        };

        let file = open_file(&self.path)?;
        let reader = ParquetRecordBatchReaderBuilder::new_with_metadata(file, self.metadata.clone())
            .with_row_groups(vec![index])
            .with_batch_size(rows.max(1))
            .build()
            .map_err(|e| decode_error(&e))?;

        let mut batches = Vec::with_capacity(1);
        for batch in reader {
            batches.push(batch.map_err(|e| decode_error(&e))?);
        }
        let schema = self.schema();
        match batches.len() {
            0 => Ok(RecordBatch::new_empty(schema)),
            1 => Ok(batches.remove(0)),
            _ => concat_batches(&schema, &batches).map_err(|e| decode_error(&e)),
        }
    }
}

fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        TransferError::read(
            "SOURCE_UNREADABLE",
            format!("cannot open {}: {e}", path.display()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;

    use arrow::array::{Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use parquet::arrow::ArrowWriter;
    use parquet::file::properties::WriterProperties;
    use tablehop_engine::memory::{MemorySink, SinkCall};
    use tablehop_engine::Ingestor;
    use tablehop_types::ErrorCategory;
    use tempfile::NamedTempFile;

    fn taxi_batch(start: i64, len: usize) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("VendorID", DataType::Int64, false),
            Field::new("Trip_Distance", DataType::Float64, true),
            Field::new("Store_And_Fwd_Flag", DataType::Utf8, true),
        ]));
        let ids: Vec<i64> = (start..start + len as i64).collect();
        let dist: Vec<f64> = ids.iter().map(|i| *i as f64 * 0.5).collect();
        let flags: Vec<Option<&str>> = ids
            .iter()
            .map(|i| if i % 2 == 0 { Some("N") } else { None })
            .collect();
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(ids)),
                Arc::new(Float64Array::from(dist)),
                Arc::new(StringArray::from(flags)),
            ],
        )
        .unwrap()
    }

    fn write_parquet(rows: usize, row_group_size: usize) -> NamedTempFile {
        let file = NamedTempFile::new().unwrap();
        let props = WriterProperties::builder()
            .set_max_row_group_size(row_group_size)
            .build();
        let batch = taxi_batch(0, rows);
        let mut writer =
            ArrowWriter::try_new(file.reopen().unwrap(), batch.schema(), Some(props)).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
        file
    }

    #[test]
    fn reads_each_row_group_whole() {
        let file = write_parquet(2_500, 1_000);
        let mut source = ParquetRowGroupSource::open(file.path()).unwrap();
        assert_eq!(source.num_row_groups(), 3);
        assert_eq!(source.num_rows(), 2_500);

        let sizes: Vec<usize> = (0..3)
            .map(|i| source.read_row_group(i).unwrap().num_rows())
            .collect();
        assert_eq!(sizes, vec![1_000, 1_000, 500]);

        let last = source.read_row_group(2).unwrap();
        let ids = last.column(0).as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(ids.value(0), 2_000);
        assert_eq!(last.schema().field(0).name(), "VendorID");
    }

    #[test]
    fn out_of_range_row_group() {
        let file = write_parquet(10, 10);
        let mut source = ParquetRowGroupSource::open(file.path()).unwrap();
        let err = source.read_row_group(1).unwrap_err();
        assert_eq!(err.category, ErrorCategory::Read);
        assert_eq!(err.code, "ROW_GROUP_OUT_OF_RANGE");
    }

    #[test]
    fn missing_file_is_read_failure() {
        let err = ParquetRowGroupSource::open("/nonexistent/trips.parquet")
            .err()
            .unwrap();
        assert_eq!(err.code, "SOURCE_UNREADABLE");
    }

    #[test]
    fn garbage_file_is_read_failure() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"definitely not parquet").unwrap();
        let err = ParquetRowGroupSource::open(file.path()).err().unwrap();
        assert_eq!(err.category, ErrorCategory::Read);
        assert_eq!(err.code, "INVALID_PARQUET");
    }

    #[tokio::test]
    async fn ingest_from_parquet_lowercases_columns() {
        let file = write_parquet(2_500, 1_200);
        let mut source = ParquetRowGroupSource::open(file.path()).unwrap();
        let mut ingest =
            Ingestor::new(MemorySink::default(), "raw_yellow_taxi_data", 1_000).unwrap();
        let summary = ingest.run(&mut source).await.unwrap();

        assert_eq!(summary.row_groups, 3);
        // 1200 -> [1000, 200], 1200 -> [1000, 200], 100 -> [100]
        assert_eq!(summary.batches, 5);
        assert_eq!(summary.rows_written, 2_500);
        match &ingest.sink().calls()[0] {
            SinkCall::Replace { columns, .. } => assert_eq!(
                columns,
                &vec![
                    "vendorid".to_string(),
                    "trip_distance".to_string(),
                    "store_and_fwd_flag".to_string()
                ]
            ),
            other => panic!("expected replace first, got {other:?}"),
        }
    }
}

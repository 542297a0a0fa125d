//! Newline-delimited JSON encoding of chunk rows for load job upload.

use arrow::record_batch::RecordBatch;
use arrow_json::LineDelimitedWriter;

use tablehop_types::error::{Result, TransferError};

/// One JSON object per row. Null values are omitted from their object.
pub fn encode(rows: &RecordBatch) -> Result<Vec<u8>> {
    let mut writer = LineDelimitedWriter::new(Vec::with_capacity(rows.get_array_memory_size()));
    writer.write(rows).map_err(encode_error)?;
    writer.finish().map_err(encode_error)?;
    Ok(writer.into_inner())
}

fn encode_error(e: arrow::error::ArrowError) -> TransferError {
    TransferError::internal("ENCODE_FAILED", format!("ndjson encoding failed: {e}"))
}

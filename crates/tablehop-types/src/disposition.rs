//! Warehouse write dispositions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a warehouse load job replaces or extends the table contents.
///
/// Serialized with the warehouse API spelling (`WRITE_TRUNCATE`, `WRITE_APPEND`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WriteDisposition {
    #[serde(rename = "WRITE_TRUNCATE")]
    Truncate,
    #[serde(rename = "WRITE_APPEND")]
    Append,
}

impl WriteDisposition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Truncate => "WRITE_TRUNCATE",
            Self::Append => "WRITE_APPEND",
        }
    }
}

impl fmt::Display for WriteDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Disposition for the chunk with the given 1-based index.
///
/// Chunk 1 truncates the warehouse table; every later chunk appends.
pub fn disposition(chunk_index: u64) -> WriteDisposition {
    if chunk_index == 1 {
        WriteDisposition::Truncate
    } else {
        WriteDisposition::Append
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_chunk_truncates() {
        assert_eq!(disposition(1), WriteDisposition::Truncate);
    }

    #[test]
    fn later_chunks_append() {
        for idx in 2..50 {
            assert_eq!(disposition(idx), WriteDisposition::Append);
        }
    }

    #[test]
    fn sequence_for_three_chunks() {
        let seq: Vec<_> = (1..=3).map(disposition).collect();
        assert_eq!(
            seq,
            vec![
                WriteDisposition::Truncate,
                WriteDisposition::Append,
                WriteDisposition::Append
            ]
        );
    }

    #[test]
    fn serializes_with_api_names() {
        let json = serde_json::to_string(&WriteDisposition::Truncate).unwrap();
        assert_eq!(json, "\"WRITE_TRUNCATE\"");
        let back: WriteDisposition = serde_json::from_str("\"WRITE_APPEND\"").unwrap();
        assert_eq!(back, WriteDisposition::Append);
    }
}

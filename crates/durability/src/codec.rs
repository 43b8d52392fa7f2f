//! WAL record encoding
//!
//! A record is one compact JSON object followed by a single `\n`:
//!
//! ```text
//! {"id":1,"body":"hello"}\n
//! ```
//!
//! Compact JSON escapes control characters inside strings, so the only raw
//! newline in an encoded record is the terminator. That makes every record
//! self-delimiting and independently decodable. There is no header, footer,
//! or checksum.

use crate::error::{Result, WalError};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Record delimiter.
pub const RECORD_DELIMITER: u8 = b'\n';

/// Encode a value as one WAL line, delimiter included.
///
/// # Errors
///
/// Returns [`WalError::Encode`] if the value cannot be represented as JSON
/// (for example a map with non-string keys). Nothing is written in that case.
pub fn encode_record<M: Serialize + ?Sized>(message: &M) -> Result<Vec<u8>> {
    let mut buf = serde_json::to_vec(message).map_err(WalError::Encode)?;
    buf.push(RECORD_DELIMITER);
    Ok(buf)
}

/// Decode one WAL line. A trailing delimiter is accepted but not required.
pub fn decode_record<M: DeserializeOwned>(line: &[u8]) -> Result<M> {
    let line = line.strip_suffix(&[RECORD_DELIMITER]).unwrap_or(line);
    serde_json::from_slice(line).map_err(WalError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: u64,
        body: String,
    }

    #[test]
    fn test_encode_is_single_terminated_line() {
        let bytes = encode_record(&Note {
            id: 1,
            body: "hello".into(),
        })
        .unwrap();
        assert_eq!(bytes, b"{\"id\":1,\"body\":\"hello\"}\n");
    }

    #[test]
    fn test_embedded_newlines_are_escaped() {
        let note = Note {
            id: 2,
            body: "line one\nline two\r\n".into(),
        };
        let bytes = encode_record(&note).unwrap();
        let newlines = bytes.iter().filter(|b| **b == RECORD_DELIMITER).count();
        assert_eq!(newlines, 1);
        assert_eq!(*bytes.last().unwrap(), RECORD_DELIMITER);

        let decoded: Note = decode_record(&bytes).unwrap();
        assert_eq!(decoded, note);
    }

    #[test]
    fn test_decode_without_delimiter() {
        let decoded: Note = decode_record(b"{\"id\":3,\"body\":\"x\"}").unwrap();
        assert_eq!(decoded.id, 3);
    }

    #[test]
    fn test_non_string_map_keys_fail_to_encode() {
        let mut map = BTreeMap::new();
        map.insert(vec![1u8, 2], "value");
        let err = encode_record(&map).unwrap_err();
        assert!(err.is_encode());
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = decode_record::<Note>(b"{\"id\":").unwrap_err();
        assert!(matches!(err, WalError::Decode(_)));
    }
}

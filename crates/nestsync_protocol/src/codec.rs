//! CBOR encode/decode helpers.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors produced while encoding or decoding protocol values.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Value could not be encoded to CBOR.
    #[error("encode error: {0}")]
    Encode(String),

    /// Bytes could not be decoded into the expected type.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Encodes a value to CBOR bytes.
pub fn to_cbor<T: Serialize>(value: &T) -> CodecResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(value, &mut buf).map_err(|e| CodecError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Decodes a value from CBOR bytes.
///
/// Unknown enum variants and structural mismatches are rejected here, so
/// malformed payloads never reach the queue or the store.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    ciborium::de::from_reader(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, serde::Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn roundtrip() {
        let sample = Sample {
            name: "goal".into(),
            count: 3,
        };
        let bytes = to_cbor(&sample).unwrap();
        let decoded: Sample = from_cbor(&bytes).unwrap();
        assert_eq!(decoded, sample);
    }

    #[test]
    fn decode_rejects_garbage() {
        let result: CodecResult<Sample> = from_cbor(&[0xFF, 0x00, 0x13]);
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }
}

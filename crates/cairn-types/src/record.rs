//! Stream record payloads.
//!
//! Both ingestion paths carry the same payload: a base key, a signed
//! 32-bit amount, and a timespan flag mask (0 = use the default set).
//! Payloads are postcard-encoded on the wire.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A counter update carried by a stream record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRecord {
    /// Base counter key; timespan suffixes are appended at apply time.
    pub key: Bytes,
    /// Amount to add (increment path) or subtract (decrement path).
    pub by: i32,
    /// Timespan selection mask; 0 means "use the default flags".
    pub flags: i64,
}

/// A payload that does not decode as a [`CounterRecord`].
#[derive(Debug, Error)]
#[error("failed to decode counter record: {0}")]
pub struct RecordDecodeError(#[from] postcard::Error);

impl CounterRecord {
    /// Decodes a stream payload.
    pub fn decode(payload: &[u8]) -> Result<Self, RecordDecodeError> {
        Ok(postcard::from_bytes(payload)?)
    }

    /// Encodes to the wire form. Used by producers and tests.
    pub fn encode(&self) -> Vec<u8> {
        postcard::to_allocvec(self).expect("counter record serialization cannot fail")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let record = CounterRecord {
            key: Bytes::from_static(b"views:article:7"),
            by: 3,
            flags: 0,
        };
        let decoded = CounterRecord::decode(&record.encode()).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn roundtrip_negative_by_and_flags() {
        let record = CounterRecord {
            key: Bytes::from_static(b"k"),
            by: -120,
            flags: 16 | 256,
        };
        let decoded = CounterRecord::decode(&record.encode()).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn garbage_payload_is_an_error() {
        assert!(CounterRecord::decode(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF]).is_err());
    }
}

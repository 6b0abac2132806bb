//! Persisted consumed-offset state.
//!
//! One record per consumer, keyed by the consumer's offset key in the
//! `offsets` column family. The record is written only as part of the same
//! atomic batch that applies the deltas it covers; on restart it, not the
//! broker's bookkeeping, is the source of truth.

use serde::{Deserialize, Serialize};

/// Durable marker of how far a consumer has applied its stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumedOffsets {
    /// Lowest stream offset not yet applied to storage.
    pub consumed: i64,
    /// Position in the underlying chunked log store (start offset of the
    /// file to resume from). Tracked only by the delayed-decrement path.
    pub file: Option<i64>,
}

impl ConsumedOffsets {
    /// State for the increment path (no secondary coordinate).
    pub fn stream_only(consumed: i64) -> Self {
        Self { consumed, file: None }
    }

    /// State for the decrement path.
    pub fn with_file(consumed: i64, file: i64) -> Self {
        Self { consumed, file: Some(file) }
    }

    /// Encodes to the stored form.
    pub fn encode(&self) -> Vec<u8> {
        postcard::to_allocvec(self).expect("offset state serialization cannot fail")
    }

    /// Decodes from the stored form.
    pub fn decode(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_only_roundtrip() {
        let state = ConsumedOffsets::stream_only(12_345);
        assert_eq!(ConsumedOffsets::decode(&state.encode()).unwrap(), state);
    }

    #[test]
    fn with_file_roundtrip() {
        let state = ConsumedOffsets::with_file(987, 900);
        let decoded = ConsumedOffsets::decode(&state.encode()).unwrap();
        assert_eq!(decoded.consumed, 987);
        assert_eq!(decoded.file, Some(900));
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(ConsumedOffsets::decode(&[0xFF]).is_err());
    }
}

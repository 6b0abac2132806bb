//! The counter merge operator and the zero-value compaction filter.
//!
//! Both run inside RocksDB callbacks, which have no error channel; a value
//! of the wrong width there means the store is corrupt and the process
//! asserts out, matching the fatal-integrity contract of the read path.

use cairn_types::{VALUE_WIDTH, decode_value, encode_value};
use rocksdb::MergeOperands;
use rocksdb::compaction_filter::Decision;

/// Name registered for the merge operator. Changing it makes existing
/// databases unopenable, so it is part of the on-disk format.
pub(crate) const MERGE_OPERATOR_NAME: &str = "cairn.counter-add";

/// Name registered for the compaction filter.
pub(crate) const COMPACTION_FILTER_NAME: &str = "cairn.zero-value-drop";

fn decode_or_die(context: &str, bytes: &[u8]) -> i64 {
    assert_eq!(
        bytes.len(),
        VALUE_WIDTH,
        "{context}: counter value is {} bytes, expected {VALUE_WIDTH}",
        bytes.len()
    );
    decode_value(bytes).expect("width just checked")
}

/// Associative merge: sum the existing value (missing = 0) and every
/// operand, as big-endian `i64`.
///
/// Associativity and commutativity over deltas are what let the engine
/// batch, reorder, and partially combine operands between flushes and
/// compactions without changing the resolved value. Overflow wraps;
/// realistic counter ranges never get there and the behavior is documented
/// as unspecified.
pub(crate) fn counter_merge(
    _key: &[u8],
    existing: Option<&[u8]>,
    operands: &MergeOperands,
) -> Option<Vec<u8>> {
    let mut total = existing.map_or(0, |bytes| decode_or_die("merge existing", bytes));
    for operand in operands.iter() {
        total = total.wrapping_add(decode_or_die("merge operand", operand));
    }
    Some(encode_value(total).to_vec())
}

/// Drops any key whose resolved value is exactly zero.
///
/// Compaction only sees values the merge operator has already resolved, so
/// removing a zero here cannot lose an in-flight delta. Reads before the
/// next compaction pass still observe the zero.
pub(crate) fn zero_value_filter(_level: u32, _key: &[u8], value: &[u8]) -> Decision {
    if decode_or_die("compaction filter", value) == 0 {
        Decision::Remove
    } else {
        Decision::Keep
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_drops_zero() {
        let decision = zero_value_filter(0, b"k", &encode_value(0));
        assert!(matches!(decision, Decision::Remove));
    }

    #[test]
    fn filter_keeps_nonzero() {
        for value in [1, -1, i64::MAX, i64::MIN] {
            let decision = zero_value_filter(0, b"k", &encode_value(value));
            assert!(matches!(decision, Decision::Keep), "value {value} dropped");
        }
    }

    #[test]
    #[should_panic(expected = "expected 8")]
    fn filter_asserts_on_bad_width() {
        let _ = zero_value_filter(0, b"k", &[1, 2, 3]);
    }
}

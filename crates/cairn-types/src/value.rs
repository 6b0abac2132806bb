//! The on-disk counter value codec and command-surface integer parsing.
//!
//! Every counter value is stored as exactly 8 bytes: the big-endian
//! two's-complement representation of an `i64`. Any other width under a
//! counter key means the store is corrupt; callers must treat
//! [`InvalidValueWidth`] as fatal rather than coerce.

use thiserror::Error;

/// Width of every stored counter value, in bytes.
pub const VALUE_WIDTH: usize = 8;

/// A stored value whose width is not exactly [`VALUE_WIDTH`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("counter value is {len} bytes, expected {VALUE_WIDTH}")]
pub struct InvalidValueWidth {
    pub len: usize,
}

/// Input to the command surface that does not parse as a signed 64-bit
/// integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("value is not an integer or out of range")]
pub struct InvalidInteger;

/// Encodes a counter value to its stored form.
pub fn encode_value(value: i64) -> [u8; VALUE_WIDTH] {
    value.to_be_bytes()
}

/// Decodes a stored counter value, enforcing the width invariant.
pub fn decode_value(bytes: &[u8]) -> Result<i64, InvalidValueWidth> {
    let array: [u8; VALUE_WIDTH] = bytes
        .try_into()
        .map_err(|_| InvalidValueWidth { len: bytes.len() })?;
    Ok(i64::from_be_bytes(array))
}

/// Parses command input as an `i64`.
pub fn parse_i64(input: &str) -> Result<i64, InvalidInteger> {
    input.parse::<i64>().map_err(|_| InvalidInteger)
}

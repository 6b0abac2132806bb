//! # cairn-types: Core types for cairn
//!
//! This crate contains the shared vocabulary used across the cairn system:
//! - Timespans and the process-wide registry ([`Timespan`], [`TimespanRegistry`])
//! - Stream record payloads ([`CounterRecord`])
//! - The on-disk counter value codec ([`encode_value`], [`decode_value`])
//! - Fallible integer parsing for the command surface ([`parse_i64`])
//! - Wall-clock helpers ([`now_ms`])
//!
//! Everything here is a leaf: no storage, no I/O, no async.

mod record;
mod time;
mod timespan;
mod value;

pub use record::{CounterRecord, RecordDecodeError};
pub use time::now_ms;
pub use timespan::{Timespan, TimespanRegistry, UnknownMode, counter_key};
pub use value::{InvalidInteger, InvalidValueWidth, VALUE_WIDTH, decode_value, encode_value, parse_i64};

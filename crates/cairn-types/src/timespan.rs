//! Timespans: named retention buckets with a delay, key suffix, and flag bit.
//!
//! Every counter key is `base_key ++ suffix`, so one base key can carry up to
//! nine independent counters (hour, day, week, ...). Which suffixes a stream
//! record fans out to is selected by the record's flag mask; a record with no
//! flags set updates the default set {hour, day, week, month}.

use thiserror::Error;

/// Milliseconds per hour, the unit the standard table is built from.
const HOUR_MS: i64 = 60 * 60 * 1000;

/// A named retention bucket.
///
/// `delay_ms` is how long the decrement path withholds a record before
/// applying it; `-1` marks a cumulative bucket with no retention delay
/// (`total`). `mask` is the bit a stream record sets to select this bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timespan {
    pub delay_ms: i64,
    pub suffix: &'static str,
    pub mask: i64,
}

/// A mode name that is not present in the registry.
///
/// Consumers resolve their mode at construction; an unknown mode is a
/// configuration error and must abort startup, not be retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown timespan mode: {0}")]
pub struct UnknownMode(pub String);

/// The process-wide table of timespans, immutable after construction.
///
/// Reads need no synchronization; share it behind an `Arc` and hand a
/// reference to every consumer at construction.
#[derive(Debug, Clone)]
pub struct TimespanRegistry {
    timespans: Vec<(&'static str, Timespan)>,
    default_flags: i64,
}

impl TimespanRegistry {
    /// The nine production timespans.
    ///
    /// Default flags (applied when a record carries none) select
    /// hour | day | week | month.
    pub fn standard() -> Self {
        let timespans = vec![
            ("hour", Timespan { delay_ms: HOUR_MS, suffix: "H", mask: 1 }),
            ("day", Timespan { delay_ms: 24 * HOUR_MS, suffix: "D", mask: 2 }),
            ("week", Timespan { delay_ms: 24 * 7 * HOUR_MS, suffix: "W", mask: 4 }),
            ("month", Timespan { delay_ms: 24 * 30 * HOUR_MS, suffix: "M", mask: 8 }),
            ("total", Timespan { delay_ms: -1, suffix: "T", mask: 16 }),
            ("2days", Timespan { delay_ms: 24 * 2 * HOUR_MS, suffix: "D2", mask: 32 }),
            ("2weeks", Timespan { delay_ms: 24 * 14 * HOUR_MS, suffix: "W2", mask: 64 }),
            ("8days", Timespan { delay_ms: 24 * 8 * HOUR_MS, suffix: "D8", mask: 128 }),
            ("6months", Timespan { delay_ms: 24 * 180 * HOUR_MS, suffix: "M6", mask: 256 }),
        ];
        let default_flags = ["hour", "day", "week", "month"]
            .iter()
            .map(|mode| {
                timespans
                    .iter()
                    .find(|(name, _)| name == mode)
                    .expect("default mode present in standard table")
                    .1
                    .mask
            })
            .fold(0, |acc, mask| acc | mask);
        Self { timespans, default_flags }
    }

    /// Builds a registry from an explicit table.
    ///
    /// Production code uses [`TimespanRegistry::standard`]; this exists so
    /// tests can run modes with short delays.
    pub fn with_timespans(timespans: Vec<(&'static str, Timespan)>, default_flags: i64) -> Self {
        Self { timespans, default_flags }
    }

    /// Looks up a mode by name.
    pub fn resolve(&self, mode: &str) -> Result<&Timespan, UnknownMode> {
        self.timespans
            .iter()
            .find(|(name, _)| *name == mode)
            .map(|(_, ts)| ts)
            .ok_or_else(|| UnknownMode(mode.to_string()))
    }

    /// The flag mask applied when a record carries no explicit flags.
    pub fn default_flags(&self) -> i64 {
        self.default_flags
    }

    /// Record flags if non-zero, else the default set.
    pub fn effective_flags(&self, record_flags: i64) -> i64 {
        if record_flags != 0 { record_flags } else { self.default_flags }
    }

    /// Every timespan whose mask bit is set in `flags`.
    pub fn selected(&self, flags: i64) -> impl Iterator<Item = &Timespan> {
        self.timespans
            .iter()
            .map(|(_, ts)| ts)
            .filter(move |ts| flags & ts.mask != 0)
    }

    /// All registered timespans, in table order.
    pub fn iter(&self) -> impl Iterator<Item = &Timespan> {
        self.timespans.iter().map(|(_, ts)| ts)
    }
}

/// Forms a counter key from a base key and a timespan suffix.
pub fn counter_key(base: &[u8], suffix: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(base.len() + suffix.len());
    key.extend_from_slice(base);
    key.extend_from_slice(suffix.as_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_has_nine_modes() {
        let registry = TimespanRegistry::standard();
        assert_eq!(registry.iter().count(), 9);
    }

    #[test]
    fn default_flags_select_hour_day_week_month() {
        let registry = TimespanRegistry::standard();
        assert_eq!(registry.default_flags(), 1 | 2 | 4 | 8);

        let suffixes: Vec<&str> = registry
            .selected(registry.default_flags())
            .map(|ts| ts.suffix)
            .collect();
        assert_eq!(suffixes, vec!["H", "D", "W", "M"]);
    }

    #[test]
    fn resolve_known_modes() {
        let registry = TimespanRegistry::standard();
        let day = registry.resolve("day").unwrap();
        assert_eq!(day.suffix, "D");
        assert_eq!(day.delay_ms, 24 * 60 * 60 * 1000);
        assert_eq!(day.mask, 2);

        let total = registry.resolve("total").unwrap();
        assert_eq!(total.suffix, "T");
        assert_eq!(total.delay_ms, -1);
    }

    #[test]
    fn resolve_unknown_mode_fails() {
        let registry = TimespanRegistry::standard();
        let err = registry.resolve("fortnight").unwrap_err();
        assert_eq!(err, UnknownMode("fortnight".to_string()));
    }

    #[test]
    fn effective_flags_prefers_record_flags() {
        let registry = TimespanRegistry::standard();
        assert_eq!(registry.effective_flags(0), registry.default_flags());
        assert_eq!(registry.effective_flags(16), 16);
        assert_eq!(registry.effective_flags(32 | 256), 32 | 256);
    }

    #[test]
    fn selected_single_bit() {
        let registry = TimespanRegistry::standard();
        let suffixes: Vec<&str> = registry.selected(64).map(|ts| ts.suffix).collect();
        assert_eq!(suffixes, vec!["W2"]);
    }

    #[test]
    fn masks_are_distinct_bits() {
        let registry = TimespanRegistry::standard();
        let mut seen = 0i64;
        for ts in registry.iter() {
            assert_eq!(ts.mask.count_ones(), 1, "mask {} is not a single bit", ts.mask);
            assert_eq!(seen & ts.mask, 0, "mask {} reused", ts.mask);
            seen |= ts.mask;
        }
    }

    #[test]
    fn suffixes_are_unique() {
        let registry = TimespanRegistry::standard();
        let mut suffixes: Vec<&str> = registry.iter().map(|ts| ts.suffix).collect();
        suffixes.sort_unstable();
        suffixes.dedup();
        assert_eq!(suffixes.len(), 9);
    }

    #[test]
    fn counter_key_appends_suffix() {
        assert_eq!(counter_key(b"user:42", "H"), b"user:42H".to_vec());
        assert_eq!(counter_key(b"", "D2"), b"D2".to_vec());
    }
}

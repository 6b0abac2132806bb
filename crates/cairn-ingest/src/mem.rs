//! Deterministic in-memory stream sources.
//!
//! These back the consumer tests and are handy for local development of
//! anything downstream of ingestion. They implement the same contracts as
//! the real broker-backed sources, including the log-file geometry of the
//! decrement path.

use std::time::Duration;

use crate::source::{DelayedSource, IncrementSource, LogRecord, SourceError, StreamRecord};

/// In-memory increment stream.
#[derive(Debug)]
pub struct MemIncrementSource {
    records: Vec<StreamRecord>,
    cursor: usize,
    batch_size: usize,
    ack_ok: bool,
    /// Number of best-effort acknowledgments attempted.
    pub commit_async_calls: usize,
}

impl MemIncrementSource {
    /// Wraps a pre-built record list. Records must be in ascending offset
    /// order.
    pub fn new(records: Vec<StreamRecord>) -> Self {
        Self {
            records,
            cursor: 0,
            batch_size: usize::MAX,
            ack_ok: true,
            commit_async_calls: 0,
        }
    }

    /// Caps how many records one poll returns.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Makes `commit_async` report failure.
    pub fn with_failing_ack(mut self) -> Self {
        self.ack_ok = false;
        self
    }
}

impl IncrementSource for MemIncrementSource {
    fn seek(&mut self, offset: i64) -> Result<(), SourceError> {
        self.cursor = self
            .records
            .iter()
            .position(|record| record.offset >= offset)
            .unwrap_or(self.records.len());
        Ok(())
    }

    fn poll(&mut self, _timeout: Duration) -> Result<Vec<StreamRecord>, SourceError> {
        let end = self.cursor.saturating_add(self.batch_size).min(self.records.len());
        let batch = self.records[self.cursor..end].to_vec();
        self.cursor = end;
        Ok(batch)
    }

    fn commit_async(&mut self) -> bool {
        self.commit_async_calls += 1;
        self.ack_ok
    }
}

/// In-memory decrement log store: a sequence of files, each a run of
/// contiguous-offset records.
#[derive(Debug)]
pub struct MemDelayedSource {
    files: Vec<Vec<LogRecord>>,
    /// Start offset of each file, plus one-past-the-end as a final entry.
    bounds: Vec<i64>,
    file_idx: usize,
    record_idx: usize,
    batch_size: usize,
    ack_ok: bool,
    /// Number of best-effort acknowledgments attempted.
    pub commit_async_calls: usize,
}

impl MemDelayedSource {
    /// Wraps pre-built log files. Every file must be non-empty and files
    /// must be contiguous in offset order.
    pub fn new(files: Vec<Vec<LogRecord>>) -> Self {
        assert!(files.iter().all(|file| !file.is_empty()), "files must be non-empty");
        let mut bounds: Vec<i64> = files.iter().map(|file| file[0].offset).collect();
        let end = files
            .last()
            .map_or(0, |file| file[0].offset + file.len() as i64);
        bounds.push(end);
        Self {
            files,
            bounds,
            file_idx: 0,
            record_idx: 0,
            batch_size: usize::MAX,
            ack_ok: true,
            commit_async_calls: 0,
        }
    }

    /// Caps how many records one poll returns.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Makes `commit_async` report failure.
    pub fn with_failing_ack(mut self) -> Self {
        self.ack_ok = false;
        self
    }

    fn exhausted(&self) -> bool {
        self.file_idx >= self.files.len()
    }
}

impl DelayedSource for MemDelayedSource {
    fn seek(&mut self, offset: i64, file_offset: i64) -> Result<(), SourceError> {
        self.file_idx = self
            .bounds
            .windows(2)
            .position(|pair| pair[0] <= file_offset && file_offset < pair[1])
            .unwrap_or(self.files.len());
        self.record_idx = 0;
        if !self.exhausted() {
            self.record_idx = self.files[self.file_idx]
                .iter()
                .position(|record| record.offset >= offset)
                .unwrap_or(self.files[self.file_idx].len());
        }
        Ok(())
    }

    fn poll(&mut self, _timeout: Duration) -> Result<Vec<LogRecord>, SourceError> {
        // A poll never spans a file boundary; move to the next file only
        // once the previous poll drained the current one.
        if !self.exhausted() && self.record_idx >= self.files[self.file_idx].len() {
            self.file_idx += 1;
            self.record_idx = 0;
        }
        if self.exhausted() {
            return Ok(Vec::new());
        }

        let file = &self.files[self.file_idx];
        let end = self.record_idx.saturating_add(self.batch_size).min(file.len());
        let batch = file[self.record_idx..end].to_vec();
        self.record_idx = end;
        Ok(batch)
    }

    fn current_file_offset(&self) -> i64 {
        if self.exhausted() {
            *self.bounds.last().expect("bounds is never empty")
        } else {
            self.bounds[self.file_idx]
        }
    }

    fn next_file_offset(&self) -> i64 {
        if self.exhausted() {
            *self.bounds.last().expect("bounds is never empty")
        } else {
            self.bounds[self.file_idx + 1]
        }
    }

    fn commit_async(&mut self) -> bool {
        self.commit_async_calls += 1;
        self.ack_ok
    }
}

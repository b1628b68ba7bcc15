//! Range scans that decode records as they go.
//!
//! [`RangeScanner::scan`] opens one store iterator over `[start, end)` and
//! wraps it in a [`RecordScan`]: a lazy, ordered iterator of [`ScanResult`]s.
//! An entry that does not decode is yielded as raw bytes and the scan moves
//! on. The underlying store iterator is released when the scan is exhausted,
//! cancelled, or dropped.

use std::iter::FusedIterator;

use humanledger_core::{KeyedStore, ScanIter};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ContractResult;
use crate::record::{Record, RecordCodec};

/// Decoded value of one scanned entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanValue {
    Record(Record),
    /// Bytes that failed to decode, passed through unchanged
    Raw(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub key: String,
    pub value: ScanValue,
}

impl ScanResult {
    pub fn record(&self) -> Option<&Record> {
        match &self.value {
            ScanValue::Record(record) => Some(record),
            ScanValue::Raw(_) => None,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self.value, ScanValue::Raw(_))
    }

    /// `{"Key": key, "Record": record}`; raw values become a (lossy) string.
    pub fn to_json(&self) -> Value {
        let record = match &self.value {
            ScanValue::Record(record) => record.to_json(),
            ScanValue::Raw(raw) => Value::String(String::from_utf8_lossy(raw).into_owned()),
        };
        let mut map = Map::new();
        map.insert("Key".to_string(), Value::String(self.key.clone()));
        map.insert("Record".to_string(), record);
        Value::Object(map)
    }
}

/// Lifecycle of a single scan.
///
/// `Opened -> Iterating* -> Exhausted`, or `Aborted` from either
/// non-terminal state on cancel. A scan whose store iterator cannot be
/// opened never exists: [`RangeScanner::scan`] returns `StorageUnavailable`
/// instead of an `Aborted` scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Opened,
    Iterating,
    Exhausted,
    Aborted,
}

impl ScanState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ScanState::Exhausted | ScanState::Aborted)
    }
}

/// Stateless entry point for decoded range scans.
pub struct RangeScanner;

impl RangeScanner {
    /// Open a decoded scan over `[start, end)`.
    ///
    /// Fails with `StorageUnavailable` if the store cannot open an iterator.
    pub fn scan<S: KeyedStore + ?Sized>(store: &S, start: &str, end: &str) -> ContractResult<RecordScan> {
        let iter = store.scan(start, end)?;
        debug!(start, end, entries = iter.remaining(), "scan opened");
        Ok(RecordScan { iter, state: ScanState::Opened, raw_count: 0 })
    }
}

/// Lazy sequence of decoded scan results. Not restartable.
#[derive(Debug)]
pub struct RecordScan {
    iter: ScanIter,
    state: ScanState,
    raw_count: usize,
}

impl RecordScan {
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Entries so far that were passed through as raw bytes.
    pub fn raw_count(&self) -> usize {
        self.raw_count
    }

    /// Stop the scan and release its store iterator.
    pub fn cancel(&mut self) {
        if !self.state.is_terminal() {
            self.iter.close();
            self.state = ScanState::Aborted;
            debug!("scan cancelled");
        }
    }
}

impl Iterator for RecordScan {
    type Item = ScanResult;

    fn next(&mut self) -> Option<ScanResult> {
        if self.state.is_terminal() {
            return None;
        }
        let Some(entry) = self.iter.next() else {
            self.state = ScanState::Exhausted;
            debug!(raw = self.raw_count, "scan exhausted");
            return None;
        };
        self.state = ScanState::Iterating;

        let value = match RecordCodec::decode(&entry.value) {
            Ok(record) => ScanValue::Record(record),
            Err(failure) => {
                warn!(key = %entry.key, reason = %failure.reason, "entry is not a record, returning raw value");
                self.raw_count += 1;
                ScanValue::Raw(failure.raw)
            }
        };
        Some(ScanResult { key: entry.key, value })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl FusedIterator for RecordScan {}

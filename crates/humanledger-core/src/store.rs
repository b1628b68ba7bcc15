//! The `KeyedStore` contract and its range iterator.
//!
//! A `KeyedStore` maps string keys to opaque byte values and can iterate a
//! half-open key range `[start, end)` in byte-wise lexicographic order.
//!
//! Range iteration hands out a [`ScanIter`] that owns a sorted snapshot and
//! one slot of the store's open-iterator budget. The slot is released when
//! the iterator is exhausted, closed, or dropped, whichever comes first.

use std::iter::FusedIterator;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{LedgerError, LedgerResult};

/// One physical entry: a key and its raw value bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub key: String,
    pub value: Vec<u8>,
}

/// Ordered key-value store with point access and range iteration.
pub trait KeyedStore {
    /// Value stored under `key`.
    ///
    /// Fails with `NotFound` when the key was never written or holds a
    /// zero-length value.
    fn get(&self, key: &str) -> LedgerResult<Vec<u8>>;

    /// Store `value` under `key`, replacing any previous value.
    fn put(&self, key: &str, value: &[u8]) -> LedgerResult<()>;

    /// Iterate entries with `start <= key < end` in ascending key order.
    ///
    /// The iterator reflects the store as of this call. Entries with
    /// zero-length values are not yielded.
    fn scan(&self, start: &str, end: &str) -> LedgerResult<ScanIter>;
}

impl<S: KeyedStore + ?Sized> KeyedStore for &S {
    fn get(&self, key: &str) -> LedgerResult<Vec<u8>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &[u8]) -> LedgerResult<()> {
        (**self).put(key, value)
    }

    fn scan(&self, start: &str, end: &str) -> LedgerResult<ScanIter> {
        (**self).scan(start, end)
    }
}

impl<S: KeyedStore + ?Sized> KeyedStore for Arc<S> {
    fn get(&self, key: &str) -> LedgerResult<Vec<u8>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &[u8]) -> LedgerResult<()> {
        (**self).put(key, value)
    }

    fn scan(&self, start: &str, end: &str) -> LedgerResult<ScanIter> {
        (**self).scan(start, end)
    }
}

/// Counts open range iterators against a fixed limit.
#[derive(Debug)]
pub struct IteratorTracker {
    open: Arc<AtomicUsize>,
    limit: usize,
}

impl IteratorTracker {
    pub fn new(limit: usize) -> Self {
        Self { open: Arc::new(AtomicUsize::new(0)), limit }
    }

    /// Reserve one iterator slot, or fail with `IteratorLimit`.
    pub fn acquire(&self) -> LedgerResult<IteratorHandle> {
        let limit = self.limit;
        self.open
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |open| {
                if open < limit { Some(open + 1) } else { None }
            })
            .map_err(|open| LedgerError::IteratorLimit { open, limit })?;
        Ok(IteratorHandle { open: Arc::clone(&self.open) })
    }

    /// Iterators currently holding a slot.
    pub fn open_count(&self) -> usize {
        self.open.load(Ordering::Acquire)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// One reserved iterator slot. Dropping it gives the slot back.
#[derive(Debug)]
pub struct IteratorHandle {
    open: Arc<AtomicUsize>,
}

impl Drop for IteratorHandle {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Range iterator over a point-in-time snapshot.
#[derive(Debug)]
pub struct ScanIter {
    entries: std::vec::IntoIter<StoredEntry>,
    handle: Option<IteratorHandle>,
}

impl ScanIter {
    /// Wrap an already-sorted snapshot. `entries` must be strictly ascending.
    pub fn new(entries: Vec<StoredEntry>, handle: IteratorHandle) -> Self {
        debug_assert!(entries.windows(2).all(|w| w[0].key < w[1].key));
        Self { entries: entries.into_iter(), handle: Some(handle) }
    }

    /// Entries not yet yielded.
    pub fn remaining(&self) -> usize {
        if self.handle.is_some() { self.entries.len() } else { 0 }
    }

    /// True until the iterator is exhausted or closed.
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Release the iterator slot and discard the rest of the snapshot.
    /// Calling `close` more than once is a no-op.
    pub fn close(&mut self) {
        if self.handle.take().is_some() {
            self.entries = Vec::new().into_iter();
        }
    }
}

impl Iterator for ScanIter {
    type Item = StoredEntry;

    fn next(&mut self) -> Option<StoredEntry> {
        self.handle.as_ref()?;
        match self.entries.next() {
            Some(entry) => Some(entry),
            None => {
                self.close();
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining();
        (n, Some(n))
    }
}

impl FusedIterator for ScanIter {}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, value: &[u8]) -> StoredEntry {
        StoredEntry { key: key.to_string(), value: value.to_vec() }
    }

    #[test]
    fn test_tracker_enforces_limit() {
        let tracker = IteratorTracker::new(2);
        let a = tracker.acquire().unwrap();
        let _b = tracker.acquire().unwrap();
        assert_eq!(tracker.open_count(), 2);
        assert!(matches!(tracker.acquire(), Err(LedgerError::IteratorLimit { open: 2, limit: 2 })));

        drop(a);
        assert_eq!(tracker.open_count(), 1);
        assert!(tracker.acquire().is_ok());
    }

    #[test]
    fn test_exhaustion_releases_slot() {
        let tracker = IteratorTracker::new(1);
        let mut iter = ScanIter::new(vec![entry("a", b"1"), entry("b", b"2")], tracker.acquire().unwrap());

        assert_eq!(iter.next().unwrap().key, "a");
        assert_eq!(tracker.open_count(), 1);
        assert_eq!(iter.next().unwrap().key, "b");
        assert!(iter.next().is_none());
        assert!(!iter.is_open());
        assert_eq!(tracker.open_count(), 0);
        // Fused
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_drop_releases_slot() {
        let tracker = IteratorTracker::new(1);
        {
            let mut iter = ScanIter::new(vec![entry("a", b"1"), entry("b", b"2")], tracker.acquire().unwrap());
            iter.next();
        }
        assert_eq!(tracker.open_count(), 0);
    }

    #[test]
    fn test_close_is_idempotent() {
        let tracker = IteratorTracker::new(1);
        let mut iter = ScanIter::new(vec![entry("a", b"1")], tracker.acquire().unwrap());
        assert_eq!(iter.remaining(), 1);
        iter.close();
        iter.close();
        assert_eq!(iter.remaining(), 0);
        assert!(iter.next().is_none());
        assert_eq!(tracker.open_count(), 0);
    }

    #[test]
    fn test_empty_snapshot() {
        let tracker = IteratorTracker::new(1);
        let mut iter = ScanIter::new(Vec::new(), tracker.acquire().unwrap());
        assert_eq!(iter.size_hint(), (0, Some(0)));
        assert!(iter.next().is_none());
        assert_eq!(tracker.open_count(), 0);
    }
}

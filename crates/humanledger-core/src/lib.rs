//! HumanLedger Core — ordered key-value ledger store
//!
//! A small ledger store mapping string keys to opaque byte values, with
//! point reads, last-write-wins puts, and snapshot range scans over a
//! half-open key interval in byte-wise lexicographic order.
//!
//! # Architecture
//!
//! - **Read path**: Served from a RAM hash table under a shared lock
//! - **Write path**: WAL-first (when persistent), then RAM, under one writer lock
//! - **Range scans**: A sorted snapshot owned by a [`ScanIter`]; each open
//!   iterator holds one slot of a bounded budget until it is exhausted or dropped
//!
//! Record encoding and contract semantics live in separate crates
//! (e.g. humanledger-contract); this crate only deals in bytes.

pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod platform_durability;
pub mod store;
pub mod wal;

pub use config::{Config, SyncMode};
pub use engine::LedgerEngine;
pub use error::{ErrorKind, LedgerError, LedgerResult};
pub use store::{IteratorHandle, IteratorTracker, KeyedStore, ScanIter, StoredEntry};

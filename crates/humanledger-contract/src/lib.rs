//! Human record contract over the HumanLedger store
//!
//! Stores "human" records (name, birthday) as JSON documents in a
//! [`KeyedStore`](humanledger_core::KeyedStore) and exposes the operations
//! `queryHuman`, `initLedger`, `createHuman`, `queryAllHuman` and
//! `changeHumanName` through an explicit dispatch table.
//!
//! # Architecture
//!
//! - [`RecordCodec`] turns [`Record`]s into payload bytes and back; payloads
//!   that do not parse come back as a [`DecodeFailure`] holding the raw bytes
//! - [`RangeScanner`] decodes a key range lazily, passing undecodable
//!   entries through as raw bytes instead of failing the scan
//! - [`HumanContract`] is the handle the host calls: `init` once, then
//!   `invoke(function, args)` per request, always answered with a [`Response`]

pub mod config;
pub mod contract;
pub mod dispatch;
pub mod error;
pub mod record;
pub mod scanner;

pub use config::ContractConfig;
pub use contract::HumanContract;
pub use dispatch::{Operation, Response};
pub use error::{ContractError, ContractResult, DecodeFailure};
pub use record::{Human, Record, RecordCodec, DOC_TYPE_HUMAN};
pub use scanner::{RangeScanner, RecordScan, ScanResult, ScanState, ScanValue};

//! Contract error taxonomy.
//!
//! Every failure an operation can report maps onto one `ContractError`
//! variant; the dispatcher turns any of them into a uniform error response.

use humanledger_core::{ErrorKind, LedgerError};
use thiserror::Error;

/// Payload bytes that do not parse as a [`Record`](crate::Record).
///
/// Carries the original bytes so callers can fall back to treating the value
/// as opaque text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("payload is not a record: {reason}")]
pub struct DecodeFailure {
    pub raw: Vec<u8>,
    pub reason: String,
}

impl DecodeFailure {
    /// The raw payload rendered as text, replacing invalid UTF-8.
    pub fn raw_text(&self) -> String {
        String::from_utf8_lossy(&self.raw).into_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    /// No entry for the key, or the entry is empty
    #[error("{key} does not exist")]
    NotFound { key: String },

    /// A single-record path needed a record and found something else
    #[error("value stored at {key} is not a record")]
    DecodeFailure {
        key: String,
        #[source]
        source: DecodeFailure,
    },

    /// Wrong argument count or shape
    #[error("Incorrect arguments: {0}")]
    InvalidArguments(String),

    /// The function name matches no operation
    #[error("Received unknown function {0} invocation")]
    UnknownOperation(String),

    /// The store could not service the request
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// ContractConfig::validate rejected the configuration
    #[error("Invalid contract configuration: {0}")]
    InvalidConfig(String),
}

impl From<LedgerError> for ContractError {
    fn from(err: LedgerError) -> Self {
        match (err.kind(), err) {
            (_, LedgerError::NotFound { key }) => ContractError::NotFound { key },
            (ErrorKind::InvalidArgument, err) => ContractError::InvalidArguments(err.to_string()),
            (_, err) => ContractError::StorageUnavailable(err.to_string()),
        }
    }
}

pub type ContractResult<T> = Result<T, ContractError>;

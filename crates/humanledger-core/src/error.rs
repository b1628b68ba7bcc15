//! Error types for HumanLedger store operations
//!
//! All store errors are represented by the LedgerError enum. Each variant
//! carries enough context to report the failing key, file, or offset.

use std::error::Error;
use std::fmt;
use std::path::PathBuf;

/// Coarse classification of a [`LedgerError`].
///
/// Callers that only need to decide how to surface an error match on this
/// instead of on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The key has no entry, or its entry holds a zero-length value
    NotFound,
    /// The caller supplied a key or value the store refuses to accept
    InvalidArgument,
    /// The store cannot service the request right now
    Unavailable,
}

/// HumanLedger error types with detailed context
#[derive(Debug, Clone)]
pub enum LedgerError {
    /// I/O operation failed
    Io {
        /// The file path where the error occurred
        path: Option<PathBuf>,
        /// The underlying I/O error kind
        kind: std::io::ErrorKind,
        /// Human-readable description
        message: String,
    },

    /// WAL file is corrupted and cannot be recovered
    WalCorrupted {
        path: PathBuf,
        /// Byte offset where corruption was detected
        offset: u64,
        reason: String,
    },

    /// Checksum verification failed
    ChecksumMismatch {
        path: PathBuf,
        expected: u32,
        actual: u32,
        offset: u64,
    },

    /// Torn write detected (partial write at end of file)
    TornWrite {
        path: PathBuf,
        expected_size: u32,
        available_bytes: u64,
        offset: u64,
    },

    /// Entry size exceeds maximum allowed
    OversizedEntry {
        entry_size: u64,
        max_size: u64,
        /// "key" or "value"
        component: String,
    },

    /// Magic bytes not found at expected location
    NoMagicFound {
        path: PathBuf,
        offset: u64,
        found_bytes: [u8; 4],
    },

    /// Point lookup found no entry, or an entry with an empty value
    NotFound {
        key: String,
    },

    /// Keys must be non-empty
    EmptyKey,

    /// Too many range iterators are open at once
    IteratorLimit {
        open: usize,
        limit: usize,
    },

    /// Config::validate rejected the configuration
    InvalidConfig {
        reason: String,
    },
}

impl LedgerError {
    /// Classify this error for callers that surface it outside the store.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::NotFound { .. } => ErrorKind::NotFound,
            LedgerError::EmptyKey
            | LedgerError::OversizedEntry { .. }
            | LedgerError::InvalidConfig { .. } => ErrorKind::InvalidArgument,
            LedgerError::Io { .. }
            | LedgerError::WalCorrupted { .. }
            | LedgerError::ChecksumMismatch { .. }
            | LedgerError::TornWrite { .. }
            | LedgerError::NoMagicFound { .. }
            | LedgerError::IteratorLimit { .. } => ErrorKind::Unavailable,
        }
    }
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::Io { path, kind, message } => {
                if let Some(path) = path {
                    write!(f, "I/O error in {}: {} ({})", path.display(), message, kind)
                } else {
                    write!(f, "I/O error: {} ({})", message, kind)
                }
            }

            LedgerError::WalCorrupted { path, offset, reason } => {
                write!(f, "WAL corrupted in {} at offset {}: {}", path.display(), offset, reason)
            }

            LedgerError::ChecksumMismatch { path, expected, actual, offset } => {
                write!(f, "Checksum mismatch in {} at offset {}: expected 0x{:08x}, got 0x{:08x}",
                       path.display(), offset, expected, actual)
            }

            LedgerError::TornWrite { path, expected_size, available_bytes, offset } => {
                write!(f, "Torn write in {} at offset {}: expected {} bytes, only {} available",
                       path.display(), offset, expected_size, available_bytes)
            }

            LedgerError::OversizedEntry { entry_size, max_size, component } => {
                write!(f, "Entry {} too large: {} bytes exceeds limit of {} bytes",
                       component, entry_size, max_size)
            }

            LedgerError::NoMagicFound { path, offset, found_bytes } => {
                write!(f, "Magic bytes not found in {} at offset {}: found {:02x}{:02x}{:02x}{:02x}",
                       path.display(), offset, found_bytes[0], found_bytes[1], found_bytes[2], found_bytes[3])
            }

            LedgerError::NotFound { key } => write!(f, "{} does not exist", key),

            LedgerError::EmptyKey => write!(f, "Key must not be empty"),

            LedgerError::IteratorLimit { open, limit } => {
                write!(f, "Cannot open range iterator: {} open, limit {}", open, limit)
            }

            LedgerError::InvalidConfig { reason } => write!(f, "Invalid configuration: {}", reason),
        }
    }
}

impl Error for LedgerError {}

/// Convert std::io::Error to LedgerError::Io
impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Io {
            path: None,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for HumanLedger store operations
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LedgerError::ChecksumMismatch {
            path: PathBuf::from("/tmp/test.wal"),
            expected: 0x12345678,
            actual: 0x87654321,
            offset: 1024,
        };

        let display = format!("{}", err);
        assert!(display.contains("Checksum mismatch"));
        assert!(display.contains("0x12345678"));
        assert!(display.contains("0x87654321"));
    }

    #[test]
    fn test_not_found_mentions_key() {
        let err = LedgerError::NotFound { key: "Human42".to_string() };
        assert!(err.to_string().contains("Human42"));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(LedgerError::EmptyKey.kind(), ErrorKind::InvalidArgument);
        let oversized = LedgerError::OversizedEntry {
            entry_size: 10,
            max_size: 5,
            component: "key".to_string(),
        };
        assert_eq!(oversized.kind(), ErrorKind::InvalidArgument);
        assert_eq!(LedgerError::IteratorLimit { open: 1, limit: 1 }.kind(), ErrorKind::Unavailable);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LedgerError = io_err.into();

        match err {
            LedgerError::Io { kind, .. } => assert_eq!(kind, std::io::ErrorKind::NotFound),
            _ => panic!("Expected Io error"),
        }
        // A missing WAL file is a storage problem, not a missing record
        let err: LedgerError = std::io::Error::new(std::io::ErrorKind::NotFound, "x").into();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
    }
}

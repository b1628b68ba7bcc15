//! Configuration management for the HumanLedger store
//!
//! Provides presets for the common deployment shapes and a `validate`
//! check that every constructor path should pass before opening a store.

use crate::format::{MAX_KEY_SIZE, MAX_VALUE_SIZE};

/// How each WAL append reaches persistent storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// durable_sync after every append; a returned Put survives power loss
    Durable,
    /// Append to the OS page cache only; call `sync_wal` to make a batch durable
    Fast,
}

/// Store configuration with deployment presets
#[derive(Debug, Clone)]
pub struct Config {
    /// WAL file rotation threshold (bytes)
    pub wal_rotation_size_bytes: u64,
    /// Sync policy for WAL appends
    pub sync_mode: SyncMode,
    /// Maximum key size in bytes; at most the WAL's u16 key length
    pub max_key_size: usize,
    /// Maximum value size in bytes
    pub max_value_size: usize,
    /// Maximum number of range iterators open at the same time
    pub max_open_iterators: usize,
}

impl Config {
    /// Ledger peer: fsync every write, generous iterator budget
    pub fn durable() -> Self {
        Self {
            wal_rotation_size_bytes: 100 * 1024 * 1024,
            sync_mode: SyncMode::Durable,
            max_key_size: MAX_KEY_SIZE,
            max_value_size: 32 * 1024 * 1024,
            max_open_iterators: 1024,
        }
    }

    /// Bulk loading: page-cache appends, caller syncs in batches
    pub fn fast() -> Self {
        Self {
            wal_rotation_size_bytes: 100 * 1024 * 1024,
            sync_mode: SyncMode::Fast,
            max_key_size: MAX_KEY_SIZE,
            max_value_size: 32 * 1024 * 1024,
            max_open_iterators: 1024,
        }
    }

    /// Small devices: smaller WAL files and tighter limits
    pub fn embedded() -> Self {
        Self {
            wal_rotation_size_bytes: 8 * 1024 * 1024,
            sync_mode: SyncMode::Durable,
            max_key_size: 64,
            max_value_size: 1024 * 1024,
            max_open_iterators: 16,
        }
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.wal_rotation_size_bytes < 1024 * 1024 {
            return Err("wal_rotation_size_bytes must be >= 1MB".into());
        }
        if self.max_key_size == 0 || self.max_key_size > MAX_KEY_SIZE {
            return Err(format!("max_key_size must be in [1, {}]", MAX_KEY_SIZE));
        }
        if self.max_value_size == 0 || self.max_value_size > MAX_VALUE_SIZE {
            return Err("max_value_size must be in [1, 32MB]".into());
        }
        if self.max_open_iterators == 0 {
            return Err("max_open_iterators must be > 0".into());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self { Self::durable() }
}

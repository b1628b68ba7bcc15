//! Ledger storage engine.
//!
//! LedgerEngine keeps the working set in a RAM hash table. When opened on a
//! directory, every write is first appended to a crash-safe WAL, and the WAL
//! is replayed on the next open. An in-memory engine skips the WAL entirely.
//!
//! **Read path**: RAM only (shared RwLock)
//! **Write path**: writer lock, WAL append, RAM insert
//! **Range scans**: sorted snapshot taken under the read lock

use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::{Config, SyncMode};
use crate::error::{LedgerError, LedgerResult};
use crate::format::Operation;
use crate::store::{IteratorTracker, KeyedStore, ScanIter, StoredEntry};
use crate::wal::{WalReader, WalWriter};

/// Ordered key-value ledger: RAM hash table + optional WAL.
///
/// All public methods take `&self`. Readers share the map's read lock.
/// Writers serialize through the writer Mutex and hold it across both the
/// WAL append and the map insert, so puts to the same key are applied in
/// WAL order.
pub struct LedgerEngine {
    /// RAM working set
    data: RwLock<HashMap<String, Vec<u8>>>,
    /// Single-writer lock; holds the WAL when the engine is persistent
    writer: Mutex<Option<WalWriter>>,
    /// Open range iterator budget
    iterators: IteratorTracker,
    /// Data directory (None for in-memory engines)
    path: Option<PathBuf>,
    config: Config,
}

impl LedgerEngine {
    /// Open or create a persistent ledger at `path`, replaying its WAL.
    pub fn open<P: AsRef<Path>>(path: P, config: Config) -> LedgerResult<Self> {
        config.validate().map_err(|reason| LedgerError::InvalidConfig { reason })?;

        let path = path.as_ref().to_path_buf();
        let wal_dir = path.join("wal");
        std::fs::create_dir_all(&wal_dir).map_err(|e| LedgerError::Io {
            path: Some(wal_dir.clone()),
            kind: e.kind(),
            message: format!("Failed to create WAL directory: {}", e),
        })?;

        let recovery = WalReader::new(&wal_dir).recover()?;
        // Appends must never land behind bytes that replay cannot get past
        for tail in &recovery.torn_tails {
            tail.truncate()?;
        }

        let mut data = HashMap::new();
        for entry in recovery.entries {
            match entry.operation {
                Operation::Put => match String::from_utf8(entry.key) {
                    Ok(key) => {
                        data.insert(key, entry.value);
                    }
                    Err(e) => {
                        warn!(key_len = e.as_bytes().len(), "skipping WAL entry with non UTF-8 key");
                    }
                },
            }
        }

        if !data.is_empty() {
            info!(entries = data.len(), wal = %wal_dir.display(), "recovered ledger from WAL");
        }

        let wal = WalWriter::new(&wal_dir, config.wal_rotation_size_bytes)?;

        Ok(Self {
            data: RwLock::new(data),
            writer: Mutex::new(Some(wal)),
            iterators: IteratorTracker::new(config.max_open_iterators),
            path: Some(path),
            config,
        })
    }

    /// Create an empty ledger that lives only in memory.
    pub fn in_memory(config: Config) -> LedgerResult<Self> {
        config.validate().map_err(|reason| LedgerError::InvalidConfig { reason })?;
        Ok(Self {
            data: RwLock::new(HashMap::new()),
            writer: Mutex::new(None),
            iterators: IteratorTracker::new(config.max_open_iterators),
            path: None,
            config,
        })
    }

    fn check_key(&self, key: &str) -> LedgerResult<()> {
        if key.is_empty() {
            return Err(LedgerError::EmptyKey);
        }
        if key.len() > self.config.max_key_size {
            return Err(LedgerError::OversizedEntry {
                entry_size: key.len() as u64,
                max_size: self.config.max_key_size as u64,
                component: "key".to_string(),
            });
        }
        Ok(())
    }

    /// Make all fast-mode writes durable with one sync. No-op in memory.
    pub fn sync_wal(&self) -> LedgerResult<()> {
        match self.writer.lock().as_ref() {
            Some(wal) => wal.sync(),
            None => Ok(()),
        }
    }

    /// Check if key has an entry (including an empty value).
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    /// Number of entries in RAM, including entries with empty values.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Data directory, or None for an in-memory engine.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Range iterators currently open against this engine.
    pub fn open_iterators(&self) -> usize {
        self.iterators.open_count()
    }
}

impl KeyedStore for LedgerEngine {
    fn get(&self, key: &str) -> LedgerResult<Vec<u8>> {
        if key.is_empty() {
            return Err(LedgerError::EmptyKey);
        }
        let data = self.data.read();
        match data.get(key) {
            Some(value) if !value.is_empty() => Ok(value.clone()),
            _ => Err(LedgerError::NotFound { key: key.to_string() }),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> LedgerResult<()> {
        self.check_key(key)?;
        if value.len() > self.config.max_value_size {
            return Err(LedgerError::OversizedEntry {
                entry_size: value.len() as u64,
                max_size: self.config.max_value_size as u64,
                component: "value".to_string(),
            });
        }

        let mut writer = self.writer.lock();
        if let Some(wal) = writer.as_mut() {
            let sync = self.config.sync_mode == SyncMode::Durable;
            wal.append(key.as_bytes(), value, Operation::Put, sync)?;
        }
        self.data.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn scan(&self, start: &str, end: &str) -> LedgerResult<ScanIter> {
        let handle = self.iterators.acquire()?;
        if start >= end {
            return Ok(ScanIter::new(Vec::new(), handle));
        }

        let mut entries: Vec<StoredEntry> = {
            let data = self.data.read();
            data.iter()
                .filter(|(k, v)| k.as_str() >= start && k.as_str() < end && !v.is_empty())
                .map(|(k, v)| StoredEntry { key: k.clone(), value: v.clone() })
                .collect()
        };
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        debug!(start, end, entries = entries.len(), "opened range scan");

        Ok(ScanIter::new(entries, handle))
    }
}

impl std::fmt::Debug for LedgerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerEngine")
            .field("path", &self.path)
            .field("entries", &self.len())
            .field("open_iterators", &self.open_iterators())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn test_engine() -> (LedgerEngine, TempDir) {
        let dir = TempDir::new().unwrap();
        let engine = LedgerEngine::open(dir.path(), Config::default()).unwrap();
        (engine, dir)
    }

    fn keys(iter: ScanIter) -> Vec<String> {
        iter.map(|e| e.key).collect()
    }

    #[test]
    fn test_open_empty() {
        let (engine, dir) = test_engine();
        assert!(engine.is_empty());
        assert_eq!(engine.path(), Some(dir.path()));
        assert_eq!(engine.open_iterators(), 0);
    }

    #[test]
    fn test_put_get() {
        let (engine, _dir) = test_engine();
        engine.put("hello", b"world").unwrap();
        assert_eq!(engine.get("hello").unwrap(), b"world");
        assert!(engine.contains_key("hello"));
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let engine = LedgerEngine::in_memory(Config::default()).unwrap();
        match engine.get("nobody") {
            Err(LedgerError::NotFound { key }) => assert_eq!(key, "nobody"),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_value_reads_as_not_found() {
        let engine = LedgerEngine::in_memory(Config::default()).unwrap();
        engine.put("blank", b"").unwrap();
        assert!(engine.contains_key("blank"));
        assert!(matches!(engine.get("blank"), Err(LedgerError::NotFound { .. })));
    }

    #[test]
    fn test_empty_key_rejected() {
        let engine = LedgerEngine::in_memory(Config::default()).unwrap();
        assert!(matches!(engine.put("", b"v"), Err(LedgerError::EmptyKey)));
        assert!(matches!(engine.get(""), Err(LedgerError::EmptyKey)));
    }

    #[test]
    fn test_size_limits_from_config() {
        let engine = LedgerEngine::in_memory(Config::embedded()).unwrap();
        let long_key = "k".repeat(65);
        assert!(matches!(
            engine.put(&long_key, b"v"),
            Err(LedgerError::OversizedEntry { component, .. }) if component == "key"
        ));
        let big = vec![1u8; 1024 * 1024 + 1];
        assert!(matches!(
            engine.put("k", &big),
            Err(LedgerError::OversizedEntry { component, .. }) if component == "value"
        ));
        assert!(engine.is_empty());
    }

    #[test]
    fn test_long_key_roundtrips_with_default_config() {
        let dir = TempDir::new().unwrap();
        let key = format!("H{}", "x".repeat(299));
        {
            let engine = LedgerEngine::open(dir.path(), Config::default()).unwrap();
            engine.put(&key, b"v").unwrap();
            assert_eq!(engine.get(&key).unwrap(), b"v");
        }
        let engine = LedgerEngine::open(dir.path(), Config::default()).unwrap();
        assert_eq!(engine.get(&key).unwrap(), b"v");

        let limit = "k".repeat(crate::format::MAX_KEY_SIZE);
        engine.put(&limit, b"v").unwrap();
        assert!(matches!(
            engine.put(&format!("{}k", limit), b"v"),
            Err(LedgerError::OversizedEntry { component, .. }) if component == "key"
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = Config::default();
        config.max_open_iterators = 0;
        assert!(matches!(LedgerEngine::in_memory(config), Err(LedgerError::InvalidConfig { .. })));
    }

    #[test]
    fn test_put_overwrite() {
        let (engine, _dir) = test_engine();
        engine.put("k", b"v1").unwrap();
        engine.put("k", b"v2").unwrap();
        assert_eq!(engine.get("k").unwrap(), b"v2");
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_crash_recovery() {
        let dir = TempDir::new().unwrap();
        {
            let engine = LedgerEngine::open(dir.path(), Config::default()).unwrap();
            engine.put("Human0", b"tanaka").unwrap();
            engine.put("Human1", b"yamada").unwrap();
            engine.put("Human0", b"sato").unwrap();
        }
        {
            let engine = LedgerEngine::open(dir.path(), Config::default()).unwrap();
            assert_eq!(engine.get("Human0").unwrap(), b"sato");
            assert_eq!(engine.get("Human1").unwrap(), b"yamada");
            assert_eq!(engine.len(), 2);
        }
    }

    #[test]
    fn test_writes_after_torn_tail_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let engine = LedgerEngine::open(dir.path(), Config::default()).unwrap();
            engine.put("a", b"1").unwrap();
        }

        // Crash mid-append: a header promising far more payload than was written
        let wal_path = dir.path().join("wal").join("wal-0000000000000000.hlog");
        let mut data = std::fs::read(&wal_path).unwrap();
        data.extend_from_slice(&crate::format::MAGIC_ARRAY);
        data.extend_from_slice(&100_000u32.to_le_bytes());
        data.extend_from_slice(&[0xAB; 40]);
        std::fs::write(&wal_path, data).unwrap();

        {
            let engine = LedgerEngine::open(dir.path(), Config::default()).unwrap();
            assert_eq!(engine.get("a").unwrap(), b"1");
            engine.put("b", b"2").unwrap();
        }

        let engine = LedgerEngine::open(dir.path(), Config::default()).unwrap();
        assert_eq!(engine.get("a").unwrap(), b"1");
        assert_eq!(engine.get("b").unwrap(), b"2");
        assert_eq!(keys(engine.scan("a", "z").unwrap()), vec!["a", "b"]);
    }

    #[test]
    fn test_fast_mode_recovers_after_sync() {
        let dir = TempDir::new().unwrap();
        {
            let engine = LedgerEngine::open(dir.path(), Config::fast()).unwrap();
            for i in 0..50 {
                engine.put(&format!("Human{}", i), b"x").unwrap();
            }
            engine.sync_wal().unwrap();
        }
        let engine = LedgerEngine::open(dir.path(), Config::fast()).unwrap();
        assert_eq!(engine.len(), 50);
    }

    #[test]
    fn test_scan_half_open_and_sorted() {
        let engine = LedgerEngine::in_memory(Config::default()).unwrap();
        for key in ["b", "d", "a", "c", "e"] {
            engine.put(key, key.as_bytes()).unwrap();
        }
        assert_eq!(keys(engine.scan("b", "e").unwrap()), vec!["b", "c", "d"]);
        assert_eq!(keys(engine.scan("", "zz").unwrap()), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_scan_is_bytewise_lexicographic() {
        let engine = LedgerEngine::in_memory(Config::default()).unwrap();
        for i in [0, 1, 2, 10, 100, 998, 999] {
            engine.put(&format!("Human{}", i), b"x").unwrap();
        }
        // "Human999" is excluded; "Human10" sorts between "Human1" and "Human2"
        assert_eq!(
            keys(engine.scan("Human0", "Human999").unwrap()),
            vec!["Human0", "Human1", "Human10", "Human100", "Human2", "Human998"]
        );
    }

    #[test]
    fn test_scan_skips_empty_values() {
        let engine = LedgerEngine::in_memory(Config::default()).unwrap();
        engine.put("a", b"1").unwrap();
        engine.put("b", b"").unwrap();
        engine.put("c", b"3").unwrap();
        assert_eq!(keys(engine.scan("a", "z").unwrap()), vec!["a", "c"]);
    }

    #[test]
    fn test_scan_empty_ranges() {
        let engine = LedgerEngine::in_memory(Config::default()).unwrap();
        engine.put("m", b"1").unwrap();
        assert_eq!(engine.scan("m", "m").unwrap().count(), 0);
        assert_eq!(engine.scan("z", "a").unwrap().count(), 0);
        assert_eq!(engine.scan("n", "z").unwrap().count(), 0);
        assert_eq!(engine.open_iterators(), 0);
    }

    #[test]
    fn test_scan_is_a_snapshot() {
        let engine = LedgerEngine::in_memory(Config::default()).unwrap();
        engine.put("a", b"1").unwrap();
        engine.put("b", b"2").unwrap();

        let mut iter = engine.scan("a", "z").unwrap();
        assert_eq!(iter.next().unwrap().key, "a");
        engine.put("c", b"3").unwrap();
        engine.put("b", b"changed").unwrap();

        let rest: Vec<StoredEntry> = iter.collect();
        assert_eq!(rest, vec![StoredEntry { key: "b".into(), value: b"2".to_vec() }]);
    }

    #[test]
    fn test_iterator_limit_and_release() {
        let mut config = Config::default();
        config.max_open_iterators = 1;
        let engine = LedgerEngine::in_memory(config).unwrap();
        engine.put("a", b"1").unwrap();
        engine.put("b", b"2").unwrap();

        let mut first = engine.scan("a", "z").unwrap();
        first.next();
        assert!(matches!(engine.scan("a", "z"), Err(LedgerError::IteratorLimit { .. })));

        drop(first);
        assert_eq!(engine.open_iterators(), 0);
        for _ in 0..10 {
            let mut iter = engine.scan("a", "z").unwrap();
            iter.next();
        }
        assert_eq!(engine.scan("a", "z").unwrap().count(), 2);
    }

    #[test]
    fn test_concurrent_reads_and_writes() {
        let engine = Arc::new(LedgerEngine::in_memory(Config::default()).unwrap());
        for i in 0..100 {
            engine.put(&format!("k{:03}", i), format!("v{}", i).as_bytes()).unwrap();
        }

        let mut handles = vec![];
        for t in 0..4 {
            let e = Arc::clone(&engine);
            handles.push(std::thread::spawn(move || {
                for i in 0..100 {
                    let val = e.get(&format!("k{:03}", i)).unwrap();
                    assert_eq!(val, format!("v{}", i).as_bytes());
                }
                e.put(&format!("t{}", t), b"done").unwrap();
                let scanned: Vec<String> = e.scan("k", "l").unwrap().map(|s| s.key).collect();
                assert_eq!(scanned.len(), 100);
                assert!(scanned.windows(2).all(|w| w[0] < w[1]));
            }));
        }
        for h in handles { h.join().unwrap(); }
        assert_eq!(engine.len(), 104);
        assert_eq!(engine.open_iterators(), 0);
    }
}

//! Write-ahead log for the HumanLedger store
//!
//! The write path is WAL-first: an entry is appended (and, in durable mode,
//! synced) before the in-memory map is updated. On open, every WAL file is
//! replayed in sequence order to rebuild the map.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::format::{decode_entry, encode_entry, LogEntry, Operation, HEADER_SIZE, MAGIC_ARRAY};
use crate::platform_durability::durable_sync;

const WAL_PREFIX: &str = "wal-";
const WAL_SUFFIX: &str = ".hlog";

fn wal_file_name(sequence: u64) -> String {
    format!("{}{:016x}{}", WAL_PREFIX, sequence, WAL_SUFFIX)
}

/// Parse the sequence number out of a WAL file name, if it is one.
fn parse_sequence(name: &str) -> Option<u64> {
    let hex = name.strip_prefix(WAL_PREFIX)?.strip_suffix(WAL_SUFFIX)?;
    u64::from_str_radix(hex, 16).ok()
}

fn io_error(path: &Path, context: &str, e: std::io::Error) -> LedgerError {
    LedgerError::Io {
        path: Some(path.to_path_buf()),
        kind: e.kind(),
        message: format!("{}: {}", context, e),
    }
}

/// Appends entries to the current WAL file, rotating by size.
///
/// `append` must return before the caller touches the in-memory map.
pub struct WalWriter {
    file: File,
    path: PathBuf,
    /// Current file size in bytes (tracked to avoid stat calls)
    size: u64,
    wal_dir: PathBuf,
    sequence: u64,
    rotation_size: u64,
}

impl WalWriter {
    /// Open a WAL writer in `wal_dir`, resuming the highest-numbered file.
    pub fn new<P: AsRef<Path>>(wal_dir: P, rotation_size: u64) -> LedgerResult<Self> {
        let wal_dir = wal_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&wal_dir)
            .map_err(|e| io_error(&wal_dir, "Failed to create WAL directory", e))?;

        let sequence = Self::find_max_sequence(&wal_dir);
        let path = wal_dir.join(wal_file_name(sequence));
        let file = Self::open_append(&path)?;
        let size = file.metadata()
            .map_err(|e| io_error(&path, "Failed to stat WAL file", e))?
            .len();

        Ok(Self { file, path, size, wal_dir, sequence, rotation_size })
    }

    fn open_append(path: &Path) -> LedgerResult<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| io_error(path, "Failed to open WAL file", e))
    }

    fn find_max_sequence(wal_dir: &Path) -> u64 {
        std::fs::read_dir(wal_dir)
            .into_iter()
            .flatten()
            .flatten()
            .filter_map(|entry| entry.file_name().to_str().and_then(parse_sequence))
            .max()
            .unwrap_or(0)
    }

    /// Append one entry. With `sync` set, the call returns only after the
    /// bytes have reached persistent storage.
    pub fn append(&mut self, key: &[u8], value: &[u8], op: Operation, sync: bool) -> LedgerResult<()> {
        let entry_bytes = encode_entry(key, value, op)?;

        if self.size > 0 && self.size + entry_bytes.len() as u64 > self.rotation_size {
            self.rotate()?;
        }

        self.file.write_all(&entry_bytes)
            .map_err(|e| io_error(&self.path, "WAL write failed", e))?;
        if sync {
            durable_sync(&self.file)
                .map_err(|e| io_error(&self.path, "WAL durable_sync failed", e))?;
        }

        self.size += entry_bytes.len() as u64;
        Ok(())
    }

    /// Sync the current file, then continue in a fresh one.
    fn rotate(&mut self) -> LedgerResult<()> {
        self.sync()?;
        self.sequence += 1;
        let new_path = self.wal_dir.join(wal_file_name(self.sequence));
        self.file = Self::open_append(&new_path)?;
        debug!(path = %new_path.display(), "rotated WAL file");
        self.path = new_path;
        self.size = 0;
        Ok(())
    }

    pub fn current_path(&self) -> &Path {
        &self.path
    }

    pub fn current_size(&self) -> u64 {
        self.size
    }

    /// Make every append so far durable with a single sync.
    pub fn sync(&self) -> LedgerResult<()> {
        durable_sync(&self.file).map_err(|e| io_error(&self.path, "WAL sync failed", e))
    }
}

/// Bytes at the end of a WAL file that did not replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TornTail {
    pub path: PathBuf,
    /// Length up to the end of the last entry that decoded
    pub valid_len: u64,
    pub file_len: u64,
}

impl TornTail {
    /// Cut the file back to its last good entry so new appends replay.
    pub fn truncate(&self) -> LedgerResult<()> {
        let file = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .map_err(|e| io_error(&self.path, "Failed to open WAL file for truncation", e))?;
        file.set_len(self.valid_len)
            .map_err(|e| io_error(&self.path, "Failed to truncate WAL file", e))?;
        durable_sync(&file).map_err(|e| io_error(&self.path, "WAL durable_sync failed", e))?;
        warn!(
            path = %self.path.display(),
            valid_len = self.valid_len,
            dropped = self.file_len - self.valid_len,
            "truncated unreadable WAL tail"
        );
        Ok(())
    }
}

/// Result of replaying a WAL directory.
#[derive(Debug, Default)]
pub struct WalRecovery {
    /// Every entry that decoded, in log order
    pub entries: Vec<LogEntry>,
    /// Files whose trailing bytes did not decode
    pub torn_tails: Vec<TornTail>,
}

/// Replays WAL files for recovery.
pub struct WalReader {
    wal_dir: PathBuf,
}

impl WalReader {
    pub fn new<P: AsRef<Path>>(wal_dir: P) -> Self {
        Self { wal_dir: wal_dir.as_ref().to_path_buf() }
    }

    /// Recover all entries from every WAL file, in sequence order.
    ///
    /// Corrupt entries are skipped by scanning forward to the next magic.
    /// Whatever follows the last entry that decodes in a file is reported as
    /// a [`TornTail`]; it must be truncated before that file is appended to.
    pub fn recover(&self) -> LedgerResult<WalRecovery> {
        let dir_entries = std::fs::read_dir(&self.wal_dir)
            .map_err(|e| io_error(&self.wal_dir, "Failed to read WAL directory", e))?;

        let mut wal_files: Vec<(u64, PathBuf)> = Vec::new();
        for entry in dir_entries {
            let entry = entry.map_err(|e| io_error(&self.wal_dir, "Failed to read directory entry", e))?;
            if let Some(seq) = entry.file_name().to_str().and_then(parse_sequence) {
                wal_files.push((seq, entry.path()));
            }
        }
        wal_files.sort();

        let mut recovery = WalRecovery::default();
        for (_, path) in &wal_files {
            self.recover_from_file(path, &mut recovery)?;
        }
        Ok(recovery)
    }

    fn recover_from_file(&self, path: &Path, recovery: &mut WalRecovery) -> LedgerResult<()> {
        let mut buffer = Vec::new();
        File::open(path)
            .and_then(|mut f| f.read_to_end(&mut buffer))
            .map_err(|e| io_error(path, "Failed to read WAL file for recovery", e))?;

        let mut offset = 0;
        let mut valid_end = 0;

        while offset + HEADER_SIZE <= buffer.len() {
            if buffer[offset..offset + 4] != MAGIC_ARRAY {
                warn!(path = %path.display(), offset, "bad magic in WAL, resyncing");
                match find_next_magic(&buffer, offset + 1) {
                    Some(next) => { offset = next; continue; }
                    None => break,
                }
            }

            let length = u32::from_le_bytes([
                buffer[offset + 4], buffer[offset + 5],
                buffer[offset + 6], buffer[offset + 7],
            ]) as usize;
            let total = HEADER_SIZE + length;

            if offset + total > buffer.len() {
                // A length running past the end is either the crash point or
                // a damaged header with good entries after it.
                match find_next_magic(&buffer, offset + 1) {
                    Some(next) => {
                        warn!(path = %path.display(), offset, needed = total, "WAL entry overruns file, resyncing");
                        offset = next;
                        continue;
                    }
                    None => {
                        warn!(
                            path = %path.display(),
                            offset,
                            needed = total,
                            available = buffer.len() - offset,
                            "torn write at end of WAL, stopping replay"
                        );
                        break;
                    }
                }
            }

            match decode_entry(&buffer[offset..offset + total]) {
                Ok(entry) => {
                    recovery.entries.push(entry);
                    offset += total;
                    valid_end = offset;
                }
                Err(e) => {
                    warn!(path = %path.display(), offset, error = %e, "corrupt WAL entry skipped");
                    match find_next_magic(&buffer, offset + 1) {
                        Some(next) => { offset = next; continue; }
                        None => break,
                    }
                }
            }
        }

        if valid_end < buffer.len() {
            recovery.torn_tails.push(TornTail {
                path: path.to_path_buf(),
                valid_len: valid_end as u64,
                file_len: buffer.len() as u64,
            });
        }
        Ok(())
    }
}

/// Position of the next magic sequence at or after `start`.
fn find_next_magic(buffer: &[u8], start: usize) -> Option<usize> {
    if start >= buffer.len() {
        return None;
    }
    buffer[start..]
        .windows(MAGIC_ARRAY.len())
        .position(|w| w == MAGIC_ARRAY)
        .map(|p| start + p)
}

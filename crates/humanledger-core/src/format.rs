//! Binary format for HumanLedger WAL entries
//!
//! Every entry is framed as:
//! EntryHeader (16 bytes) + key_len(u16 LE) + value_len(u32 LE) + key_bytes + value_bytes

use std::path::PathBuf;

use crate::error::{LedgerError, LedgerResult};

/// Magic bytes identifying HumanLedger WAL entries: "HLDG" in ASCII
pub const MAGIC_ARRAY: [u8; 4] = [0x48, 0x4C, 0x44, 0x47];

/// Hard upper bound on key size in bytes (keys are length-prefixed as u16)
pub const MAX_KEY_SIZE: usize = u16::MAX as usize;

/// Hard upper bound on value size in bytes (32MB)
pub const MAX_VALUE_SIZE: usize = 32 * 1024 * 1024;

/// Header size in bytes
pub const HEADER_SIZE: usize = 16;

/// Size of the key_len + value_len prefix inside the payload
const LENGTHS_SIZE: usize = 2 + 4;

/// WAL operation types.
///
/// Entries are never removed from the ledger, so the only logged operation is
/// a put. The byte is kept in the header so replay can reject unknown codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Operation {
    /// Insert or overwrite a key-value pair
    Put = 1,
}

impl Operation {
    fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Operation::Put),
            _ => None,
        }
    }
}

/// Fixed-size header for each WAL entry
///
/// Layout:
///   [0..4]   magic:    "HLDG"
///   [4..8]   length:   u32 - payload length in bytes
///   [8..12]  checksum: u32 - CRC32C of payload bytes
///   [12]     op:       u8  - operation code
///   [13..16] reserved: must be zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHeader {
    pub magic: [u8; 4],
    pub length: u32,
    pub checksum: u32,
    pub op: u8,
}

impl EntryHeader {
    pub fn new(length: u32, checksum: u32, op: Operation) -> Self {
        Self { magic: MAGIC_ARRAY, length, checksum, op: op as u8 }
    }

    /// Serialize header to bytes for writing
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.magic);
        buf[4..8].copy_from_slice(&self.length.to_le_bytes());
        buf[8..12].copy_from_slice(&self.checksum.to_le_bytes());
        buf[12] = self.op;
        buf
    }

    /// Parse header from bytes
    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        Self {
            magic: [bytes[0], bytes[1], bytes[2], bytes[3]],
            length: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            checksum: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            op: bytes[12],
        }
    }
}

/// One decoded WAL entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub operation: Operation,
}

/// Encode a key-value pair into a complete, checksummed WAL entry
pub fn encode_entry(key: &[u8], value: &[u8], op: Operation) -> LedgerResult<Vec<u8>> {
    // Size checks happen before allocating anything
    if key.len() > MAX_KEY_SIZE {
        return Err(LedgerError::OversizedEntry {
            entry_size: key.len() as u64,
            max_size: MAX_KEY_SIZE as u64,
            component: "key".to_string(),
        });
    }
    if value.len() > MAX_VALUE_SIZE {
        return Err(LedgerError::OversizedEntry {
            entry_size: value.len() as u64,
            max_size: MAX_VALUE_SIZE as u64,
            component: "value".to_string(),
        });
    }

    let payload_size = LENGTHS_SIZE + key.len() + value.len();
    let mut buffer = Vec::with_capacity(HEADER_SIZE + payload_size);
    buffer.extend_from_slice(&[0u8; HEADER_SIZE]);
    buffer.extend_from_slice(&(key.len() as u16).to_le_bytes());
    buffer.extend_from_slice(&(value.len() as u32).to_le_bytes());
    buffer.extend_from_slice(key);
    buffer.extend_from_slice(value);

    let checksum = crc32c::crc32c(&buffer[HEADER_SIZE..]);
    let header = EntryHeader::new(payload_size as u32, checksum, op);
    buffer[..HEADER_SIZE].copy_from_slice(&header.to_bytes());

    Ok(buffer)
}

fn corrupted(offset: usize, reason: String) -> LedgerError {
    LedgerError::WalCorrupted { path: PathBuf::from("<buffer>"), offset: offset as u64, reason }
}

/// Decode one WAL entry from the start of `data`
pub fn decode_entry(data: &[u8]) -> LedgerResult<LogEntry> {
    if data.len() < HEADER_SIZE {
        return Err(corrupted(0, format!("Entry too short: {} bytes, need at least {}", data.len(), HEADER_SIZE)));
    }

    let mut header_bytes = [0u8; HEADER_SIZE];
    header_bytes.copy_from_slice(&data[..HEADER_SIZE]);
    let header = EntryHeader::from_bytes(&header_bytes);

    if header.magic != MAGIC_ARRAY {
        return Err(LedgerError::NoMagicFound {
            path: PathBuf::from("<buffer>"),
            offset: 0,
            found_bytes: header.magic,
        });
    }

    let payload_end = HEADER_SIZE + header.length as usize;
    if data.len() < payload_end {
        return Err(LedgerError::TornWrite {
            path: PathBuf::from("<buffer>"),
            expected_size: header.length,
            available_bytes: (data.len() - HEADER_SIZE) as u64,
            offset: HEADER_SIZE as u64,
        });
    }

    let payload = &data[HEADER_SIZE..payload_end];
    let actual = crc32c::crc32c(payload);
    if actual != header.checksum {
        return Err(LedgerError::ChecksumMismatch {
            path: PathBuf::from("<buffer>"),
            expected: header.checksum,
            actual,
            offset: HEADER_SIZE as u64,
        });
    }

    let operation = Operation::from_code(header.op)
        .ok_or_else(|| corrupted(12, format!("Invalid operation type: {}", header.op)))?;

    if payload.len() < LENGTHS_SIZE {
        return Err(corrupted(HEADER_SIZE, "Payload too short for length fields".to_string()));
    }
    let key_len = u16::from_le_bytes([payload[0], payload[1]]) as usize;
    let value_len = u32::from_le_bytes([payload[2], payload[3], payload[4], payload[5]]) as usize;
    let key_end = LENGTHS_SIZE + key_len;
    let value_end = key_end + value_len;

    if payload.len() != value_end {
        return Err(corrupted(
            HEADER_SIZE,
            format!("Payload is {} bytes, key({}) + value({}) need {}", payload.len(), key_len, value_len, value_end),
        ));
    }

    Ok(LogEntry {
        key: payload[LENGTHS_SIZE..key_end].to_vec(),
        value: payload[key_end..value_end].to_vec(),
        operation,
    })
}

//! Record codec
//!
//! Encoding and decoding of single log records.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{CaskError, Result};

/// Header size: CRC (4) + KeyLen (4) + ValLen (4) + Mark (1) = 13 bytes
pub const HEADER_SIZE: usize = 13;

const CRC_SIZE: usize = 4;

/// Whether a record stores a value or marks its key as deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Mark {
    Put = 0x01,
    Delete = 0x02,
}

impl Mark {
    fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Mark::Put),
            0x02 => Some(Mark::Delete),
            _ => None,
        }
    }
}

/// A single entry in the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub mark: Mark,
}

impl Record {
    /// Create a PUT record
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            mark: Mark::Put,
        }
    }

    /// Create a DELETE record (tombstone) with an empty value
    pub fn tombstone(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: Vec::new(),
            mark: Mark::Delete,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.mark == Mark::Delete
    }

    /// Number of bytes this record occupies on disk
    pub fn encoded_len(&self) -> u64 {
        (HEADER_SIZE + self.key.len() + self.value.len()) as u64
    }

    /// Serialize into one contiguous buffer (header + key + value)
    pub fn encode(&self) -> Result<BytesMut> {
        let key_len = u32::try_from(self.key.len()).map_err(|_| CaskError::RecordTooLarge {
            what: "key",
            len: self.key.len(),
        })?;
        let value_len = u32::try_from(self.value.len()).map_err(|_| CaskError::RecordTooLarge {
            what: "value",
            len: self.value.len(),
        })?;

        let mut buf = BytesMut::with_capacity(self.encoded_len() as usize);

        // CRC placeholder, filled once the rest of the record is in place
        buf.put_u32_le(0);
        buf.put_u32_le(key_len);
        buf.put_u32_le(value_len);
        buf.put_u8(self.mark as u8);
        buf.put_slice(&self.key);
        buf.put_slice(&self.value);

        let crc = crc32fast::hash(&buf[CRC_SIZE..]);
        buf[..CRC_SIZE].copy_from_slice(&crc.to_le_bytes());

        Ok(buf)
    }
}

/// Total encoded length of the record described by `header`
pub fn record_len(header: &[u8; HEADER_SIZE]) -> u64 {
    let mut fields = &header[CRC_SIZE..];
    let key_len = fields.get_u32_le() as u64;
    let value_len = fields.get_u32_le() as u64;
    HEADER_SIZE as u64 + key_len + value_len
}

/// Decode the record at the start of `buf`
///
/// Returns:
/// - `Ok(Some((record, consumed)))` — one record and how many bytes it used
/// - `Ok(None)` — `buf` is empty (end of log)
/// - `Err(CorruptRecord)` — truncated, bad checksum or unknown mark.
///   The reported offset is relative to the start of `buf`.
pub fn decode(buf: &[u8]) -> Result<Option<(Record, u64)>> {
    if buf.is_empty() {
        return Ok(None);
    }

    if buf.len() < HEADER_SIZE {
        return Err(CaskError::corrupt(
            0,
            format!("truncated header: {} of {} bytes", buf.len(), HEADER_SIZE),
        ));
    }

    let mut header = &buf[..HEADER_SIZE];
    let stored_crc = header.get_u32_le();
    let key_len = header.get_u32_le() as usize;
    let value_len = header.get_u32_le() as usize;
    let mark_byte = header.get_u8();

    let total = HEADER_SIZE
        .checked_add(key_len)
        .and_then(|n| n.checked_add(value_len))
        .filter(|&n| n <= buf.len())
        .ok_or_else(|| {
            CaskError::corrupt(
                0,
                format!(
                    "record needs {} + {} + {} bytes, only {} available",
                    HEADER_SIZE,
                    key_len,
                    value_len,
                    buf.len()
                ),
            )
        })?;

    let crc = crc32fast::hash(&buf[CRC_SIZE..total]);
    if crc != stored_crc {
        return Err(CaskError::corrupt(
            0,
            format!("checksum mismatch: stored {:#010x}, computed {:#010x}", stored_crc, crc),
        ));
    }

    let mark = Mark::from_u8(mark_byte)
        .ok_or_else(|| CaskError::corrupt(0, format!("unknown mark byte {:#04x}", mark_byte)))?;

    let key_end = HEADER_SIZE + key_len;
    let record = Record {
        key: buf[HEADER_SIZE..key_end].to_vec(),
        value: buf[key_end..total].to_vec(),
        mark,
    };

    Ok(Some((record, total as u64)))
}

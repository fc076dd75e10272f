//! Log Module
//!
//! The single append-only data file and the binary layout of its records.
//!
//! ## Responsibilities
//! - Encode/decode self-delimiting records
//! - Append records at the end of the active file
//! - Positional reads for lookups, sequential scans for replay and merge
//! - CRC32 checksums for corruption detection
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Record 1                                                     │
//! │ ┌─────────┬────────────┬────────────┬────────┬─────┬───────┐ │
//! │ │ CRC (4) │ KeyLen (4) │ ValLen (4) │Mark (1)│ Key │ Value │ │
//! │ └─────────┴────────────┴────────────┴────────┴─────┴───────┘ │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Record 2                                                     │
//! │ ┌─────────┬────────────┬────────────┬────────┬─────┬───────┐ │
//! │ │ CRC (4) │ KeyLen (4) │ ValLen (4) │Mark (1)│ Key │ Value │ │
//! │ └─────────┴────────────┴────────────┴────────┴─────┴───────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian. The CRC covers every byte after itself.
//! Mark is `0x01` for PUT and `0x02` for DELETE (tombstone, empty value).

mod record;
mod file;

pub use record::{decode, record_len, Mark, Record, HEADER_SIZE};
pub use file::{LogFile, LogIterator};

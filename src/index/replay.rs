//! Index replay
//!
//! Rebuilds the Index by reading the log from offset 0 to end of file.

use crate::error::Result;
use crate::log::{LogFile, Mark};

use super::Index;

/// Rebuilds an Index from a log file
pub struct Replay;

/// Result of a replay
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplayResult {
    /// Number of records read (PUTs and tombstones)
    pub records_replayed: u64,

    /// Number of tombstones among them
    pub tombstones: u64,

    /// Keys left in the Index afterwards
    pub live_keys: usize,

    /// Bytes consumed; equals the file length on success
    pub bytes_scanned: u64,
}

impl Replay {
    /// Replay every record of `log` into a fresh Index
    ///
    /// This will:
    /// 1. Point each PUT's key at its offset (later records win)
    /// 2. Remove the key of each DELETE, present or not
    /// 3. Stop cleanly at end of log
    ///
    /// Any corrupt record aborts the replay: a damaged log cannot be trusted
    /// to produce a correct Index.
    pub fn rebuild(log: &LogFile) -> Result<(Index, ReplayResult)> {
        let mut index = Index::new();
        let mut result = ReplayResult::default();

        let mut records = log.iter();
        for entry in records.by_ref() {
            let (offset, record) = entry?;
            result.records_replayed += 1;

            match record.mark {
                Mark::Put => {
                    index.set(record.key, offset);
                }
                Mark::Delete => {
                    result.tombstones += 1;
                    index.remove(&record.key);
                }
            }
        }

        result.bytes_scanned = records.position();
        result.live_keys = index.len();

        tracing::debug!(
            "Replayed {} records ({} tombstones) from {}: {} live keys",
            result.records_replayed,
            result.tombstones,
            log.path().display(),
            result.live_keys
        );

        Ok((index, result))
    }
}

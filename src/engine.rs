//! Engine Module
//!
//! The storage engine that coordinates the log, the Index and merges.
//!
//! ## Responsibilities
//! - Open/create the data directory and active log
//! - Rebuild the Index from the log on startup
//! - Route put/get/delete through the log and Index
//! - Run merges under exclusive access

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::config::{Config, SyncStrategy};
use crate::error::{CaskError, Result};
use crate::index::{Index, Replay};
use crate::log::{LogFile, Record};
use crate::merge::{Compactor, MergeStats};

/// Everything guarded by the engine lock, mutated as one unit
struct State {
    index: Index,
    log: LogFile,
}

/// The main storage engine
///
/// ## Concurrency Model
///
/// One `RwLock` guards the (Index, LogFile, write offset) triple:
///
/// - **Reads** (get/contains_key/keys): shared lock. The Index lookup and the
///   positional file read happen under the same guard, so a merge can never
///   swap the file between them.
/// - **Writes** (put/delete/sync) and **merge**: exclusive lock for their full
///   duration. A long merge blocks writers until it finishes.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Path of the active data file
    log_path: PathBuf,

    /// Rewrites the log during merge
    compactor: Compactor,

    /// Index + active file
    state: RwLock<State>,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const DATA_FILENAME: &'static str = "caskkv.data";
    const MERGE_FILENAME: &'static str = "caskkv.data.merge";

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Create data directory if missing
    /// 2. Remove a merge file left behind by a crash
    /// 3. Open/create the active log
    /// 4. Replay the log into a fresh Index
    pub fn open(config: Config) -> Result<Self> {
        if let SyncStrategy::EveryNWrites { count: 0 } = config.sync_strategy {
            return Err(CaskError::Config(
                "EveryNWrites sync strategy needs a count of at least 1".to_string(),
            ));
        }

        // Step 1: Create data directory if it doesn't exist
        fs::create_dir_all(&config.data_dir)?;

        // Step 2: Compute paths (derived from data_dir, not configurable)
        let log_path = config.data_dir.join(Self::DATA_FILENAME);
        let merge_path = config.data_dir.join(Self::MERGE_FILENAME);

        // Step 3: A merge file only survives a crash mid-merge; the active
        // file is still authoritative in that case
        if merge_path.exists() {
            tracing::warn!(
                "Removing incomplete merge file {}",
                merge_path.display()
            );
            fs::remove_file(&merge_path)?;
        }

        // Step 4: Open the log and rebuild the Index
        let log = LogFile::open(&log_path, config.sync_strategy)?;
        let (index, replay) = Replay::rebuild(&log)?;

        tracing::info!(
            "Opened {}: {} live keys, {} records, {} bytes",
            log_path.display(),
            replay.live_keys,
            replay.records_replayed,
            replay.bytes_scanned
        );

        Ok(Self {
            config,
            log_path,
            compactor: Compactor::new(merge_path),
            state: RwLock::new(State { index, log }),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Get a value by key
    ///
    /// Returns `Ok(None)` when the key was never written or has been deleted.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let state = self.state.read();

        let offset = match state.index.get(key) {
            Some(offset) => offset,
            None => return Ok(None),
        };

        match state.log.read_at(offset)? {
            Some((record, _)) if record.key == key && !record.is_tombstone() => {
                Ok(Some(record.value))
            }
            _ => Err(CaskError::corrupt(
                offset,
                "index entry does not point at a live record for this key",
            )),
        }
    }

    /// True if `key` currently has a value
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.state.read().index.contains(key)
    }

    /// Put a key-value pair
    ///
    /// Steps:
    /// 1. Acquire write lock
    /// 2. Append the record to the log
    /// 3. Point the Index at the new offset (only if the append succeeded)
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut state = self.state.write();

        let offset = state.log.append(&Record::put(key, value))?;
        state.index.set(key.to_vec(), offset);

        Ok(())
    }

    /// Delete a key
    ///
    /// Appends a tombstone so the deletion survives restart, then drops the
    /// key from the Index. Deleting an absent key writes nothing.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        let mut state = self.state.write();

        if !state.index.contains(key) {
            return Ok(());
        }

        state.log.append(&Record::tombstone(key))?;
        state.index.remove(key);

        Ok(())
    }

    /// Compact the log, dropping superseded records and tombstones
    ///
    /// Holds the write lock from the first read to the final file swap.
    pub fn merge(&self) -> Result<MergeStats> {
        let mut state = self.state.write();
        let State { index, log } = &mut *state;

        self.compactor.run(log, index)
    }

    /// Force an fsync of the active log
    pub fn sync(&self) -> Result<()> {
        self.state.write().log.sync()
    }

    /// Close the engine gracefully
    ///
    /// Syncs the log; the file handle is released on drop.
    pub fn close(self) -> Result<()> {
        self.state.into_inner().log.sync()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.state.read().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().index.is_empty()
    }

    /// All live keys, sorted
    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.state.read().index.keys()
    }

    /// Current size of the active log in bytes
    pub fn log_size(&self) -> u64 {
        self.state.read().log.offset()
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the active log path
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

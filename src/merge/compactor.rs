//! Compactor
//!
//! Streams live records from the active log into a new file and swaps it in.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CaskError, Result};
use crate::index::Index;
use crate::log::{LogFile, Mark};

/// Outcome of a merge
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeStats {
    /// Records read from the old file
    pub records_scanned: u64,
    /// Records rewritten into the new file
    pub records_kept: u64,
    /// Size of the active file before the merge
    pub bytes_before: u64,
    /// Size of the active file after the merge
    pub bytes_after: u64,
}

impl MergeStats {
    /// Bytes given back to the filesystem
    pub fn bytes_reclaimed(&self) -> u64 {
        self.bytes_before.saturating_sub(self.bytes_after)
    }
}

/// Rewrites the active log keeping only records the Index still points at
///
/// The caller must hold exclusive access to both the log and the Index for
/// the whole run.
pub struct Compactor {
    /// Temporary file the live records are written into
    merge_path: PathBuf,
}

impl Compactor {
    pub fn new(merge_path: impl Into<PathBuf>) -> Self {
        Self {
            merge_path: merge_path.into(),
        }
    }

    pub fn merge_path(&self) -> &Path {
        &self.merge_path
    }

    /// Compact `log` in place
    ///
    /// Steps:
    /// 1. Scan the old file, appending records whose offset matches the Index
    /// 2. fsync the merge file
    /// 3. Rename it over the active path (replaces the old file)
    /// 4. Adopt the merge file handle as `log`
    /// 5. Apply the buffered retargets to `index`
    /// 6. fsync the data directory
    ///
    /// A failure before step 3 completes leaves `log` and `index` untouched
    /// and removes the merge file. A failure in step 6 is reported after the
    /// swap has taken effect. Empty logs are a no-op.
    pub fn run(&self, log: &mut LogFile, index: &mut Index) -> Result<MergeStats> {
        if log.is_empty() {
            tracing::debug!("Merge skipped: {} is empty", log.path().display());
            return Ok(MergeStats::default());
        }

        match self.compact(log, index) {
            Ok(stats) => Ok(stats),
            Err(e) => {
                tracing::warn!("Merge aborted: {}", e);
                self.discard_merge_file();
                Err(CaskError::Merge(Box::new(e)))
            }
        }
    }

    fn compact(&self, log: &mut LogFile, index: &mut Index) -> Result<MergeStats> {
        let mut stats = MergeStats {
            bytes_before: log.offset(),
            ..MergeStats::default()
        };

        // Phase 1: stream live records into the merge file
        let mut merged = LogFile::create(&self.merge_path, log.sync_strategy())?;
        let mut moves: Vec<(Vec<u8>, u64)> = Vec::with_capacity(index.len());

        for entry in log.iter() {
            let (offset, record) = entry?;
            stats.records_scanned += 1;

            let live = record.mark == Mark::Put && index.get(&record.key) == Some(offset);
            if !live {
                continue;
            }

            let new_offset = merged.append(&record)?;
            moves.push((record.key, new_offset));
            stats.records_kept += 1;
        }

        // Phase 2: make the new file durable
        merged.sync()?;
        stats.bytes_after = merged.offset();

        // Phase 3: swap. rename replaces the old file atomically and keeps
        // the inode, so the merged handle stays valid as the active file
        let active_path = log.path().to_path_buf();
        merged.rename_to(&active_path)?;
        tracing::debug!(
            "Renamed {} over {}",
            self.merge_path.display(),
            active_path.display()
        );

        // Phase 4: adopt the new file; the old handle is closed on drop.
        // Nothing between the rename and here can fail
        *log = merged;

        // Phase 5: offsets are only valid against the new file
        index.retarget(moves);

        // The swap is already in effect; a failure here only means the
        // rename may not survive a power loss
        sync_parent_dir(&active_path)?;

        tracing::info!(
            "Merge complete: kept {}/{} records, {} -> {} bytes",
            stats.records_kept,
            stats.records_scanned,
            stats.bytes_before,
            stats.bytes_after
        );

        Ok(stats)
    }

    fn discard_merge_file(&self) {
        if let Err(e) = fs::remove_file(&self.merge_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    "Failed to remove merge file {}: {}",
                    self.merge_path.display(),
                    e
                );
            }
        }
    }
}

/// Persist the rename by syncing the containing directory
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::File::open(dir)?.sync_all()?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> Result<()> {
    Ok(())
}

//! Append-only log file
//!
//! Sole point of contact with the on-disk data file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::SyncStrategy;
use crate::error::{CaskError, Result};

use super::record::{self, Record, HEADER_SIZE};

/// An open data file plus its write offset
///
/// ## Concurrency:
/// - `read_at` takes `&self` and uses positional reads, so any number of
///   readers can share the file without a cursor
/// - `append`/`sync` take `&mut self`; the engine serializes them
pub struct LogFile {
    /// Path of the file on disk
    path: PathBuf,
    /// Handle opened for read + append
    file: File,
    /// Next free byte (== current file length)
    offset: u64,
    /// When to fsync after appends
    sync_strategy: SyncStrategy,
    /// Appends since the last fsync
    unsynced: usize,
    /// Set when a failed append could not be rolled back
    failed: bool,
}

impl LogFile {
    /// Open or create the file at `path`
    ///
    /// The write offset starts at the current file length.
    pub fn open(path: &Path, sync_strategy: SyncStrategy) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;

        let offset = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            offset,
            sync_strategy,
            unsynced: 0,
            failed: false,
        })
    }

    /// Create an empty file at `path`, discarding anything already there
    pub fn create(path: &Path, sync_strategy: SyncStrategy) -> Result<Self> {
        File::create(path)?;
        Self::open(path, sync_strategy)
    }

    /// Read the record starting at `offset`
    ///
    /// Returns:
    /// - `Ok(Some((record, size)))` — the record and its encoded size
    /// - `Ok(None)` — `offset` is at (or past) end of file
    /// - `Err(CorruptRecord)` — malformed or truncated data
    pub fn read_at(&self, offset: u64) -> Result<Option<(Record, u64)>> {
        if offset >= self.offset {
            return Ok(None);
        }

        let available = self.offset - offset;
        if available < HEADER_SIZE as u64 {
            return Err(CaskError::corrupt(
                offset,
                format!("truncated header: {} of {} bytes", available, HEADER_SIZE),
            ));
        }

        let mut header = [0u8; HEADER_SIZE];
        read_exact_at(&self.file, &mut header, offset)?;

        let len = record::record_len(&header);
        if len > available {
            return Err(CaskError::corrupt(
                offset,
                format!("record length {} exceeds remaining {} bytes", len, available),
            ));
        }

        let len = usize::try_from(len).map_err(|_| {
            CaskError::corrupt(offset, format!("record length {} does not fit in memory", len))
        })?;
        let mut buf = vec![0u8; len];
        read_exact_at(&self.file, &mut buf, offset)?;

        record::decode(&buf).map_err(|e| e.relocate(offset))
    }

    /// Append a record at the end of the file
    ///
    /// Returns the offset the record was written at. On failure the file is
    /// truncated back so no partial record is left behind and the offset is
    /// unchanged. If that truncation fails too, every later append is refused
    /// with `LogFailed`.
    pub fn append(&mut self, record: &Record) -> Result<u64> {
        if self.failed {
            return Err(CaskError::LogFailed(format!(
                "{} holds bytes past offset {} that could not be truncated",
                self.path.display(),
                self.offset
            )));
        }

        let buf = record.encode()?;
        let at = self.offset;

        let written = self
            .file
            .write_all(&buf)
            .map_err(CaskError::from)
            .and_then(|()| {
                self.unsynced += 1;
                self.sync_if_due()
            });

        if let Err(e) = written {
            self.rollback(at);
            return Err(e);
        }

        self.offset = at + buf.len() as u64;
        Ok(at)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Rename the file on disk to `path` and keep using the same handle
    ///
    /// Replaces any file already at `path`.
    pub fn rename_to(&mut self, path: &Path) -> Result<()> {
        fs::rename(&self.path, path)?;
        self.path = path.to_path_buf();
        Ok(())
    }

    /// Iterate over every record from offset 0
    pub fn iter(&self) -> LogIterator<'_> {
        LogIterator {
            log: self,
            position: 0,
            done: false,
        }
    }

    /// Next free byte position
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// True when nothing has been written
    pub fn is_empty(&self) -> bool {
        self.offset == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sync_strategy(&self) -> SyncStrategy {
        self.sync_strategy
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn sync_if_due(&mut self) -> Result<()> {
        match self.sync_strategy {
            SyncStrategy::EveryWrite => self.sync(),
            SyncStrategy::EveryNWrites { count } if self.unsynced >= count => self.sync(),
            SyncStrategy::EveryNWrites { .. } => Ok(()),
        }
    }

    /// Drop any bytes past `at` left by a failed append
    ///
    /// With `O_APPEND` the next write would land after leftover bytes, so a
    /// failed truncation marks the file as failed.
    fn rollback(&mut self, at: u64) {
        if let Err(e) = self.file.set_len(at) {
            tracing::error!(
                "Failed to truncate {} back to {} after a failed append: {}",
                self.path.display(),
                at,
                e
            );
            self.failed = true;
        }
        self.unsynced = self.unsynced.saturating_sub(1);
    }
}

/// Sequential scan over a log file
///
/// Yields `(offset, record)` pairs. Stops at end of log; a decode error is
/// yielded once and ends the iteration.
pub struct LogIterator<'a> {
    log: &'a LogFile,
    position: u64,
    done: bool,
}

impl<'a> LogIterator<'a> {
    /// Offset of the next record to be read
    pub fn position(&self) -> u64 {
        self.position
    }
}

impl<'a> Iterator for LogIterator<'a> {
    type Item = Result<(u64, Record)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.log.read_at(self.position) {
            Ok(Some((record, size))) => {
                let at = self.position;
                self.position += size;
                Some(Ok((at, record)))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => return Err(io::Error::from(io::ErrorKind::UnexpectedEof)),
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

//! # CaskKV
//!
//! A single-file, log-structured key-value store in the Bitcask style:
//! - Every write is appended to one data file
//! - An in-memory Index maps each live key to its latest record's offset
//! - The Index is rebuilt by replaying the log on startup
//! - Merge rewrites only live records to reclaim space
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Engine                             │
//! │        RwLock<(Index, LogFile)>  get: shared, rest: excl.   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┼─────────────────────┐
//!          │            │                     │
//!          ▼            ▼                     ▼
//!   ┌─────────────┐ ┌─────────────┐   ┌──────────────┐
//!   │    Index    │ │   LogFile   │◀──│  Compactor   │
//!   │ key→offset  │ │  (append)   │   │   (merge)    │
//!   └──────▲──────┘ └──────┬──────┘   └──────────────┘
//!          │    replay     │
//!          └───────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use caskkv::Engine;
//!
//! let engine = Engine::open_path(std::path::Path::new("./data"))?;
//! engine.put(b"hello", b"world")?;
//! assert_eq!(engine.get(b"hello")?, Some(b"world".to_vec()));
//! engine.delete(b"hello")?;
//! engine.merge()?;
//! # Ok::<(), caskkv::CaskError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod log;
pub mod index;
pub mod merge;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CaskError, Result};
pub use config::{Config, SyncStrategy};
pub use engine::Engine;
pub use merge::MergeStats;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of CaskKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

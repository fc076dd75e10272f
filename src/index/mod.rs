//! Index Module
//!
//! In-memory map from each live key to the offset of its latest record.
//!
//! ## Responsibilities
//! - O(1) amortized key → offset lookups
//! - Rebuild from the log at startup (replay)
//! - Bulk retargeting after a merge rewrites the log
//!
//! ## Invariant
//! After replay or a completed write, `index[key]` is either absent (never
//! written, or deleted) or the offset of the one authoritative record for
//! `key` in the active file. Tombstones are never indexed.

mod table;
mod replay;

pub use table::Index;
pub use replay::{Replay, ReplayResult};

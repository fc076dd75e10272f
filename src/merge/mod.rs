//! Merge Module
//!
//! Compaction of the active log.
//!
//! ## Responsibilities
//! - Drop superseded PUTs and all tombstones
//! - Rewrite live records into a temporary file
//! - Swap the temporary file in as the active log
//! - Retarget the Index only after the swap succeeded
//!
//! ## Merge Flow
//! ```text
//!   active log ──scan──▶ index[key] == offset ? ──yes──▶ merge file (append)
//!                                      │
//!                                      no ──▶ dropped
//!
//!   merge file ──fsync──▶ rename over active path ──▶ reopen ──▶ retarget Index
//! ```

mod compactor;

pub use compactor::{Compactor, MergeStats};

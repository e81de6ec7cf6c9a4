//! Error kinds surfaced by the crate.
//!
//! The teacher workspace's other crates thread `anyhow::Result` through
//! everything, which is fine when callers only ever print the error. Here
//! callers need to distinguish "this filter is read-only" from "these two
//! filters don't have the same shape" from "that path doesn't exist", so
//! each failure mode in the on-disk/in-memory contract gets its own variant
//! instead of an opaque `anyhow::Error`.

use std::io;

/// All ways a [`crate::Mba`] or [`crate::BloomFilter`] operation can fail.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad constructor input: capacity `< 1`, error rate outside `(0, 1)`,
    /// wrong seed count, duplicate seeds, or an out-of-range seed.
    #[error("argument error: {0}")]
    Argument(String),

    /// The backing file did not exist on open.
    #[error("file not found: {0}")]
    NotFound(String),

    /// Bad magic, unknown version, or a header/payload length mismatch.
    #[error("corrupt filter: {0}")]
    Corrupt(String),

    /// A set operation between filters of differing `m`, `k`, or seeds.
    #[error("shape mismatch: {0}")]
    Shape(String),

    /// A mutating call against a read-only filter, or a chmod failure
    /// while materializing a filter from a base64 snapshot.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Any operation against a handle that has already been closed.
    #[error("handle is closed")]
    Closed,

    /// Underlying mmap/read/write/flush failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn not_found(path: &std::path::Path) -> Self {
        Error::NotFound(path.display().to_string())
    }
}

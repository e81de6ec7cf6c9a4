///! # mmap-bloom
///!
///! A persistent, memory-mapped Bloom filter: a probabilistic set
///! supporting insertion and approximate membership testing with a bounded
///! false-positive rate and zero false negatives, whose backing storage is
///! a single file mapped directly into the process address space. The
///! file is both the in-memory and the on-disk representation; there is no
///! separate serialize/deserialize step.
///!
///! ## Layers
///!
///! - [`Mba`] (private) — the memory-mapped bit array and its header.
///! - [`BloomFilter`] — the engine: hashing, insertion, query, set algebra,
///!   base64 snapshotting.
///! - [`params`] / [`hash`] — parameter derivation (`m`, `k`), deterministic
///!   seed selection, and the double-hashing scheme that turns one Murmur3
///!   call into `k` bit indices.
///!
///! ## Usage in RiptideKV-style storage engines
///!
///! Each SSTable can embed one of these instead of the teacher's in-memory
///! `BloomFilter`, so the filter itself is the file on disk — no separate
///! encode/decode pass, and the filter can be `mmap`ed read-only by every
///! reader of an immutable SSTable.
///!
///! ## Example
///!
///! ```rust,no_run
///! use mmap_bloom::BloomFilter;
///!
///! let mut bf = BloomFilter::new(1000, 0.01, Some("t.bloom".as_ref()), None).unwrap();
///! bf.add(b"hello").unwrap();
///! assert!(bf.contains(b"hello").unwrap());
///! ```
///!
///! ## Concurrency
///!
///! Single-threaded by contract: no internal locking, no background work.
///! Multiple processes may map the same file, but at most one writer across
///! all of them is required by the caller (see spec.md §5).

mod canon;
mod error;
mod filter;
mod hash;
mod mba;
mod params;

pub use canon::Canonicalize;
pub use error::Error;
pub use filter::{BloomFilter, OpenMode};
pub use params::MAX_HASHES;

/// Alias for the crate's fallible return type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests;

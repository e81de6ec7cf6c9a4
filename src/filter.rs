//! BF — the Bloom filter engine layered on top of the [`Mba`].
//!
//! Grounded in the teacher's `crates/bloom::BloomFilter` (construction from
//! `(n, p)`, `insert`/`may_contain`, the `from_raw` deserialization seam)
//! generalized to: a persistent, memory-mapped backing store instead of a
//! `Vec<u8>`; `k` Murmur3-keyed double-hash seeds instead of two fixed FNV
//! lanes; set algebra and base64 snapshotting, which the teacher's filter
//! (embedded once per SSTable, never combined with another) never needed.

use crate::error::Error;
use crate::hash;
use crate::mba::{self, BitOp, Mba};
use crate::params;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::path::Path;

/// Requested access mode for [`BloomFilter::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
}

/// A persistent, memory-mapped Bloom filter.
///
/// Holds an [`Mba`] plus the parameters derived from (or supplied at)
/// construction. A closed handle (after [`BloomFilter::close`]) rejects
/// every operation with [`Error::Closed`]; a read-only open handle serves
/// queries and [`BloomFilter::to_base64`] but rejects every mutation with
/// [`Error::Permission`].
pub struct BloomFilter {
    inner: Option<Mba>,
}

impl BloomFilter {
    /// Constructs a filter sized for `capacity` elements at `error_rate`,
    /// backed by `path` (or an anonymous mapping if `path` is `None`).
    ///
    /// If `hash_seeds` is `None`, seeds are derived deterministically from
    /// `k` (see [`params::default_seeds`]); otherwise the supplied seeds
    /// are validated against the derived `k` and used as-is.
    pub fn new(
        capacity: u64,
        error_rate: f64,
        path: Option<&Path>,
        hash_seeds: Option<Vec<u32>>,
    ) -> Result<Self, Error> {
        let (m, k) = params::derive(capacity, error_rate)?;

        let seeds = match hash_seeds {
            Some(seeds) => {
                params::validate_explicit_seeds(&seeds, k)?;
                seeds
            }
            None => params::default_seeds(k),
        };

        let mba = Mba::create(path, m, capacity, error_rate, k, &seeds)?;
        Ok(Self { inner: Some(mba) })
    }

    /// Opens an existing filter file in the given mode.
    pub fn open(path: &Path, mode: OpenMode) -> Result<Self, Error> {
        let read_only = mode == OpenMode::ReadOnly;
        let mba = Mba::open(path, read_only)?;
        Ok(Self { inner: Some(mba) })
    }

    fn mba(&self) -> Result<&Mba, Error> {
        self.inner.as_ref().ok_or(Error::Closed)
    }

    fn mba_mut(&mut self) -> Result<&mut Mba, Error> {
        self.inner.as_mut().ok_or(Error::Closed)
    }

    fn require_writable(&mut self) -> Result<&mut Mba, Error> {
        let mba = self.mba_mut()?;
        if mba.read_only() {
            return Err(Error::Permission("filter is read-only".into()));
        }
        Ok(mba)
    }

    /// Adds `bytes` to the filter. Returns `true` if every bit it set was
    /// already `1` (i.e. the element was *possibly* already present).
    pub fn add(&mut self, bytes: &[u8]) -> Result<bool, Error> {
        let mba = self.require_writable()?;
        let idxs = hash::indices(mba.seeds(), mba.total_bits(), bytes);

        let mut already_present = true;
        for idx in idxs {
            if !mba.get(idx) {
                already_present = false;
            }
            mba.set(idx, true)?;
        }

        mba.increment_element_count()?;
        Ok(already_present)
    }

    /// Returns `true` iff every bit for `bytes` is set. Never a false
    /// negative for an element that was previously [`add`](Self::add)ed.
    pub fn contains(&self, bytes: &[u8]) -> Result<bool, Error> {
        let mba = self.mba()?;
        let idxs = hash::indices(mba.seeds(), mba.total_bits(), bytes);
        Ok(idxs.into_iter().all(|idx| mba.get(idx)))
    }

    /// Adds every element of `items` to the filter.
    ///
    /// If an `add` fails mid-stream (read-only filter, closed handle),
    /// elements already added before the failure remain set.
    pub fn update<I, B>(&mut self, items: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        for item in items {
            self.add(item.as_ref())?;
        }
        Ok(())
    }

    /// Zeroes the bit payload and resets `element_count` to `0`.
    pub fn clear_all(&mut self) -> Result<(), Error> {
        let mba = self.require_writable()?;
        mba.clear_all()?;
        mba.set_element_count(0)?;
        Ok(())
    }

    fn check_same_shape(&self, other: &Self) -> Result<(), Error> {
        let a = self.mba()?;
        let b = other.mba()?;

        if a.total_bits() != b.total_bits() || a.num_hashes() != b.num_hashes() {
            return Err(Error::Shape(
                "filters have different bit count or hash count".into(),
            ));
        }
        if a.seeds() != b.seeds() {
            return Err(Error::Shape("filters have different hash seeds".into()));
        }

        Ok(())
    }

    /// In-place union with `other`. Requires identical `m`, `k`, and
    /// `hash_seeds`. Resets `element_count` to `0` (see spec.md §9: the
    /// counter is exact only under `add`, and reconciling two counters is
    /// lossy).
    pub fn union(&mut self, other: &Self) -> Result<(), Error> {
        self.check_same_shape(other)?;

        let other_mba = other.mba()?;
        let self_mba = self.require_writable()?;
        // Safety: `check_same_shape` already confirmed both handles are open.
        self_mba.bitwise_op(other_mba, BitOp::Or)?;
        self_mba.set_element_count(0)?;
        Ok(())
    }

    /// In-place intersection with `other`. Same shape requirement and
    /// `element_count` reset as [`union`](Self::union).
    pub fn intersection(&mut self, other: &Self) -> Result<(), Error> {
        self.check_same_shape(other)?;

        let other_mba = other.mba()?;
        let self_mba = self.require_writable()?;
        self_mba.bitwise_op(other_mba, BitOp::And)?;
        self_mba.set_element_count(0)?;
        Ok(())
    }

    /// Creates a new filter at `path` (or anonymous, if `None`) with an
    /// identical header and bit payload — every observable property and
    /// every set element are preserved.
    pub fn copy(&self, path: Option<&Path>) -> Result<Self, Error> {
        let mba = self.mba()?;
        let mut copy = Mba::create(
            path,
            mba.total_bits(),
            mba.capacity(),
            mba.error_rate(),
            mba.num_hashes(),
            mba.seeds(),
        )?;
        copy.bitwise_op(mba, BitOp::Or)?;
        copy.set_element_count(mba.element_count())?;
        Ok(Self { inner: Some(copy) })
    }

    /// Like [`copy`](Self::copy), but the bit payload is left zeroed and
    /// `element_count` starts at `0` — a compatible empty filter suitable
    /// for later set operations against the original.
    pub fn copy_template(&self, path: Option<&Path>) -> Result<Self, Error> {
        let mba = self.mba()?;
        let template = Mba::create(
            path,
            mba.total_bits(),
            mba.capacity(),
            mba.error_rate(),
            mba.num_hashes(),
            mba.seeds(),
        )?;
        Ok(Self {
            inner: Some(template),
        })
    }

    /// Returns the base64 encoding of the complete file image (header and
    /// payload). Does not mutate the filter.
    pub fn to_base64(&self) -> Result<String, Error> {
        let mba = self.mba()?;
        Ok(BASE64.encode(mba.raw_bytes()))
    }

    /// Decodes `text`, writes it to `path` with mode `perm`, maps it
    /// read-write, and validates it as a well-formed filter.
    ///
    /// `perm` is applied via an explicit `chmod` so it takes effect
    /// regardless of the process umask.
    pub fn from_base64(path: &Path, text: &str, perm: u32) -> Result<Self, Error> {
        let image = BASE64
            .decode(text)
            .map_err(|e| Error::Corrupt(format!("invalid base64: {e}")))?;
        let mba = mba::from_image(path, &image, perm)?;
        Ok(Self { inner: Some(mba) })
    }

    /// Flushes (if writable) and releases the handle. Further operations
    /// return [`Error::Closed`].
    pub fn close(&mut self) -> Result<(), Error> {
        let mba = self.inner.take().ok_or(Error::Closed)?;
        mba.close()
    }

    /// Requests the OS flush dirty pages to disk. Rejected with
    /// [`Error::Permission`] on a read-only filter (spec.md §8 lists
    /// `sync` alongside `add`/`update`/`clear_all`/`union`/`intersection`
    /// as a mutating call).
    pub fn sync(&mut self) -> Result<(), Error> {
        self.require_writable()?.sync()
    }

    /// Requested element capacity `n`.
    pub fn capacity(&self) -> Result<u64, Error> {
        Ok(self.mba()?.capacity())
    }

    /// Target false-positive rate `p`.
    pub fn error_rate(&self) -> Result<f64, Error> {
        Ok(self.mba()?.error_rate())
    }

    /// Number of hash functions `k`.
    pub fn num_hashes(&self) -> Result<u32, Error> {
        Ok(self.mba()?.num_hashes())
    }

    /// Total bit count `m`.
    pub fn num_bits(&self) -> Result<u64, Error> {
        Ok(self.mba()?.total_bits())
    }

    /// The ordered hash seeds.
    pub fn hash_seeds(&self) -> Result<&[u32], Error> {
        Ok(self.mba()?.seeds())
    }

    /// Number of successful `add` calls (approximate; never decremented,
    /// reset to `0` by `clear_all`/`union`/`intersection`).
    pub fn element_count(&self) -> Result<u64, Error> {
        Ok(self.mba()?.element_count())
    }

    /// `true` if this handle's backing mapping forbids writes.
    pub fn read_only(&self) -> Result<bool, Error> {
        Ok(self.mba()?.read_only())
    }

    /// The backing file path. Errors for an in-memory (anonymous) filter,
    /// which has no name to report.
    pub fn name(&self) -> Result<&Path, Error> {
        self.mba()?
            .path()
            .ok_or_else(|| Error::Argument("in-memory filter has no name".into()))
    }
}

impl Drop for BloomFilter {
    fn drop(&mut self) {
        if let Some(mba) = self.inner.take() {
            if let Err(e) = mba.close() {
                log::warn!("error closing bloom filter on drop: {e}");
            }
        }
    }
}

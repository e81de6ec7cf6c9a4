//! MBA — the memory-mapped bit array backing a [`crate::BloomFilter`].
//!
//! File layout (native-endian, packed), per spec.md §4.1:
//!
//! ```text
//! offset  size    field
//! 0       4       magic "BLOM"
//! 4       4       version (1)
//! 8       8       total_bits (m)
//! 16      8       capacity (n)
//! 24      8       element_count
//! 32      8       error_rate, as f64::to_bits()
//! 40      4       num_hashes (k)
//! 44      4       reserved (zero)
//! 48      4*k     seeds, k * u32
//! pad     -       zero padding up to an 8-byte boundary
//! P       ceil(m/8), padded to a multiple of 8    bit payload
//! ```
//!
//! The header is the source of truth on open: every derived field (byte
//! lengths, offsets) is recomputed from it rather than cached from the
//! constructor that created the file. The whole file — header and payload
//! alike — lives in a single mapping, the way `artemonad-QuiverDB`'s
//! `bloom/sidecar` module maps its own magic-tagged bitmap file.

use crate::error::Error;
use byteorder::{ByteOrder, NativeEndian};
use memmap2::{Mmap, MmapMut, MmapOptions};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

const MAGIC: &[u8; 4] = b"BLOM";
const VERSION: u32 = 1;

const OFF_MAGIC: usize = 0;
const OFF_VERSION: usize = 4;
const OFF_TOTAL_BITS: usize = 8;
const OFF_CAPACITY: usize = 16;
const OFF_ELEMENT_COUNT: usize = 24;
const OFF_ERROR_RATE: usize = 32;
const OFF_NUM_HASHES: usize = 40;
const OFF_RESERVED: usize = 44;
const OFF_SEEDS: usize = 48;

const MIN_HEADER_LEN: u64 = OFF_SEEDS as u64;

/// Bitwise set operation applied word-at-a-time by [`Mba::bitwise_op`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BitOp {
    Or,
    And,
    Xor,
}

enum Mapping {
    Rw(MmapMut),
    Ro(Mmap),
}

impl Mapping {
    fn as_slice(&self) -> &[u8] {
        match self {
            Mapping::Rw(m) => &m[..],
            Mapping::Ro(m) => &m[..],
        }
    }

    fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        match self {
            Mapping::Rw(m) => Some(&mut m[..]),
            Mapping::Ro(_) => None,
        }
    }
}

/// The memory-mapped bit array: a fixed-length bit vector plus the header
/// describing its shape, stored as a single file mapped into memory (or an
/// anonymous mapping when no path is given).
pub(crate) struct Mba {
    mapping: Mapping,
    // Kept alive for the lifetime of the mapping; never read directly.
    #[allow(dead_code)]
    file: Option<File>,
    path: Option<PathBuf>,
    read_only: bool,
    total_bits: u64,
    capacity: u64,
    error_rate: f64,
    num_hashes: u32,
    seeds: Vec<u32>,
    header_len: usize,
}

fn round_up(x: usize, word: usize) -> usize {
    (x + word - 1) / word * word
}

fn header_len_for(k: u32) -> usize {
    round_up(OFF_SEEDS + 4 * k as usize, 8)
}

fn payload_len_for(total_bits: u64) -> usize {
    let raw_bytes = ((total_bits + 7) / 8) as usize;
    round_up(raw_bytes, 8)
}

impl Mba {
    /// Creates a new bit array of exactly `total_bits` bits, with the
    /// given header metadata, either backed by `path` or anonymous when
    /// `path` is `None`.
    pub(crate) fn create(
        path: Option<&Path>,
        total_bits: u64,
        capacity: u64,
        error_rate: f64,
        num_hashes: u32,
        seeds: &[u32],
    ) -> Result<Self, Error> {
        let header_len = header_len_for(num_hashes);
        let payload_len = payload_len_for(total_bits);
        let file_len = header_len + payload_len;

        let (mapping, file) = match path {
            Some(p) => {
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(p)?;
                file.set_len(file_len as u64)?;

                let mut mmap = unsafe { MmapOptions::new().map_mut(&file)? };
                write_header(&mut mmap[..], total_bits, capacity, error_rate, num_hashes, seeds);
                mmap.flush()?;

                (Mapping::Rw(mmap), Some(file))
            }
            None => {
                let mut mmap = MmapOptions::new().len(file_len).map_anon()?;
                write_header(&mut mmap[..], total_bits, capacity, error_rate, num_hashes, seeds);
                (Mapping::Rw(mmap), None)
            }
        };

        log::info!(
            "created bit array: total_bits={} capacity={} num_hashes={} path={:?}",
            total_bits,
            capacity,
            num_hashes,
            path
        );

        Ok(Self {
            mapping,
            file,
            path: path.map(Path::to_path_buf),
            read_only: false,
            total_bits,
            capacity,
            error_rate,
            num_hashes,
            seeds: seeds.to_vec(),
            header_len,
        })
    }

    /// Opens an existing file, validating its header and mapping the
    /// payload with the requested protection.
    pub(crate) fn open(path: &Path, read_only: bool) -> Result<Self, Error> {
        let file = match OpenOptions::new()
            .read(true)
            .write(!read_only)
            .open(path)
        {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(Error::not_found(path)),
            Err(e) => return Err(Error::Io(e)),
        };

        let meta_len = file.metadata()?.len();
        if meta_len < MIN_HEADER_LEN {
            return Err(Error::Corrupt("file too small for header".into()));
        }

        let mapping = if read_only {
            Mapping::Ro(unsafe { MmapOptions::new().map(&file)? })
        } else {
            Mapping::Rw(unsafe { MmapOptions::new().map_mut(&file)? })
        };

        let bytes = mapping.as_slice();

        if &bytes[OFF_MAGIC..OFF_MAGIC + 4] != MAGIC {
            return Err(Error::Corrupt("bad magic".into()));
        }

        let version = NativeEndian::read_u32(&bytes[OFF_VERSION..OFF_VERSION + 4]);
        if version != VERSION {
            return Err(Error::Corrupt(format!("unsupported version {version}")));
        }

        let total_bits = NativeEndian::read_u64(&bytes[OFF_TOTAL_BITS..OFF_TOTAL_BITS + 8]);
        let capacity = NativeEndian::read_u64(&bytes[OFF_CAPACITY..OFF_CAPACITY + 8]);
        let error_rate = f64::from_bits(NativeEndian::read_u64(
            &bytes[OFF_ERROR_RATE..OFF_ERROR_RATE + 8],
        ));
        let num_hashes = NativeEndian::read_u32(&bytes[OFF_NUM_HASHES..OFF_NUM_HASHES + 4]);

        let header_len = header_len_for(num_hashes);
        let payload_len = payload_len_for(total_bits);
        let expected_len = header_len + payload_len;

        if meta_len as usize != expected_len {
            return Err(Error::Corrupt(format!(
                "expected file length {expected_len}, got {meta_len}"
            )));
        }

        let mut seeds = Vec::with_capacity(num_hashes as usize);
        for i in 0..num_hashes as usize {
            let off = OFF_SEEDS + i * 4;
            seeds.push(NativeEndian::read_u32(&bytes[off..off + 4]));
        }

        log::info!(
            "opened bit array: total_bits={} capacity={} path={} mode={}",
            total_bits,
            capacity,
            path.display(),
            if read_only { "ro" } else { "rw" }
        );

        Ok(Self {
            mapping,
            file: Some(file),
            path: Some(path.to_path_buf()),
            read_only,
            total_bits,
            capacity,
            error_rate,
            num_hashes,
            seeds,
            header_len,
        })
    }

    fn mapping_mut(&mut self) -> Result<&mut [u8], Error> {
        self.mapping
            .as_mut_slice()
            .ok_or_else(|| Error::Permission("mutation of a read-only bit array".into()))
    }

    pub(crate) fn total_bits(&self) -> u64 {
        self.total_bits
    }

    pub(crate) fn capacity(&self) -> u64 {
        self.capacity
    }

    pub(crate) fn error_rate(&self) -> f64 {
        self.error_rate
    }

    pub(crate) fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    pub(crate) fn seeds(&self) -> &[u32] {
        &self.seeds
    }

    pub(crate) fn read_only(&self) -> bool {
        self.read_only
    }

    pub(crate) fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(crate) fn element_count(&self) -> u64 {
        NativeEndian::read_u64(&self.mapping.as_slice()[OFF_ELEMENT_COUNT..OFF_ELEMENT_COUNT + 8])
    }

    pub(crate) fn set_element_count(&mut self, value: u64) -> Result<(), Error> {
        let buf = self.mapping_mut()?;
        NativeEndian::write_u64(&mut buf[OFF_ELEMENT_COUNT..OFF_ELEMENT_COUNT + 8], value);
        Ok(())
    }

    pub(crate) fn increment_element_count(&mut self) -> Result<(), Error> {
        let next = self.element_count().wrapping_add(1);
        self.set_element_count(next)
    }

    /// Returns `true` if bit `i` is set. `i` must be `< total_bits`.
    pub(crate) fn get(&self, i: u64) -> bool {
        debug_assert!(i < self.total_bits);
        let byte = self.header_len + (i / 8) as usize;
        let bit = (i % 8) as u8;
        (self.mapping.as_slice()[byte] >> bit) & 1 == 1
    }

    /// Sets bit `i` to `v`. `i` must be `< total_bits`.
    pub(crate) fn set(&mut self, i: u64, v: bool) -> Result<(), Error> {
        debug_assert!(i < self.total_bits);
        let byte = self.header_len + (i / 8) as usize;
        let bit = (i % 8) as u8;
        let buf = self.mapping_mut()?;
        if v {
            buf[byte] |= 1 << bit;
        } else {
            buf[byte] &= !(1 << bit);
        }
        Ok(())
    }

    /// Zeroes the bit payload only; the header (including `element_count`)
    /// is left untouched.
    pub(crate) fn clear_all(&mut self) -> Result<(), Error> {
        let header_len = self.header_len;
        let buf = self.mapping_mut()?;
        for b in &mut buf[header_len..] {
            *b = 0;
        }
        Ok(())
    }

    /// Applies `op` between `self` and `other`, word-at-a-time, writing the
    /// result into `self`. Both bit arrays must have the same `total_bits`.
    pub(crate) fn bitwise_op(&mut self, other: &Mba, op: BitOp) -> Result<(), Error> {
        if self.total_bits != other.total_bits {
            return Err(Error::Shape(format!(
                "bit array size mismatch: {} vs {}",
                self.total_bits, other.total_bits
            )));
        }

        let header_len = self.header_len;
        let other_payload = &other.mapping.as_slice()[other.header_len..];
        let self_payload = &mut self.mapping_mut()?[header_len..];

        for (sw, ow) in self_payload
            .chunks_exact_mut(8)
            .zip(other_payload.chunks_exact(8))
        {
            let s = NativeEndian::read_u64(sw);
            let o = NativeEndian::read_u64(ow);
            let result = match op {
                BitOp::Or => s | o,
                BitOp::And => s & o,
                BitOp::Xor => s ^ o,
            };
            NativeEndian::write_u64(sw, result);
        }

        Ok(())
    }

    /// Requests the OS flush dirty pages of the mapping to disk. A no-op
    /// on read-only or anonymous mappings.
    pub(crate) fn sync(&self) -> Result<(), Error> {
        if let Mapping::Rw(m) = &self.mapping {
            m.flush()?;
        }
        log::debug!("synced bit array path={:?}", self.path);
        Ok(())
    }

    /// Flushes (if writable) and releases the mapping and file handle.
    pub(crate) fn close(self) -> Result<(), Error> {
        if !self.read_only {
            self.sync()?;
        }
        log::debug!("closed bit array path={:?}", self.path);
        Ok(())
    }

    /// The full file image (header + payload), as written to disk.
    pub(crate) fn raw_bytes(&self) -> &[u8] {
        self.mapping.as_slice()
    }
}

fn write_header(
    buf: &mut [u8],
    total_bits: u64,
    capacity: u64,
    error_rate: f64,
    num_hashes: u32,
    seeds: &[u32],
) {
    buf[OFF_MAGIC..OFF_MAGIC + 4].copy_from_slice(MAGIC);
    NativeEndian::write_u32(&mut buf[OFF_VERSION..OFF_VERSION + 4], VERSION);
    NativeEndian::write_u64(&mut buf[OFF_TOTAL_BITS..OFF_TOTAL_BITS + 8], total_bits);
    NativeEndian::write_u64(&mut buf[OFF_CAPACITY..OFF_CAPACITY + 8], capacity);
    NativeEndian::write_u64(&mut buf[OFF_ELEMENT_COUNT..OFF_ELEMENT_COUNT + 8], 0);
    NativeEndian::write_u64(
        &mut buf[OFF_ERROR_RATE..OFF_ERROR_RATE + 8],
        error_rate.to_bits(),
    );
    NativeEndian::write_u32(&mut buf[OFF_NUM_HASHES..OFF_NUM_HASHES + 4], num_hashes);
    NativeEndian::write_u32(&mut buf[OFF_RESERVED..OFF_RESERVED + 4], 0);

    for (i, seed) in seeds.iter().enumerate() {
        let off = OFF_SEEDS + i * 4;
        NativeEndian::write_u32(&mut buf[off..off + 4], *seed);
    }
}

/// Writes a raw base64-decoded file image to `path`, chmods it to `perm`,
/// then opens it read-write, validating it as a well-formed [`Mba`].
///
/// `perm` is applied via an explicit `chmod` after creation so that it
/// takes effect regardless of the process umask, per spec.md §4.5.
pub(crate) fn from_image(path: &Path, image: &[u8], perm: u32) -> Result<Mba, Error> {
    if (image.len() as u64) < MIN_HEADER_LEN {
        return Err(Error::Corrupt("decoded image too small for header".into()));
    }

    std::fs::write(path, image)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(perm))
            .map_err(|e| Error::Permission(format!("chmod {path:?}: {e}")))?;
    }
    #[cfg(not(unix))]
    {
        let _ = perm;
    }

    Mba::open(path, false)
}

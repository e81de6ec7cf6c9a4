//! Double hashing on top of Murmur3-128.
//!
//! The teacher's `BloomFilter::get_hash`/`hash_pair` derives two 64-bit
//! lanes from a single hash call and double-hashes across them. This module
//! keeps that shape but swaps FNV-1a for Murmur3 (per spec.md §1/§4.4,
//! which specifies `h128(seed, bytes) -> (u64, u64)` via Murmur3-128 keyed
//! by seed) and generalizes from two fixed lanes to `k` caller-supplied
//! seeds.

use std::io::Cursor;

/// Murmur3 x64-128 keyed by `seed`, split into its high and low 64-bit
/// lanes. A `Cursor` over an in-memory slice never fails to read, so the
/// only error path in `murmur3::murmur3_x64_128` is unreachable here.
pub fn h128(seed: u32, bytes: &[u8]) -> (u64, u64) {
    let mut cursor = Cursor::new(bytes);
    let hash = murmur3::murmur3_x64_128(&mut cursor, seed)
        .expect("murmur3 over an in-memory cursor cannot fail");
    let hi = (hash >> 64) as u64;
    let lo = hash as u64;
    (hi, lo)
}

/// Computes the `k` bit indices for `bytes` via double hashing, per
/// spec.md §4.4: `(a, b) = h128(seeds[0], bytes)`, then for each `i` in
/// `[0, k)`, `hi = (a + i * b + seeds[i]) mod m`.
///
/// `seeds` must be non-empty; `m` must be non-zero. Both are upheld by
/// [`crate::BloomFilter`]'s invariants before this is ever called.
pub fn indices(seeds: &[u32], m: u64, bytes: &[u8]) -> Vec<u64> {
    debug_assert!(!seeds.is_empty());
    debug_assert!(m > 0);

    let (a, b) = h128(seeds[0], bytes);
    let m128 = m as u128;

    seeds
        .iter()
        .enumerate()
        .map(|(i, seed)| {
            let term = a as u128 + (i as u128) * (b as u128) + *seed as u128;
            (term % m128) as u64
        })
        .collect()
}

//! Parameter derivation and default seed selection.
//!
//! Grounded in `crates/bloom::BloomFilter::calculate_m`/`with_fp_rate` from
//! the teacher, generalized from `f32` to `f64` (the on-disk header stores
//! `error_rate` as a binary64, per the file layout) and extended with the
//! deterministic prime-walk seed selection spec.md §4.3 calls for, which the
//! teacher's in-memory filter doesn't need (it only ever uses two FNV
//! seeds baked into the source).

use crate::error::Error;
use std::collections::HashSet;

/// Hard safety cap on the number of hash functions, per spec.md §4.2.
pub const MAX_HASHES: u32 = 128;

/// Derives `(m, k)` — total bit count and hash function count — from a
/// requested capacity `n` and target false-positive rate `p`.
///
/// `m = ceil(-n * ln(p) / ln(2)^2)`, rounded up to a multiple of 8.
/// `k = max(1, round((m / n) * ln(2)))`, capped at [`MAX_HASHES`].
pub fn derive(n: u64, p: f64) -> Result<(u64, u32), Error> {
    if n < 1 {
        return Err(Error::Argument("capacity must be >= 1".into()));
    }
    if !(p > 0.0 && p < 1.0) {
        return Err(Error::Argument("error_rate must be in (0, 1)".into()));
    }

    let nf = n as f64;
    let ln2_squared = std::f64::consts::LN_2.powi(2);
    let raw_m = -(nf * p.ln()) / ln2_squared;
    let m = round_up_8((raw_m.ceil() as u64).max(8));

    let bpk = m as f64 / nf;
    let k = ((bpk * std::f64::consts::LN_2).round() as u32)
        .max(1)
        .min(MAX_HASHES);

    Ok((m, k))
}

fn round_up_8(x: u64) -> u64 {
    (x + 7) / 8 * 8
}

/// Derives the first `k` distinct hash seeds by walking primes upward from
/// a small starting point. Deterministic for a given `k`, so any two
/// filters created with the same `(n, p)` (hence the same `k`) share seeds.
pub fn default_seeds(k: u32) -> Vec<u32> {
    let mut seeds = Vec::with_capacity(k as usize);
    let mut candidate: u64 = 2;

    while seeds.len() < k as usize {
        if is_prime(candidate) {
            seeds.push(candidate as u32);
        }
        candidate += 1;
    }

    seeds
}

fn is_prime(x: u64) -> bool {
    if x < 2 {
        return false;
    }
    if x < 4 {
        return true;
    }
    if x % 2 == 0 {
        return false;
    }

    let mut d = 3;
    while d * d <= x {
        if x % d == 0 {
            return false;
        }
        d += 2;
    }

    true
}

/// Validates an explicit set of caller-supplied seeds against the `k`
/// derived from `(n, p)`: length must match, every seed must be distinct.
pub fn validate_explicit_seeds(seeds: &[u32], k: u32) -> Result<(), Error> {
    if seeds.len() != k as usize {
        return Err(Error::Argument(format!(
            "expected {} hash seeds, got {}",
            k,
            seeds.len()
        )));
    }

    let unique: HashSet<u32> = seeds.iter().copied().collect();
    if unique.len() != seeds.len() {
        return Err(Error::Argument("hash seeds must be distinct".into()));
    }

    Ok(())
}

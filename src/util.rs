//! Helpers shared by every hasher variant.
//!
//! - **`canonical`** folds forward and reverse-complement strand hashes into a
//!   strand-independent value (the smaller of the two).
//! - **`extend_base`** / **`extend_hashes`** derive the remaining hash slots of
//!   a window from its base value with the multiplicative mixing scheme.

use crate::constants::{MULTISEED, MULTISHIFT};

/// Strand-independent hash of a window: the smaller of the forward and
/// reverse-complement strand hashes.
///
/// ```
/// # use kmer_bloom::util::canonical;
/// assert_eq!(canonical(7, 3), 3);
/// assert_eq!(canonical(3, 7), canonical(7, 3));
/// ```
#[inline(always)]
pub const fn canonical(fwd: u64, rev: u64) -> u64 {
    if rev < fwd {
        rev
    } else {
        fwd
    }
}

/// Fill `hashes` from a single base value.
///
/// Slot 0 receives `base`; slot `i >= 1` receives
///
/// ```text
///   h_i  = base * (i ^ (k * MULTISEED))
///   h_i ^= h_i >> MULTISHIFT
/// ```
///
/// with wrapping arithmetic. `k` is the window span the base was computed
/// over. An empty slice is left untouched.
#[inline]
pub fn extend_base(base: u64, k: u32, hashes: &mut [u64]) {
    let Some((first, rest)) = hashes.split_first_mut() else {
        return;
    };
    *first = base;
    let k_mix = (k as u64).wrapping_mul(MULTISEED);
    for (i, slot) in rest.iter_mut().enumerate() {
        let mut t = base.wrapping_mul((i as u64 + 1) ^ k_mix);
        t ^= t >> MULTISHIFT;
        *slot = t;
    }
}

/// Fill `hashes` from a pair of strand hashes, using their canonical value
/// as the base.
///
/// ```
/// # use kmer_bloom::util::{canonical, extend_hashes};
/// let mut out = [0u64; 4];
/// extend_hashes(0x5678, 0x1234, 5, &mut out);
/// assert_eq!(out[0], canonical(0x5678, 0x1234));
/// assert_ne!(out[1], out[0]);
/// ```
#[inline]
pub fn extend_hashes(fwd: u64, rev: u64, k: u32, hashes: &mut [u64]) {
    extend_base(canonical(fwd, rev), k, hashes);
}

/// Reverse complement of a nucleotide sequence. Bytes outside `ACGTU`
/// (either case) are kept as-is, so ambiguous bases stay ambiguous.
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|&c| match c {
            b'A' => b'T',
            b'C' => b'G',
            b'G' => b'C',
            b'T' | b'U' => b'A',
            b'a' => b't',
            b'c' => b'g',
            b'g' => b'c',
            b't' | b'u' => b'a',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_picks_smaller_strand() {
        assert_eq!(canonical(u64::MAX, 1), 1);
        assert_eq!(canonical(0, u64::MAX), 0);
        assert_eq!(canonical(42, 42), 42);
    }

    #[test]
    fn extend_zero_length_slice() {
        let mut out: [u64; 0] = [];
        extend_hashes(123, 456, 7, &mut out);
    }

    #[test]
    fn extend_matches_mixing_formula() {
        const F: u64 = 0x1234_5678_9ABC_DEF0;
        const R: u64 = 0x0FED_CBA9_8765_4321;
        const K: u32 = 21;
        let mut v = [0u64; 8];
        extend_hashes(F, R, K, &mut v);
        let base = R; // R < F
        assert_eq!(v[0], base);
        for (i, &h) in v.iter().enumerate().skip(1) {
            let mut t = base.wrapping_mul((i as u64) ^ (K as u64).wrapping_mul(MULTISEED));
            t ^= t >> MULTISHIFT;
            assert_eq!(h, t);
        }
    }

    #[test]
    fn reverse_complement_keeps_case_and_ambiguity() {
        assert_eq!(reverse_complement(b"ACGTN"), b"NACGT".to_vec());
        assert_eq!(reverse_complement(b"aacgu"), b"acgtt".to_vec());
    }
}

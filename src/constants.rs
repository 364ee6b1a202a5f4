//! Random per-base seeds and the split-rotate lookup tables derived from them.
//!
//! Every table is generated at compile time from the four nucleotide seeds,
//! so the lookups used in the rolling hot path are plain array reads.

/// Seed of adenine.
pub const SEED_A: u64 = 0x3c8b_fbb3_95c6_0474;
/// Seed of cytosine.
pub const SEED_C: u64 = 0x3193_c185_62a0_2b4c;
/// Seed of guanine.
pub const SEED_G: u64 = 0x2032_3ed0_8257_2324;
/// Seed of thymine (and uracil).
pub const SEED_T: u64 = 0x2955_49f5_4be2_4456;
/// Sentinel seed of every byte that is not a nucleotide.
pub const SEED_N: u64 = 0;

/// `c & CP_OFF` indexes the seed of the complement of nucleotide `c`.
pub const CP_OFF: u8 = 0x07;

/// Multiplier used to derive extra hash values from a base hash.
pub const MULTISEED: u64 = 0x90b4_5d39_fb6d_a1fa;
/// Final avalanche shift applied to extra hash values.
pub const MULTISHIFT: u32 = 27;

/// Width of the high (left) half of a split-rotated word.
pub const LEFT_BITS: u32 = 31;
/// Width of the low (right) half of a split-rotated word.
pub const RIGHT_BITS: u32 = 33;
const RIGHT_MASK: u64 = (1 << RIGHT_BITS) - 1;

/// Byte → nucleotide seed. Upper- and lower-case `ACGTU` map to their seed;
/// the low slots `1, 3, 4, 5, 7` hold the complement seeds reached through
/// [`CP_OFF`].
pub const SEED_TAB: [u64; 256] = seed_tab();

/// Byte -> whether it is a nucleotide (`ACGTU`, either case).
///
/// [`SEED_TAB`] cannot answer this: its low slots hold complement seeds.
pub static VALID_BASE: [bool; 256] = valid_base();

#[inline(always)]
pub fn is_base(c: u8) -> bool {
    VALID_BASE[c as usize]
}

const fn valid_base() -> [bool; 256] {
    let mut t = [false; 256];
    let bases = b"ACGTUacgtu";
    let mut i = 0;
    while i < bases.len() {
        t[bases[i] as usize] = true;
        i += 1;
    }
    t
}

/// Left halves of every seed, pre-rotated by `0..31`.
pub static MS_TAB_31L: [[u64; LEFT_BITS as usize]; 256] = ms_tab_31l();

/// Right halves of every seed, pre-rotated by `0..33`.
pub static MS_TAB_33R: [[u64; RIGHT_BITS as usize]; 256] = ms_tab_33r();

const fn seed_tab() -> [u64; 256] {
    let mut t = [SEED_N; 256];
    t[b'A' as usize] = SEED_A;
    t[b'a' as usize] = SEED_A;
    t[b'C' as usize] = SEED_C;
    t[b'c' as usize] = SEED_C;
    t[b'G' as usize] = SEED_G;
    t[b'g' as usize] = SEED_G;
    t[b'T' as usize] = SEED_T;
    t[b't' as usize] = SEED_T;
    t[b'U' as usize] = SEED_T;
    t[b'u' as usize] = SEED_T;

    t[(b'A' & CP_OFF) as usize] = SEED_T;
    t[(b'C' & CP_OFF) as usize] = SEED_G;
    t[(b'G' & CP_OFF) as usize] = SEED_C;
    t[(b'T' & CP_OFF) as usize] = SEED_A;
    t[(b'U' & CP_OFF) as usize] = SEED_A;
    t
}

/// Rotate the low `width` bits of `x` left by `d` (`d < width`).
pub(crate) const fn rotl_bits(x: u64, d: u32, width: u32) -> u64 {
    if d == 0 {
        return x;
    }
    let mask = (1u64 << width) - 1;
    ((x << d) | (x >> (width - d))) & mask
}

const fn ms_tab_31l() -> [[u64; LEFT_BITS as usize]; 256] {
    let seeds = seed_tab();
    let mut t = [[0u64; LEFT_BITS as usize]; 256];
    let mut c = 0;
    while c < 256 {
        let left = seeds[c] >> RIGHT_BITS;
        let mut d = 0;
        while d < LEFT_BITS {
            t[c][d as usize] = rotl_bits(left, d, LEFT_BITS) << RIGHT_BITS;
            d += 1;
        }
        c += 1;
    }
    t
}

const fn ms_tab_33r() -> [[u64; RIGHT_BITS as usize]; 256] {
    let seeds = seed_tab();
    let mut t = [[0u64; RIGHT_BITS as usize]; 256];
    let mut c = 0;
    while c < 256 {
        let right = seeds[c] & RIGHT_MASK;
        let mut d = 0;
        while d < RIGHT_BITS {
            t[c][d as usize] = rotl_bits(right, d, RIGHT_BITS);
            d += 1;
        }
        c += 1;
    }
    t
}

// ──────────────────────────────────────────────────────────────
// Amino-acid seeds
// --------------------------------------------------------------------------

/// Seed of every byte that is not one of the 20 standard residues.
pub const AA_SEED_NONE: u64 = 0;

/// Residue equivalence classes per reduction level (index 0 = level 1).
/// Each level is a coarsening of the one before it.
pub const AA_LEVEL_CLASSES: [&[&str]; 3] = [
    &[
        "A", "C", "D", "E", "F", "G", "H", "I", "K", "L", "M", "N", "P", "Q", "R", "S", "T", "V",
        "W", "Y",
    ],
    &[
        "A", "C", "G", "P", "H", "N", "ST", "DE", "QKR", "ILMV", "FWY",
    ],
    &["AGPST", "C", "DENQKRH", "ILMV", "FWY"],
];

/// Byte → residue-class seed, per level. Members of one class share a seed.
pub static AA_SEED_TAB: [[u64; 256]; 3] = aa_seed_tab();

const fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

const fn aa_seed_tab() -> [[u64; 256]; 3] {
    let mut t = [[AA_SEED_NONE; 256]; 3];
    let mut lvl = 0;
    while lvl < AA_LEVEL_CLASSES.len() {
        let classes = AA_LEVEL_CLASSES[lvl];
        let mut c = 0;
        while c < classes.len() {
            // odd, so never the sentinel
            let seed = splitmix64(((lvl as u64 + 1) << 32) | c as u64) | 1;
            let members = classes[c].as_bytes();
            let mut m = 0;
            while m < members.len() {
                t[lvl][members[m] as usize] = seed;
                t[lvl][members[m].to_ascii_lowercase() as usize] = seed;
                m += 1;
            }
            c += 1;
        }
        lvl += 1;
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complement_slots_point_at_complement_seed() {
        for (base, comp) in [(b'A', SEED_T), (b'C', SEED_G), (b'G', SEED_C), (b'T', SEED_A)] {
            assert_eq!(SEED_TAB[(base & CP_OFF) as usize], comp);
            let lower = base.to_ascii_lowercase();
            assert_eq!(SEED_TAB[(lower & CP_OFF) as usize], comp);
        }
    }

    #[test]
    fn non_nucleotides_are_sentinel() {
        for b in [b'N', b'n', b'X', b'-', b'.', b'R'] {
            assert_eq!(SEED_TAB[b as usize], SEED_N);
        }
    }

    #[test]
    fn control_bytes_are_not_bases() {
        for b in 0u8..32 {
            assert!(!is_base(b), "byte {b}");
        }
        for b in *b"ACGTUacgtu" {
            assert!(is_base(b));
        }
        assert_eq!(VALID_BASE.iter().filter(|&&v| v).count(), 10);
    }

    #[test]
    fn unrotated_halves_recombine_to_seed() {
        for c in [b'A', b'C', b'G', b'T'] {
            let c = c as usize;
            assert_eq!(MS_TAB_31L[c][0] | MS_TAB_33R[c][0], SEED_TAB[c]);
        }
    }

    #[test]
    fn amino_acid_levels_coarsen() {
        for lvl in 1..3 {
            for a in 0..256 {
                for b in 0..256 {
                    if AA_SEED_TAB[lvl - 1][a] != AA_SEED_NONE
                        && AA_SEED_TAB[lvl - 1][a] == AA_SEED_TAB[lvl - 1][b]
                    {
                        assert_eq!(AA_SEED_TAB[lvl][a], AA_SEED_TAB[lvl][b]);
                    }
                }
            }
        }
        let valid = |lvl: usize| AA_SEED_TAB[lvl].iter().filter(|&&s| s != AA_SEED_NONE).count();
        assert_eq!(valid(0), 40);
        assert_eq!(valid(1), 40);
        assert_eq!(valid(2), 40);
        assert_eq!(AA_SEED_TAB[0][b'B' as usize], AA_SEED_NONE);
        assert_eq!(AA_SEED_TAB[0][b'X' as usize], AA_SEED_NONE);

        for (lvl, classes) in AA_LEVEL_CLASSES.iter().enumerate() {
            let mut seeds: Vec<u64> = classes
                .iter()
                .map(|c| AA_SEED_TAB[lvl][c.as_bytes()[0] as usize])
                .collect();
            seeds.sort_unstable();
            seeds.dedup();
            assert_eq!(seeds.len(), classes.len(), "level {}", lvl + 1);
        }
    }
}

//! Low-level **split-rotate** primitives shared by every hasher.
//!
//! A 64-bit hash word is treated as two independent rings: the high 31 bits
//! (33–63) and the low 33 bits (0–32). Rotating the rings separately keeps
//! the period of a seed at `31 * 33` shifts instead of 64, which is what lets
//! the rolling updates cancel outgoing bases exactly.

use crate::constants::{rotl_bits, LEFT_BITS, MS_TAB_31L, MS_TAB_33R, RIGHT_BITS};

const RIGHT_MASK: u64 = (1 << RIGHT_BITS) - 1;

/// One-bit split-rotate left.
///
/// Bit 63 wraps to bit 33 and bit 32 wraps to bit 0.
#[inline(always)]
pub const fn srol(x: u64) -> u64 {
    let m = ((x & 0x8000_0000_0000_0000) >> 30) | ((x & 0x0000_0001_0000_0000) >> 32);
    ((x << 1) & 0xFFFF_FFFD_FFFF_FFFF) | m
}

/// Split-rotate left by an arbitrary distance.
///
/// Each ring is rotated by `d` modulo its own width, so any `d` is valid.
#[inline]
pub const fn srol_by(x: u64, d: u32) -> u64 {
    let left = rotl_bits(x >> RIGHT_BITS, d % LEFT_BITS, LEFT_BITS);
    let right = rotl_bits(x & RIGHT_MASK, d % RIGHT_BITS, RIGHT_BITS);
    (left << RIGHT_BITS) | right
}

/// One-bit split-rotate right; inverse of [`srol`].
#[inline(always)]
pub const fn sror(x: u64) -> u64 {
    let m = ((x & 0x0000_0002_0000_0000) << 30) | ((x & 0x0000_0000_0000_0001) << 32);
    ((x >> 1) & 0xFFFF_FFFE_FFFF_FFFF) | m
}

/// Seed of byte `c`, split-rotated left by `d`, read from the lookup tables.
#[inline(always)]
pub fn srol_table(c: u8, d: u32) -> u64 {
    let idx31 = (d % LEFT_BITS) as usize;
    let idx33 = (d % RIGHT_BITS) as usize;
    MS_TAB_31L[c as usize][idx31] | MS_TAB_33R[c as usize][idx33]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SEED_TAB;

    #[test]
    fn srol_table_matches_reference_points() {
        // (c, d) pairs straddle both ring widths: 30/31 wrap the left ring,
        // 32/33 wrap the right ring, 64 wraps both more than once.
        assert_eq!(srol_table(0, 0), 0x0000_0000_0000_0000);
        assert_eq!(srol_table(3, 32), 0x4064_7DA0_412B_9192);
        assert_eq!(srol_table(4, 0), 0x3C8B_FBB3_95C6_0474);
        assert_eq!(srol_table(1, 0), 0x2955_49F5_4BE2_4456);
        assert_eq!(srol_table(7, 1), 0x6327_8308_C540_5699);
        assert_eq!(srol_table(1, 33), 0xA555_27D1_4BE2_4456);
        assert_eq!(srol_table(4, 33), 0xF22F_EEC9_95C6_0474);
        assert_eq!(srol_table(4, 30), 0x9E45_FDD9_32B8_C08E);
        assert_eq!(srol_table(0, 31), 0x0000_0000_0000_0000);
        assert_eq!(srol_table(7, 33), 0xC64F_0611_62A0_2B4C);
        assert_eq!(srol_table(1, 64), 0xA555_27D1_52F8_9115);
        assert_eq!(srol_table(3, 64), 0x80C8_FB40_2095_C8C9);
        assert_eq!(srol_table(7, 30), 0x18C9_E0C3_2C54_0569);
        assert_eq!(srol_table(1, 1), 0x52AA_93E8_97C4_88AD);
        assert_eq!(srol_table(4, 64), 0xF22F_EEC8_6571_811D);
        assert_eq!(srol_table(7, 31), 0x3193_C184_58A8_0AD3);
        assert_eq!(srol_table(3, 1), 0x4064_7DA1_04AE_4648);
        assert_eq!(srol_table(1, 32), 0x52AA_93E8_A5F1_222B);
    }

    #[test]
    fn srol_and_sror_inverse() {
        let mut x = 0xDEADBEEF_DEADBEEF_u64;
        for _ in 0..128 {
            x = srol(x);
            x = sror(x);
        }
        assert_eq!(x, 0xDEADBEEF_DEADBEEF);
    }

    #[test]
    fn arbitrary_rotation_matches_repeated_srol() {
        let x = 0x0123_4567_89AB_CDEF_u64;
        let mut stepped = x;
        for d in 0..=200 {
            assert_eq!(srol_by(x, d), stepped, "srol_by at d={d}");
            stepped = srol(stepped);
        }
    }

    #[test]
    fn table_lookup_matches_direct_rotation() {
        for c in [b'A', b'C', b'G', b'T', 1, 3, 4, 7] {
            for d in [0, 5, 31, 33, 100, 1022, 1023] {
                assert_eq!(srol_table(c, d), srol_by(SEED_TAB[c as usize], d));
            }
        }
    }

    #[test]
    fn split_rotation_has_period_1023() {
        let x = 0xFEDC_BA98_7654_3210_u64;
        assert_eq!(srol_by(x, 31 * 33), x);
        assert_eq!(sror(x), srol_by(x, 31 * 33 - 1));
    }
}

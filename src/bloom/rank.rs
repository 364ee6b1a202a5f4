//! Rank index over a frozen bit vector.
//!
//! The multi-indexed filter maps every set bit to a slot of its id array;
//! the slot of bit `i` is the number of set bits strictly before `i`.
//!
//! Layout: one cumulative popcount per [`SUPERBLOCK_BITS`] bits, plus a
//! sentinel holding the total. `rank1` adds the popcounts of at most seven
//! whole words and one partial word to the superblock entry.

/// Bits covered by one superblock entry.
pub const SUPERBLOCK_BITS: usize = 512;

const WORDS_PER_SUPERBLOCK: usize = SUPERBLOCK_BITS / 64;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RankIndex {
    /// `superblocks[i]` = number of 1-bits in `[0, i * SUPERBLOCK_BITS)`.
    superblocks: Vec<u64>,
}

impl RankIndex {
    pub fn build(words: &[u64]) -> Self {
        let mut superblocks = Vec::with_capacity(words.len() / WORDS_PER_SUPERBLOCK + 2);
        let mut cumulative = 0u64;
        for chunk in words.chunks(WORDS_PER_SUPERBLOCK) {
            superblocks.push(cumulative);
            cumulative += chunk.iter().map(|w| w.count_ones() as u64).sum::<u64>();
        }
        // Sentinel
        superblocks.push(cumulative);
        Self { superblocks }
    }

    /// Restore a previously built table. The caller must check it against
    /// the bit vector with [`RankIndex::matches`].
    pub fn from_superblocks(superblocks: Vec<u64>) -> Self {
        Self { superblocks }
    }

    pub fn superblocks(&self) -> &[u64] {
        &self.superblocks
    }

    /// Total number of set bits.
    pub fn ones(&self) -> usize {
        self.superblocks.last().copied().unwrap_or(0) as usize
    }

    /// Number of 1-bits in `[0, pos)` of `words`, which must be the vector
    /// this index was built from.
    #[inline]
    pub fn rank1(&self, words: &[u64], pos: usize) -> usize {
        let word_idx = pos / 64;
        let super_idx = pos / SUPERBLOCK_BITS;
        let mut rank = self.superblocks[super_idx] as usize;
        for w in &words[super_idx * WORDS_PER_SUPERBLOCK..word_idx] {
            rank += w.count_ones() as usize;
        }
        let bit = pos % 64;
        if bit != 0 {
            rank += (words[word_idx] & ((1u64 << bit) - 1)).count_ones() as usize;
        }
        rank
    }

    pub fn matches(&self, words: &[u64]) -> bool {
        *self == Self::build(words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn naive_rank(words: &[u64], pos: usize) -> usize {
        (0..pos)
            .filter(|&i| words[i / 64] >> (i % 64) & 1 == 1)
            .count()
    }

    #[test]
    fn rank_matches_naive_count() {
        let mut rng = StdRng::seed_from_u64(42);
        let words: Vec<u64> = (0..37).map(|_| rng.gen()).collect();
        let index = RankIndex::build(&words);
        for pos in (0..words.len() * 64).step_by(13) {
            assert_eq!(index.rank1(&words, pos), naive_rank(&words, pos), "pos {pos}");
        }
        let total: usize = words.iter().map(|w| w.count_ones() as usize).sum();
        assert_eq!(index.ones(), total);
        assert_eq!(index.superblocks().len(), 37 / 8 + 2);
    }

    #[test]
    fn empty_vector_has_only_sentinel() {
        let index = RankIndex::build(&[]);
        assert_eq!(index.superblocks(), &[0]);
        assert_eq!(index.ones(), 0);
    }

    #[test]
    fn detects_stale_table() {
        let words = vec![u64::MAX; 16];
        let index = RankIndex::build(&words);
        assert!(index.matches(&words));
        let mut other = words.clone();
        other[3] = 0;
        assert!(!index.matches(&other));
    }

    proptest! {
        #[test]
        fn rank_is_monotone(words in proptest::collection::vec(any::<u64>(), 1..40), frac in 0.0f64..1.0) {
            let index = RankIndex::build(&words);
            let pos = ((words.len() * 64 - 1) as f64 * frac) as usize;
            let r = index.rank1(&words, pos);
            let r_next = index.rank1(&words, pos + 1);
            let bit = (words[pos / 64] >> (pos % 64) & 1) as usize;
            prop_assert_eq!(r_next, r + bit);
        }
    }
}

//! Fixed-size bit array addressed by hash values.

use bitvec::prelude::*;

/// Bit array whose slot for a hash `h` is `h mod len`.
///
/// Bits are packed into `u64` words with the least-significant bit first, so
/// the little-endian byte image puts bit `i` at byte `i / 8`, bit `i % 8`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BitStore {
    bits: BitVec<u64, Lsb0>,
}

impl BitStore {
    /// Zeroed store of `len` bits; `len` must be a multiple of 64.
    pub fn new(len: usize) -> Self {
        debug_assert_eq!(len % 64, 0);
        Self {
            bits: bitvec![u64, Lsb0; 0; len],
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    #[inline(always)]
    pub fn slot(&self, hash: u64) -> usize {
        (hash % self.bits.len() as u64) as usize
    }

    /// Set the bit for `hash`, returning whether it was already set.
    #[inline(always)]
    pub fn set(&mut self, hash: u64) -> bool {
        let slot = self.slot(hash);
        self.bits.replace(slot, true)
    }

    #[inline(always)]
    pub fn get(&self, hash: u64) -> bool {
        self.bits[self.slot(hash)]
    }

    #[inline(always)]
    pub fn get_slot(&self, slot: usize) -> bool {
        self.bits[slot]
    }

    pub fn count_ones(&self) -> usize {
        self.bits.count_ones()
    }

    pub fn words(&self) -> &[u64] {
        self.bits.as_raw_slice()
    }

    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.words().iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    pub fn from_words(words: Vec<u64>) -> Self {
        Self {
            bits: BitVec::from_vec(words),
        }
    }

    /// Rebuild from a little-endian byte image whose length is a multiple
    /// of 8.
    pub fn from_le_bytes(bytes: &[u8]) -> Self {
        let words = bytes
            .chunks_exact(8)
            .map(|chunk| {
                let mut word = [0u8; 8];
                word.copy_from_slice(chunk);
                u64::from_le_bytes(word)
            })
            .collect();
        Self::from_words(words)
    }
}

//! **Streaming ("blind") ntHash** for *contiguous* k-mers.
//!
//! Unlike [`kmer::NtHash`](crate::kmer), which borrows an entire DNA string
//! and skips windows containing 'N', **`BlindNtHash` only sees the window it
//! currently hashes**. The caller feeds the next / previous character to move
//! the window forward or backward; a character that is not a nucleotide is
//! refused and leaves the hasher untouched.
//!
//! The window lives in a small ring buffer of exactly `k` bases.
//!
//! A **builder + iterator** facade (`BlindNtHashBuilder` /
//! `BlindNtHashIter`) streams over a sequence until it meets the first
//! character that cannot be fed.

use std::collections::VecDeque;

use crate::{
    constants::*,
    kmer::{
        base_forward_hash, base_reverse_hash, check_window, has_invalid_base, next_forward_hash,
        next_reverse_hash, prev_forward_hash, prev_reverse_hash, substitute,
    },
    state::HashState,
    util::extend_hashes,
    Error, Result,
};

/// Rolling hash over a *fixed-width* window that the caller rolls manually.
///
/// The window is stored in a `VecDeque<u8>`:
/// - `roll()` removes the **front** base and pushes a new base at the **back**.
/// - `roll_back()` does the opposite.
/// - `peek()` / `peek_back()` compute hashes for the next / previous window
///   without moving it.
#[derive(Clone, Debug)]
pub struct BlindNtHash {
    window: VecDeque<u8>,
    k: u16,
    pos: isize,
    fwd_hash: u64,
    rev_hash: u64,
    state: HashState,
}

impl BlindNtHash {
    /// Create a new `BlindNtHash` whose initial window is `seq[pos..pos+k]`.
    ///
    /// # Errors
    ///
    /// Returns if `k == 0`, `num_hashes == 0`, `seq.len() < k`, `pos` is too
    /// large, or the initial window holds a non-nucleotide.
    pub fn new(seq: &[u8], k: u16, num_hashes: u8, pos: usize) -> Result<Self> {
        check_window(seq.len(), k, num_hashes, pos)?;
        let slice = &seq[pos..pos + k as usize];
        if has_invalid_base(slice, k as usize).is_some() {
            return Err(Error::InvalidSequence);
        }

        let fwd_hash = base_forward_hash(slice, k);
        let rev_hash = base_reverse_hash(slice, k);
        let mut state = HashState::new(k as u32, num_hashes as u32, None);
        state.set_pos(pos);
        extend_hashes(fwd_hash, rev_hash, k as u32, state.hashes_mut());

        Ok(Self {
            window: slice.iter().copied().collect(),
            k,
            pos: pos as isize,
            fwd_hash,
            rev_hash,
            state,
        })
    }

    /// Slide the window one base forward, appending `char_in`.
    ///
    /// Returns `false` without changing anything if `char_in` is not a
    /// nucleotide.
    pub fn roll(&mut self, char_in: u8) -> bool {
        if !is_base(char_in) {
            return false;
        }
        let Some(char_out) = self.window.pop_front() else {
            return false;
        };
        self.window.push_back(char_in);

        self.fwd_hash = next_forward_hash(self.fwd_hash, self.k, char_out, char_in);
        self.rev_hash = next_reverse_hash(self.rev_hash, self.k, char_out, char_in);
        self.pos += 1;
        self.commit();
        true
    }

    /// Slide the window one base backward, prepending `char_in`.
    pub fn roll_back(&mut self, char_in: u8) -> bool {
        if !is_base(char_in) {
            return false;
        }
        let Some(char_out) = self.window.pop_back() else {
            return false;
        };
        self.window.push_front(char_in);

        self.fwd_hash = prev_forward_hash(self.fwd_hash, self.k, char_out, char_in);
        self.rev_hash = prev_reverse_hash(self.rev_hash, self.k, char_out, char_in);
        self.pos -= 1;
        self.commit();
        true
    }

    /// Compute hashes for the **next** window without moving.
    pub fn peek(&mut self, char_in: u8) -> bool {
        if !is_base(char_in) {
            return false;
        }
        let Some(&char_out) = self.window.front() else {
            return false;
        };
        let fwd = next_forward_hash(self.fwd_hash, self.k, char_out, char_in);
        let rev = next_reverse_hash(self.rev_hash, self.k, char_out, char_in);
        extend_hashes(fwd, rev, self.k as u32, self.state.hashes_mut());
        true
    }

    /// Compute hashes for the **previous** window without moving.
    pub fn peek_back(&mut self, char_in: u8) -> bool {
        if !is_base(char_in) {
            return false;
        }
        let Some(&char_out) = self.window.back() else {
            return false;
        };
        let fwd = prev_forward_hash(self.fwd_hash, self.k, char_out, char_in);
        let rev = prev_reverse_hash(self.rev_hash, self.k, char_out, char_in);
        extend_hashes(fwd, rev, self.k as u32, self.state.hashes_mut());
        true
    }

    /// Hash the current window with single-base substitutions applied; see
    /// [`NtHash::sub`](crate::NtHash::sub).
    pub fn sub(&mut self, positions: &[usize], new_bases: &[u8]) -> Result<()> {
        let window = self.window.make_contiguous();
        let (fwd, rev) = substitute(self.fwd_hash, self.rev_hash, window, positions, new_bases)?;
        extend_hashes(fwd, rev, self.k as u32, self.state.hashes_mut());
        Ok(())
    }

    #[inline(always)]
    pub fn hashes(&self) -> &[u64] {
        self.state.hashes()
    }

    /// Start of the current window relative to where the hasher was created.
    /// Goes negative when rolled back past the starting position.
    #[inline(always)]
    pub fn pos(&self) -> isize {
        self.pos
    }

    #[inline(always)]
    pub fn forward_hash(&self) -> u64 {
        self.fwd_hash
    }

    #[inline(always)]
    pub fn reverse_hash(&self) -> u64 {
        self.rev_hash
    }

    #[inline(always)]
    pub fn k(&self) -> u16 {
        self.k
    }

    #[inline(always)]
    pub fn hash_count(&self) -> u8 {
        self.state.hash_count() as u8
    }

    /// Current window, oldest base first.
    pub fn window(&self) -> impl Iterator<Item = u8> + '_ {
        self.window.iter().copied()
    }

    #[inline(always)]
    pub fn state(&self) -> &HashState {
        &self.state
    }

    #[inline(always)]
    fn commit(&mut self) {
        self.state.set_offset(self.pos as i64);
        extend_hashes(
            self.fwd_hash,
            self.rev_hash,
            self.k as u32,
            self.state.hashes_mut(),
        );
    }
}

pub struct BlindNtHashBuilder<'a> {
    seq: &'a [u8],
    k: u16,
    num_hashes: u8,
    start_pos: usize,
}

impl<'a> BlindNtHashBuilder<'a> {
    pub fn new(seq: &'a [u8]) -> Self {
        Self {
            seq,
            k: 0,
            num_hashes: 1,
            start_pos: 0,
        }
    }

    pub fn k(mut self, k: u16) -> Self {
        self.k = k;
        self
    }

    pub fn num_hashes(mut self, m: u8) -> Self {
        self.num_hashes = m;
        self
    }

    pub fn pos(mut self, pos: usize) -> Self {
        self.start_pos = pos;
        self
    }

    pub fn finish(self) -> Result<BlindNtHashIter<'a>> {
        let hasher = BlindNtHash::new(self.seq, self.k, self.num_hashes, self.start_pos)?;
        let end = self.seq.len() - self.k as usize;
        Ok(BlindNtHashIter {
            seq: self.seq,
            end,
            hasher,
            first: true,
            done: false,
        })
    }
}

/// Yields `(pos, hashes)` for consecutive windows; stops at the end of the
/// sequence or at the first character the hasher refuses.
pub struct BlindNtHashIter<'a> {
    seq: &'a [u8],
    end: usize,
    hasher: BlindNtHash,
    first: bool,
    done: bool,
}

impl<'a> Iterator for BlindNtHashIter<'a> {
    type Item = (usize, Vec<u64>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.first {
            self.first = false;
            return Some((self.hasher.pos() as usize, self.hasher.hashes().to_vec()));
        }

        let cur = self.hasher.pos() as usize;
        if cur >= self.end {
            self.done = true;
            return None;
        }

        let incoming = self.seq[cur + self.hasher.k as usize];
        if !self.hasher.roll(incoming) {
            self.done = true;
            return None;
        }

        Some((self.hasher.pos() as usize, self.hasher.hashes().to_vec()))
    }
}

impl<'a> IntoIterator for BlindNtHashBuilder<'a> {
    type Item = (usize, Vec<u64>);
    type IntoIter = BlindNtHashIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.finish()
            .expect("invalid BlindNtHashBuilder configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NtHash;

    #[test]
    fn rejects_invalid_initial_window() {
        assert!(matches!(
            BlindNtHash::new(b"ACNTA", 4, 1, 0),
            Err(Error::InvalidSequence)
        ));
        assert!(BlindNtHash::new(b"ACNTAG", 3, 1, 3).is_ok());
    }

    #[test]
    fn refused_character_leaves_state() {
        let mut h = BlindNtHash::new(b"ACGTA", 5, 2, 0).unwrap();
        let before = h.hashes().to_vec();
        assert!(!h.roll(b'N'));
        assert!(!h.roll_back(b'-'));
        assert!(!h.peek(b'N'));
        assert_eq!(h.pos(), 0);
        assert_eq!(h.hashes(), before.as_slice());
        assert_eq!(h.window().collect::<Vec<_>>(), b"ACGTA".to_vec());
    }

    #[test]
    fn feeding_matches_owned_hasher() {
        let seq = b"TTGACGGACTACGATCGACTAG";
        let k = 6;
        let mut blind = BlindNtHash::new(seq, k, 3, 0).unwrap();
        let mut owned = NtHash::new(seq, k, 3, 0).unwrap();
        assert!(owned.roll());
        assert_eq!(blind.hashes(), owned.hashes());
        for &c in &seq[k as usize..] {
            assert!(blind.roll(c));
            assert!(owned.roll());
            assert_eq!(blind.hashes(), owned.hashes());
        }
        while owned.roll_back() {
            let c = seq[owned.pos()];
            assert!(blind.roll_back(c));
            assert_eq!(blind.hashes(), owned.hashes());
        }
        assert_eq!(blind.pos(), 0);
    }

    #[test]
    fn sub_on_ring_window() {
        let mut h = BlindNtHash::new(b"ACGTAC", 4, 2, 0).unwrap();
        h.roll(b'A');
        h.roll(b'C');
        // window is now GTAC, stored wrapped in the ring
        h.sub(&[0], b"C").unwrap();
        let expected = BlindNtHash::new(b"CTAC", 4, 2, 0).unwrap();
        assert_eq!(h.hashes(), expected.hashes());
    }

    #[test]
    fn iterator_stops_at_refused_char() {
        let seq = b"ACGTACNGT";
        let positions: Vec<usize> = BlindNtHashBuilder::new(seq)
            .k(3)
            .into_iter()
            .map(|(p, _)| p)
            .collect();
        assert_eq!(positions, vec![0, 1, 2, 3]);
    }
}

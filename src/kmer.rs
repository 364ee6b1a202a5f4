//! Canonical **ntHash** for *contiguous* k-mers.
//!
//! Computes rolling hashes over DNA k-mers in **O(1)** time per base after an
//! initial **O(k)** base computation, skipping every window that holds a byte
//! outside `ACGTU` (either case).
//!
//! Bit-twiddling is delegated to the `tables` (split-rotate) and `constants`
//! (lookup tables) modules, plus `util::extend_hashes` for generating extra
//! hash values per k-mer.
//!
//! A **builder + iterator** facade (`NtHashBuilder` / `NtHashIter`) is also
//! provided.

use crate::{
    constants::*,
    state::{HashState, RollingHash},
    tables::{srol, srol_table, sror},
    util::extend_hashes,
    Error,
};

/// Convenient alias for fallible operations in this module.
pub type Result<T> = crate::Result<T>;

/// Rolling k-mer hasher over a contiguous DNA sequence.
///
/// - Initialization is deferred until the first valid k-mer (skips any
///   windows containing `N` or other non-nucleotides).
/// - `roll()` / `roll_back()` move by one base, jumping over invalid windows.
/// - Each valid k-mer emits `num_hashes` values: the canonical hash plus
///   extra mixes.
#[derive(Clone, Debug)]
pub struct NtHash<'a> {
    seq: &'a [u8],
    k: u16,
    pos: usize,
    initialized: bool,
    fwd_hash: u64,
    rev_hash: u64,
    state: HashState,
}

impl<'a> NtHash<'a> {
    /// Create a new `NtHash` starting at `pos`.
    ///
    /// # Arguments
    ///
    /// * `seq` – full DNA sequence (`A,C,G,T,U` recognized; others act as `N`)
    /// * `k` – k-mer length (> 0)
    /// * `num_hashes` – how many hash values per k-mer (> 0)
    /// * `pos` – starting index
    ///
    /// # Errors
    ///
    /// Returns if `k == 0`, `num_hashes == 0`, `seq.len() < k`, or `pos` is
    /// past the last window.
    pub fn new(seq: &'a [u8], k: u16, num_hashes: u8, pos: usize) -> Result<Self> {
        check_window(seq.len(), k, num_hashes, pos)?;
        Ok(Self {
            seq,
            k,
            pos,
            initialized: false,
            fwd_hash: 0,
            rev_hash: 0,
            state: HashState::new(k as u32, num_hashes as u32, None),
        })
    }

    /// Advance forward by one base, skipping over k-mers with `N`.
    /// Returns `true` if a new valid hash was produced; on `false` nothing
    /// changed.
    pub fn roll(&mut self) -> bool {
        if !self.initialized {
            return self.init();
        }
        let k_usz = self.k as usize;
        if self.pos >= self.seq.len() - k_usz {
            return false;
        }
        let incoming = self.seq[self.pos + k_usz];
        if !is_base(incoming) {
            return match next_valid_window(self.seq, k_usz, self.pos + k_usz + 1) {
                Some(start) => {
                    self.reset_at(start);
                    true
                }
                None => false,
            };
        }
        let outgoing = self.seq[self.pos];
        self.fwd_hash = next_forward_hash(self.fwd_hash, self.k, outgoing, incoming);
        self.rev_hash = next_reverse_hash(self.rev_hash, self.k, outgoing, incoming);
        self.pos += 1;
        self.commit();
        true
    }

    /// Move backward by one base, skipping over k-mers with `N`.
    ///
    /// Before the first window has been hashed this initializes instead.
    pub fn roll_back(&mut self) -> bool {
        if !self.initialized {
            return self.init();
        }
        if self.pos == 0 {
            return false;
        }
        let incoming = self.seq[self.pos - 1];
        if !is_base(incoming) {
            return match prev_valid_window(self.seq, self.k as usize, self.pos - 1) {
                Some(start) => {
                    self.reset_at(start);
                    true
                }
                None => false,
            };
        }
        let outgoing = self.seq[self.pos + self.k as usize - 1];
        self.fwd_hash = prev_forward_hash(self.fwd_hash, self.k, outgoing, incoming);
        self.rev_hash = prev_reverse_hash(self.rev_hash, self.k, outgoing, incoming);
        self.pos -= 1;
        self.commit();
        true
    }

    /// Hash the next k-mer into the output slots without moving.
    pub fn peek(&mut self) -> bool {
        if !self.initialized && !self.init() {
            return false;
        }
        if self.pos >= self.seq.len() - self.k as usize {
            return false;
        }
        let incoming = self.seq[self.pos + self.k as usize];
        self.peek_char(incoming)
    }

    /// Peek with an explicit incoming byte.
    pub fn peek_char(&mut self, incoming: u8) -> bool {
        if !self.initialized && !self.init() {
            return false;
        }
        if !is_base(incoming) {
            return false;
        }
        let outgoing = self.seq[self.pos];
        let fwd = next_forward_hash(self.fwd_hash, self.k, outgoing, incoming);
        let rev = next_reverse_hash(self.rev_hash, self.k, outgoing, incoming);
        self.fill_hash_buffer(fwd, rev);
        true
    }

    /// Hash the previous k-mer into the output slots without moving.
    pub fn peek_back(&mut self) -> bool {
        if !self.initialized && !self.init() {
            return false;
        }
        if self.pos == 0 {
            return false;
        }
        let incoming = self.seq[self.pos - 1];
        self.peek_back_char(incoming)
    }

    /// Peek backward with an explicit incoming byte.
    pub fn peek_back_char(&mut self, incoming: u8) -> bool {
        if !self.initialized && !self.init() {
            return false;
        }
        if !is_base(incoming) {
            return false;
        }
        let outgoing = self.seq[self.pos + self.k as usize - 1];
        let fwd = prev_forward_hash(self.fwd_hash, self.k, outgoing, incoming);
        let rev = prev_reverse_hash(self.rev_hash, self.k, outgoing, incoming);
        self.fill_hash_buffer(fwd, rev);
        true
    }

    /// Hash the current window as if `seq[pos + positions[i]]` were
    /// `new_bases[i]`, leaving the cursor and strand hashes untouched.
    ///
    /// Costs O(`positions.len()`), independent of `k`.
    ///
    /// # Errors
    ///
    /// `InvalidSubstitution` when the slices differ in length, an offset is
    /// `>= k`, a replacement is not a nucleotide, or no valid window exists.
    pub fn sub(&mut self, positions: &[usize], new_bases: &[u8]) -> Result<()> {
        if !self.initialized && !self.init() {
            return Err(Error::InvalidSubstitution(
                "sequence holds no valid window".into(),
            ));
        }
        let window = &self.seq[self.pos..self.pos + self.k as usize];
        let (fwd, rev) = substitute(self.fwd_hash, self.rev_hash, window, positions, new_bases)?;
        self.fill_hash_buffer(fwd, rev);
        Ok(())
    }

    /// Returns the most recent hash buffer.
    #[inline(always)]
    pub fn hashes(&self) -> &[u64] {
        self.state.hashes()
    }

    /// Returns the current k-mer start index.
    #[inline(always)]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Returns the forward-strand hash.
    #[inline(always)]
    pub fn forward_hash(&self) -> u64 {
        self.fwd_hash
    }

    /// Returns the reverse-complement hash.
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

    #[inline(always)]
    pub fn state(&self) -> &HashState {
        &self.state
    }

    /// Initialize on the first valid k-mer at or after `pos`.
    fn init(&mut self) -> bool {
        match next_valid_window(self.seq, self.k as usize, self.pos) {
            Some(start) => {
                self.reset_at(start);
                true
            }
            None => false,
        }
    }

    fn reset_at(&mut self, start: usize) {
        self.pos = start;
        self.fwd_hash = base_forward_hash(&self.seq[start..], self.k);
        self.rev_hash = base_reverse_hash(&self.seq[start..], self.k);
        self.initialized = true;
        self.commit();
    }

    #[inline(always)]
    fn commit(&mut self) {
        self.state.set_pos(self.pos);
        extend_hashes(
            self.fwd_hash,
            self.rev_hash,
            self.k as u32,
            self.state.hashes_mut(),
        );
    }

    #[inline(always)]
    fn fill_hash_buffer(&mut self, fwd: u64, rev: u64) {
        extend_hashes(fwd, rev, self.k as u32, self.state.hashes_mut());
    }
}

impl RollingHash for NtHash<'_> {
    fn roll(&mut self) -> bool {
        NtHash::roll(self)
    }

    fn roll_back(&mut self) -> bool {
        NtHash::roll_back(self)
    }

    fn state(&self) -> &HashState {
        &self.state
    }
}

/// Shared constructor validation of the buffer-owning hashers.
pub(crate) fn check_window(seq_len: usize, k: u16, num_hashes: u8, pos: usize) -> Result<()> {
    if k == 0 {
        return Err(Error::InvalidK);
    }
    if num_hashes == 0 {
        return Err(Error::InvalidHashCount);
    }
    let k_usz = k as usize;
    if seq_len < k_usz {
        return Err(Error::SequenceTooShort { seq_len, k });
    }
    if pos > seq_len - k_usz {
        return Err(Error::PositionOutOfRange { pos, seq_len });
    }
    Ok(())
}

/// Index of the rightmost non-nucleotide in `seq[..k]`, if any.
#[inline(always)]
pub fn has_invalid_base(seq: &[u8], k: usize) -> Option<usize> {
    seq[..k].iter().rposition(|&c| !is_base(c))
}

/// Start of the first all-nucleotide window at or after `from`.
pub(crate) fn next_valid_window(seq: &[u8], k: usize, mut from: usize) -> Option<usize> {
    while from + k <= seq.len() {
        match has_invalid_base(&seq[from..], k) {
            Some(skip) => from += skip + 1,
            None => return Some(from),
        }
    }
    None
}

/// Start of the last all-nucleotide window ending at or before `end`.
pub(crate) fn prev_valid_window(seq: &[u8], k: usize, mut end: usize) -> Option<usize> {
    while end >= k {
        let start = end - k;
        match seq[start..end].iter().position(|&c| !is_base(c)) {
            Some(idx) => end = start + idx,
            None => return Some(start),
        }
    }
    None
}

/// Forward-strand hash of `seq[..k]`.
#[inline]
pub fn base_forward_hash(seq: &[u8], k: u16) -> u64 {
    seq[..k as usize]
        .iter()
        .fold(0, |h, &c| srol(h) ^ SEED_TAB[c as usize])
}

/// Reverse-complement hash of `seq[..k]`.
#[inline]
pub fn base_reverse_hash(seq: &[u8], k: u16) -> u64 {
    seq[..k as usize]
        .iter()
        .rev()
        .fold(0, |h, &c| srol(h) ^ SEED_TAB[(c & CP_OFF) as usize])
}

/// Apply single-base substitutions to a pair of strand hashes of `window`.
///
/// Repeated offsets are applied in order, each against the previous
/// replacement.
pub(crate) fn substitute(
    mut fwd: u64,
    mut rev: u64,
    window: &[u8],
    positions: &[usize],
    new_bases: &[u8],
) -> Result<(u64, u64)> {
    if positions.len() != new_bases.len() {
        return Err(Error::InvalidSubstitution(format!(
            "{} positions but {} replacement bases",
            positions.len(),
            new_bases.len()
        )));
    }
    let k = window.len();
    for (i, (&p, &new)) in positions.iter().zip(new_bases).enumerate() {
        if p >= k {
            return Err(Error::InvalidSubstitution(format!(
                "offset {p} outside window of {k}"
            )));
        }
        if !is_base(new) {
            return Err(Error::InvalidSubstitution(format!(
                "replacement {:?} is not a nucleotide",
                new as char
            )));
        }
        let old = positions[..i]
            .iter()
            .rposition(|&q| q == p)
            .map_or(window[p], |j| new_bases[j]);
        let fd = (k - 1 - p) as u32;
        fwd ^= srol_table(old, fd) ^ srol_table(new, fd);
        rev ^= srol_table(old & CP_OFF, p as u32) ^ srol_table(new & CP_OFF, p as u32);
    }
    Ok((fwd, rev))
}

#[inline(always)]
pub(crate) fn next_forward_hash(prev: u64, k: u16, char_out: u8, char_in: u8) -> u64 {
    let mut h = srol(prev);
    h ^= SEED_TAB[char_in as usize];
    h ^= srol_table(char_out, k as u32);
    h
}

#[inline(always)]
pub(crate) fn prev_forward_hash(prev: u64, k: u16, char_out: u8, char_in: u8) -> u64 {
    let mut h = prev ^ srol_table(char_in, k as u32);
    h ^= SEED_TAB[char_out as usize];
    sror(h)
}

#[inline(always)]
pub(crate) fn next_reverse_hash(prev: u64, k: u16, char_out: u8, char_in: u8) -> u64 {
    let mut h = prev ^ srol_table(char_in & CP_OFF, k as u32);
    h ^= SEED_TAB[(char_out & CP_OFF) as usize];
    sror(h)
}

#[inline(always)]
pub(crate) fn prev_reverse_hash(prev: u64, k: u16, char_out: u8, char_in: u8) -> u64 {
    let mut h = srol(prev);
    h ^= SEED_TAB[(char_in & CP_OFF) as usize];
    h ^= srol_table(char_out & CP_OFF, k as u32);
    h
}

// -------------------------------------------------------------------------
// Builder + Iterator facade
// -------------------------------------------------------------------------

/// Configure and consume a rolling-hash computation as an iterator.
pub struct NtHashBuilder<'a> {
    seq: &'a [u8],
    k: u16,
    num_hashes: u8,
    pos: usize,
}

impl<'a> NtHashBuilder<'a> {
    /// Begin building over `seq`.
    pub fn new(seq: &'a [u8]) -> Self {
        NtHashBuilder {
            seq,
            k: 0,
            num_hashes: 1,
            pos: 0,
        }
    }

    /// Set the k-mer length.
    pub fn k(mut self, k: u16) -> Self {
        self.k = k;
        self
    }

    /// Set how many hashes per k-mer.
    pub fn num_hashes(mut self, m: u8) -> Self {
        self.num_hashes = m;
        self
    }

    /// Set the starting position.
    pub fn pos(mut self, pos: usize) -> Self {
        self.pos = pos;
        self
    }

    /// Finalize into an iterator.
    pub fn finish(self) -> Result<NtHashIter<'a>> {
        let hasher = NtHash::new(self.seq, self.k, self.num_hashes, self.pos)?;
        Ok(NtHashIter {
            hasher,
            done: false,
        })
    }
}

/// Iterator yielding `(pos, Vec<u64>)` for each valid k-mer.
pub struct NtHashIter<'a> {
    hasher: NtHash<'a>,
    done: bool,
}

impl<'a> Iterator for NtHashIter<'a> {
    type Item = (usize, Vec<u64>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.hasher.roll() {
            self.done = true;
            return None;
        }
        Some((self.hasher.pos(), self.hasher.hashes().to_owned()))
    }
}

impl<'a> IntoIterator for NtHashBuilder<'a> {
    type Item = (usize, Vec<u64>);
    type IntoIter = NtHashIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.finish().expect("invalid NtHashBuilder configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::reverse_complement;

    fn fresh(seq: &[u8], k: u16, m: u8) -> Vec<u64> {
        let mut h = NtHash::new(seq, k, m, 0).unwrap();
        assert!(h.roll());
        h.hashes().to_vec()
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(matches!(NtHash::new(b"ACGT", 0, 1, 0), Err(Error::InvalidK)));
        assert!(matches!(
            NtHash::new(b"ACGT", 2, 0, 0),
            Err(Error::InvalidHashCount)
        ));
        assert!(matches!(
            NtHash::new(b"ACG", 4, 1, 0),
            Err(Error::SequenceTooShort { seq_len: 3, k: 4 })
        ));
        assert!(matches!(
            NtHash::new(b"ACGTA", 4, 1, 2),
            Err(Error::PositionOutOfRange { pos: 2, .. })
        ));
    }

    #[test]
    fn rolling_matches_fresh_construction() {
        let seq = b"ATGCGTACGTAGCTAGCTAGGCTAGCATCGACTGACT";
        let k = 7;
        let mut h = NtHash::new(seq, k, 3, 0).unwrap();
        let mut n = 0;
        while h.roll() {
            let p = h.pos();
            assert_eq!(h.hashes(), fresh(&seq[p..p + k as usize], k, 3).as_slice());
            n += 1;
        }
        assert_eq!(n, seq.len() - k as usize + 1);
    }

    #[test]
    fn skips_windows_with_n() {
        let seq = b"ACGTNNACGTA";
        let positions: Vec<usize> = NtHashBuilder::new(seq)
            .k(4)
            .into_iter()
            .map(|(p, _)| p)
            .collect();
        assert_eq!(positions, vec![0, 6, 7]);
    }

    #[test]
    fn exhausted_roll_keeps_state() {
        let mut h = NtHash::new(b"ACGTN", 4, 2, 0).unwrap();
        assert!(h.roll());
        let before = h.hashes().to_vec();
        assert!(!h.roll());
        assert_eq!(h.pos(), 0);
        assert_eq!(h.hashes(), before.as_slice());
    }

    #[test]
    fn roll_back_jumps_over_n() {
        let seq = b"ACGTANGGCAT";
        let mut h = NtHash::new(seq, 4, 1, 6).unwrap();
        assert!(h.roll());
        assert_eq!(h.pos(), 6);
        assert!(h.roll_back());
        assert_eq!(h.pos(), 1);
        assert_eq!(h.hashes(), fresh(&seq[1..5], 4, 1).as_slice());
        assert!(h.roll_back());
        assert_eq!(h.pos(), 0);
        assert!(!h.roll_back());
    }

    #[test]
    fn lowercase_and_uracil_hash_like_dna() {
        assert_eq!(fresh(b"acgtt", 5, 2), fresh(b"ACGTT", 5, 2));
        assert_eq!(fresh(b"ACGUU", 5, 2), fresh(b"ACGTT", 5, 2));
    }

    #[test]
    fn canonical_hash_is_strand_independent() {
        let seq = b"GATTACAGATTACA";
        let rc = reverse_complement(seq);
        assert_eq!(fresh(seq, 14, 4), fresh(&rc, 14, 4));
    }

    #[test]
    fn peek_does_not_move() {
        let seq = b"ACGTACGTTG";
        let mut h = NtHash::new(seq, 4, 2, 0).unwrap();
        assert!(h.roll());
        let fwd = h.forward_hash();
        assert!(h.peek());
        let peeked = h.hashes().to_vec();
        assert_eq!(h.pos(), 0);
        assert_eq!(h.forward_hash(), fwd);
        assert!(h.roll());
        assert_eq!(h.hashes(), peeked.as_slice());

        assert!(h.peek_back());
        assert_eq!(h.hashes(), fresh(&seq[0..4], 4, 2).as_slice());
        assert_eq!(h.pos(), 1);
        assert!(!h.peek_char(b'N'));
    }

    #[test]
    fn sub_matches_substituted_sequence() {
        let seq = b"ACGTACGTAC";
        let mut h = NtHash::new(seq, 6, 3, 0).unwrap();
        assert!(h.roll());
        assert!(h.roll());
        h.sub(&[0, 3, 5], b"TTG").unwrap();
        assert_eq!(h.hashes(), fresh(b"TGTTCG", 6, 3).as_slice());
        assert_eq!(h.pos(), 1);

        // repeated offset applies on top of the first replacement
        h.sub(&[2, 2], b"CA").unwrap();
        assert_eq!(h.hashes(), fresh(b"CGAACG", 6, 3).as_slice());
    }

    #[test]
    fn sub_rejects_bad_requests() {
        let mut h = NtHash::new(b"ACGTAC", 6, 1, 0).unwrap();
        assert!(h.sub(&[6], b"A").is_err());
        assert!(h.sub(&[1], b"N").is_err());
        assert!(h.sub(&[1, 2], b"A").is_err());
        let mut none = NtHash::new(b"NNNNNN", 3, 1, 0).unwrap();
        assert!(matches!(
            none.sub(&[0], b"A"),
            Err(Error::InvalidSubstitution(_))
        ));
    }

    #[test]
    fn state_tracks_cursor() {
        let mut h = NtHash::new(b"ACGTAC", 3, 2, 0).unwrap();
        assert_eq!(h.state().pos(), -1);
        h.roll();
        h.roll();
        assert_eq!(h.state().pos(), 1);
        assert_eq!(h.state().window_len(), 3);
        assert_eq!(h.hash_count(), 2);
    }
}

//! **Spaced-seed ntHash** for *non-contiguous* k-mers.
//!
//! **`SeedNtHash` hashes only selected positions of each window** ("care
//! sites"), once per spaced seed, giving every seed its own hash sub-space.
//!
//! Hashes are rolled, not recomputed: when a window shifts by one base only
//! the positions where a mask switches between care and don't-care (plus the
//! two window ends) change their contribution, so a shift costs
//! O(number of mask blocks) per seed.
//!
//! A **builder + iterator** (`SeedNtHashBuilder` / `SeedNtHashIter`)
//! provides traversal over valid k-mers.

use crate::{
    constants::{is_base, CP_OFF},
    kmer::{check_window, next_valid_window, prev_valid_window},
    state::{HashState, RollingHash},
    tables::{srol, srol_table, sror},
    util::extend_hashes,
    Error, Result,
};

/// A parsed spaced-seed mask.
///
/// `care` lists the offsets that are hashed; `edges` lists every boundary
/// `j` in `0..=k` where `mask[j - 1] != mask[j]` (positions outside the mask
/// count as don't-care). Only edge bases change the hash when rolling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpacedSeed {
    mask: String,
    care: Vec<usize>,
    edges: Vec<usize>,
}

impl SpacedSeed {
    /// Parse a mask of `'0'` / `'1'` characters.
    ///
    /// # Errors
    /// `SeedLengthMismatch` if the mask is not `k` long, `InvalidSeed` if it
    /// holds other characters or no `'1'` at all.
    pub fn parse(mask: &str, k: u16) -> Result<Self> {
        if mask.len() != k as usize {
            return Err(Error::SeedLengthMismatch { len: mask.len(), k });
        }
        if !mask.bytes().all(|b| b == b'0' || b == b'1') {
            return Err(Error::InvalidSeed {
                seed: mask.to_owned(),
                reason: "mask characters must be '0' or '1'",
            });
        }
        let care: Vec<usize> = mask
            .bytes()
            .enumerate()
            .filter_map(|(i, b)| (b == b'1').then_some(i))
            .collect();
        Self::from_parts(mask.to_owned(), care)
    }

    /// Build a seed from explicit care offsets into a window of `k`.
    pub fn from_care_indices(care: &[usize], k: u16) -> Result<Self> {
        let k_usz = k as usize;
        if care.iter().any(|&i| i >= k_usz) {
            return Err(Error::InvalidWindowOffsets);
        }
        let mut mask = vec![b'0'; k_usz];
        for &i in care {
            mask[i] = b'1';
        }
        let mask: String = mask.into_iter().map(char::from).collect();
        Self::parse(&mask, k)
    }

    fn from_parts(mask: String, care: Vec<usize>) -> Result<Self> {
        if care.is_empty() {
            return Err(Error::InvalidSeed {
                seed: mask,
                reason: "mask has no care position",
            });
        }
        let m = mask.as_bytes();
        let k = m.len();
        let is_care = |j: usize| j < k && m[j] == b'1';
        let edges = (0..=k)
            .filter(|&j| {
                let prev = j > 0 && is_care(j - 1);
                prev != is_care(j)
            })
            .collect();
        Ok(Self { mask, care, edges })
    }

    #[inline]
    pub fn mask(&self) -> &str {
        &self.mask
    }

    #[inline]
    pub fn care(&self) -> &[usize] {
        &self.care
    }

    /// Number of care positions.
    #[inline]
    pub fn weight(&self) -> usize {
        self.care.len()
    }

    /// Strand hashes of the seed over `window`, computed from scratch.
    #[inline]
    pub fn hash_pair(&self, window: &[u8]) -> (u64, u64) {
        let k = self.mask.len();
        let mut fwd = 0u64;
        let mut rev = 0u64;
        for &p in &self.care {
            let c = window[p];
            fwd ^= srol_table(c, (k - 1 - p) as u32);
            rev ^= srol_table(c & CP_OFF, p as u32);
        }
        (fwd, rev)
    }

    /// Contribution of the edge bases of the span starting at the lower of
    /// two adjacent windows. `at(j)` yields the base at offset `j` in `0..=k`.
    #[inline]
    fn shift_delta(&self, at: impl Fn(usize) -> u8) -> (u64, u64) {
        let k = self.mask.len();
        let mut df = 0u64;
        let mut dr = 0u64;
        for &j in &self.edges {
            let c = at(j);
            df ^= srol_table(c, (k - j) as u32);
            dr ^= srol_table(c & CP_OFF, j as u32);
        }
        (df, dr)
    }
}

/// Spaced-seed ntHash over a borrowed sequence, one hash sub-space per seed.
///
/// Hash slots are laid out seed-major: seed `s`, hash `i` lives at
/// `s * num_hashes_per_seed + i`.
#[derive(Clone, Debug)]
pub struct SeedNtHash<'a> {
    seq: &'a [u8],
    k: u16,
    num_hashes: usize,
    seeds: Vec<SpacedSeed>,
    pos: usize,
    fwd_hashes: Vec<u64>,
    rev_hashes: Vec<u64>,
    state: HashState,
    initialised: bool,
}

impl<'a> SeedNtHash<'a> {
    /// Creates a new hasher from a sequence and spaced-seed masks.
    ///
    /// # Errors
    /// Returns an error if `k` is zero, no seed or zero hashes are requested,
    /// the sequence is too short, `start_pos` is past the last window, or a
    /// mask is invalid.
    pub fn new<S: AsRef<str>>(
        seq: &'a [u8],
        seed_masks: &[S],
        num_hashes_per_seed: usize,
        k: u16,
        start_pos: usize,
    ) -> Result<Self> {
        let seeds = seed_masks
            .iter()
            .map(|m| SpacedSeed::parse(m.as_ref(), k))
            .collect::<Result<Vec<_>>>()?;
        Self::with_seeds(seq, seeds, num_hashes_per_seed, k, start_pos)
    }

    /// Constructor using pre-parsed care indices (one list per seed).
    pub fn from_care_indices(
        seq: &'a [u8],
        seeds: &[Vec<usize>],
        num_hashes_per_seed: usize,
        k: u16,
        start_pos: usize,
    ) -> Result<Self> {
        let seeds = seeds
            .iter()
            .map(|care| SpacedSeed::from_care_indices(care, k))
            .collect::<Result<Vec<_>>>()?;
        Self::with_seeds(seq, seeds, num_hashes_per_seed, k, start_pos)
    }

    /// Constructor over already parsed seeds.
    pub fn with_seeds(
        seq: &'a [u8],
        seeds: Vec<SpacedSeed>,
        num_hashes_per_seed: usize,
        k: u16,
        start_pos: usize,
    ) -> Result<Self> {
        if num_hashes_per_seed == 0 || num_hashes_per_seed > u8::MAX as usize {
            return Err(Error::InvalidHashCount);
        }
        check_window(seq.len(), k, num_hashes_per_seed as u8, start_pos)?;
        if seeds.is_empty() {
            return Err(Error::InvalidParameter(
                "at least one spaced seed is required".into(),
            ));
        }
        if let Some(s) = seeds.iter().find(|s| s.mask.len() != k as usize) {
            return Err(Error::SeedLengthMismatch {
                len: s.mask.len(),
                k,
            });
        }

        let masks = seeds.iter().map(|s| s.mask.clone()).collect();
        let n = seeds.len();
        Ok(Self {
            seq,
            k,
            num_hashes: num_hashes_per_seed,
            state: HashState::new(k as u32, (n * num_hashes_per_seed) as u32, Some(masks)),
            seeds,
            pos: start_pos,
            fwd_hashes: vec![0; n],
            rev_hashes: vec![0; n],
            initialised: false,
        })
    }

    /// Returns the current position in the sequence.
    #[inline(always)]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Returns the current set of hash values.
    #[inline(always)]
    pub fn hashes(&self) -> &[u64] {
        self.state.hashes()
    }

    /// Forward-strand hash of every seed for the current window.
    #[inline(always)]
    pub fn forward_hashes(&self) -> &[u64] {
        &self.fwd_hashes
    }

    /// Reverse-complement hash of every seed for the current window.
    #[inline(always)]
    pub fn reverse_hashes(&self) -> &[u64] {
        &self.rev_hashes
    }

    #[inline(always)]
    pub fn seeds(&self) -> &[SpacedSeed] {
        &self.seeds
    }

    #[inline(always)]
    pub fn k(&self) -> u16 {
        self.k
    }

    /// Hashes emitted per seed.
    #[inline(always)]
    pub fn hashes_per_seed(&self) -> usize {
        self.num_hashes
    }

    #[inline(always)]
    pub fn state(&self) -> &HashState {
        &self.state
    }

    /// Advances by one position, jumping over windows with invalid bases.
    /// On first call, searches for the first valid k-mer (initialization).
    pub fn roll(&mut self) -> bool {
        if !self.initialised {
            return self.init();
        }
        let k = self.k as usize;
        if self.pos >= self.seq.len() - k {
            return false;
        }
        let incoming = self.seq[self.pos + k];
        if !is_base(incoming) {
            return match next_valid_window(self.seq, k, self.pos + k + 1) {
                Some(start) => {
                    self.reset_at(start);
                    true
                }
                None => false,
            };
        }
        let (seq, pos) = (self.seq, self.pos);
        for (i, seed) in self.seeds.iter().enumerate() {
            let (df, dr) = seed.shift_delta(|j| seq[pos + j]);
            self.fwd_hashes[i] = srol(self.fwd_hashes[i]) ^ df;
            self.rev_hashes[i] = sror(self.rev_hashes[i] ^ dr);
        }
        self.pos += 1;
        self.commit();
        true
    }

    /// Moves back by one position, jumping over windows with invalid bases.
    pub fn roll_back(&mut self) -> bool {
        if !self.initialised {
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
        let (seq, lower) = (self.seq, self.pos - 1);
        for (i, seed) in self.seeds.iter().enumerate() {
            let (df, dr) = seed.shift_delta(|j| seq[lower + j]);
            self.fwd_hashes[i] = sror(self.fwd_hashes[i] ^ df);
            self.rev_hashes[i] = srol(self.rev_hashes[i]) ^ dr;
        }
        self.pos = lower;
        self.commit();
        true
    }

    /// Hashes of the next window, written to the output slots without moving.
    pub fn peek(&mut self) -> bool {
        if !self.initialised && !self.init() {
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
        if !self.initialised && !self.init() {
            return false;
        }
        if !is_base(incoming) {
            return false;
        }
        let (seq, pos, k) = (self.seq, self.pos, self.k as usize);
        let at = |j: usize| if j == k { incoming } else { seq[pos + j] };
        for (i, seed) in self.seeds.iter().enumerate() {
            let (df, dr) = seed.shift_delta(at);
            let fwd = srol(self.fwd_hashes[i]) ^ df;
            let rev = sror(self.rev_hashes[i] ^ dr);
            let slots = &mut self.state.hashes_mut()[i * self.num_hashes..(i + 1) * self.num_hashes];
            extend_hashes(fwd, rev, k as u32, slots);
        }
        true
    }

    /// Hashes of the previous window, written to the output slots without
    /// moving.
    pub fn peek_back(&mut self) -> bool {
        if !self.initialised && !self.init() {
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
        if !self.initialised && !self.init() {
            return false;
        }
        if !is_base(incoming) {
            return false;
        }
        let (seq, pos, k) = (self.seq, self.pos, self.k as usize);
        // offsets are relative to the window one base to the left
        let at = |j: usize| if j == 0 { incoming } else { seq[pos + j - 1] };
        for (i, seed) in self.seeds.iter().enumerate() {
            let (df, dr) = seed.shift_delta(at);
            let fwd = sror(self.fwd_hashes[i] ^ df);
            let rev = srol(self.rev_hashes[i]) ^ dr;
            let slots = &mut self.state.hashes_mut()[i * self.num_hashes..(i + 1) * self.num_hashes];
            extend_hashes(fwd, rev, k as u32, slots);
        }
        true
    }

    /// Initializes by finding the first valid k-mer at or after `pos`.
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
        let window = &self.seq[start..start + self.k as usize];
        for (i, seed) in self.seeds.iter().enumerate() {
            let (fwd, rev) = seed.hash_pair(window);
            self.fwd_hashes[i] = fwd;
            self.rev_hashes[i] = rev;
        }
        self.pos = start;
        self.initialised = true;
        self.commit();
    }

    fn commit(&mut self) {
        self.state.set_pos(self.pos);
        let m = self.num_hashes;
        let k = self.k as u32;
        let slots = self.state.hashes_mut();
        for (i, (&fwd, &rev)) in self.fwd_hashes.iter().zip(&self.rev_hashes).enumerate() {
            extend_hashes(fwd, rev, k, &mut slots[i * m..(i + 1) * m]);
        }
    }
}

impl RollingHash for SeedNtHash<'_> {
    fn roll(&mut self) -> bool {
        SeedNtHash::roll(self)
    }

    fn roll_back(&mut self) -> bool {
        SeedNtHash::roll_back(self)
    }

    fn state(&self) -> &HashState {
        &self.state
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Builder + Iterator facade
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for creating a `SeedNtHashIter`.
///
/// Example:
/// ```rust
/// use kmer_bloom::{SeedNtHashBuilder, Result};
///
/// # fn main() -> Result<()> {
/// let seq   = b"ATCGTACGATGCATGCATGCTGACG";
/// let masks = vec!["000111", "010101"];
///
/// for (pos, hashes) in SeedNtHashBuilder::new(seq)
///                        .k(6)
///                        .masks(masks)
///                        .num_hashes(2)
///                        .finish()? {
///     println!("{pos:2}  {:016x}", hashes[0]);
/// }
/// # Ok(()) }
/// ```
pub struct SeedNtHashBuilder<'a> {
    seq: &'a [u8],
    masks: Vec<String>,
    k: u16,
    num_hashes: usize,
    start_pos: usize,
}

impl<'a> SeedNtHashBuilder<'a> {
    /// Starts building a new configuration from the given sequence.
    pub fn new(seq: &'a [u8]) -> Self {
        Self {
            seq,
            masks: Vec::new(),
            k: 0,
            num_hashes: 1,
            start_pos: 0,
        }
    }

    /// Sets the k-mer size.
    pub fn k(mut self, k: u16) -> Self {
        self.k = k;
        self
    }

    /// Sets seed masks where '1' indicates positions to hash.
    pub fn masks<S: Into<String>, I: IntoIterator<Item = S>>(mut self, m: I) -> Self {
        self.masks = m.into_iter().map(Into::into).collect();
        self
    }

    /// Specifies number of hashes per spaced seed.
    pub fn num_hashes(mut self, n: usize) -> Self {
        self.num_hashes = n;
        self
    }

    /// Sets the start position in the sequence.
    pub fn pos(mut self, p: usize) -> Self {
        self.start_pos = p;
        self
    }

    /// Finalizes the builder and returns an iterator over the hashes.
    pub fn finish(self) -> Result<SeedNtHashIter<'a>> {
        let hasher = SeedNtHash::new(
            self.seq,
            self.masks.as_slice(),
            self.num_hashes,
            self.k,
            self.start_pos,
        )?;
        Ok(SeedNtHashIter {
            hasher,
            done: false,
        })
    }
}

/// Iterator over valid k-mers yielding spaced-seed hashes.
pub struct SeedNtHashIter<'a> {
    hasher: SeedNtHash<'a>,
    done: bool,
}

impl<'a> Iterator for SeedNtHashIter<'a> {
    type Item = (usize, Vec<u64>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.hasher.roll() {
            self.done = true;
            return None;
        }
        Some((self.hasher.pos(), self.hasher.hashes().to_vec()))
    }
}

impl<'a> IntoIterator for SeedNtHashBuilder<'a> {
    type Item = (usize, Vec<u64>);
    type IntoIter = SeedNtHashIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.finish()
            .expect("invalid SeedNtHashBuilder configuration")
    }
}

//! **aaHash**: rolling hashes over amino-acid k-mers.
//!
//! Residues are hashed through per-level equivalence classes; at level 1
//! every standard residue is its own class, levels 2 and 3 merge
//! physico-chemically similar residues so that, for example, `I` and `V`
//! hash identically from level 2 on. Bytes outside the 20 standard residues
//! invalidate their windows, which are skipped.
//!
//! Protein windows have no reverse complement, so the base value is the
//! forward hash itself; extra values come from `util::extend_base`.
//!
//! [`SeedAaHash`] mixes levels inside a window: each position of a seed
//! string names the level it is hashed at, `0` leaving it out.

use crate::{
    constants::{AA_LEVEL_CLASSES, AA_SEED_NONE, AA_SEED_TAB},
    kmer::check_window,
    state::{HashState, RollingHash},
    tables::{srol, srol_by, sror},
    util::extend_base,
    Error, Result,
};

#[inline(always)]
fn aa_seed(c: u8, level: u8) -> u64 {
    AA_SEED_TAB[level as usize - 1][c as usize]
}

#[inline(always)]
fn is_residue(c: u8) -> bool {
    AA_SEED_TAB[0][c as usize] != AA_SEED_NONE
}

fn check_level(level: u8) -> Result<u8> {
    if (1..=AA_LEVEL_CLASSES.len() as u8).contains(&level) {
        Ok(level)
    } else {
        Err(Error::InvalidLevel(level))
    }
}

/// Start of the first all-residue window at or after `from`.
fn next_residue_window(seq: &[u8], k: usize, mut from: usize) -> Option<usize> {
    while from + k <= seq.len() {
        match seq[from..from + k].iter().rposition(|&c| !is_residue(c)) {
            Some(skip) => from += skip + 1,
            None => return Some(from),
        }
    }
    None
}

/// Start of the last all-residue window ending at or before `end`.
fn prev_residue_window(seq: &[u8], k: usize, mut end: usize) -> Option<usize> {
    while end >= k {
        let start = end - k;
        match seq[start..end].iter().position(|&c| !is_residue(c)) {
            Some(idx) => end = start + idx,
            None => return Some(start),
        }
    }
    None
}

/// Hash of `window` at a single level.
#[inline]
pub fn aahash_base(window: &[u8], level: u8) -> u64 {
    window.iter().fold(0, |h, &c| srol(h) ^ aa_seed(c, level))
}

/// Rolling amino-acid hasher at a fixed reduction level.
#[derive(Clone, Debug)]
pub struct AaHash<'a> {
    seq: &'a [u8],
    k: u16,
    level: u8,
    pos: usize,
    initialized: bool,
    fwd_hash: u64,
    state: HashState,
}

impl<'a> AaHash<'a> {
    /// Create a hasher over `seq` at `level` (1..=3), starting at `pos`.
    ///
    /// # Errors
    ///
    /// `InvalidLevel` plus the window checks shared with [`NtHash`](crate::NtHash).
    pub fn new(seq: &'a [u8], k: u16, num_hashes: u8, level: u8, pos: usize) -> Result<Self> {
        let level = check_level(level)?;
        check_window(seq.len(), k, num_hashes, pos)?;
        Ok(Self {
            seq,
            k,
            level,
            pos,
            initialized: false,
            fwd_hash: 0,
            state: HashState::new(k as u32, num_hashes as u32, None),
        })
    }

    /// Advance one residue, skipping windows with invalid characters.
    pub fn roll(&mut self) -> bool {
        if !self.initialized {
            return self.init();
        }
        let k = self.k as usize;
        if self.pos >= self.seq.len() - k {
            return false;
        }
        let incoming = self.seq[self.pos + k];
        if !is_residue(incoming) {
            return match next_residue_window(self.seq, k, self.pos + k + 1) {
                Some(start) => {
                    self.reset_at(start);
                    true
                }
                None => false,
            };
        }
        self.fwd_hash = self.next_hash(self.seq[self.pos], incoming);
        self.pos += 1;
        self.commit();
        true
    }

    /// Move back one residue, skipping windows with invalid characters.
    pub fn roll_back(&mut self) -> bool {
        if !self.initialized {
            return self.init();
        }
        if self.pos == 0 {
            return false;
        }
        let incoming = self.seq[self.pos - 1];
        if !is_residue(incoming) {
            return match prev_residue_window(self.seq, self.k as usize, self.pos - 1) {
                Some(start) => {
                    self.reset_at(start);
                    true
                }
                None => false,
            };
        }
        let outgoing = self.seq[self.pos + self.k as usize - 1];
        self.fwd_hash = self.prev_hash(outgoing, incoming);
        self.pos -= 1;
        self.commit();
        true
    }

    /// Hash the next window into the output slots without moving.
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

    /// Like [`peek`](Self::peek), with `incoming` entering the window instead
    /// of the next residue of the sequence.
    pub fn peek_char(&mut self, incoming: u8) -> bool {
        if !self.initialized && !self.init() {
            return false;
        }
        if !is_residue(incoming) {
            return false;
        }
        let h = self.next_hash(self.seq[self.pos], incoming);
        extend_base(h, self.k as u32, self.state.hashes_mut());
        true
    }

    /// Hash the previous window into the output slots without moving.
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

    pub fn peek_back_char(&mut self, incoming: u8) -> bool {
        if !self.initialized && !self.init() {
            return false;
        }
        if !is_residue(incoming) {
            return false;
        }
        let outgoing = self.seq[self.pos + self.k as usize - 1];
        let h = self.prev_hash(outgoing, incoming);
        extend_base(h, self.k as u32, self.state.hashes_mut());
        true
    }

    #[inline(always)]
    pub fn hashes(&self) -> &[u64] {
        self.state.hashes()
    }

    #[inline(always)]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Base (level-reduced) hash of the current window.
    #[inline(always)]
    pub fn forward_hash(&self) -> u64 {
        self.fwd_hash
    }

    #[inline(always)]
    pub fn k(&self) -> u16 {
        self.k
    }

    #[inline(always)]
    pub fn level(&self) -> u8 {
        self.level
    }

    #[inline(always)]
    pub fn state(&self) -> &HashState {
        &self.state
    }

    #[inline(always)]
    fn next_hash(&self, out: u8, incoming: u8) -> u64 {
        srol(self.fwd_hash)
            ^ srol_by(aa_seed(out, self.level), self.k as u32)
            ^ aa_seed(incoming, self.level)
    }

    #[inline(always)]
    fn prev_hash(&self, out: u8, incoming: u8) -> u64 {
        sror(
            self.fwd_hash
                ^ srol_by(aa_seed(incoming, self.level), self.k as u32)
                ^ aa_seed(out, self.level),
        )
    }

    fn init(&mut self) -> bool {
        match next_residue_window(self.seq, self.k as usize, self.pos) {
            Some(start) => {
                self.reset_at(start);
                true
            }
            None => false,
        }
    }

    fn reset_at(&mut self, start: usize) {
        self.pos = start;
        self.fwd_hash = aahash_base(&self.seq[start..start + self.k as usize], self.level);
        self.initialized = true;
        self.commit();
    }

    fn commit(&mut self) {
        self.state.set_pos(self.pos);
        extend_base(self.fwd_hash, self.k as u32, self.state.hashes_mut());
    }
}

impl RollingHash for AaHash<'_> {
    fn roll(&mut self) -> bool {
        AaHash::roll(self)
    }

    fn roll_back(&mut self) -> bool {
        AaHash::roll_back(self)
    }

    fn state(&self) -> &HashState {
        &self.state
    }
}

/// Seed of residue `c` at `level`; level `0` contributes nothing.
#[inline(always)]
fn level_seed(c: u8, level: u8) -> u64 {
    if level == 0 {
        0
    } else {
        aa_seed(c, level)
    }
}

/// Per-position level seed of [`SeedAaHash`]: `levels[p]` is the level
/// residue `p` is hashed at, `0` for don't-care.
///
/// `edges` lists every boundary `j` in `0..=k` where the level changes
/// between offsets `j - 1` and `j` (offsets outside the window count as
/// level 0); only residues on an edge change the hash when the window shifts.
#[derive(Clone, Debug, PartialEq, Eq)]
struct LevelSeed {
    levels: Vec<u8>,
    edges: Vec<usize>,
}

impl LevelSeed {
    fn parse(seed: &str, k: u16) -> Result<Self> {
        if seed.len() != k as usize {
            return Err(Error::SeedLengthMismatch { len: seed.len(), k });
        }
        let levels: Vec<u8> = seed.bytes().map(|b| b.wrapping_sub(b'0')).collect();
        if levels.iter().any(|&l| l > AA_LEVEL_CLASSES.len() as u8) {
            return Err(Error::InvalidSeed {
                seed: seed.to_owned(),
                reason: "levels must be digits 0 to 3",
            });
        }
        if levels.iter().all(|&l| l == 0) {
            return Err(Error::InvalidSeed {
                seed: seed.to_owned(),
                reason: "seed has no care position",
            });
        }
        let mut seed = Self {
            levels,
            edges: Vec::new(),
        };
        let edges = (0..=seed.levels.len())
            .filter(|&j| seed.level_before(j) != seed.level_at(j))
            .collect();
        seed.edges = edges;
        Ok(seed)
    }

    #[inline(always)]
    fn level_at(&self, j: usize) -> u8 {
        self.levels.get(j).copied().unwrap_or(0)
    }

    #[inline(always)]
    fn level_before(&self, j: usize) -> u8 {
        if j == 0 {
            0
        } else {
            self.level_at(j - 1)
        }
    }

    fn hash(&self, window: &[u8]) -> u64 {
        let k = self.levels.len();
        window
            .iter()
            .zip(&self.levels)
            .enumerate()
            .fold(0, |h, (p, (&c, &l))| {
                h ^ srol_by(level_seed(c, l), (k - 1 - p) as u32)
            })
    }

    /// Difference between the rotated lower window and the upper one, over
    /// the span starting at the lower window. `at(j)` yields the residue at
    /// offset `j` in `0..=k`.
    #[inline]
    fn shift_delta(&self, at: impl Fn(usize) -> u8) -> u64 {
        let k = self.levels.len();
        self.edges.iter().fold(0, |d, &j| {
            let c = at(j);
            let diff = level_seed(c, self.level_before(j)) ^ level_seed(c, self.level_at(j));
            d ^ srol_by(diff, (k - j) as u32)
        })
    }
}

/// Amino-acid hasher with a reduction level chosen per window position.
///
/// Hash slots are seed-major, as in [`SeedNtHash`](crate::SeedNtHash). A
/// shift costs one lookup per level edge of each seed.
#[derive(Clone, Debug)]
pub struct SeedAaHash<'a> {
    seq: &'a [u8],
    k: u16,
    num_hashes: usize,
    seeds: Vec<LevelSeed>,
    fwd_hashes: Vec<u64>,
    pos: usize,
    initialized: bool,
    state: HashState,
}

impl<'a> SeedAaHash<'a> {
    /// # Errors
    ///
    /// Window checks as for [`AaHash`]; `InvalidSeed` / `SeedLengthMismatch`
    /// for malformed seeds; `InvalidParameter` without any seed.
    pub fn new<S: AsRef<str>>(
        seq: &'a [u8],
        seeds: &[S],
        num_hashes_per_seed: usize,
        k: u16,
        pos: usize,
    ) -> Result<Self> {
        if num_hashes_per_seed == 0 || num_hashes_per_seed > u8::MAX as usize {
            return Err(Error::InvalidHashCount);
        }
        check_window(seq.len(), k, num_hashes_per_seed as u8, pos)?;
        if seeds.is_empty() {
            return Err(Error::InvalidParameter(
                "at least one level seed is required".into(),
            ));
        }
        let parsed = seeds
            .iter()
            .map(|s| LevelSeed::parse(s.as_ref(), k))
            .collect::<Result<Vec<_>>>()?;
        let masks = seeds.iter().map(|s| s.as_ref().to_owned()).collect();
        Ok(Self {
            seq,
            k,
            num_hashes: num_hashes_per_seed,
            state: HashState::new(
                k as u32,
                (parsed.len() * num_hashes_per_seed) as u32,
                Some(masks),
            ),
            fwd_hashes: vec![0; parsed.len()],
            seeds: parsed,
            pos,
            initialized: false,
        })
    }

    pub fn roll(&mut self) -> bool {
        if !self.initialized {
            return self.init();
        }
        let k = self.k as usize;
        if self.pos >= self.seq.len() - k {
            return false;
        }
        let incoming = self.seq[self.pos + k];
        if !is_residue(incoming) {
            return match next_residue_window(self.seq, k, self.pos + k + 1) {
                Some(start) => {
                    self.reset_at(start);
                    true
                }
                None => false,
            };
        }
        let (seq, pos) = (self.seq, self.pos);
        for (fwd, seed) in self.fwd_hashes.iter_mut().zip(&self.seeds) {
            *fwd = srol(*fwd) ^ seed.shift_delta(|j| seq[pos + j]);
        }
        self.pos += 1;
        self.commit();
        true
    }

    pub fn roll_back(&mut self) -> bool {
        if !self.initialized {
            return self.init();
        }
        if self.pos == 0 {
            return false;
        }
        let incoming = self.seq[self.pos - 1];
        if !is_residue(incoming) {
            return match prev_residue_window(self.seq, self.k as usize, self.pos - 1) {
                Some(start) => {
                    self.reset_at(start);
                    true
                }
                None => false,
            };
        }
        let (seq, lower) = (self.seq, self.pos - 1);
        for (fwd, seed) in self.fwd_hashes.iter_mut().zip(&self.seeds) {
            *fwd = sror(*fwd ^ seed.shift_delta(|j| seq[lower + j]));
        }
        self.pos = lower;
        self.commit();
        true
    }

    #[inline(always)]
    pub fn hashes(&self) -> &[u64] {
        self.state.hashes()
    }

    /// Base hash of every seed for the current window.
    #[inline(always)]
    pub fn forward_hashes(&self) -> &[u64] {
        &self.fwd_hashes
    }

    #[inline(always)]
    pub fn pos(&self) -> usize {
        self.pos
    }

    #[inline(always)]
    pub fn k(&self) -> u16 {
        self.k
    }

    #[inline(always)]
    pub fn hashes_per_seed(&self) -> usize {
        self.num_hashes
    }

    #[inline(always)]
    pub fn state(&self) -> &HashState {
        &self.state
    }

    fn init(&mut self) -> bool {
        match next_residue_window(self.seq, self.k as usize, self.pos) {
            Some(start) => {
                self.reset_at(start);
                true
            }
            None => false,
        }
    }

    fn reset_at(&mut self, start: usize) {
        let window = &self.seq[start..start + self.k as usize];
        for (fwd, seed) in self.fwd_hashes.iter_mut().zip(&self.seeds) {
            *fwd = seed.hash(window);
        }
        self.pos = start;
        self.initialized = true;
        self.commit();
    }

    fn commit(&mut self) {
        self.state.set_pos(self.pos);
        let m = self.num_hashes;
        let k = self.k as u32;
        let slots = self.state.hashes_mut();
        for (i, &fwd) in self.fwd_hashes.iter().enumerate() {
            extend_base(fwd, k, &mut slots[i * m..(i + 1) * m]);
        }
    }
}

impl RollingHash for SeedAaHash<'_> {
    fn roll(&mut self) -> bool {
        SeedAaHash::roll(self)
    }

    fn roll_back(&mut self) -> bool {
        SeedAaHash::roll_back(self)
    }

    fn state(&self) -> &HashState {
        &self.state
    }
}

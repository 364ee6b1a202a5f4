//! Per-window output and cursor bookkeeping of a rolling hasher.

/// The hash values of the current window plus where that window sits.
///
/// A `HashState` is owned by exactly one hasher and mutated in place by its
/// roll / peek / substitution operations. `hashes().len() == hash_count()`
/// always holds; with spaced seeds the slots are laid out seed-major
/// (`seed * hashes_per_seed + i`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashState {
    hashes: Vec<u64>,
    pos: i64,
    started: bool,
    window_len: u32,
    hash_count: u32,
    seed_masks: Option<Vec<String>>,
}

impl HashState {
    pub(crate) fn new(window_len: u32, hash_count: u32, seed_masks: Option<Vec<String>>) -> Self {
        Self {
            hashes: vec![0; hash_count as usize],
            pos: -1,
            started: false,
            window_len,
            hash_count,
            seed_masks,
        }
    }

    /// Hash values of the current window (or of the last peek/substitution).
    #[inline(always)]
    pub fn hashes(&self) -> &[u64] {
        &self.hashes
    }

    #[inline(always)]
    pub(crate) fn hashes_mut(&mut self) -> &mut [u64] {
        &mut self.hashes
    }

    /// Start offset of the current window; `-1` until the first window has
    /// been hashed. A blind hasher rolled back past where it was created
    /// reports negative offsets.
    #[inline(always)]
    pub fn pos(&self) -> i64 {
        self.pos
    }

    /// `true` once a window has been hashed.
    #[inline(always)]
    pub fn is_started(&self) -> bool {
        self.started
    }

    #[inline(always)]
    pub(crate) fn set_pos(&mut self, pos: usize) {
        self.set_offset(pos as i64);
    }

    #[inline(always)]
    pub(crate) fn set_offset(&mut self, pos: i64) {
        self.pos = pos;
        self.started = true;
    }

    /// Window length `k`.
    #[inline(always)]
    pub fn window_len(&self) -> u32 {
        self.window_len
    }

    /// Number of hash slots per window.
    #[inline(always)]
    pub fn hash_count(&self) -> u32 {
        self.hash_count
    }

    /// Spaced-seed masks the slots were computed with, if any.
    pub fn seed_masks(&self) -> Option<&[String]> {
        self.seed_masks.as_deref()
    }
}

/// A hasher that owns its sequence buffer and can move its window in both
/// directions.
///
/// Filters ingest sequences through this trait so that nucleotide, spaced-seed
/// and amino-acid hashers are interchangeable.
pub trait RollingHash {
    /// Advance to the next valid window. `false` once the sequence is exhausted.
    fn roll(&mut self) -> bool;

    /// Move back to the previous valid window. `false` at the start.
    fn roll_back(&mut self) -> bool;

    /// Output/cursor state of the current window.
    fn state(&self) -> &HashState;

    /// Hash values of the current window.
    #[inline(always)]
    fn hashes(&self) -> &[u64] {
        self.state().hashes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_unstarted() {
        let st = HashState::new(21, 4, None);
        assert_eq!(st.pos(), -1);
        assert!(!st.is_started());
        assert_eq!(st.hashes().len(), 4);
        assert!(st.seed_masks().is_none());
    }

    #[test]
    fn set_pos_starts_state() {
        let mut st = HashState::new(5, 2, Some(vec!["11011".into()]));
        st.set_pos(7);
        assert!(st.is_started());
        assert_eq!(st.pos(), 7);
        assert_eq!(st.seed_masks().unwrap(), ["11011".to_string()]);
    }

    #[test]
    fn negative_offset_still_counts_as_started() {
        let mut st = HashState::new(5, 1, None);
        st.set_offset(-3);
        assert!(st.is_started());
        assert_eq!(st.pos(), -3);
    }
}

//! # kmer-bloom
//!
//! Rolling **ntHash** multi-hashing over DNA, RNA and protein windows, and
//! the Bloom-filter family that consumes those hashes.
//!
//! This crate provides:
//! - [`kmer::NtHash`]: canonical contiguous-k-mer hasher that skips windows
//!   holding non-ACGTU bases.
//! - [`blind::BlindNtHash`]: rolls on caller-supplied characters, keeping only
//!   the current window.
//! - [`seed::SeedNtHash`]: spaced-seed hasher, one hash sub-space per mask.
//! - [`aahash::AaHash`] / [`aahash::SeedAaHash`]: protein windows at three
//!   residue-reduction levels.
//! - [`bloom`]: plain, k-mer, spaced-seed, counting and multi-indexed Bloom
//!   filters with a shared on-disk format.
//!
//! Bit-twiddling lives in the low-level modules (`tables`, `constants`);
//! canonicalization and hash extension live in `util`.
//!
//! ## Example
//!
//! ```rust
//! use kmer_bloom::{KmerBloomFilter, NtHash, Result};
//!
//! fn main() -> Result<()> {
//!     // 2 hashes per 4-mer over "ACGTNACGT", starting at pos=0
//!     let mut hasher = NtHash::new(b"ACGTNACGT", 4, 2, 0)?;
//!
//!     // First roll() initializes on the first valid window
//!     assert!(hasher.roll());
//!     let hashes = hasher.hashes();
//!     println!("first 4-mer: {:#x}, {:#x}", hashes[0], hashes[1]);
//!
//!     while hasher.roll() {
//!         println!("pos {} -> {:#x}", hasher.pos(), hasher.hashes()[0]);
//!     }
//!
//!     let mut filter = KmerBloomFilter::new(1024, 3, 4)?;
//!     filter.insert(b"ACGTACGT");
//!     assert_eq!(filter.contains(b"ACGTACGT"), 5);
//!     Ok(())
//! }
//! ```

mod constants;
mod tables;

pub mod aahash;
pub mod blind;
pub mod bloom;
pub mod kmer;
pub mod record;
pub mod seed;
pub mod state;
pub mod util;

// ──────────────────────────────────────────────────────────────
// Re-exports: public API surface
// --------------------------------------------------------------------------

/// One-bit split-rotate left (31 + 33 halves).
pub use tables::srol;
/// Split-rotate left by any distance.
pub use tables::srol_by;
/// Seed split-rotated via lookup tables.
pub use tables::srol_table;
/// One-bit split-rotate right (31 + 33 halves).
pub use tables::sror;

/// Combine forward and reverse hashes into a strand-independent value.
pub use util::canonical;
/// Derive multiple hash values from a single canonical hash.
pub use util::extend_hashes;

pub use state::{HashState, RollingHash};

/// Primary rolling k-mer hasher.
///
/// See [`kmer::NtHash`] for full documentation.
pub use kmer::NtHash;
pub use kmer::NtHashBuilder;
pub use kmer::NtHashIter;

pub use blind::BlindNtHash;
pub use blind::BlindNtHashBuilder;

pub use seed::SeedNtHash;
pub use seed::SeedNtHashBuilder;
pub use seed::SpacedSeed;

pub use aahash::{AaHash, SeedAaHash};

pub use bloom::{
    BloomFilter, CountingBloomFilter, KmerBloomFilter, KmerCountingBloomFilter, MiBloomFilter,
    MiPhase, SeedBloomFilter,
};

pub use record::SeqRecord;

// ──────────────────────────────────────────────────────────────
// Crate-wide result and error types
// --------------------------------------------------------------------------

/// Shorthand `Result` alias for this crate's operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by hashers, filters and the filter file format.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// `k` was zero.
    #[error("k must be > 0")]
    InvalidK,

    /// Zero hashes per window were requested.
    #[error("number of hashes must be > 0")]
    InvalidHashCount,

    /// Provided sequence length is shorter than `k`.
    #[error("sequence length ({seq_len}) < k ({k})")]
    SequenceTooShort { seq_len: usize, k: u16 },

    /// Starting `pos` is beyond the last valid window (`seq.len() - k`).
    #[error("position ({pos}) exceeds sequence length ({seq_len})")]
    PositionOutOfRange { pos: usize, seq_len: usize },

    /// The initial window of a blind hasher holds an invalid character.
    #[error("invalid sequence")]
    InvalidSequence,

    /// Care offsets of a spaced seed fall outside the window.
    #[error("invalid window offsets")]
    InvalidWindowOffsets,

    /// A spaced-seed mask holds a character outside its alphabet or has no
    /// care position.
    #[error("invalid spaced seed {seed:?}: {reason}")]
    InvalidSeed { seed: String, reason: &'static str },

    /// A spaced-seed mask is not exactly `k` long.
    #[error("spaced seed length ({len}) != k ({k})")]
    SeedLengthMismatch { len: usize, k: u16 },

    /// Amino-acid reduction level outside `1..=3`.
    #[error("amino-acid level {0} not in 1..=3")]
    InvalidLevel(u8),

    /// A filter parameter is out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A substitution request is malformed.
    #[error("invalid substitution: {0}")]
    InvalidSubstitution(String),

    /// An id does not fit the id field of a multi-indexed filter slot.
    #[error("id {id} outside 1..={max}")]
    InvalidId { id: u16, max: u16 },

    /// A multi-indexed filter operation was called in the wrong phase.
    #[error("{operation} is not allowed while {phase}")]
    PhaseViolation {
        operation: &'static str,
        phase: MiPhase,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to parse filter header: {0}")]
    HeaderParse(#[from] toml::de::Error),

    #[error("failed to write filter header: {0}")]
    HeaderWrite(#[from] toml::ser::Error),

    /// The first line of a filter file is not the expected signature.
    #[error("file signature {found:?} does not match expected {expected:?}")]
    SignatureMismatch { expected: String, found: String },

    #[error("filter header is not terminated by [HeaderEnd]")]
    MissingHeaderEnd,

    #[error("filter header has no [{0}] table")]
    MissingHeaderTable(String),

    /// The body is shorter than the header announces.
    #[error("filter body truncated: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },

    #[error("corrupt filter file: {0}")]
    Corrupt(String),
}

//! Bloom filters fed by the rolling hashers.
//!
//! Every filter takes precomputed hash values (one slice of `hash_num`
//! values per element); the k-mer and seed variants drive the hashers
//! themselves. All variants share the file format in [`persist`].

pub mod cell;
pub mod counting;
pub mod filter;
pub mod mi;
pub mod persist;
pub mod rank;
pub mod store;

pub use cell::{Counter, IdCell, IdWrite};
pub use counting::{CountingBloomFilter, KmerCountingBloomFilter};
pub use filter::{BloomFilter, KmerBloomFilter, SeedBloomFilter};
pub use mi::{MiBloomFilter, MiPhase};
pub use persist::{file_signature, FilterHeader};

/// Hash-function tag written by the nucleotide k-mer filters.
pub const NTHASH_FN_NAME: &str = "ntHash_v2";

/// The first `hash_num` values of `hashes`. A shorter slice addresses only
/// the values it holds.
#[inline(always)]
pub(crate) fn addressed(hashes: &[u64], hash_num: u32) -> &[u64] {
    &hashes[..hashes.len().min(hash_num as usize)]
}

//! Counting Bloom filters with saturating 8-bit counters.

use std::path::Path;

use tracing::{debug, info, warn};

use super::{
    addressed,
    cell::Counter,
    persist::{read_filter, write_filter, FilterHeader},
    NTHASH_FN_NAME,
};
use crate::{kmer::NtHash, Error, Result};

/// Counting Bloom filter over precomputed hash values.
///
/// Hash `h` addresses counter `h mod counters`. The count of an element is
/// the minimum of its addressed counters, so it never under-counts until a
/// counter saturates at [`Counter::MAX`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CountingBloomFilter {
    counters: Vec<Counter>,
    hash_num: u32,
    hash_fn: String,
}

impl CountingBloomFilter {
    pub const SIGNATURE: &'static str = "CountingBloomFilter_v1";

    /// One counter per byte; `bytes` is rounded up to a multiple of 8.
    pub fn new(bytes: usize, hash_num: u32) -> Result<Self> {
        Self::with_hash_fn(bytes, hash_num, "")
    }

    pub fn with_hash_fn(bytes: usize, hash_num: u32, hash_fn: impl Into<String>) -> Result<Self> {
        if bytes == 0 {
            return Err(Error::InvalidParameter("filter size must be > 0 bytes".into()));
        }
        if hash_num == 0 {
            return Err(Error::InvalidHashCount);
        }
        Ok(Self {
            counters: vec![Counter::default(); bytes.div_ceil(8) * 8],
            hash_num,
            hash_fn: hash_fn.into(),
        })
    }

    #[inline(always)]
    fn slot(&self, hash: u64) -> usize {
        (hash % self.counters.len() as u64) as usize
    }

    #[inline]
    fn slots<'h>(&self, hashes: &'h [u64]) -> impl Iterator<Item = usize> + 'h {
        let len = self.counters.len() as u64;
        addressed(hashes, self.hash_num)
            .iter()
            .map(move |&h| (h % len) as usize)
    }

    /// Increment every addressed counter.
    pub fn insert(&mut self, hashes: &[u64]) {
        for &h in addressed(hashes, self.hash_num) {
            let slot = self.slot(h);
            self.counters[slot].increment();
        }
    }

    /// Decrement every addressed counter. Empty and saturated counters are
    /// left as they are.
    pub fn remove(&mut self, hashes: &[u64]) {
        for &h in addressed(hashes, self.hash_num) {
            let slot = self.slot(h);
            self.counters[slot].decrement();
        }
    }

    /// Zero every addressed counter.
    pub fn clear(&mut self, hashes: &[u64]) {
        for &h in addressed(hashes, self.hash_num) {
            let slot = self.slot(h);
            self.counters[slot] = Counter::default();
        }
    }

    /// Count of the element: the minimum addressed counter.
    pub fn contains(&self, hashes: &[u64]) -> u8 {
        self.slots(hashes)
            .map(|s| self.counters[s].get())
            .min()
            .unwrap_or(0)
    }

    /// Count before inserting.
    pub fn contains_insert(&mut self, hashes: &[u64]) -> u8 {
        let count = self.contains(hashes);
        self.insert(hashes);
        count
    }

    /// Count after inserting.
    pub fn insert_contains(&mut self, hashes: &[u64]) -> u8 {
        self.insert(hashes);
        self.contains(hashes)
    }

    /// Insert only while the count is below `threshold`; returns the count
    /// after the (possible) insertion.
    pub fn insert_thresh_contains(&mut self, hashes: &[u64], threshold: u8) -> u8 {
        let count = self.contains(hashes);
        if count < threshold {
            self.insert(hashes);
            return self.contains(hashes);
        }
        count
    }

    /// Count before the (possible) insertion, which happens only while the
    /// count is below `threshold`.
    pub fn contains_insert_thresh(&mut self, hashes: &[u64], threshold: u8) -> u8 {
        let count = self.contains(hashes);
        if count < threshold {
            self.insert(hashes);
        }
        count
    }

    pub fn bytes(&self) -> usize {
        self.counters.len()
    }

    pub fn hash_num(&self) -> u32 {
        self.hash_num
    }

    pub fn hash_fn(&self) -> &str {
        &self.hash_fn
    }

    /// Number of counters at or above `threshold`.
    pub fn pop_cnt(&self, threshold: u8) -> usize {
        self.counters.iter().filter(|c| c.get() >= threshold).count()
    }

    pub fn occupancy(&self, threshold: u8) -> f64 {
        self.pop_cnt(threshold) as f64 / self.counters.len() as f64
    }

    /// False-positive rate of a query asking for a count of at least
    /// `threshold`.
    pub fn fpr(&self, threshold: u8) -> f64 {
        self.occupancy(threshold).powi(self.hash_num as i32)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.save_as(path.as_ref(), Self::SIGNATURE, self.header())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_as(path.as_ref(), Self::SIGNATURE).map(|(cbf, _)| cbf)
    }

    fn header(&self) -> FilterHeader {
        FilterHeader::new(self.bytes(), self.hash_num, &self.hash_fn)
    }

    fn save_as(&self, path: &Path, signature: &str, header: FilterHeader) -> Result<()> {
        let body: Vec<u8> = self.counters.iter().map(|c| c.get()).collect();
        write_filter(path, signature, &header, &body)?;
        info!(
            path = %path.display(),
            signature,
            bytes = self.bytes(),
            pop_cnt = self.pop_cnt(1),
            "saved counting bloom filter"
        );
        Ok(())
    }

    fn load_as(path: &Path, signature: &str) -> Result<(Self, FilterHeader)> {
        let (header, body) = read_filter(path, signature)?;
        if body.is_empty() {
            return Err(Error::Corrupt("counting bloom filter has no counters".into()));
        }
        if header.hash_num == 0 {
            return Err(Error::InvalidHashCount);
        }
        let cbf = Self {
            counters: body.into_iter().map(Counter::new).collect(),
            hash_num: header.hash_num,
            hash_fn: header.hash_fn.clone().unwrap_or_default(),
        };
        info!(
            path = %path.display(),
            signature,
            bytes = cbf.bytes(),
            pop_cnt = cbf.pop_cnt(1),
            "loaded counting bloom filter"
        );
        Ok((cbf, header))
    }
}

/// Counting Bloom filter fed with every k-mer of a sequence.
///
/// Sequence-level queries sum the per-k-mer results over the valid windows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KmerCountingBloomFilter {
    cbf: CountingBloomFilter,
    k: u16,
}

impl KmerCountingBloomFilter {
    pub const SIGNATURE: &'static str = "KmerCountingBloomFilter_v1";

    pub fn new(bytes: usize, hash_num: u8, k: u16) -> Result<Self> {
        if k == 0 {
            return Err(Error::InvalidK);
        }
        Ok(Self {
            cbf: CountingBloomFilter::with_hash_fn(bytes, hash_num as u32, NTHASH_FN_NAME)?,
            k,
        })
    }

    /// Apply `op` to every valid k-mer of `seq`, summing its results.
    fn for_each_kmer(
        &mut self,
        seq: &[u8],
        mut op: impl FnMut(&mut CountingBloomFilter, &[u64]) -> u64,
    ) -> u64 {
        let mut hasher = match NtHash::new(seq, self.k, self.hash_num(), 0) {
            Ok(h) => h,
            Err(e) => {
                debug!(seq_len = seq.len(), k = self.k, error = %e, "sequence holds no k-mer");
                return 0;
            }
        };
        let mut total = 0;
        while hasher.roll() {
            total += op(&mut self.cbf, hasher.hashes());
        }
        total
    }

    pub fn insert(&mut self, seq: &[u8]) {
        self.for_each_kmer(seq, |cbf, h| {
            cbf.insert(h);
            0
        });
    }

    pub fn remove(&mut self, seq: &[u8]) {
        self.for_each_kmer(seq, |cbf, h| {
            cbf.remove(h);
            0
        });
    }

    pub fn clear(&mut self, seq: &[u8]) {
        self.for_each_kmer(seq, |cbf, h| {
            cbf.clear(h);
            0
        });
    }

    /// Sum of the counts of every valid k-mer of `seq`.
    pub fn contains(&self, seq: &[u8]) -> u64 {
        let Ok(mut hasher) = NtHash::new(seq, self.k, self.hash_num(), 0) else {
            debug!(seq_len = seq.len(), k = self.k, "sequence holds no k-mer");
            return 0;
        };
        let mut total = 0;
        while hasher.roll() {
            total += self.cbf.contains(hasher.hashes()) as u64;
        }
        total
    }

    pub fn contains_insert(&mut self, seq: &[u8]) -> u64 {
        self.for_each_kmer(seq, |cbf, h| cbf.contains_insert(h) as u64)
    }

    pub fn insert_contains(&mut self, seq: &[u8]) -> u64 {
        self.for_each_kmer(seq, |cbf, h| cbf.insert_contains(h) as u64)
    }

    pub fn insert_thresh_contains(&mut self, seq: &[u8], threshold: u8) -> u64 {
        self.for_each_kmer(seq, |cbf, h| cbf.insert_thresh_contains(h, threshold) as u64)
    }

    pub fn contains_insert_thresh(&mut self, seq: &[u8], threshold: u8) -> u64 {
        self.for_each_kmer(seq, |cbf, h| cbf.contains_insert_thresh(h, threshold) as u64)
    }

    pub fn k(&self) -> u16 {
        self.k
    }

    pub fn hash_num(&self) -> u8 {
        self.cbf.hash_num as u8
    }

    pub fn counting_bloom_filter(&self) -> &CountingBloomFilter {
        &self.cbf
    }

    pub fn pop_cnt(&self, threshold: u8) -> usize {
        self.cbf.pop_cnt(threshold)
    }

    pub fn occupancy(&self, threshold: u8) -> f64 {
        self.cbf.occupancy(threshold)
    }

    pub fn fpr(&self, threshold: u8) -> f64 {
        self.cbf.fpr(threshold)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let header = FilterHeader {
            k: Some(self.k),
            ..self.cbf.header()
        };
        self.cbf.save_as(path.as_ref(), Self::SIGNATURE, header)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let (mut cbf, header) = CountingBloomFilter::load_as(path, Self::SIGNATURE)?;
        let k = FilterHeader::require(header.k, "k")?;
        if k == 0 {
            return Err(Error::InvalidK);
        }
        if cbf.hash_num > u8::MAX as u32 {
            return Err(Error::InvalidHashCount);
        }
        if cbf.hash_fn.is_empty() {
            cbf.hash_fn = NTHASH_FN_NAME.to_owned();
        } else if cbf.hash_fn != NTHASH_FN_NAME {
            warn!(
                path = %path.display(),
                found = %cbf.hash_fn,
                expected = NTHASH_FN_NAME,
                "filter was built with a different hash function"
            );
        }
        Ok(Self { cbf, k })
    }
}

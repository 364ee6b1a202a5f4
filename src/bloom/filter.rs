//! Plain, k-mer and spaced-seed Bloom filters.

use std::path::Path;

use tracing::{debug, info, warn};

use super::{
    addressed,
    persist::{read_filter, write_filter, FilterHeader},
    store::BitStore,
    NTHASH_FN_NAME,
};
use crate::{
    kmer::NtHash, record::SeqRecord, seed::SeedNtHash, Error, Result, RollingHash, SpacedSeed,
};

fn too_large(entries: usize) -> Error {
    Error::InvalidParameter(format!("filter for {entries} entries does not fit in memory"))
}

/// Bloom filter over precomputed hash values.
///
/// The bit array holds `bytes * 8` bits, `bytes` being rounded up to a
/// multiple of 8. Hash `h` addresses bit `h mod bits`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BloomFilter {
    store: BitStore,
    hash_num: u32,
    hash_fn: String,
}

impl BloomFilter {
    pub const SIGNATURE: &'static str = "BloomFilter_v1";

    /// # Errors
    /// `InvalidParameter` if `bytes == 0`, `InvalidHashCount` if
    /// `hash_num == 0`.
    pub fn new(bytes: usize, hash_num: u32) -> Result<Self> {
        Self::with_hash_fn(bytes, hash_num, "")
    }

    /// Filter tagged with the name of the hash function feeding it; the tag
    /// is persisted and reported back on load.
    pub fn with_hash_fn(bytes: usize, hash_num: u32, hash_fn: impl Into<String>) -> Result<Self> {
        if bytes == 0 {
            return Err(Error::InvalidParameter("filter size must be > 0 bytes".into()));
        }
        if hash_num == 0 {
            return Err(Error::InvalidHashCount);
        }
        let bytes = bytes.div_ceil(8) * 8;
        Ok(Self {
            store: BitStore::new(bytes * 8),
            hash_num,
            hash_fn: hash_fn.into(),
        })
    }

    /// Bytes needed to hold `entries` elements at `target_fpr` with
    /// `hash_num` hashes each, rounded up to a multiple of 8.
    pub fn optimal_bytes(entries: usize, hash_num: u32, target_fpr: f64) -> Result<usize> {
        if !(target_fpr > 0.0 && target_fpr < 1.0) {
            return Err(Error::InvalidParameter(format!(
                "target false positive rate {target_fpr} not in (0, 1)"
            )));
        }
        if hash_num == 0 {
            return Err(Error::InvalidHashCount);
        }
        // fpr = (1 - e^(-h*n/m))^h  =>  m = -h*n / ln(1 - fpr^(1/h))
        let h = hash_num as f64;
        let bits = -h * entries as f64 / (1.0 - target_fpr.powf(1.0 / h)).ln();
        let bytes = (bits / 8.0).ceil().max(1.0);
        if !bytes.is_finite() || bytes >= usize::MAX as f64 {
            return Err(too_large(entries));
        }
        (bytes as usize)
            .checked_next_multiple_of(8)
            .ok_or_else(|| too_large(entries))
    }

    #[inline]
    pub fn insert(&mut self, hashes: &[u64]) {
        for &h in addressed(hashes, self.hash_num) {
            self.store.set(h);
        }
    }

    /// `true` iff every addressed bit is set.
    #[inline]
    pub fn contains(&self, hashes: &[u64]) -> bool {
        addressed(hashes, self.hash_num)
            .iter()
            .all(|&h| self.store.get(h))
    }

    /// Insert and report whether the element was already present.
    #[inline]
    pub fn contains_insert(&mut self, hashes: &[u64]) -> bool {
        let mut found = true;
        for &h in addressed(hashes, self.hash_num) {
            found &= self.store.set(h);
        }
        found
    }

    /// Insert every window a rolling hasher visits. Returns the number of
    /// windows inserted.
    pub fn insert_from<H: RollingHash>(&mut self, hasher: &mut H) -> usize {
        let mut n = 0;
        while hasher.roll() {
            self.insert(hasher.hashes());
            n += 1;
        }
        n
    }

    /// Number of windows visited by `hasher` that the filter contains.
    pub fn contains_from<H: RollingHash>(&self, hasher: &mut H) -> usize {
        let mut hits = 0;
        while hasher.roll() {
            hits += self.contains(hasher.hashes()) as usize;
        }
        hits
    }

    pub fn bytes(&self) -> usize {
        self.store.len() / 8
    }

    pub fn hash_num(&self) -> u32 {
        self.hash_num
    }

    pub fn hash_fn(&self) -> &str {
        &self.hash_fn
    }

    /// Number of set bits.
    pub fn pop_cnt(&self) -> usize {
        self.store.count_ones()
    }

    pub fn occupancy(&self) -> f64 {
        self.pop_cnt() as f64 / self.store.len() as f64
    }

    /// Expected false-positive rate at the current occupancy.
    pub fn fpr(&self) -> f64 {
        self.occupancy().powi(self.hash_num as i32)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.save_as(path.as_ref(), Self::SIGNATURE, self.header())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_as(path.as_ref(), Self::SIGNATURE).map(|(bf, _)| bf)
    }

    fn header(&self) -> FilterHeader {
        FilterHeader::new(self.bytes(), self.hash_num, &self.hash_fn)
    }

    fn save_as(&self, path: &Path, signature: &str, header: FilterHeader) -> Result<()> {
        write_filter(path, signature, &header, &self.store.to_le_bytes())?;
        info!(
            path = %path.display(),
            signature,
            bytes = self.bytes(),
            pop_cnt = self.pop_cnt(),
            "saved bloom filter"
        );
        Ok(())
    }

    fn load_as(path: &Path, signature: &str) -> Result<(Self, FilterHeader)> {
        let (header, body) = read_filter(path, signature)?;
        if body.is_empty() || body.len() % 8 != 0 {
            return Err(Error::Corrupt(format!(
                "bloom filter body of {} bytes is not a positive multiple of 8",
                body.len()
            )));
        }
        if header.hash_num == 0 {
            return Err(Error::InvalidHashCount);
        }
        let bf = Self {
            store: BitStore::from_le_bytes(&body),
            hash_num: header.hash_num,
            hash_fn: header.hash_fn.clone().unwrap_or_default(),
        };
        info!(
            path = %path.display(),
            signature,
            bytes = bf.bytes(),
            pop_cnt = bf.pop_cnt(),
            "loaded bloom filter"
        );
        Ok((bf, header))
    }
}

fn check_hash_fn(path: &Path, found: &str, expected: &str) {
    if !found.is_empty() && found != expected {
        warn!(
            path = %path.display(),
            found,
            expected,
            "filter was built with a different hash function"
        );
    }
}

/// Bloom filter fed with the canonical ntHash values of every k-mer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KmerBloomFilter {
    bloom: BloomFilter,
    k: u16,
}

impl KmerBloomFilter {
    pub const SIGNATURE: &'static str = "KmerBloomFilter_v1";

    pub fn new(bytes: usize, hash_num: u8, k: u16) -> Result<Self> {
        if k == 0 {
            return Err(Error::InvalidK);
        }
        Ok(Self {
            bloom: BloomFilter::with_hash_fn(bytes, hash_num as u32, NTHASH_FN_NAME)?,
            k,
        })
    }

    /// Hasher over `seq`, or `None` when `seq` holds no k-mer.
    fn hasher<'s>(&self, seq: &'s [u8]) -> Option<NtHash<'s>> {
        match NtHash::new(seq, self.k, self.hash_num(), 0) {
            Ok(h) => Some(h),
            Err(e) => {
                debug!(seq_len = seq.len(), k = self.k, error = %e, "sequence holds no k-mer");
                None
            }
        }
    }

    /// Insert every valid k-mer of `seq`. Sequences shorter than `k`
    /// insert nothing.
    pub fn insert(&mut self, seq: &[u8]) {
        if let Some(mut h) = self.hasher(seq) {
            self.bloom.insert_from(&mut h);
        }
    }

    /// Number of valid k-mers of `seq` found in the filter.
    pub fn contains(&self, seq: &[u8]) -> usize {
        self.hasher(seq)
            .map_or(0, |mut h| self.bloom.contains_from(&mut h))
    }

    /// Insert every k-mer of `seq`, returning how many were already present.
    pub fn contains_insert(&mut self, seq: &[u8]) -> usize {
        let Some(mut h) = self.hasher(seq) else {
            return 0;
        };
        let mut hits = 0;
        while h.roll() {
            hits += self.bloom.contains_insert(h.hashes()) as usize;
        }
        hits
    }

    /// Insert the sequence of every record.
    pub fn insert_records<'r>(&mut self, records: impl IntoIterator<Item = &'r SeqRecord>) {
        for record in records {
            self.insert(record.seq.as_bytes());
        }
    }

    pub fn k(&self) -> u16 {
        self.k
    }

    pub fn hash_num(&self) -> u8 {
        self.bloom.hash_num as u8
    }

    pub fn bloom(&self) -> &BloomFilter {
        &self.bloom
    }

    pub fn pop_cnt(&self) -> usize {
        self.bloom.pop_cnt()
    }

    pub fn occupancy(&self) -> f64 {
        self.bloom.occupancy()
    }

    pub fn fpr(&self) -> f64 {
        self.bloom.fpr()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let header = FilterHeader {
            k: Some(self.k),
            ..self.bloom.header()
        };
        self.bloom.save_as(path.as_ref(), Self::SIGNATURE, header)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let (mut bloom, header) = BloomFilter::load_as(path, Self::SIGNATURE)?;
        let k = FilterHeader::require(header.k, "k")?;
        if k == 0 {
            return Err(Error::InvalidK);
        }
        if bloom.hash_num > u8::MAX as u32 {
            return Err(Error::InvalidHashCount);
        }
        check_hash_fn(path, &bloom.hash_fn, NTHASH_FN_NAME);
        if bloom.hash_fn.is_empty() {
            bloom.hash_fn = NTHASH_FN_NAME.to_owned();
        }
        Ok(Self { bloom, k })
    }
}

/// Bloom filter over spaced-seed hashes. Each seed owns `hash_num_per_seed`
/// hashes, so one filter answers membership per seed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedBloomFilter {
    bloom: BloomFilter,
    k: u16,
    seeds: Vec<SpacedSeed>,
    hash_num_per_seed: u8,
}

impl SeedBloomFilter {
    pub const SIGNATURE: &'static str = "SeedBloomFilter_v1";

    /// # Errors
    /// Any mask error of [`SpacedSeed::parse`], or `InvalidParameter` when
    /// `seeds` is empty.
    pub fn new<S: AsRef<str>>(
        bytes: usize,
        k: u16,
        seeds: &[S],
        hash_num_per_seed: u8,
    ) -> Result<Self> {
        if k == 0 {
            return Err(Error::InvalidK);
        }
        if seeds.is_empty() {
            return Err(Error::InvalidParameter(
                "at least one spaced seed is required".into(),
            ));
        }
        let seeds = seeds
            .iter()
            .map(|m| SpacedSeed::parse(m.as_ref(), k))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            bloom: BloomFilter::with_hash_fn(bytes, hash_num_per_seed as u32, NTHASH_FN_NAME)?,
            k,
            seeds,
            hash_num_per_seed,
        })
    }

    fn hasher<'s>(&self, seq: &'s [u8]) -> Option<SeedNtHash<'s>> {
        match SeedNtHash::with_seeds(
            seq,
            self.seeds.clone(),
            self.hash_num_per_seed as usize,
            self.k,
            0,
        ) {
            Ok(h) => Some(h),
            Err(e) => {
                debug!(seq_len = seq.len(), k = self.k, error = %e, "sequence holds no k-mer");
                None
            }
        }
    }

    /// Insert every seed's hashes at every valid window of `seq`.
    pub fn insert(&mut self, seq: &[u8]) {
        let Some(mut h) = self.hasher(seq) else {
            return;
        };
        let m = self.hash_num_per_seed as usize;
        while h.roll() {
            for chunk in h.hashes().chunks_exact(m) {
                self.bloom.insert(chunk);
            }
        }
    }

    /// For every valid window of `seq`, the indices of the seeds whose
    /// hashes are all present.
    pub fn contains(&self, seq: &[u8]) -> Vec<Vec<usize>> {
        let Some(mut h) = self.hasher(seq) else {
            return Vec::new();
        };
        let m = self.hash_num_per_seed as usize;
        let mut hits = Vec::new();
        while h.roll() {
            let found = h
                .hashes()
                .chunks_exact(m)
                .enumerate()
                .filter(|(_, chunk)| self.bloom.contains(chunk))
                .map(|(i, _)| i)
                .collect();
            hits.push(found);
        }
        hits
    }

    pub fn k(&self) -> u16 {
        self.k
    }

    pub fn seeds(&self) -> &[SpacedSeed] {
        &self.seeds
    }

    pub fn hash_num_per_seed(&self) -> u8 {
        self.hash_num_per_seed
    }

    pub fn bloom(&self) -> &BloomFilter {
        &self.bloom
    }

    pub fn pop_cnt(&self) -> usize {
        self.bloom.pop_cnt()
    }

    pub fn occupancy(&self) -> f64 {
        self.bloom.occupancy()
    }

    /// False-positive rate of a single seed's lookup.
    pub fn fpr(&self) -> f64 {
        self.bloom.fpr()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let header = FilterHeader {
            k: Some(self.k),
            seeds: Some(self.seeds.iter().map(|s| s.mask().to_owned()).collect()),
            ..self.bloom.header()
        };
        self.bloom.save_as(path.as_ref(), Self::SIGNATURE, header)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let (mut bloom, header) = BloomFilter::load_as(path, Self::SIGNATURE)?;
        let k = FilterHeader::require(header.k, "k")?;
        let masks = FilterHeader::require(header.seeds, "seeds")?;
        if masks.is_empty() {
            return Err(Error::Corrupt("header lists no spaced seeds".into()));
        }
        if bloom.hash_num > u8::MAX as u32 {
            return Err(Error::InvalidHashCount);
        }
        let seeds = masks
            .iter()
            .map(|m| SpacedSeed::parse(m, k))
            .collect::<Result<Vec<_>>>()?;
        check_hash_fn(path, &bloom.hash_fn, NTHASH_FN_NAME);
        if bloom.hash_fn.is_empty() {
            bloom.hash_fn = NTHASH_FN_NAME.to_owned();
        }
        let hash_num_per_seed = bloom.hash_num as u8;
        Ok(Self {
            bloom,
            k,
            seeds,
            hash_num_per_seed,
        })
    }
}

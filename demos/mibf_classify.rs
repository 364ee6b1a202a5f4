//! Build a multi-indexed Bloom filter over a few synthetic references and
//! classify reads drawn from them by majority vote over their k-mers.

use kmer_bloom::{bloom::NTHASH_FN_NAME, MiBloomFilter, NtHash, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};

const K: u16 = 25;
const HASH_NUM: u8 = 3;

fn for_each_kmer(seq: &[u8], mut f: impl FnMut(&[u64]) -> Result<()>) -> Result<()> {
    let mut h = NtHash::new(seq, K, HASH_NUM, 0)?;
    while h.roll() {
        f(h.hashes())?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(7);
    let references: Vec<Vec<u8>> = (0..5)
        .map(|_| (0..5_000).map(|_| b"ACGT"[rng.gen_range(0..4)]).collect())
        .collect();

    let entries = references.iter().map(|r| r.len() - K as usize + 1).sum();
    let bits = MiBloomFilter::calc_optimal_size(entries, HASH_NUM as u32, 0.2)?;
    let mut mi = MiBloomFilter::with_hash_fn(bits, HASH_NUM as u32, NTHASH_FN_NAME)?;

    for r in &references {
        for_each_kmer(r, |h| mi.insert_bv(h))?;
    }
    mi.complete_bv_insertion()?;
    for (i, r) in references.iter().enumerate() {
        let id = i as u16 + 1;
        for_each_kmer(r, |h| mi.insert_id(h, id))?;
    }
    mi.complete_id_insertion()?;
    mi.complete_saturation_insertion()?;

    println!(
        "bits: {}  popcount: {}  saturated: {}",
        mi.bit_len(),
        mi.pop_cnt(),
        mi.pop_saturated_cnt()
    );
    println!("slots per id: {:?}", mi.get_id_occurence_count(true)?);

    for (i, r) in references.iter().enumerate() {
        let start = rng.gen_range(0..r.len() - 150);
        let read = &r[start..start + 150];
        let mut votes = vec![0usize; references.len() + 1];
        for_each_kmer(read, |h| {
            for raw in mi.get_id(h)? {
                if raw & MiBloomFilter::SATURATION_MASK == 0 {
                    votes[(raw & MiBloomFilter::ID_MASK) as usize] += 1;
                }
            }
            Ok(())
        })?;
        let best = (1..votes.len()).max_by_key(|&j| votes[j]).unwrap_or(0);
        println!("read from reference {}: classified as {best} (votes {votes:?})", i + 1);
    }
    Ok(())
}

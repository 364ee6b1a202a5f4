use kmer_bloom::{KmerBloomFilter, NtHashBuilder, Result};

fn main() -> Result<()> {
    let seq = "ATCGTACGATGCATGCATGCTGACG";
    let kmer_size: u16 = 6;
    let num_hashes: u8 = 3;

    let iter = NtHashBuilder::new(seq.as_bytes())
        .k(kmer_size)
        .num_hashes(num_hashes)
        .pos(0)
        .finish()?;

    for (pos, hashes) in iter {
        let end = pos + kmer_size as usize;
        println!("{} {:x?}", &seq[pos..end], hashes);
    }

    let mut filter = KmerBloomFilter::new(1024, num_hashes, kmer_size)?;
    filter.insert(seq.as_bytes());
    for query in ["GCATGCATGC", "GGGGGGGGGG"] {
        println!("{query}: {} k-mers found", filter.contains(query.as_bytes()));
    }

    Ok(())
}

use kmer_bloom::{Result, SeedBloomFilter, SeedNtHash, SeedNtHashBuilder};

fn main() -> Result<()> {
    println!("# SeedNtHash");
    let seq = "ATCGTACGATGCATGCATGCTGACG";
    let seed_masks = vec!["000111".to_string(), "010101".to_string()];
    let k = 6u16;
    let m2 = 2usize;

    println!("## Low-level API");
    let mut h = SeedNtHash::new(seq.as_bytes(), &seed_masks, m2, k, 0)?;
    while h.roll() {
        let pos = h.pos();
        let kmer = &seq[pos..pos + k as usize];
        println!("{} {:x?}", kmer, h.hashes());
    }

    println!("## SeedNtHashBuilder");
    let iter = SeedNtHashBuilder::new(seq.as_bytes())
        .k(k)
        .masks(seed_masks.clone())
        .num_hashes(m2)
        .pos(0)
        .finish()?;
    for (pos, hashes) in iter {
        let kmer = &seq[pos..pos + k as usize];
        println!("{} {:x?}", kmer, hashes);
    }

    println!("## SeedBloomFilter");
    let mut filter = SeedBloomFilter::new(1024, k, &seed_masks, m2 as u8)?;
    filter.insert(seq.as_bytes());
    // the first window with offset 1 changed: only "000111" ignores it
    for (i, seeds) in filter.contains(b"AACGTA").iter().enumerate() {
        println!("window {i}: matching seeds {seeds:?}");
    }

    Ok(())
}

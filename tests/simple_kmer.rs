use kmer_bloom::{util::reverse_complement, NtHash, NtHashBuilder};

const SEQ: &str = "ATCGTACGATGCATGCATGCTGACG";
const K: u16 = 6;
const M: u8 = 3;

const EXPECTED_KMERS: [&str; 20] = [
    "ATCGTA", "TCGTAC", "CGTACG", "GTACGA", "TACGAT", "ACGATG", "CGATGC", "GATGCA", "ATGCAT",
    "TGCATG", "GCATGC", "CATGCA", "ATGCAT", "TGCATG", "GCATGC", "CATGCT", "ATGCTG", "TGCTGA",
    "GCTGAC", "CTGACG",
];

// expected hashes for each window (hex literals)
const EXPECTED_HASHES: [[u64; 3]; 20] = [
        [0x665c763218bb91de, 0x3eb36eeabb382b0b, 0xa50fe50b27ed2b74],
        [0xcdec18dd4118ed4a, 0x8205eb720525eaaa, 0x4ff2043678f1f3dc],
        [0xcacbc13a3e6a1d09, 0xb8c9d3f865804e2a, 0x83959539c996f5f9],
        [0xcdec18dd4118ed4a, 0x8205eb720525eaaa, 0x4ff2043678f1f3dc],
        [0x665c763218bb91de, 0x3eb36eeabb382b0b, 0xa50fe50b27ed2b74],
        [0x0965db7ac2f0992a, 0x1b48ac2e52e702e5, 0x24ae87a36b33d493],
        [0x01a69bef96c0042a, 0x6ffc31c8d55cdee7, 0x71a2cdbaf5c35cf4],
        [0x34026309ee4750c7, 0x8fb41989cbd6bbcc, 0xc3b67cba5d534dd7],
        [0x93b7a709feb3335c, 0xad7a239eaecd3b0c, 0x4131ca9d26052f68],
        [0x25a39c5c0eb058af, 0xd512032b39ee3220, 0xfab59f92fced5d77],
        [0x2f86842987518fbb, 0x39b6bbd2459a27c1, 0x693d3ff3dd3912f5],
        [0x25a39c5c0eb058af, 0xd512032b39ee3220, 0xfab59f92fced5d77],
        [0x93b7a709feb3335c, 0xad7a239eaecd3b0c, 0x4131ca9d26052f68],
        [0x25a39c5c0eb058af, 0xd512032b39ee3220, 0xfab59f92fced5d77],
        [0x2f86842987518fbb, 0x39b6bbd2459a27c1, 0x693d3ff3dd3912f5],
        [0x7ad7f5b4d0899231, 0x274218fb673210bc, 0xa21a0ea01cbb77f5],
        [0x6d5bc5a8f032d675, 0x9a87a3a108c29c4a, 0x07e3695bb404eb1f],
        [0x08ae78a4a1a0c3c5, 0x14342eb9df1eef7a, 0x1ce2a75c676f1029],
        [0x9c551b83d0d70750, 0x0cda5d25abf66496, 0xa92f78bd247bd260],
        [0x17870a5ae89751b0, 0xf117e2eeefe44ae9, 0x089eed4aa672cfd6],
];

#[test]
fn regression_simple_kmer() {
    let iter = NtHashBuilder::new(SEQ.as_bytes())
        .k(K)
        .num_hashes(M)
        .pos(0)
        .finish()
        .expect("builder should succeed");

    let k_usize = K as usize;
    let results: Vec<(usize, Vec<u64>)> = iter.collect();
    assert_eq!(results.len(), EXPECTED_KMERS.len());

    for (i, (pos, hashes)) in results.iter().enumerate() {
        let window = &SEQ[*pos..*pos + k_usize];
        assert_eq!(window, EXPECTED_KMERS[i], "window at pos {}", pos);
        assert_eq!(
            hashes.as_slice(),
            &EXPECTED_HASHES[i][..],
            "hashes at pos {} (window {})",
            pos,
            window
        );
    }
}

#[test]
fn rolling_matches_fresh_hasher() {
    let seq = SEQ.as_bytes();
    let mut rolling = NtHash::new(seq, K, M, 0).unwrap();
    while rolling.roll() {
        let pos = rolling.pos();
        let mut fresh = NtHash::new(&seq[pos..pos + K as usize], K, M, 0).unwrap();
        assert!(fresh.roll());
        assert_eq!(rolling.hashes(), fresh.hashes(), "pos {}", pos);
    }
}

#[test]
fn roll_back_retraces_forward_hashes() {
    let seq = b"ACTAGCTG";
    let mut h = NtHash::new(seq, 5, 3, 0).unwrap();
    let mut forward = Vec::new();
    while h.roll() {
        forward.push(h.hashes().to_vec());
    }
    assert_eq!(forward.len(), 4);

    let mut backward = Vec::new();
    while h.roll_back() {
        backward.push(h.hashes().to_vec());
    }
    forward.pop();
    forward.reverse();
    assert_eq!(backward, forward);
    assert_eq!(h.pos(), 0);
}

#[test]
fn canonical_hash_is_strand_independent() {
    let seq = b"ACGTACACTGGACTGAGTCT";
    let rc = reverse_complement(seq);
    assert_eq!(rc, b"AGACTCAGTCCAGTGTACGT".to_vec());

    let mut fwd = NtHash::new(seq, 20, 3, 0).unwrap();
    let mut rev = NtHash::new(&rc, 20, 3, 0).unwrap();
    assert!(fwd.roll());
    assert!(rev.roll());
    assert_eq!(fwd.hashes(), rev.hashes());
    assert_eq!(fwd.forward_hash(), rev.reverse_hash());
    assert_eq!(fwd.reverse_hash(), rev.forward_hash());
}

#[test]
fn windows_with_n_are_skipped() {
    let seq = b"ATCGTACGNNNNNNNNATGCTGACG";
    let positions: Vec<usize> = NtHashBuilder::new(seq)
        .k(K)
        .num_hashes(M)
        .into_iter()
        .map(|(pos, _)| pos)
        .collect();
    assert_eq!(positions, vec![0, 1, 2, 16, 17, 18, 19]);
}

#[test]
fn control_bytes_invalidate_windows() {
    let mut h = NtHash::new(b"ACG\x01T", 5, 1, 0).unwrap();
    assert!(!h.roll());

    let seq = b"ATCGTACG\x01ATGCTGACG";
    let positions: Vec<usize> = NtHashBuilder::new(seq)
        .k(K)
        .num_hashes(M)
        .into_iter()
        .map(|(pos, _)| pos)
        .collect();
    assert_eq!(positions, vec![0, 1, 2, 9, 10, 11, 12]);
}

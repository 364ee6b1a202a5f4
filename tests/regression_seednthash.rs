use kmer_bloom::{SeedNtHash, SeedNtHashBuilder};

const SEQ: &str = "ATCGTACGATGCATGCATGCTGACG";

// expected hashes for each window: two per seed, seed-major
const EXPECTED_HASHES: [[u64; 4]; 20] = [
        [0x6e88898f352997fd, 0xf26bf1ba07c4e0e0, 0x29179fb722becd8f, 0x96ae09b3c077ed51],
        [0x774c98de5af00244, 0xd06ad828a6dae6e1, 0x8dfafe12672b8edd, 0x433d84223da01682],
        [0x7bf1922a2e657967, 0xc65b5973cf5e578b, 0x1bf5fc26ce571dba, 0x4f9ea00747f52644],
        [0x3204d04f44f3273d, 0x741a727b60dd7015, 0x522f3f6c457d9b1f, 0xc872aafd01aa2242],
        [0x88b5e52913e59196, 0x700c6c4e441b2876, 0x4f4be9853a055c51, 0xbd0c90066527eed5],
        [0x80b743f0428bba5a, 0x96b5125a22fd74ac, 0x38b6028f0fb90d6b, 0x8cacc8d4a06676f9],
        [0xd4a29bf549877c5e, 0x35c1ebfcaaef9864, 0x813f8492219411b7, 0xccfb1c60f4e5e8d6],
        [0xa514dfac4c3be2f5, 0x6c55e45b87ccbe40, 0x74fcbbd4c0facfa9, 0xfc1262d91fa51f36],
        [0x05ba1f88145dd2d1, 0x754d88df2e3aa35d, 0x7a4ed0a07f46ac0e, 0xdc9e22a3459bf50c],
        [0x80b743f0428bba5a, 0x96b5125a22fd74ac, 0x1bf5fc26ce571dba, 0x4f9ea00747f52644],
        [0xd4a29bf549877c5e, 0x35c1ebfcaaef9864, 0x8dfafe12672b8edd, 0x433d84223da01682],
        [0xa514dfac4c3be2f5, 0x6c55e45b87ccbe40, 0x74fcbbd4c0facfa9, 0xfc1262d91fa51f36],
        [0x05ba1f88145dd2d1, 0x754d88df2e3aa35d, 0x7a4ed0a07f46ac0e, 0xdc9e22a3459bf50c],
        [0x80b743f0428bba5a, 0x96b5125a22fd74ac, 0x1bf5fc26ce571dba, 0x4f9ea00747f52644],
        [0xd4a29bf549877c5e, 0x35c1ebfcaaef9864, 0x8dfafe12672b8edd, 0x433d84223da01682],
        [0x1ec2976988b3e6b8, 0x6192d8470b211dbf, 0x4f4be9853a055c51, 0xbd0c90066527eed5],
        [0xb4d7ab299f1306bb, 0xc3868948b57f3277, 0x4afe316b6d30785d, 0x491eb9019121865f],
        [0xd7cafb5ff87a1db9, 0xd9002353d0c232ab, 0x9afd31669f3d276a, 0x1eb0274b6712fd94],
        [0x1f8d496fe1c17b87, 0x01ae0032b1b2b6db, 0xa867228341fe1316, 0xa2535d4a92854025],
        [0x7bf1922a2e657967, 0xc65b5973cf5e578b, 0x01c5884b209b43ca, 0xa2992ac1c111e9d0],
];

#[test]
fn regression_simple_seednthash() {
    let seed_masks = vec!["000111".to_string(), "010101".to_string()];
    let k = 6u16;

    let iter = SeedNtHashBuilder::new(SEQ.as_bytes())
        .k(k)
        .masks(seed_masks)
        .num_hashes(2)
        .finish()
        .expect("builder should succeed");

    let results: Vec<(usize, Vec<u64>)> = iter.collect();
    assert_eq!(results.len(), EXPECTED_HASHES.len());
    for (i, (pos, hashes)) in results.iter().enumerate() {
        assert_eq!(*pos, i);
        assert_eq!(
            hashes.as_slice(),
            &EXPECTED_HASHES[i][..],
            "hashes at pos {} (window {})",
            pos,
            &SEQ[*pos..*pos + k as usize]
        );
    }
}

#[test]
fn seed_roll_back_retraces() {
    let masks = ["110011", "101101"];
    let mut h = SeedNtHash::new(SEQ.as_bytes(), &masks, 3, 6, 0).unwrap();
    let mut forward = Vec::new();
    while h.roll() {
        forward.push(h.hashes().to_vec());
    }
    let mut backward = Vec::new();
    while h.roll_back() {
        backward.push(h.hashes().to_vec());
    }
    forward.pop();
    forward.reverse();
    assert_eq!(backward, forward);
}

use kmer_bloom::{BlindNtHash, BlindNtHashBuilder, NtHashBuilder};

const SEQ: &str = "ATCGTACGATGCATGCATGCTGACG";

#[test]
fn regression_blind_matches_contiguous() {
    let blind: Vec<(usize, Vec<u64>)> = BlindNtHashBuilder::new(SEQ.as_bytes())
        .k(6)
        .num_hashes(3)
        .pos(0)
        .finish()
        .expect("builder should succeed")
        .collect();
    let owned: Vec<(usize, Vec<u64>)> = NtHashBuilder::new(SEQ.as_bytes())
        .k(6)
        .num_hashes(3)
        .into_iter()
        .collect();
    assert_eq!(blind.len(), 20);
    assert_eq!(blind, owned);
    assert_eq!(
        blind[0].1,
        vec![0x665c763218bb91de, 0x3eb36eeabb382b0b, 0xa50fe50b27ed2b74]
    );
}

#[test]
fn regression_blind_stops_at_n() {
    let seq = "ATCGTACGNNNNNNNNATGCTGACG";
    let results: Vec<(usize, Vec<u64>)> = BlindNtHashBuilder::new(seq.as_bytes())
        .k(6)
        .num_hashes(3)
        .finish()
        .expect("builder should succeed")
        .collect();
    let windows: Vec<&str> = results.iter().map(|(p, _)| &seq[*p..*p + 6]).collect();
    assert_eq!(windows, vec!["ATCGTA", "TCGTAC", "CGTACG"]);
}

#[test]
fn blind_resumes_after_caller_restarts_past_n() {
    let seq = b"ATCGTACGNNNNNNNNATGCTGACG";
    let mut h = BlindNtHash::new(seq, 6, 3, 0).unwrap();
    assert!(h.roll(seq[6]));
    assert!(h.roll(seq[7]));
    assert!(!h.roll(seq[8]));

    // a fresh hasher past the ambiguous run agrees with the contiguous one
    let restarted = BlindNtHash::new(seq, 6, 3, 16).unwrap();
    let (_, expected) = NtHashBuilder::new(seq)
        .k(6)
        .num_hashes(3)
        .into_iter()
        .find(|(p, _)| *p == 16)
        .unwrap();
    assert_eq!(restarted.hashes(), expected.as_slice());
}

#[test]
fn blind_refuses_control_bytes() {
    let mut h = BlindNtHash::new(SEQ.as_bytes(), 6, 3, 0).unwrap();
    let before = h.hashes().to_vec();
    for b in [0x01, 0x03, 0x04, 0x05, 0x07] {
        assert!(!h.roll(b));
        assert!(!h.roll_back(b));
    }
    assert_eq!(h.hashes(), before.as_slice());
    assert!(BlindNtHash::new(b"ACG\x07TT", 6, 1, 0).is_err());
}

#[test]
fn blind_position_goes_negative_past_origin() {
    let mut h = BlindNtHash::new(b"ACGTACGT", 4, 1, 0).unwrap();
    assert!(h.roll_back(b'A'));
    assert_eq!(h.pos(), -1);
    assert_eq!(h.state().pos(), -1);
    assert!(h.state().is_started());
    assert!(h.roll_back(b'C'));
    assert_eq!(h.state().pos(), -2);
    assert!(h.roll(b'A'));
    assert!(h.roll(b'C'));
    assert_eq!(h.pos(), 0);
    assert_eq!(h.state().pos(), 0);
}

use crate::{BloomFilter, OpenMode};
use rand::Rng;
use tempfile::tempdir;

#[test]
fn hello_is_found_world_is_not() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.bloom");

    let mut bf = BloomFilter::new(200, 0.001, Some(&path), None).unwrap();
    bf.add(b"hello").unwrap();

    assert!(bf.contains(b"hello").unwrap());
    assert!(!bf.contains(b"world").unwrap());
}

#[test]
fn persisted_filter_is_readable_after_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.bloom");

    let keys: Vec<String> = (0..10).map(|i| format!("key-{i}")).collect();

    {
        let mut bf1 = BloomFilter::new(100, 0.01, Some(&path), None).unwrap();
        for key in &keys {
            bf1.add(key.as_bytes()).unwrap();
        }
        bf1.sync().unwrap();
    }

    let bf2 = BloomFilter::open(&path, OpenMode::ReadWrite).unwrap();
    for key in &keys {
        assert!(bf2.contains(key.as_bytes()).unwrap());
    }
}

#[test]
fn no_false_negatives_over_random_elements() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.bloom");
    let mut rng = rand::thread_rng();

    let mut bf = BloomFilter::new(2_000, 0.01, Some(&path), None).unwrap();
    let elements: Vec<[u8; 16]> = (0..2_000).map(|_| rng.gen()).collect();

    for e in &elements {
        bf.add(e).unwrap();
    }

    for e in &elements {
        assert!(bf.contains(e).unwrap());
    }
}

#[test]
fn false_positive_rate_is_within_two_orders_of_magnitude() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.bloom");
    let mut rng = rand::thread_rng();

    let target_p = 0.01;
    let mut bf = BloomFilter::new(5_000, target_p, Some(&path), None).unwrap();

    let elements: Vec<[u8; 16]> = (0..5_000).map(|_| rng.gen()).collect();
    for e in &elements {
        bf.add(e).unwrap();
    }

    let seen: std::collections::HashSet<_> = elements.iter().cloned().collect();
    let mut false_positives = 0usize;
    let trials = 20_000usize;

    let mut tested = 0usize;
    while tested < trials {
        let candidate: [u8; 16] = rng.gen();
        if seen.contains(&candidate) {
            continue;
        }
        tested += 1;
        if bf.contains(&candidate).unwrap() {
            false_positives += 1;
        }
    }

    let observed = false_positives as f64 / trials as f64;
    assert!(
        observed < 100.0 * target_p,
        "observed fp rate {observed} too high for target {target_p}"
    );
}

#[test]
fn identical_inputs_produce_identical_bit_payloads() {
    let dir = tempdir().unwrap();
    let path_a = dir.path().join("a.bloom");
    let path_b = dir.path().join("b.bloom");

    let elements: Vec<String> = (0..200).map(|i| format!("elem-{i}")).collect();

    let mut a = BloomFilter::new(500, 0.02, Some(&path_a), None).unwrap();
    let mut b = BloomFilter::new(500, 0.02, Some(&path_b), None).unwrap();

    for e in &elements {
        a.add(e.as_bytes()).unwrap();
        b.add(e.as_bytes()).unwrap();
    }

    assert_eq!(a.to_base64().unwrap(), b.to_base64().unwrap());
}

#[test]
fn add_reports_whether_all_bits_were_already_set() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.bloom");
    let mut bf = BloomFilter::new(100, 0.01, Some(&path), None).unwrap();

    let first = bf.add(b"repeat-me").unwrap();
    let second = bf.add(b"repeat-me").unwrap();

    assert!(!first);
    assert!(second);
}

#[test]
fn update_adds_every_element() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.bloom");
    let mut bf = BloomFilter::new(100, 0.01, Some(&path), None).unwrap();

    bf.update([b"a".as_slice(), b"b".as_slice(), b"c".as_slice()])
        .unwrap();

    assert!(bf.contains(b"a").unwrap());
    assert!(bf.contains(b"b").unwrap());
    assert!(bf.contains(b"c").unwrap());
}

#[test]
fn clear_all_empties_the_filter_and_resets_count() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.bloom");
    let mut bf = BloomFilter::new(100, 0.01, Some(&path), None).unwrap();

    bf.add(b"hello").unwrap();
    assert_eq!(bf.element_count().unwrap(), 1);

    bf.clear_all().unwrap();

    assert!(!bf.contains(b"hello").unwrap());
    assert_eq!(bf.element_count().unwrap(), 0);
}

#[test]
fn anonymous_filter_has_no_name() {
    let mut bf = BloomFilter::new(10, 0.1, None, None).unwrap();
    bf.add(b"x").unwrap();
    assert!(bf.name().is_err());
}

#[test]
fn closed_handle_rejects_every_operation() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.bloom");
    let mut bf = BloomFilter::new(10, 0.1, Some(&path), None).unwrap();

    bf.close().unwrap();

    assert!(matches!(bf.contains(b"x"), Err(crate::Error::Closed)));
    assert!(matches!(bf.add(b"x"), Err(crate::Error::Closed)));
    assert!(matches!(bf.close(), Err(crate::Error::Closed)));
}

use crate::BloomFilter;
use tempfile::tempdir;

fn seeded(dir: &std::path::Path, name: &str, seeds: &[u32]) -> BloomFilter {
    let path = dir.join(name);
    BloomFilter::new(100, 0.01, Some(&path), Some(seeds.to_vec())).unwrap()
}

#[test]
fn union_contains_elements_from_both_filters() {
    let dir = tempdir().unwrap();
    let seeds = crate::params::default_seeds(5);

    let mut a = seeded(dir.path(), "a.bloom", &seeds);
    let mut b = seeded(dir.path(), "b.bloom", &seeds);

    a.add(b"only-in-a").unwrap();
    b.add(b"only-in-b").unwrap();

    a.union(&b).unwrap();

    assert!(a.contains(b"only-in-a").unwrap());
    assert!(a.contains(b"only-in-b").unwrap());
    assert_eq!(a.element_count().unwrap(), 0);
}

#[test]
fn intersection_contains_shared_elements() {
    let dir = tempdir().unwrap();
    let seeds = crate::params::default_seeds(5);

    let mut a = seeded(dir.path(), "a.bloom", &seeds);
    let mut b = seeded(dir.path(), "b.bloom", &seeds);

    a.add(b"shared").unwrap();
    a.add(b"only-in-a").unwrap();
    b.add(b"shared").unwrap();

    a.intersection(&b).unwrap();

    assert!(a.contains(b"shared").unwrap());
}

#[test]
fn union_rejects_filters_with_different_seeds() {
    let dir = tempdir().unwrap();

    let mut a = seeded(dir.path(), "a.bloom", &[2, 3, 5, 7, 11]);
    let b = seeded(dir.path(), "b.bloom", &[2, 3, 5, 7, 13]);

    assert!(matches!(a.union(&b), Err(crate::Error::Shape(_))));
}

#[test]
fn copy_preserves_contents_and_element_count() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("orig.bloom");
    let copy_path = dir.path().join("copy.bloom");

    let mut bf = BloomFilter::new(100, 0.01, Some(&path), None).unwrap();
    bf.add(b"one").unwrap();
    bf.add(b"two").unwrap();

    let copy = bf.copy(Some(&copy_path)).unwrap();

    assert!(copy.contains(b"one").unwrap());
    assert!(copy.contains(b"two").unwrap());
    assert_eq!(copy.element_count().unwrap(), bf.element_count().unwrap());
    assert_eq!(copy.to_base64().unwrap(), bf.to_base64().unwrap());
}

#[test]
fn copy_template_is_empty_but_compatible() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("orig.bloom");
    let template_path = dir.path().join("template.bloom");

    let mut bf = BloomFilter::new(100, 0.01, Some(&path), None).unwrap();
    bf.add(b"one").unwrap();

    let mut template = bf.copy_template(Some(&template_path)).unwrap();

    assert!(!template.contains(b"one").unwrap());
    assert_eq!(template.element_count().unwrap(), 0);
    assert_eq!(template.num_bits().unwrap(), bf.num_bits().unwrap());
    assert_eq!(template.hash_seeds().unwrap(), bf.hash_seeds().unwrap());

    // Demonstrates the intended use: template is a compatible empty
    // filter that can later be unioned against the original.
    template.union(&bf).unwrap();
    assert!(template.contains(b"one").unwrap());
}

use crate::cache::{CacheLevel, Probe};

const LINE: [u8; 4] = [0; 4];

#[test]
fn probe_misses_until_installed() {
    let mut level = CacheLevel::new("L1", 4, 4, 2, 1);
    assert_eq!(level.probe(7, 1), Probe::Miss);
    let (line, evicted) = level.install(7, 1, false, &LINE);
    assert!(evicted.is_none());
    assert_eq!(level.probe(7, 1), Probe::Hit(line));
    // Same tag, other set
    assert_eq!(level.probe(7, 0), Probe::Miss);
    assert_eq!(level.stats().hits, 1);
    assert_eq!(level.stats().misses, 2);
}

#[test]
fn fills_the_first_free_slot() {
    let mut level = CacheLevel::new("L1", 4, 8, 4, 1);
    level.install(5, 0, false, &LINE);
    level.install(6, 0, false, &LINE);
    let set = level.set(0);
    assert_eq!((set[0].valid, set[0].tag), (true, 5));
    assert_eq!((set[1].valid, set[1].tag), (true, 6));
    assert!(!set[2].valid);
    assert!(!set[3].valid);
    assert_eq!(level.uninitialised_line_count(), 6);
}

#[test]
fn evicts_least_recently_used() {
    let mut level = CacheLevel::new("L1", 4, 4, 2, 1);
    level.install(1, 0, false, &LINE);
    level.install(2, 0, false, &LINE);
    // Tag 1 becomes the most recently used, leaving tag 2 as the victim
    assert!(matches!(level.probe(1, 0), Probe::Hit(_)));
    let (_, evicted) = level.install(3, 0, false, &LINE);
    let evicted = evicted.unwrap();
    assert_eq!(evicted.tag, 2);
    assert_eq!(evicted.address, level.layout().line_address(2, 0));
    assert!(level.find(1, 0).is_some());
    assert!(level.find(2, 0).is_none());
    assert!(level.find(3, 0).is_some());
}

#[test]
fn eviction_returns_dirty_state_and_contents() {
    let mut level = CacheLevel::new("L1", 4, 2, 2, 1);
    level.install(1, 0, true, &[1, 2, 3, 4]);
    level.install(2, 0, false, &[5, 6, 7, 8]);
    let (_, evicted) = level.install(3, 0, false, &LINE);
    let evicted = evicted.unwrap();
    assert_eq!(evicted.tag, 1);
    assert!(evicted.dirty);
    assert_eq!(evicted.data, vec![1, 2, 3, 4]);

    let (_, evicted) = level.install(4, 0, false, &LINE);
    let evicted = evicted.unwrap();
    assert_eq!(evicted.tag, 2);
    assert!(!evicted.dirty);
}

#[test]
fn direct_mapped_conflicts_always_evict() {
    let mut level = CacheLevel::new("L1", 4, 1, 1, 1);
    level.install(1, 0, false, &LINE);
    assert_eq!(level.probe(2, 0), Probe::Miss);
    let (_, evicted) = level.install(2, 0, false, &LINE);
    assert_eq!(evicted.map(|line| line.tag), Some(1));
    assert_eq!(level.probe(1, 0), Probe::Miss);
}

#[test]
fn mark_dirty_and_byte_access() {
    let mut level = CacheLevel::new("L1", 8, 2, 1, 1);
    let (line, _) = level.install(3, 1, false, &[0; 8]);
    assert!(!level.line(line).dirty);
    level.write_bytes(line, 2, &[0xAA, 0xBB]);
    level.mark_dirty(line);
    assert!(level.line(line).dirty);
    let mut buf = [0u8; 4];
    level.read_bytes(line, 1, &mut buf);
    assert_eq!(buf, [0, 0xAA, 0xBB, 0]);
    assert_eq!(level.line_data(line), &[0, 0, 0xAA, 0xBB, 0, 0, 0, 0]);
}

#[test]
fn absorbed_write_back_keeps_recency() {
    let mut level = CacheLevel::new("L2", 4, 4, 4, 10);
    let (line, _) = level.install(9, 0, false, &LINE);
    let address = level.layout().line_address(9, 0);
    let last_used = level.line(line).last_used;
    assert!(level.absorb_write_back(address, &[9, 9, 9, 9]));
    assert!(level.line(line).dirty);
    assert_eq!(level.line(line).last_used, last_used);
    assert_eq!(level.line_data(line), &[9, 9, 9, 9]);
    // Not present, left for the next level out
    assert!(!level.absorb_write_back(address + 0x100, &LINE));
}

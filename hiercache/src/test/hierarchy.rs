use crate::hierarchy::{Access, CacheHierarchy, ServedBy};
use crate::config::ConfigBuilder;
use super::{single_level, two_level_direct};

fn memory_miss(latency: u64) -> Access {
    Access {
        served_by: ServedBy::Memory,
        latency,
    }
}

fn hit(level: u8, latency: u64) -> Access {
    Access {
        served_by: ServedBy::Cache(level),
        latency,
    }
}

#[test]
fn single_line_direct_mapped_never_hits_on_conflicts() {
    let mut hierarchy = CacheHierarchy::new(&single_level(4, 1, 0, None, 2));
    // Same index, different tags
    for address in [0x0, 0x4, 0x0, 0x4] {
        let (_, access) = hierarchy.read(address);
        assert_eq!(access, memory_miss(102));
    }
    assert_eq!(hierarchy.memory().line_reads(), 4);
}

#[test]
fn associative_set_holds_its_working_set() {
    // 4 lines, 2 sets of 2. 0x0 and 0x8 both map to set 0
    let mut hierarchy = CacheHierarchy::new(&single_level(4, 4, 1, Some(2), 1));
    let addresses = [0x0, 0x8];
    for address in addresses {
        assert_eq!(hierarchy.read(address).1.served_by, ServedBy::Memory);
    }
    for _ in 0..10 {
        for address in addresses {
            assert_eq!(hierarchy.read(address).1, hit(1, 1));
        }
    }
}

#[test]
fn lru_thrashes_when_the_working_set_is_too_large() {
    let mut hierarchy = CacheHierarchy::new(&single_level(4, 4, 1, Some(2), 1));
    for _ in 0..5 {
        for address in [0x0, 0x8, 0x10] {
            assert_eq!(hierarchy.read(address).1.served_by, ServedBy::Memory);
        }
    }
}

#[test]
fn hits_in_deeper_levels_fill_closer_ones() {
    let mut hierarchy = CacheHierarchy::new(&two_level_direct(1, 4));
    assert_eq!(hierarchy.read(0x0).1, memory_miss(111));
    // Evicts 0x0 from L1 only
    assert_eq!(hierarchy.read(0x4).1, memory_miss(111));
    assert_eq!(hierarchy.read(0x0).1, hit(2, 11));
    assert_eq!(hierarchy.read(0x0).1, hit(1, 1));

    let l1 = hierarchy.levels()[0].stats();
    let l2 = hierarchy.levels()[1].stats();
    assert_eq!((l1.hits, l1.misses), (1, 3));
    assert_eq!((l2.hits, l2.misses), (1, 2));
}

#[test]
fn reads_return_memory_contents() {
    let mut hierarchy = CacheHierarchy::new(&two_level_direct(2, 8));
    hierarchy.memory_mut().write_word(0x40, 0x1234_5678);
    assert_eq!(hierarchy.read(0x40), (0x1234_5678, memory_miss(111)));
    assert_eq!(hierarchy.read(0x40), (0x1234_5678, hit(1, 1)));
    assert_eq!(hierarchy.read(0x80).0, 0);
}

#[test]
fn written_values_survive_eviction_to_memory() {
    let mut hierarchy = CacheHierarchy::new(&single_level(4, 1, 0, None, 1));
    assert_eq!(hierarchy.write(0x0, 0xAABB_CCDD), memory_miss(101));
    // Pushes the dirty line out
    hierarchy.write(0x4, 0x1122_3344);
    assert_eq!(hierarchy.write_backs(), 1);
    assert_eq!(hierarchy.memory().line_writes(), 1);
    assert_eq!(hierarchy.memory().read_word(0x0), 0xAABB_CCDD);
    assert_eq!(hierarchy.read(0x0), (0xAABB_CCDD, memory_miss(101)));
    assert_eq!(hierarchy.read(0x4).0, 0x1122_3344);
}

#[test]
fn write_hits_mark_the_line_dirty() {
    let mut hierarchy = CacheHierarchy::new(&single_level(4, 2, 0, None, 1));
    hierarchy.read(0x0);
    hierarchy.write(0x0, 5);
    let level = &hierarchy.levels()[0];
    let decoded = level.decode(0x0);
    let line = level.find(decoded.tag, decoded.index).unwrap();
    assert!(level.line(line).dirty);
    assert_eq!(hierarchy.memory().read_word(0x0), 0);
}

#[test]
fn reads_never_fill_dirty() {
    let mut hierarchy = CacheHierarchy::new(&two_level_direct(1, 4));
    hierarchy.read(0x0);
    hierarchy.read(0x4);
    assert_eq!(hierarchy.write_backs(), 0);
    assert_eq!(hierarchy.memory().line_writes(), 0);
}

#[test]
fn write_backs_land_in_the_next_level_holding_the_line() {
    let mut hierarchy = CacheHierarchy::new(&two_level_direct(1, 4));
    hierarchy.write(0x0, 1);
    // Only the L1 copy sees this, L2 keeps the older value
    assert_eq!(hierarchy.write(0x0, 2), hit(1, 1));
    // Evicting 0x0 from L1 hands the newer value to L2
    hierarchy.read(0x4);
    assert_eq!(hierarchy.write_backs(), 1);
    assert_eq!(hierarchy.memory().line_writes(), 0);
    assert_eq!(hierarchy.read(0x0), (2, hit(2, 11)));
}

#[test]
fn write_backs_skip_levels_that_lost_the_line() {
    // L1 and L2 hold one line each, L3 has four direct mapped slots
    let config = ConfigBuilder {
        line_size: Some(4),
        levels: Some(3),
        lines_l1: Some(1),
        lines_l2: Some(1),
        lines_l3: Some(4),
        latency_l1: Some(1),
        latency_l2: Some(10),
        latency_l3: Some(20),
        mapping_strategy: Some(0),
        cycles: Some(100),
        ..ConfigBuilder::default()
    }
    .build()
    .unwrap();
    let mut hierarchy = CacheHierarchy::new(&config);
    hierarchy.write(0x0, 1);

    // L2 evicts 0x0 into L3 before L1 does, so the L1 victim passes over L2
    assert_eq!(hierarchy.read(0x4), (0, memory_miss(131)));
    assert_eq!(hierarchy.write_backs(), 2);
    assert_eq!(hierarchy.memory().line_writes(), 0);
    let l2 = &hierarchy.levels()[1];
    let decoded = l2.decode(0x0);
    assert!(l2.find(decoded.tag, decoded.index).is_none());
    let l3 = &hierarchy.levels()[2];
    let decoded = l3.decode(0x0);
    assert!(l3.line(l3.find(decoded.tag, decoded.index).unwrap()).dirty);

    // 0x10 shares the L3 slot of 0x0, pushing the dirty line out to memory
    hierarchy.read(0x10);
    assert_eq!(hierarchy.write_backs(), 3);
    assert_eq!(hierarchy.memory().line_writes(), 1);
    assert_eq!(hierarchy.memory().read_word(0x0), 1);
    assert_eq!(hierarchy.read(0x0), (1, memory_miss(131)));
}

#[test]
fn unaligned_words_span_two_lines() {
    let mut hierarchy = CacheHierarchy::new(&single_level(4, 4, 0, None, 1));
    assert_eq!(hierarchy.write(0x2, 0xAABB_CCDD), memory_miss(202));
    assert_eq!(hierarchy.read(0x2), (0xAABB_CCDD, hit(1, 2)));
    assert_eq!(hierarchy.read(0x0).0, 0xCCDD_0000);
    assert_eq!(hierarchy.read(0x4).0, 0x0000_AABB);
}

#[test]
fn spanning_access_reports_the_deepest_level() {
    let mut hierarchy = CacheHierarchy::new(&single_level(4, 4, 0, None, 1));
    hierarchy.read(0x0);
    // First line hits, second goes to memory
    assert_eq!(hierarchy.read(0x2).1, memory_miss(1 + 101));
}

#[test]
fn lines_smaller_than_a_word() {
    let mut hierarchy = CacheHierarchy::new(&single_level(1, 8, 1, None, 1));
    hierarchy.write(0x10, 0x0102_0304);
    assert_eq!(hierarchy.read(0x10), (0x0102_0304, hit(1, 4)));
}

#[test]
fn words_wrap_around_the_address_space() {
    let mut hierarchy = CacheHierarchy::new(&single_level(4, 4, 1, None, 1));
    hierarchy.write(0xFFFF_FFFE, 0xDEAD_BEEF);
    assert_eq!(hierarchy.read(0xFFFF_FFFE).0, 0xDEAD_BEEF);
    assert_eq!(hierarchy.read(0x0).0, 0x0000_DEAD);
}

#[test]
fn write_then_read_returns_the_value_on_every_path() {
    let mut hierarchy = CacheHierarchy::new(&two_level_direct(2, 4));
    for (i, address) in (0..64u32).map(|i| i * 4).enumerate() {
        let value = 0x1000_0000 + i as u32;
        hierarchy.write(address, value);
        assert_eq!(hierarchy.read(address).0, value);
    }
    for (i, address) in (0..64u32).map(|i| i * 4).enumerate() {
        assert_eq!(hierarchy.read(address).0, 0x1000_0000 + i as u32);
    }
}

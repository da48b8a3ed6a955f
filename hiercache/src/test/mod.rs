use crate::config::{CacheConfiguration, ConfigBuilder};

mod cache;
mod hierarchy;

/// A single level hierarchy with 100 cycle memory
pub(crate) fn single_level(
    line_size: u32,
    lines: u32,
    mapping_strategy: u32,
    associativity: Option<u32>,
    latency: u32,
) -> CacheConfiguration {
    ConfigBuilder {
        line_size: Some(line_size),
        levels: Some(1),
        lines_l1: Some(lines),
        latency_l1: Some(latency),
        mapping_strategy: Some(mapping_strategy),
        associativity,
        cycles: Some(100),
        ..ConfigBuilder::default()
    }
    .build()
    .unwrap()
}

/// Two direct mapped levels with 4 byte lines, L1 latency 1, L2 latency 10 and 100 cycle memory
pub(crate) fn two_level_direct(lines_l1: u32, lines_l2: u32) -> CacheConfiguration {
    ConfigBuilder {
        line_size: Some(4),
        levels: Some(2),
        lines_l1: Some(lines_l1),
        lines_l2: Some(lines_l2),
        latency_l1: Some(1),
        latency_l2: Some(10),
        mapping_strategy: Some(0),
        cycles: Some(100),
        ..ConfigBuilder::default()
    }
    .build()
    .unwrap()
}

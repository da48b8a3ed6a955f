//! # HierCache
//!
//! HierCache is a library for simulating a multi-level CPU cache hierarchy
//!
//! It replays a trace of word reads and writes against one to three inclusive, write-back cache
//! levels in front of a sparse main memory, reporting where each request was served, what it
//! cost in cycles, and whether verified reads returned the values the trace expects
//!
//! Configuration and traces are validated up front; the engine itself trusts what it is given

/// Splitting addresses into tag, set index and offset
pub mod address;

/// Contains a single cache level with least recently used replacement
pub mod cache;

/// Contains the validated configuration, the builder used to produce it from JSON and command
/// line input, and the command line number parsers
pub mod config;

/// Contains the multi-level lookup, fill and write back protocol
pub mod hierarchy;

/// The backing store behind the last level
pub mod memory;

/// Contains the simulator used to replay a trace with a given configuration
pub mod simulator;

/// Trace file loading and the request type
pub mod trace;

/// Contains generators for synthetic traces, used by benchmarks, tests and the trace generator
pub mod workload;

mod io;

#[cfg(test)]
mod test;

pub use config::{CacheConfiguration, ConfigBuilder, ConfigError};
pub use hierarchy::{CacheHierarchy, ServedBy};
pub use simulator::{SimulationError, SimulationResult, Simulator};
pub use trace::{MemoryRequest, TraceError};


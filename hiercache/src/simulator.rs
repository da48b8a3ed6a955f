use std::time::{Duration, Instant};
use serde::{Deserialize, Serialize};
use crate::config::CacheConfiguration;
use crate::hierarchy::{CacheHierarchy, ServedBy};
use crate::trace::{MemoryRequest, Operation};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SimulationError {
    #[error("the trace contains no requests")]
    EmptyTrace,
}

/// The simulator replays requests against a hierarchy, in order, and collects results.
///
/// It supports calling simulate multiple times; the hierarchy keeps its state between calls, and
/// the time taken to simulate and the results are accumulated
#[derive(Debug)]
pub struct Simulator {
    hierarchy: CacheHierarchy,
    verify: bool,
    result: SimulationResult,
    simulation_time: Duration,
}

/// The result of a simulation. Serialises to the JSON output format, without per request outcomes
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimulationResult {
    pub requests: u64,
    /// Requests served by some cache level
    pub hits: u64,
    /// Requests that went to main memory
    pub misses: u64,
    pub total_latency: u64,
    /// Lines fetched from main memory
    pub main_memory_accesses: u64,
    /// Dirty lines evicted from any level
    pub write_backs: u64,
    pub caches: Vec<CacheResult>,
    pub mismatches: Vec<Mismatch>,
    #[serde(skip)]
    pub outcomes: Vec<RequestOutcome>,
}

/// The result for an individual level, counted per line probe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheResult {
    pub name: String,
    pub hits: u64,
    pub misses: u64,
}

/// A verified read which returned something other than its expected value
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Mismatch {
    /// Index of the request in the replayed sequence
    pub request: usize,
    pub address: u32,
    pub expected: u32,
    pub actual: u32,
}

/// What happened to a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOutcome {
    pub index: usize,
    pub operation: Operation,
    pub address: u32,
    pub served_by: ServedBy,
    pub latency: u64,
    /// The value read, or the value written
    pub data: u32,
    pub mismatch: bool,
}

impl SimulationResult {
    /// A run succeeds when no verified read disagreed with its expected value
    pub fn is_success(&self) -> bool {
        self.mismatches.is_empty()
    }
}

impl Simulator {
    /// Creates a new simulator, with an empty hierarchy, for a given configuration
    pub fn new(config: &CacheConfiguration) -> Self {
        log::info!("Simulating {config}");
        let hierarchy = CacheHierarchy::new(config);
        let result = SimulationResult {
            caches: hierarchy
                .levels()
                .iter()
                .map(|level| CacheResult {
                    name: level.name().to_string(),
                    hits: 0,
                    misses: 0,
                })
                .collect(),
            ..SimulationResult::default()
        };
        Self {
            hierarchy,
            verify: config.verify(),
            result,
            simulation_time: Duration::new(0, 0),
        }
    }

    /// Replays `requests` in order
    ///
    /// In verify mode, reads carrying an expected value are checked against the value the
    /// hierarchy returns. Mismatches are recorded in the result and do not stop the replay
    ///
    /// # Arguments
    ///
    /// * `requests`: The requests, in trace order. Must not be empty
    ///
    /// returns: Result<&SimulationResult, SimulationError>
    pub fn simulate(&mut self, requests: &[MemoryRequest]) -> Result<&SimulationResult, SimulationError> {
        if requests.is_empty() {
            return Err(SimulationError::EmptyTrace);
        }
        let start = Instant::now();
        for request in requests {
            self.step(request);
        }
        self.simulation_time += start.elapsed();
        self.collect_level_results();
        Ok(&self.result)
    }

    fn step(&mut self, request: &MemoryRequest) {
        let index = self.result.outcomes.len();
        let (data, access, expected) = match *request {
            MemoryRequest::Read { address, expected } => {
                let (data, access) = self.hierarchy.read(address);
                (data, access, expected.filter(|_| self.verify))
            }
            MemoryRequest::Write { address, value } => (value, self.hierarchy.write(address, value), None),
        };
        let mismatch = expected.map_or(false, |expected| expected != data);
        if let Some(expected) = expected.filter(|_| mismatch) {
            log::debug!("Request {index}: expected 0x{expected:08x}, read 0x{data:08x}");
            self.result.mismatches.push(Mismatch {
                request: index,
                address: request.address(),
                expected,
                actual: data,
            });
        }
        log::debug!(
            "Request {index}: {} 0x{:08x} {} in {} cycles",
            request.operation(),
            request.address(),
            access.served_by,
            access.latency
        );

        self.result.requests += 1;
        self.result.total_latency += access.latency;
        match access.served_by {
            ServedBy::Memory => self.result.misses += 1,
            ServedBy::Cache(_) => self.result.hits += 1,
        }
        self.result.outcomes.push(RequestOutcome {
            index,
            operation: request.operation(),
            address: request.address(),
            served_by: access.served_by,
            latency: access.latency,
            data,
            mismatch,
        });
    }

    fn collect_level_results(&mut self) {
        for (level, res) in self.hierarchy.levels().iter().zip(&mut self.result.caches) {
            let stats = level.stats();
            res.hits = stats.hits;
            res.misses = stats.misses;
        }
        self.result.main_memory_accesses = self.hierarchy.memory().line_reads();
        self.result.write_backs = self.hierarchy.write_backs();
    }

    pub fn result(&self) -> &SimulationResult {
        &self.result
    }

    pub fn hierarchy(&self) -> &CacheHierarchy {
        &self.hierarchy
    }

    /// Gets the wall-clock execution time for processing
    pub fn get_execution_time(&self) -> &Duration {
        &self.simulation_time
    }

    /// Gets the number of uninitialised lines for each level
    pub fn get_uninitialised_line_counts(&self) -> Vec<u64> {
        self.hierarchy
            .levels()
            .iter()
            .map(|level| level.uninitialised_line_count() as u64)
            .collect()
    }
}

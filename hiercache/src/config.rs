use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use serde::Deserialize;

/// The deepest hierarchy supported
pub const MAX_LEVELS: usize = 3;

/// Names used for the levels, nearest to the requester first
pub const LEVEL_NAMES: [&str; MAX_LEVELS] = ["L1", "L2", "L3"];

pub const DEFAULT_LINE_SIZE: u32 = 64;
pub const DEFAULT_LEVELS: u32 = 3;
pub const DEFAULT_LINE_COUNTS: [u32; MAX_LEVELS] = [512, 4096, 32768];
pub const DEFAULT_LATENCIES: [u32; MAX_LEVELS] = [8, 16, 32];
pub const DEFAULT_MAPPING_STRATEGY: u32 = 1;
pub const DEFAULT_MEMORY_LATENCY: u32 = 100;

/// Most line slots a single level may have. Slot metadata is allocated up front
pub const MAX_LEVEL_LINES: u32 = 1 << 22;

/// Largest data capacity of a single level, in bytes. Line contents are allocated up front
pub const MAX_LEVEL_BYTES: u64 = 1 << 28;

/// Reasons a configuration is rejected. All of them are fatal before any request is simulated
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Negative values are not accepted {name}: {arg}")]
    Negative { name: &'static str, arg: String },

    #[error("Literals are not accepted in an argument {name}: {arg}")]
    Literal { name: &'static str, arg: String },

    #[error("Buffer error {name}: {arg}")]
    Overflow { name: &'static str, arg: String },

    #[error("Out of bounds {name}: {arg}")]
    OutOfBounds { name: &'static str, arg: String },

    #[error("{name} {value} is not a power of 2")]
    NotPowerOfTwo { name: &'static str, value: u32 },

    #[error("Number of cache levels {0} is invalid, the value is between 1 and 3")]
    LevelCount(u32),

    #[error("Mapping strategy {0} is invalid, expected 0 (direct-mapped) or 1 (set-associative)")]
    MappingStrategy(u32),

    #[error("Associativity can only be set with the set-associative mapping strategy")]
    AssociativityWithoutSets,

    #[error("{level} capacity of {bytes} bytes exceeds the supported maximum of {max} bytes", max = MAX_LEVEL_BYTES)]
    Capacity { level: &'static str, bytes: u64 },

    #[error("Couldn't open the config file at path {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Couldn't parse the config file: {0}")]
    Json(#[from] serde_json::Error),
}

/// How lines are placed within a level
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MappingStrategy {
    /// Every address maps to exactly one slot
    DirectMapped,
    /// Addresses map to a set of slots. Without an explicit associativity, a level is a single set
    SetAssociative,
}

impl TryFrom<u32> for MappingStrategy {
    type Error = ConfigError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MappingStrategy::DirectMapped),
            1 => Ok(MappingStrategy::SetAssociative),
            other => Err(ConfigError::MappingStrategy(other)),
        }
    }
}

/// Resolved parameters for one level
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LevelConfig {
    pub line_count: u32,
    pub latency: u32,
    pub associativity: u32,
}

/// A validated hierarchy configuration
///
/// Can only be produced by [`ConfigBuilder::build`], so every size is a non-zero power of two and
/// the level count is in range. The engine relies on this and never re-checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfiguration {
    line_size: u32,
    levels: Vec<LevelConfig>,
    mapping_strategy: MappingStrategy,
    memory_latency: u32,
    verify: bool,
    debug: bool,
}

impl CacheConfiguration {
    pub fn line_size(&self) -> u32 {
        self.line_size
    }

    /// Levels ordered from nearest to the requester outwards
    pub fn levels(&self) -> &[LevelConfig] {
        &self.levels
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn mapping_strategy(&self) -> MappingStrategy {
        self.mapping_strategy
    }

    /// Cost in cycles of going to the backing store, the "cycles" parameter
    pub fn memory_latency(&self) -> u32 {
        self.memory_latency
    }

    pub fn verify(&self) -> bool {
        self.verify
    }

    pub fn debug(&self) -> bool {
        self.debug
    }
}

impl fmt::Display for CacheConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} byte lines", self.line_size)?;
        for (name, level) in LEVEL_NAMES.iter().zip(&self.levels) {
            write!(
                f,
                ", {name}: {} lines {}-way {} cycles",
                level.line_count, level.associativity, level.latency
            )?;
        }
        write!(f, ", memory: {} cycles", self.memory_latency)
    }
}

/// Unvalidated settings, gathered from a JSON file and/or the command line
///
/// Unset fields fall back to the defaults when built. The JSON form uses the field names, e.g.
///
/// ```json
/// { "line_size": 64, "levels": 2, "lines_l1": 64, "lines_l2": 512, "mapping_strategy": 1 }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigBuilder {
    pub line_size: Option<u32>,
    pub levels: Option<u32>,
    pub lines_l1: Option<u32>,
    pub lines_l2: Option<u32>,
    pub lines_l3: Option<u32>,
    pub latency_l1: Option<u32>,
    pub latency_l2: Option<u32>,
    pub latency_l3: Option<u32>,
    pub mapping_strategy: Option<u32>,
    pub associativity: Option<u32>,
    pub cycles: Option<u32>,
    pub verify: Option<bool>,
    pub debug: Option<bool>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_reader(reader: impl Read) -> Result<Self, ConfigError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_reader(BufReader::new(file))
    }

    /// Layers `overrides` on top of these settings, fields set in `overrides` win
    pub fn merge(self, overrides: ConfigBuilder) -> Self {
        Self {
            line_size: overrides.line_size.or(self.line_size),
            levels: overrides.levels.or(self.levels),
            lines_l1: overrides.lines_l1.or(self.lines_l1),
            lines_l2: overrides.lines_l2.or(self.lines_l2),
            lines_l3: overrides.lines_l3.or(self.lines_l3),
            latency_l1: overrides.latency_l1.or(self.latency_l1),
            latency_l2: overrides.latency_l2.or(self.latency_l2),
            latency_l3: overrides.latency_l3.or(self.latency_l3),
            mapping_strategy: overrides.mapping_strategy.or(self.mapping_strategy),
            associativity: overrides.associativity.or(self.associativity),
            cycles: overrides.cycles.or(self.cycles),
            verify: overrides.verify.or(self.verify),
            debug: overrides.debug.or(self.debug),
        }
    }

    /// Validates the settings and produces an immutable configuration
    pub fn build(&self) -> Result<CacheConfiguration, ConfigError> {
        let line_size = self.line_size.unwrap_or(DEFAULT_LINE_SIZE);
        require_power_of_two("Cache line size", line_size)?;

        let level_count = self.levels.unwrap_or(DEFAULT_LEVELS);
        if level_count == 0 || level_count as usize > MAX_LEVELS {
            return Err(ConfigError::LevelCount(level_count));
        }

        let mapping_strategy =
            MappingStrategy::try_from(self.mapping_strategy.unwrap_or(DEFAULT_MAPPING_STRATEGY))?;
        if let Some(associativity) = self.associativity {
            if mapping_strategy == MappingStrategy::DirectMapped {
                return Err(ConfigError::AssociativityWithoutSets);
            }
            require_power_of_two("Associativity", associativity)?;
        }

        let memory_latency = self.cycles.unwrap_or(DEFAULT_MEMORY_LATENCY);
        if memory_latency == 0 {
            return Err(ConfigError::OutOfBounds {
                name: "cycles",
                arg: memory_latency.to_string(),
            });
        }

        let line_counts = [self.lines_l1, self.lines_l2, self.lines_l3];
        let latencies = [self.latency_l1, self.latency_l2, self.latency_l3];
        const LINE_COUNT_NAMES: [&str; MAX_LEVELS] =
            ["Number of lines in L1", "Number of lines in L2", "Number of lines in L3"];
        let mut levels = Vec::with_capacity(level_count as usize);
        for i in 0..level_count as usize {
            let line_count = line_counts[i].unwrap_or(DEFAULT_LINE_COUNTS[i]);
            require_power_of_two(LINE_COUNT_NAMES[i], line_count)?;
            if line_count > MAX_LEVEL_LINES {
                return Err(ConfigError::OutOfBounds {
                    name: LINE_COUNT_NAMES[i],
                    arg: line_count.to_string(),
                });
            }
            let bytes = line_count as u64 * line_size as u64;
            if bytes > MAX_LEVEL_BYTES {
                return Err(ConfigError::Capacity {
                    level: LEVEL_NAMES[i],
                    bytes,
                });
            }
            let associativity = match mapping_strategy {
                MappingStrategy::DirectMapped => 1,
                MappingStrategy::SetAssociative => self.associativity.map_or(line_count, |a| a.min(line_count)),
            };
            levels.push(LevelConfig {
                line_count,
                latency: latencies[i].unwrap_or(DEFAULT_LATENCIES[i]),
                associativity,
            });
        }

        Ok(CacheConfiguration {
            line_size,
            levels,
            mapping_strategy,
            memory_latency,
            verify: self.verify.unwrap_or(false),
            debug: self.debug.unwrap_or(false),
        })
    }
}

fn require_power_of_two(name: &'static str, value: u32) -> Result<(), ConfigError> {
    if value.is_power_of_two() {
        Ok(())
    } else {
        Err(ConfigError::NotPowerOfTwo { name, value })
    }
}

/// Parses an unsigned decimal command line value that fits in 32 bits
///
/// Checks are applied in a fixed order so each bad input gets one specific diagnostic: a leading
/// sign is reported as negative, any other non-digit as a literal, and values too wide for 32
/// bits as a buffer error
///
/// # Examples
///
/// ```
/// use hiercache::config::{parse_unsigned, ConfigError};
/// assert_eq!(parse_unsigned("1000", "cycles").unwrap(), 1000);
/// assert!(matches!(parse_unsigned("-1000", "cycles"), Err(ConfigError::Negative { .. })));
/// assert!(matches!(parse_unsigned("1000a", "cycles"), Err(ConfigError::Literal { .. })));
/// ```
pub fn parse_unsigned(arg: &str, name: &'static str) -> Result<u32, ConfigError> {
    if arg.starts_with('-') {
        return Err(ConfigError::Negative {
            name,
            arg: arg.to_string(),
        });
    }
    if arg.is_empty() || !arg.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ConfigError::Literal {
            name,
            arg: arg.to_string(),
        });
    }
    // Only digits remain, so the only possible failure is overflow
    arg.parse::<u32>().map_err(|_| ConfigError::Overflow {
        name,
        arg: arg.to_string(),
    })
}

/// As [`parse_unsigned`], additionally rejecting zero
pub fn parse_positive(arg: &str, name: &'static str) -> Result<u32, ConfigError> {
    match parse_unsigned(arg, name)? {
        0 => Err(ConfigError::OutOfBounds {
            name,
            arg: arg.to_string(),
        }),
        value => Ok(value),
    }
}

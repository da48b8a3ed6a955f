use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use clap::Parser;
use env_logger::Env;
use hiercache::config::{parse_positive, parse_unsigned, ConfigBuilder, ConfigError, LEVEL_NAMES};
use hiercache::simulator::{SimulationError, Simulator};
use hiercache::trace::{load_trace, TraceError};

#[derive(Parser, Debug)]
#[command(about = "Multi-level cache hierarchy simulator")]
struct Args {
    /// CSV trace of OP,ADDRESS,DATA rows
    trace: Option<PathBuf>,

    /// JSON configuration file, command line options take precedence over it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Main memory latency in cycles
    #[arg(short = 'c', long, value_name = "N", allow_hyphen_values = true)]
    cycles: Option<String>,

    /// Cache line size in bytes, a power of 2
    #[arg(short = 'C', long = "cacheline-size", value_name = "N", allow_hyphen_values = true)]
    line_size: Option<String>,

    /// Number of lines in L1, a power of 2
    #[arg(short = 'L', long = "num-lines-l1", value_name = "N", allow_hyphen_values = true)]
    lines_l1: Option<String>,

    /// Number of lines in L2, a power of 2
    #[arg(short = 'M', long = "num-lines-l2", value_name = "N", allow_hyphen_values = true)]
    lines_l2: Option<String>,

    /// Number of lines in L3, a power of 2
    #[arg(short = 'N', long = "num-lines-l3", value_name = "N", allow_hyphen_values = true)]
    lines_l3: Option<String>,

    /// L1 access latency in cycles
    #[arg(short = 'l', long = "latency-cache-l1", value_name = "N", allow_hyphen_values = true)]
    latency_l1: Option<String>,

    /// L2 access latency in cycles
    #[arg(short = 'm', long = "latency-cache-l2", value_name = "N", allow_hyphen_values = true)]
    latency_l2: Option<String>,

    /// L3 access latency in cycles
    #[arg(short = 'n', long = "latency-cache-l3", value_name = "N", allow_hyphen_values = true)]
    latency_l3: Option<String>,

    /// Number of cache levels, 1 to 3
    #[arg(short = 'e', long = "num-cache-levels", value_name = "N", allow_hyphen_values = true)]
    levels: Option<String>,

    /// 0 for direct-mapped, 1 for set-associative
    #[arg(short = 'S', long = "mapping-strategy", value_name = "N", allow_hyphen_values = true)]
    mapping_strategy: Option<String>,

    /// Lines per set with the set-associative strategy, fully associative when omitted
    #[arg(short = 'A', long, value_name = "N", allow_hyphen_values = true)]
    associativity: Option<String>,

    /// Print every request and extra diagnostics
    #[arg(short, long)]
    debug: bool,

    /// Check reads against the expected values in the trace
    #[arg(short, long)]
    verify: bool,

    /// Print the result as JSON instead of a summary
    #[arg(short, long)]
    json: bool,

    /// Print simulation and total execution time
    #[arg(short, long)]
    performance: bool,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error("No input file")]
    NoInputFile,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error("Couldn't serialise the output: {0}")]
    Output(#[from] serde_json::Error),
}

fn positive(arg: &Option<String>, name: &'static str) -> Result<Option<u32>, ConfigError> {
    arg.as_deref().map(|arg| parse_positive(arg, name)).transpose()
}

fn unsigned(arg: &Option<String>, name: &'static str) -> Result<Option<u32>, ConfigError> {
    arg.as_deref().map(|arg| parse_unsigned(arg, name)).transpose()
}

impl Args {
    /// Settings given on the command line, unset options stay unset so a config file can fill them
    fn to_builder(&self) -> Result<ConfigBuilder, ConfigError> {
        Ok(ConfigBuilder {
            cycles: positive(&self.cycles, "cycles")?,
            line_size: positive(&self.line_size, "Cache line size")?,
            lines_l1: positive(&self.lines_l1, "Number of lines in L1")?,
            lines_l2: positive(&self.lines_l2, "Number of lines in L2")?,
            lines_l3: positive(&self.lines_l3, "Number of lines in L3")?,
            latency_l1: unsigned(&self.latency_l1, "Latency of L1")?,
            latency_l2: unsigned(&self.latency_l2, "Latency of L2")?,
            latency_l3: unsigned(&self.latency_l3, "Latency of L3")?,
            levels: unsigned(&self.levels, "Number of cache levels")?,
            mapping_strategy: unsigned(&self.mapping_strategy, "Mapping strategy")?,
            associativity: positive(&self.associativity, "Associativity")?,
            verify: self.verify.then_some(true),
            debug: self.debug.then_some(true),
        })
    }
}

/// Runs the simulation, returning whether every verified read matched
fn run(args: &Args, start: Instant) -> Result<bool, CliError> {
    let overrides = args.to_builder()?;
    let builder = match &args.config {
        Some(path) => ConfigBuilder::from_json_file(path)?.merge(overrides),
        None => overrides,
    };
    let config = builder.build()?;

    let default_filter = if config.debug() { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    let trace = args.trace.as_ref().ok_or(CliError::NoInputFile)?;
    let requests = load_trace(trace)?;
    log::info!("Loaded {} requests from {trace:?}", requests.len());

    let mut simulator = Simulator::new(&config);
    let result = simulator.simulate(&requests)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        if config.debug() {
            for outcome in &result.outcomes {
                println!(
                    "Request {}: {} 0x{:08x} 0x{:08x} {} in {} cycles",
                    outcome.index, outcome.operation, outcome.address, outcome.data, outcome.served_by, outcome.latency
                );
            }
        }
        println!("Requests processed: {}", result.requests);
        println!("Hits: {}, misses: {}", result.hits, result.misses);
        for cache in &result.caches {
            println!("{}: {} hits, {} misses", cache.name, cache.hits, cache.misses);
        }
        println!("Main memory accesses: {}", result.main_memory_accesses);
        println!("Write backs: {}", result.write_backs);
        println!("Total latency: {} cycles", result.total_latency);
        for mismatch in &result.mismatches {
            println!(
                "Request {} Failure: address 0x{:08x} expected 0x{:08x}, read 0x{:08x}",
                mismatch.request, mismatch.address, mismatch.expected, mismatch.actual
            );
        }
        println!("{}", if result.is_success() { "Success" } else { "Failure" });
    }
    let success = result.is_success();

    if args.performance {
        let simulation_time = simulator.get_execution_time();
        let total_time = start.elapsed();
        println!("Simulation time: {}s", simulation_time.as_nanos() as f64 / 1e9);
        println!(
            "Total execution time (includes initial parsing, configuration, and output): {}s",
            total_time.as_nanos() as f64 / 1e9
        )
    }
    if config.debug() {
        #[cfg(debug_assertions)]
        println!(
            "Running the debug binary. If benchmarking, re-compile with the --release argument when using cargo run"
        );
        println!("Parsed input configuration: {config}");
        let uninitialised_lines = simulator.get_uninitialised_line_counts();
        let formatted = LEVEL_NAMES
            .iter()
            .zip(uninitialised_lines.iter())
            .map(|(name, count)| format!("{name}: {count}"))
            .collect::<Vec<_>>()
            .join(", ");
        println!("Uninitialised cache lines by layer: ({formatted})");
        println!("Total uninitialised cache lines: {}", uninitialised_lines.iter().sum::<u64>())
    }
    Ok(success)
}

fn main() -> ExitCode {
    let start = Instant::now();
    let args = Args::parse();
    match run(&args, start) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

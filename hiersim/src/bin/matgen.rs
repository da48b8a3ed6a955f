use std::fs;
use std::path::PathBuf;
use clap::Parser;
use hiercache::workload::{matrix_multiplication, to_csv};

/// Writes the trace of an N x N matrix multiplication
#[derive(Parser, Debug)]
#[command(about = "Matrix multiplication trace generator")]
struct Args {
    /// Matrix dimension
    #[arg(value_parser = clap::value_parser!(u32).range(1..=256))]
    n: u32,

    /// Include the expected value of every read, for verify mode
    #[arg(short, long)]
    expected: bool,

    /// Write the trace to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

fn main() -> Result<(), String> {
    let args = Args::parse();
    let csv = to_csv(&matrix_multiplication(args.n, args.expected));
    match &args.output {
        Some(path) => fs::write(path, csv + "\n").map_err(|e| format!("Couldn't write the trace to {path:?}: {e}"))?,
        None => println!("{csv}"),
    }
    Ok(())
}

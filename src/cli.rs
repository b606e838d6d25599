// CLI-specific types and structures
// This module contains the command-line interface definitions

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

use crate::config::InputFormat;
use crate::parallel::BenchMode;

#[derive(Parser, Debug)]
#[command(name = "sequence")]
#[command(about = "A high performance sequential log scanner, analyzer and parser")]
#[command(
    long_about = "A high performance sequential log scanner, analyzer and parser\n\nCOMMANDS:\n  scan     Tokenize a log file or a single message\n  analyze  Discover the patterns that match every message in a log file\n  parse    Match each message of a log file against known patterns\n  bench    Measure scanning or parsing throughput\n\nCOMMON EXAMPLES:\n  sequence analyze -i app.log -o patterns.txt\n  sequence parse -i app.log -p patterns.txt\n  sequence bench scan -i app.log --workers 4"
)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file (default: ./sequence.toml, then sequence.toml next to the executable)
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Message format to tokenize
    #[arg(long = "format", value_enum, global = true)]
    pub format: Option<InputFormat>,

    /// Input file, gzip and zstd compressed files are detected automatically
    #[arg(short = 'i', long = "input", global = true)]
    pub input: Option<PathBuf>,

    /// Output file (stdout if not specified)
    #[arg(short = 'o', long = "output", global = true)]
    pub output: Option<PathBuf>,

    /// Known patterns: a file, or a directory of files (used by analyze and parse)
    #[arg(short = 'p', long = "patterns", global = true)]
    pub patterns: Option<PathBuf>,

    /// Write a CPU profile (flamegraph SVG) to this file
    #[arg(long = "cpuprofile", global = true)]
    pub cpuprofile: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Tokenize a log file or message and output a list of tokens
    Scan {
        /// Message to tokenize when no input file is given
        message: Option<String>,
    },
    /// Analyze a log file and output a list of patterns that match all the log messages
    Analyze,
    /// Parse a log file and output the parsed tokens for each log message
    Parse,
    /// Benchmark scanning or parsing of a log file, no output is provided
    Bench {
        #[command(subcommand)]
        target: BenchTarget,

        /// Number of workers (0 = one per CPU)
        #[arg(long = "workers", global = true)]
        workers: Option<usize>,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchTarget {
    /// Benchmark the scanning of a log file
    Scan,
    /// Benchmark the parsing of a log file
    Parse,
}

impl From<BenchTarget> for BenchMode {
    fn from(target: BenchTarget) -> Self {
        match target {
            BenchTarget::Scan => BenchMode::Scan,
            BenchTarget::Parse => BenchMode::Parse,
        }
    }
}

/// Invalid combination of arguments, reported with exit code 2
#[derive(Debug, Error)]
#[error("{0}")]
pub struct UsageError(pub String);

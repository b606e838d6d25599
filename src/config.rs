use clap::ValueEnum;
use serde::Deserialize;
use std::path::PathBuf;

use crate::analyzer::AnalyzerConfig;
use crate::cli::{Cli, Command};
use crate::config_file::ConfigFile;

/// Default capacity of the benchmark work queue, in lines
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Main configuration struct for sequence
#[derive(Debug, Clone)]
pub struct SequenceConfig {
    pub input: InputConfig,
    pub output: OutputConfig,
    pub analyzer: AnalyzerConfig,
    pub performance: PerformanceConfig,
}

/// Input configuration
#[derive(Debug, Clone)]
pub struct InputConfig {
    pub file: Option<PathBuf>,
    pub format: InputFormat,
    pub patterns: Option<PathBuf>,
}

/// Output configuration
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    pub file: Option<PathBuf>,
}

/// Performance configuration
#[derive(Debug, Clone)]
pub struct PerformanceConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    pub cpuprofile: Option<PathBuf>,
}

/// Message format handed to the scanner
#[derive(ValueEnum, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    #[default]
    Text,
    Json,
}

impl SequenceConfig {
    /// Merge command-line options over configuration file values
    pub fn from_cli(cli: &Cli, file: &ConfigFile) -> Self {
        let defaults = AnalyzerConfig::default();
        let analyzer = AnalyzerConfig {
            depth: file.analyzer.depth.unwrap_or(defaults.depth),
            max_children: file.analyzer.max_children.unwrap_or(defaults.max_children),
            similarity: file.analyzer.similarity.unwrap_or(defaults.similarity),
        }
        .sanitized();

        let cli_workers = match &cli.command {
            Command::Bench { workers, .. } => *workers,
            _ => None,
        };
        let workers = resolve_workers(cli_workers.or(file.bench.workers).unwrap_or(1));

        Self {
            input: InputConfig {
                file: cli.input.clone(),
                format: cli.format.or(file.input.format).unwrap_or_default(),
                patterns: cli.patterns.clone(),
            },
            output: OutputConfig {
                file: cli.output.clone(),
            },
            analyzer,
            performance: PerformanceConfig {
                workers,
                queue_capacity: file
                    .bench
                    .queue_capacity
                    .unwrap_or(DEFAULT_QUEUE_CAPACITY)
                    .max(1),
                cpuprofile: cli.cpuprofile.clone(),
            },
        }
    }
}

/// `0` means one worker per CPU
fn resolve_workers(requested: usize) -> usize {
    if requested == 0 {
        num_cpus::get().max(1)
    } else {
        requested
    }
}

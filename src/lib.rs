// Core library for sequence log pattern discovery

pub mod analysis;
pub mod analyzer;
pub mod cli;
pub mod config;
pub mod config_file;
pub mod coordinator;
pub mod decompression;
pub mod logging;
pub mod parallel;
pub mod parser;
pub mod platform;
pub mod profiler;
pub mod readers;
pub mod runner;
pub mod scanner;

pub use analysis::{discover, Discovery, Orchestrator, PatternStats, RankedReport, Summary};
pub use analyzer::{Analyzer, AnalyzerConfig, AnalyzerError, ANY_TOKEN};
pub use config::{InputFormat, SequenceConfig};
pub use coordinator::{Coordinator, CoordinatorState};
pub use parallel::{benchmark, BenchConfig, BenchHarness, BenchMode, BenchReport};
pub use parser::{NoMatch, Parser};
pub use readers::{InputFile, LineBatch, LineSource};
pub use scanner::{ScanError, Scanner, Sequence, Token, TokenKind};

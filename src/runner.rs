//! Command execution
//!
//! Runs one subcommand against the merged configuration. Reports and token
//! dumps go to the output file or stdout, diagnostics go through `tracing`.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use crate::analysis::Orchestrator;
use crate::cli::{Cli, Command, UsageError};
use crate::config::SequenceConfig;
use crate::coordinator::Coordinator;
use crate::parallel::{BenchConfig, BenchHarness, BenchMode};
use crate::parser::Parser;
use crate::readers::{InputFile, LineBatch, LineSource};
use crate::scanner::Scanner;

pub fn run(cli: &Cli, config: &SequenceConfig) -> Result<()> {
    match &cli.command {
        Command::Scan { message } => run_scan(config, message.as_deref()),
        Command::Analyze => run_analyze(config),
        Command::Parse => run_parse(config),
        Command::Bench { target, .. } => run_bench(config, BenchMode::from(*target)),
    }
}

fn run_scan(config: &SequenceConfig, message: Option<&str>) -> Result<()> {
    let mut scanner = Scanner::new(config.input.format);

    if let Some(path) = &config.input.file {
        let mut out = open_output(config.output.file.as_deref())?;
        for line in InputFile::new(path).lines()? {
            let line = line?;
            let seq = scanner
                .scan(&line)
                .with_context(|| format!("Failed to scan message: {}", line))?;
            write!(out, "{}\n\n", seq.print_tokens())?;
        }
        out.flush()?;
        return Ok(());
    }

    match message.filter(|message| !message.is_empty()) {
        Some(message) => {
            let seq = scanner
                .scan(message)
                .with_context(|| format!("Failed to scan message: {}", message))?;
            let mut out = open_output(config.output.file.as_deref())?;
            writeln!(out, "{}", seq.print_tokens())?;
            out.flush()?;
            Ok(())
        }
        None => Err(UsageError("Invalid input file or string specified".to_string()).into()),
    }
}

fn run_analyze(config: &SequenceConfig) -> Result<()> {
    let path = require_input(config)?;
    let coordinator = Coordinator::start(config.performance.cpuprofile.as_deref())?;

    let parser = load_parser(config)?;
    let source = InputFile::new(path);
    let mut orchestrator =
        Orchestrator::new(config.input.format, &parser, config.analyzer.clone());
    let discovery = orchestrator.discover(&source)?;

    let mut out = open_output(config.output.file.as_deref())?;
    discovery.report().write_to(&mut out)?;
    out.flush()?;

    tracing::info!("{}", discovery.summary());
    coordinator.finish()
}

fn run_parse(config: &SequenceConfig) -> Result<()> {
    let path = require_input(config)?;
    let coordinator = Coordinator::start(config.performance.cpuprofile.as_deref())?;

    let parser = load_parser(config)?;
    let mut scanner = Scanner::new(config.input.format);
    let mut out = open_output(config.output.file.as_deref())?;

    let mut count = 0usize;
    let start = Instant::now();
    for line in InputFile::new(path).lines()? {
        let line = line?;
        count += 1;

        let seq = scanner
            .scan(&line)
            .with_context(|| format!("Failed to scan message: {}", line))?;
        match parser.parse(&seq) {
            Ok(pattern) => write!(out, "{}\n# {}\n{}\n\n", line, pattern, seq.print_tokens())?,
            Err(e) => tracing::warn!(line = %line, "Error ({}) parsing message", e),
        }
    }
    out.flush()?;

    let secs = start.elapsed().as_secs_f64();
    let rate = if secs > 0.0 { count as f64 / secs } else { 0.0 };
    tracing::info!(
        "Parsed {} messages in {:.2} secs, ~ {:.2} msgs/sec",
        count,
        secs,
        rate
    );
    coordinator.finish()
}

fn run_bench(config: &SequenceConfig, mode: BenchMode) -> Result<()> {
    let path = require_input(config)?;
    let batch = LineBatch::load(&InputFile::new(path))?;
    let parser = match mode {
        BenchMode::Parse => load_parser(config)?,
        BenchMode::Scan => Parser::new(),
    };

    let coordinator = Coordinator::start(config.performance.cpuprofile.as_deref())?;
    let harness = BenchHarness::new(
        BenchConfig {
            workers: config.performance.workers,
            queue_capacity: config.performance.queue_capacity,
            mode,
            format: config.input.format,
        },
        &parser,
    );
    let report = harness.run(&batch)?;

    tracing::info!(workers = report.workers, "{}", report.format_stats());
    coordinator.finish()
}

fn require_input(config: &SequenceConfig) -> Result<&Path> {
    config
        .input
        .file
        .as_deref()
        .ok_or_else(|| UsageError("Invalid input file specified".to_string()).into())
}

fn load_parser(config: &SequenceConfig) -> Result<Parser> {
    match &config.input.patterns {
        Some(path) => {
            let parser = Parser::load(path)
                .with_context(|| format!("Failed to load patterns from '{}'", path.display()))?;
            tracing::debug!(patterns = parser.len(), "known patterns loaded");
            Ok(parser)
        }
        None => Ok(Parser::new()),
    }
}

/// Buffered writer to `path`, or stdout when no path is given
pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    let Some(path) = path else {
        return Ok(Box::new(BufWriter::new(io::stdout().lock())));
    };

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let file = options
        .open(path)
        .with_context(|| format!("Cannot create output file '{}'", path.display()))?;
    Ok(Box::new(BufWriter::new(file)))
}

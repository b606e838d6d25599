//! Pattern discovery
//!
//! Drives the scanner, the known-pattern parser and the analyzer over a line
//! stream and aggregates per-pattern statistics.
//!
//! Discovery runs in two passes over the same stream. The first pass only
//! feeds messages that no known pattern matches into the analyzer. Once the
//! analyzer is finalized, the second pass classifies every message again,
//! this time against both the known and the learned patterns. Everything
//! here runs on the calling thread.

mod report;

pub use report::{RankedEntry, RankedReport, Summary};

use anyhow::{Context, Result};
use std::collections::HashMap;

use crate::analyzer::{Analyzer, AnalyzerConfig, AnalyzerError};
use crate::config::InputFormat;
use crate::parser::Parser;
use crate::readers::LineSource;
use crate::scanner::{Scanner, Sequence};

/// Aggregate for one pattern
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternStat {
    pub count: usize,
    /// Most recent message that matched the pattern
    pub example: String,
}

/// Pattern text -> statistics
#[derive(Debug, Clone, Default)]
pub struct PatternStats {
    table: HashMap<String, PatternStat>,
}

impl PatternStats {
    pub fn record(&mut self, pattern: &str, line: &str) {
        match self.table.get_mut(pattern) {
            Some(stat) => {
                stat.count += 1;
                stat.example.clear();
                stat.example.push_str(line);
            }
            None => {
                self.table.insert(
                    pattern.to_string(),
                    PatternStat {
                        count: 1,
                        example: line.to_string(),
                    },
                );
            }
        }
    }

    pub fn get(&self, pattern: &str) -> Option<&PatternStat> {
        self.table.get(pattern)
    }

    /// Number of distinct patterns
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Number of messages across all patterns
    pub fn total(&self) -> usize {
        self.table.values().map(|stat| stat.count).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PatternStat)> {
        self.table.iter().map(|(pattern, stat)| (pattern.as_str(), stat))
    }
}

/// Outcome of a single classify-or-learn pass
#[derive(Debug)]
pub struct SinglePass {
    pub known: PatternStats,
    /// Still training; holds every message no known pattern matched
    pub analyzer: Analyzer,
    pub lines: usize,
}

/// Outcome of a two-pass discovery run
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub known: PatternStats,
    pub learned: PatternStats,
    pub lines: usize,
    pub unclassified: usize,
    /// Distinct patterns the analyzer produced when it was finalized
    pub learned_patterns: usize,
    /// Calls made into the analyzer across both passes
    pub analyzer_calls: usize,
}

impl Discovery {
    pub fn report(&self) -> RankedReport {
        RankedReport::from_stats(&self.learned)
    }

    pub fn summary(&self) -> Summary {
        Summary {
            lines: self.lines,
            unique_patterns: self.known.len() + self.learned.len(),
            new_patterns: self.learned.len(),
            unclassified: self.unclassified,
        }
    }
}

pub struct Orchestrator<'p> {
    scanner: Scanner,
    parser: &'p Parser,
    analyzer_config: AnalyzerConfig,
}

impl<'p> Orchestrator<'p> {
    pub fn new(format: InputFormat, parser: &'p Parser, analyzer_config: AnalyzerConfig) -> Self {
        Self {
            scanner: Scanner::new(format),
            parser,
            analyzer_config,
        }
    }

    fn scan(&mut self, line: &str) -> Result<Sequence> {
        self.scanner
            .scan(line)
            .with_context(|| format!("Failed to scan message: {}", line))
    }

    /// Aggregate messages matching a known pattern, learn from the rest
    pub fn classify_or_discover<S: LineSource + ?Sized>(&mut self, source: &S) -> Result<SinglePass> {
        let mut known = PatternStats::default();
        let mut analyzer = Analyzer::new(self.analyzer_config.clone());
        let mut lines = 0;

        for line in source.lines()? {
            let line = line?;
            lines += 1;

            let seq = self.scan(&line)?;
            match self.parser.parse(&seq) {
                Ok(pattern) => known.record(pattern, &line),
                Err(_) => analyzer.add(&seq)?,
            }
        }

        Ok(SinglePass {
            known,
            analyzer,
            lines,
        })
    }

    /// Train on unmatched messages, then classify the whole stream again
    pub fn discover<S: LineSource + ?Sized>(&mut self, source: &S) -> Result<Discovery> {
        let mut analyzer = Analyzer::new(self.analyzer_config.clone());
        let mut analyzer_calls = 0;

        for line in source.lines()? {
            let line = line?;
            let seq = self.scan(&line)?;
            if self.parser.parse(&seq).is_err() {
                analyzer.add(&seq)?;
                analyzer_calls += 1;
            }
        }

        let learned_patterns = analyzer
            .finalize()
            .context("Failed to finalize analyzer")?;

        let mut discovery = Discovery {
            learned_patterns,
            ..Discovery::default()
        };

        for line in source.lines()? {
            let line = line?;
            discovery.lines += 1;

            let seq = self.scan(&line)?;
            if let Ok(pattern) = self.parser.parse(&seq) {
                discovery.known.record(pattern, &line);
                continue;
            }

            analyzer_calls += 1;
            match analyzer.analyze(&seq) {
                Ok(pattern) => discovery.learned.record(pattern, &line),
                Err(AnalyzerError::NoMatch) => {
                    tracing::warn!(line = %line, "Error analyzing message");
                    discovery.unclassified += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        discovery.analyzer_calls = analyzer_calls;
        Ok(discovery)
    }
}

/// Two-pass discovery over `source`
pub fn discover<S: LineSource + ?Sized>(
    source: &S,
    parser: &Parser,
    format: InputFormat,
    analyzer_config: AnalyzerConfig,
) -> Result<Discovery> {
    Orchestrator::new(format, parser, analyzer_config).discover(source)
}

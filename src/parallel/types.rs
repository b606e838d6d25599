//! Type definitions for the throughput harness

use std::fmt;
use std::time::Duration;

use crate::config::{InputFormat, DEFAULT_QUEUE_CAPACITY};

/// Per-line work performed by the harness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchMode {
    /// Tokenize only
    Scan,
    /// Tokenize and match against the known patterns
    Parse,
}

impl BenchMode {
    fn verb(self) -> &'static str {
        match self {
            BenchMode::Scan => "Scanned",
            BenchMode::Parse => "Parsed",
        }
    }
}

impl fmt::Display for BenchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BenchMode::Scan => "scan",
            BenchMode::Parse => "parse",
        })
    }
}

/// Configuration for a harness run
#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub workers: usize,
    /// Bound of the work queue, in lines
    pub queue_capacity: usize,
    pub mode: BenchMode,
    pub format: InputFormat,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            mode: BenchMode::Scan,
            format: InputFormat::Text,
        }
    }
}

/// Measurements of one harness run
#[derive(Debug, Clone)]
pub struct BenchReport {
    pub mode: BenchMode,
    pub workers: usize,
    pub elapsed: Duration,
    pub lines_processed: usize,
    pub total_bytes: usize,
}

impl BenchReport {
    pub fn lines_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.lines_processed as f64 / secs
        } else {
            0.0
        }
    }

    pub fn mb_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total_bytes as f64 / (1024.0 * 1024.0) / secs
        } else {
            0.0
        }
    }

    pub fn format_stats(&self) -> String {
        format!(
            "{} {} messages in {:.2} secs, ~ {:.2} msgs/sec, ~ {:.2} MB/sec",
            self.mode.verb(),
            self.lines_processed,
            self.elapsed.as_secs_f64(),
            self.lines_per_sec(),
            self.mb_per_sec()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(elapsed: Duration) -> BenchReport {
        BenchReport {
            mode: BenchMode::Scan,
            workers: 2,
            elapsed,
            lines_processed: 1000,
            total_bytes: 2 * 1024 * 1024,
        }
    }

    #[test]
    fn computes_rates() {
        let report = report(Duration::from_secs(2));
        assert_eq!(report.lines_per_sec(), 500.0);
        assert_eq!(report.mb_per_sec(), 1.0);
        assert_eq!(
            report.format_stats(),
            "Scanned 1000 messages in 2.00 secs, ~ 500.00 msgs/sec, ~ 1.00 MB/sec"
        );
    }

    #[test]
    fn zero_elapsed_does_not_divide() {
        let report = report(Duration::ZERO);
        assert_eq!(report.lines_per_sec(), 0.0);
        assert_eq!(report.mb_per_sec(), 0.0);
    }

    #[test]
    fn parse_mode_uses_its_own_verb() {
        let mut report = report(Duration::from_secs(1));
        report.mode = BenchMode::Parse;
        assert!(report.format_stats().starts_with("Parsed 1000 messages"));
    }
}

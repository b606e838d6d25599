//! Ranked pattern report
//!
//! The report text doubles as a pattern file: every comment line starts with
//! `#` and every other non-blank line is one pattern.

use std::cmp::Ordering;
use std::fmt;
use std::io::{self, Write};

use super::PatternStats;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedEntry {
    pub count: usize,
    pub pattern: String,
    pub example: String,
}

/// Patterns ordered by match count, highest first
#[derive(Debug, Clone, Default)]
pub struct RankedReport {
    entries: Vec<RankedEntry>,
}

impl RankedReport {
    pub fn from_stats(stats: &PatternStats) -> Self {
        let mut entries: Vec<RankedEntry> = stats
            .iter()
            .map(|(pattern, stat)| RankedEntry {
                count: stat.count,
                pattern: pattern.to_string(),
                example: stat.example.clone(),
            })
            .collect();

        // Equal counts fall back to pattern text so output is stable
        entries.sort_unstable_by(|a, b| match b.count.cmp(&a.count) {
            Ordering::Equal => a.pattern.cmp(&b.pattern),
            other => other,
        });

        Self { entries }
    }

    pub fn entries(&self) -> &[RankedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for entry in &self.entries {
            writeln!(out, "# {} log messages matched", entry.count)?;
            writeln!(out, "{}", entry.pattern)?;
            writeln!(out, "# {}", entry.example)?;
            writeln!(out)?;
        }
        Ok(())
    }
}

/// Closing numbers of an `analyze` run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub lines: usize,
    pub unique_patterns: usize,
    pub new_patterns: usize,
    pub unclassified: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Analyzed {} messages, found {} unique patterns, {} are new.",
            self.lines, self.unique_patterns, self.new_patterns
        )?;
        if self.unclassified > 0 {
            write!(f, " {} messages could not be classified.", self.unclassified)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(records: &[(&str, &str)]) -> PatternStats {
        let mut stats = PatternStats::default();
        for (pattern, line) in records {
            stats.record(pattern, line);
        }
        stats
    }

    #[test]
    fn orders_by_count_then_pattern() {
        let report = RankedReport::from_stats(&stats(&[
            ("zeta %string%", "zeta 1"),
            ("alpha %string%", "alpha 1"),
            ("beta %string%", "beta 1"),
            ("beta %string%", "beta 2"),
        ]));

        let order: Vec<&str> = report.entries().iter().map(|e| e.pattern.as_str()).collect();
        assert_eq!(order, vec!["beta %string%", "alpha %string%", "zeta %string%"]);
        assert_eq!(report.entries()[0].count, 2);
        assert_eq!(report.entries()[0].example, "beta 2");
    }

    #[test]
    fn writes_pattern_file_text() {
        let report = RankedReport::from_stats(&stats(&[
            ("%integer% user login ok", "2023 user login ok"),
            ("%integer% user login ok", "2023 user login ok"),
            ("%integer% user logout fail", "2023 user logout fail"),
        ]));

        let mut out = Vec::new();
        report.write_to(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "# 2 log messages matched\n%integer% user login ok\n# 2023 user login ok\n\n\
             # 1 log messages matched\n%integer% user logout fail\n# 2023 user logout fail\n\n"
        );
    }

    #[test]
    fn empty_report_writes_nothing() {
        let report = RankedReport::from_stats(&PatternStats::default());
        let mut out = Vec::new();
        report.write_to(&mut out).unwrap();
        assert!(report.is_empty());
        assert!(out.is_empty());
    }

    #[test]
    fn summary_mentions_unclassified_only_when_present() {
        let mut summary = Summary {
            lines: 3,
            unique_patterns: 2,
            new_patterns: 2,
            unclassified: 0,
        };
        assert_eq!(
            summary.to_string(),
            "Analyzed 3 messages, found 2 unique patterns, 2 are new."
        );

        summary.unclassified = 1;
        assert!(summary
            .to_string()
            .ends_with("2 are new. 1 messages could not be classified."));
    }
}

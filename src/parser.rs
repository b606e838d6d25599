//! Known-pattern matcher
//!
//! Holds a static set of patterns loaded from pattern files and matches
//! scanned messages against them. Pattern files use the same text as the
//! `analyze` report: `#` lines and blank lines are skipped, every other
//! line is one pattern.

use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::analyzer::ANY_TOKEN;
use crate::config::InputFormat;
use crate::readers::InputFile;
use crate::scanner::{Scanner, Sequence, Token, TokenKind};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("no known pattern matches the message")]
pub struct NoMatch;

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternToken {
    Any,
    Kind(TokenKind),
    Exact(String),
}

impl PatternToken {
    fn from_token(token: &Token) -> Self {
        if token.kind == TokenKind::Literal {
            if token.value == ANY_TOKEN {
                return PatternToken::Any;
            }
            if let Some(kind) = TokenKind::from_placeholder(&token.value) {
                return PatternToken::Kind(kind);
            }
        }
        PatternToken::Exact(token.value.clone())
    }

    fn matches(&self, token: &Token) -> bool {
        match self {
            PatternToken::Any => true,
            PatternToken::Kind(kind) => token.kind == *kind,
            PatternToken::Exact(value) => token.value == *value,
        }
    }

    fn text(&self) -> &str {
        match self {
            PatternToken::Any => ANY_TOKEN,
            PatternToken::Kind(kind) => kind.placeholder(),
            PatternToken::Exact(value) => value,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Pattern {
    tokens: Vec<PatternToken>,
    text: String,
    concrete: usize,
}

impl Pattern {
    pub fn from_sequence(seq: &Sequence) -> Self {
        let tokens: Vec<PatternToken> = seq.tokens().iter().map(PatternToken::from_token).collect();
        let text = tokens
            .iter()
            .map(PatternToken::text)
            .collect::<Vec<_>>()
            .join(" ");
        let concrete = tokens
            .iter()
            .filter(|token| **token != PatternToken::Any)
            .count();
        Self {
            tokens,
            text,
            concrete,
        }
    }

    /// Canonical pattern text, used as the aggregation key
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn matches(&self, seq: &Sequence) -> bool {
        self.tokens.len() == seq.len()
            && self
                .tokens
                .iter()
                .zip(seq.tokens())
                .all(|(pattern, token)| pattern.matches(token))
    }
}

#[derive(Debug, Default)]
pub struct Parser {
    patterns: Vec<Pattern>,
    by_length: HashMap<usize, Vec<usize>>,
    texts: HashSet<String>,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load patterns from a file, or from every file in a directory
    pub fn load(path: &Path) -> Result<Self> {
        let files = if path.is_dir() {
            pattern_files(path)?
        } else {
            vec![path.to_path_buf()]
        };

        let mut parser = Self::new();
        let mut scanner = Scanner::new(InputFormat::Text);

        for file in files {
            let before = parser.len();
            for line in InputFile::new(&file).numbered_lines()? {
                let (line_no, line) = line?;
                let seq = scanner.scan(&line).with_context(|| {
                    format!(
                        "Failed to scan pattern at {}:{}: {}",
                        file.display(),
                        line_no,
                        line
                    )
                })?;
                parser.add(&seq);
            }
            tracing::debug!(
                file = %file.display(),
                patterns = parser.len() - before,
                "loaded patterns"
            );
        }

        Ok(parser)
    }

    /// Add a pattern, returning false if the same pattern is already known
    pub fn add(&mut self, seq: &Sequence) -> bool {
        let pattern = Pattern::from_sequence(seq);
        if pattern.is_empty() || !self.texts.insert(pattern.text.clone()) {
            return false;
        }

        self.by_length
            .entry(pattern.len())
            .or_default()
            .push(self.patterns.len());
        self.patterns.push(pattern);
        true
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(Pattern::text)
    }

    /// Text of the most specific pattern matching the message
    pub fn parse(&self, seq: &Sequence) -> Result<&str, NoMatch> {
        let candidates = self.by_length.get(&seq.len()).ok_or(NoMatch)?;

        let mut best: Option<&Pattern> = None;
        for &idx in candidates {
            let pattern = &self.patterns[idx];
            if best.map_or(true, |b| pattern.concrete > b.concrete) && pattern.matches(seq) {
                best = Some(pattern);
            }
        }

        best.map(Pattern::text).ok_or(NoMatch)
    }
}

fn pattern_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Failed to read pattern directory '{}'", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

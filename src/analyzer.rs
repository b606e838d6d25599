//! Pattern learner
//!
//! Clusters messages that no known pattern matched into generalized
//! patterns using a fixed-depth prefix tree partitioned by token count.
//! Positions where clustered messages disagree become [`ANY_TOKEN`].
//!
//! The analyzer is a two-phase object: messages are added while it is
//! training, [`Analyzer::finalize`] closes training for good, and only then
//! can messages be analyzed against the learned patterns.

use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::scanner::{Sequence, Token};

/// Pattern text that matches any single token
pub const ANY_TOKEN: &str = "%string%";

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    pub depth: usize,
    pub max_children: usize,
    pub similarity: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            depth: 4,
            max_children: 100,
            similarity: 0.6,
        }
    }
}

impl AnalyzerConfig {
    pub fn sanitized(&self) -> Self {
        let similarity = if self.similarity.is_nan() {
            Self::default().similarity
        } else {
            self.similarity.clamp(0.0, 1.0)
        };
        Self {
            depth: self.depth.max(2),
            max_children: self.max_children.max(1),
            similarity,
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzerError {
    #[error("analyzer is finalized, no more messages can be added")]
    AlreadyFinalized,
    #[error("analyzer must be finalized before messages can be analyzed")]
    NotFinalized,
    #[error("no learned pattern matches the message")]
    NoMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Training,
    Finalized,
}

/// Messages grouped under one template
#[derive(Debug)]
struct Cluster {
    template: Vec<String>,
    count: usize,
}

/// How well a template fits a message: agreeing share first, then the
/// number of concrete template positions
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
struct Fit {
    share: f64,
    concrete: usize,
}

impl Fit {
    const NONE: Fit = Fit {
        share: 0.0,
        concrete: 0,
    };
}

impl Cluster {
    fn new(tokens: &[String]) -> Self {
        Self {
            template: tokens.to_vec(),
            count: 0,
        }
    }

    fn fit(&self, tokens: &[String]) -> Fit {
        let concrete: Vec<(&String, &String)> = self
            .template
            .iter()
            .zip(tokens)
            .filter(|(slot, _)| *slot != ANY_TOKEN)
            .collect();
        let agreeing = concrete.iter().filter(|(slot, token)| slot == token).count();

        Fit {
            share: agreeing as f64 / self.template.len().max(1) as f64,
            concrete: concrete.len(),
        }
    }

    /// Widen every disagreeing position to the wildcard
    fn absorb(&mut self, tokens: &[String]) {
        for (slot, token) in self.template.iter_mut().zip(tokens) {
            if slot != token {
                *slot = ANY_TOKEN.to_string();
            }
        }
    }

    /// Concrete positions, if every one of them agrees with the message
    fn accepts(&self, tokens: &[&str]) -> Option<usize> {
        if self.template.len() != tokens.len() {
            return None;
        }

        let mut concrete = 0usize;
        for (slot, token) in self.template.iter().zip(tokens) {
            if slot == ANY_TOKEN {
                continue;
            }
            if slot != token {
                return None;
            }
            concrete += 1;
        }
        Some(concrete)
    }
}

/// Prefix tree node; clusters hang off the nodes at the prefix depth
#[derive(Debug, Default)]
struct Node {
    children: HashMap<String, Node>,
    cluster_ids: Vec<usize>,
}

impl Node {
    /// Follow the branch for `prefix`, growing it as needed. A full node
    /// sends unseen keys down its wildcard branch.
    fn grow(&mut self, prefix: &[String], max_children: usize) -> &mut Node {
        let mut node = self;
        for token in prefix {
            let mut key = branch_key(token);
            if !node.children.contains_key(key) && node.children.len() >= max_children {
                key = ANY_TOKEN;
            }
            node = node.children.entry(key.to_string()).or_default();
        }
        node
    }

    fn walk(&self, prefix: &[&str]) -> Option<&Node> {
        let mut node = self;
        for token in prefix {
            node = node
                .children
                .get(branch_key(token))
                .or_else(|| node.children.get(ANY_TOKEN))?;
        }
        Some(node)
    }
}

#[derive(Debug)]
pub struct Analyzer {
    config: AnalyzerConfig,
    phase: Phase,
    roots: HashMap<usize, Node>,
    clusters: Vec<Cluster>,
    // Exact signature -> cluster it first joined
    signatures: HashMap<String, usize>,
    // Rendered template per cluster, filled by finalize
    patterns: Vec<String>,
    added: usize,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config: config.sanitized(),
            phase: Phase::Training,
            roots: HashMap::new(),
            clusters: Vec::new(),
            signatures: HashMap::new(),
            patterns: Vec::new(),
            added: 0,
        }
    }

    /// Tokens used to route a message of `len` tokens down the tree
    fn prefix_len(&self, len: usize) -> usize {
        self.config.depth.min(len).saturating_sub(1)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of messages added during training
    pub fn added(&self) -> usize {
        self.added
    }

    pub fn add(&mut self, seq: &Sequence) -> Result<(), AnalyzerError> {
        if self.phase == Phase::Finalized {
            return Err(AnalyzerError::AlreadyFinalized);
        }

        let signature = seq.signature();
        let tokens: Vec<String> = seq
            .tokens()
            .iter()
            .map(|token| token.pattern_text().to_string())
            .collect();
        self.added += 1;

        if let Some(&cluster_id) = self.signatures.get(&signature) {
            self.clusters[cluster_id].count += 1;
            return Ok(());
        }

        let prefix = self.prefix_len(tokens.len());
        let leaf = self
            .roots
            .entry(tokens.len())
            .or_default()
            .grow(&tokens[..prefix], self.config.max_children);
        let cluster_id = join_cluster(leaf, &tokens, &mut self.clusters, self.config.similarity);

        self.clusters[cluster_id].count += 1;
        self.signatures.insert(signature, cluster_id);
        Ok(())
    }

    /// Close training and return the number of distinct learned patterns
    pub fn finalize(&mut self) -> Result<usize, AnalyzerError> {
        if self.phase == Phase::Finalized {
            return Err(AnalyzerError::AlreadyFinalized);
        }

        self.patterns = self
            .clusters
            .iter()
            .map(|cluster| cluster.template.join(" "))
            .collect();
        self.phase = Phase::Finalized;

        let patterns = self.pattern_count();
        tracing::debug!(
            messages = self.added,
            clusters = self.clusters.len(),
            patterns,
            "analyzer finalized"
        );
        Ok(patterns)
    }

    pub fn analyze(&self, seq: &Sequence) -> Result<&str, AnalyzerError> {
        if self.phase != Phase::Finalized {
            return Err(AnalyzerError::NotFinalized);
        }

        if let Some(&cluster_id) = self.signatures.get(&seq.signature()) {
            return Ok(&self.patterns[cluster_id]);
        }

        let tokens: Vec<&str> = seq.tokens().iter().map(Token::pattern_text).collect();

        let root = self
            .roots
            .get(&tokens.len())
            .ok_or(AnalyzerError::NoMatch)?;
        let leaf = root
            .walk(&tokens[..self.prefix_len(tokens.len())])
            .ok_or(AnalyzerError::NoMatch)?;

        // Most concrete compatible template wins, oldest cluster on ties
        let mut best: Option<(usize, usize)> = None;
        for &cluster_id in &leaf.cluster_ids {
            if let Some(concrete) = self.clusters[cluster_id].accepts(&tokens) {
                if best.map_or(true, |(_, best_concrete)| concrete > best_concrete) {
                    best = Some((cluster_id, concrete));
                }
            }
        }

        best.map(|(cluster_id, _)| self.patterns[cluster_id].as_str())
            .ok_or(AnalyzerError::NoMatch)
    }

    /// Distinct learned patterns in the order they were first created
    pub fn patterns(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.patterns
            .iter()
            .map(String::as_str)
            .filter(|pattern| seen.insert(*pattern))
            .collect()
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.iter().collect::<HashSet<_>>().len()
    }
}

/// Tokens carrying digits are treated as variable and share a branch
fn branch_key(token: &str) -> &str {
    let placeholder = token.len() > 2 && token.starts_with('%') && token.ends_with('%');
    if !placeholder && token.bytes().any(|b| b.is_ascii_digit()) {
        ANY_TOKEN
    } else {
        token
    }
}

/// Best-fitting cluster under `leaf` if it is similar enough, else a new one
fn join_cluster(
    leaf: &mut Node,
    tokens: &[String],
    clusters: &mut Vec<Cluster>,
    similarity: f64,
) -> usize {
    let mut best: Option<(usize, Fit)> = None;
    for &cluster_id in &leaf.cluster_ids {
        let fit = clusters[cluster_id].fit(tokens);
        if fit > best.map_or(Fit::NONE, |(_, best_fit)| best_fit) {
            best = Some((cluster_id, fit));
        }
    }

    match best {
        Some((cluster_id, fit)) if fit.share >= similarity => {
            clusters[cluster_id].absorb(tokens);
            cluster_id
        }
        _ => {
            clusters.push(Cluster::new(tokens));
            leaf.cluster_ids.push(clusters.len() - 1);
            clusters.len() - 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputFormat;
    use crate::scanner::Scanner;

    fn seq(line: &str) -> Sequence {
        Scanner::new(InputFormat::Text).scan(line).unwrap()
    }

    #[test]
    fn separates_messages_that_diverge_in_the_prefix() {
        let mut analyzer = Analyzer::default();
        analyzer.add(&seq("2023 user login ok")).unwrap();
        analyzer.add(&seq("2023 user login ok")).unwrap();
        analyzer.add(&seq("2023 user logout fail")).unwrap();

        assert_eq!(analyzer.finalize().unwrap(), 2);
        assert_eq!(
            analyzer.patterns(),
            vec!["%integer% user login ok", "%integer% user logout fail"]
        );
        assert_eq!(
            analyzer.analyze(&seq("1999 user login ok")).unwrap(),
            "%integer% user login ok"
        );
    }

    #[test]
    fn generalizes_differing_positions() {
        let mut analyzer = Analyzer::default();
        analyzer
            .add(&seq("failed to connect to host alpha"))
            .unwrap();
        analyzer.add(&seq("failed to connect to host beta")).unwrap();
        assert_eq!(analyzer.finalize().unwrap(), 1);

        assert_eq!(
            analyzer.analyze(&seq("failed to connect to host gamma")),
            Ok("failed to connect to host %string%")
        );
        assert_eq!(
            analyzer.analyze(&seq("failed to connect to host alpha")),
            Ok("failed to connect to host %string%")
        );
    }

    #[test]
    fn unknown_shapes_do_not_match() {
        let mut analyzer = Analyzer::default();
        analyzer.add(&seq("disk full on sda")).unwrap();
        analyzer.finalize().unwrap();

        assert_eq!(
            analyzer.analyze(&seq("completely different message here now")),
            Err(AnalyzerError::NoMatch)
        );
        assert_eq!(
            analyzer.analyze(&seq("disk full on sdb")),
            Err(AnalyzerError::NoMatch)
        );
    }

    #[test]
    fn enforces_the_finalize_barrier() {
        let mut analyzer = Analyzer::default();
        assert_eq!(analyzer.phase(), Phase::Training);
        assert_eq!(
            analyzer.analyze(&seq("user login ok")),
            Err(AnalyzerError::NotFinalized)
        );

        analyzer.add(&seq("user login ok")).unwrap();
        analyzer.finalize().unwrap();
        assert_eq!(analyzer.phase(), Phase::Finalized);

        assert_eq!(
            analyzer.add(&seq("user login ok")),
            Err(AnalyzerError::AlreadyFinalized)
        );
        assert_eq!(analyzer.finalize(), Err(AnalyzerError::AlreadyFinalized));
        assert_eq!(analyzer.added(), 1);
    }

    #[test]
    fn finalize_without_training_learns_nothing() {
        let mut analyzer = Analyzer::default();
        assert_eq!(analyzer.finalize().unwrap(), 0);
        assert!(analyzer.patterns().is_empty());
        assert_eq!(
            analyzer.analyze(&seq("anything")),
            Err(AnalyzerError::NoMatch)
        );
    }

    #[test]
    fn overflowing_children_share_a_wildcard_branch() {
        let config = AnalyzerConfig {
            max_children: 1,
            ..AnalyzerConfig::default()
        };
        let mut analyzer = Analyzer::new(config);
        analyzer.add(&seq("alpha started cleanly")).unwrap();
        analyzer.add(&seq("beta started cleanly")).unwrap();
        analyzer.add(&seq("gamma started cleanly")).unwrap();
        analyzer.finalize().unwrap();

        assert_eq!(
            analyzer.analyze(&seq("alpha started cleanly")),
            Ok("alpha started cleanly")
        );
        assert_eq!(
            analyzer.analyze(&seq("delta started cleanly")),
            Ok("%string% started cleanly")
        );
    }

    #[test]
    fn sanitizes_config() {
        let config = AnalyzerConfig {
            depth: 0,
            max_children: 0,
            similarity: -1.0,
        }
        .sanitized();
        assert_eq!(config.depth, 2);
        assert_eq!(config.max_children, 1);
        assert_eq!(config.similarity, 0.0);

        let config = AnalyzerConfig {
            similarity: f64::NAN,
            ..AnalyzerConfig::default()
        }
        .sanitized();
        assert_eq!(config.similarity, AnalyzerConfig::default().similarity);
    }
}

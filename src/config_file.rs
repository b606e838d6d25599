use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::InputFormat;

/// Configuration file handler for sequence
///
/// Every setting is optional; anything left out falls back to the built-in
/// defaults, and command-line options override whatever the file says.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub input: InputSection,
    pub analyzer: AnalyzerSection,
    pub bench: BenchSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputSection {
    pub format: Option<InputFormat>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyzerSection {
    pub depth: Option<usize>,
    pub max_children: Option<usize>,
    pub similarity: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchSection {
    pub workers: Option<usize>,
    pub queue_capacity: Option<usize>,
}

impl ConfigFile {
    pub const FILE_NAME: &'static str = "sequence.toml";

    /// Config file locations in order of preference:
    /// 1. ./sequence.toml
    /// 2. sequence.toml next to the executable
    pub fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(Self::FILE_NAME)];

        if let Some(dir) = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            paths.push(dir.join(Self::FILE_NAME));
        }

        paths
    }

    pub fn find_config() -> Option<PathBuf> {
        Self::get_config_paths().into_iter().find(|path| path.is_file())
    }

    /// Load the explicit config file, or the first one found, or defaults
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => match Self::find_config() {
                Some(path) => {
                    tracing::debug!(path = %path.display(), "using configuration file");
                    Self::load(&path)
                }
                None => Ok(Self::default()),
            },
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::parse(&text)
            .with_context(|| format!("Invalid config file '{}'", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let Some(similarity) = self.analyzer.similarity {
            if !(0.0..=1.0).contains(&similarity) {
                bail!(
                    "analyzer.similarity must be between 0.0 and 1.0, got {}",
                    similarity
                );
            }
        }
        Ok(())
    }
}

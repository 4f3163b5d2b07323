use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csg_refine::RefineConfig;
use serde::{Deserialize, Serialize};

/// Settings of a batch refinement run, loaded from an optional JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Candidates per target.
    pub beam_width: usize,
    /// Only the first `test_size` targets are used when set.
    pub test_size: Option<usize>,
    /// Cells per side for targets rendered from programs.
    pub resolution: usize,
    /// Terminal vocabulary; the built-in grammar is used when absent.
    pub terminals: Option<PathBuf>,
    pub refine: RefineConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            beam_width: 10,
            test_size: None,
            resolution: 64,
            terminals: None,
            refine: RefineConfig::default(),
        }
    }
}

impl BatchConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.beam_width > 0, "beam_width must be at least 1");
        anyhow::ensure!(self.resolution > 0, "resolution must be at least 1");
        self.refine.validate().context("invalid refine settings")?;
        Ok(())
    }
}

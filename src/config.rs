use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "lcovr.toml";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Where the Cobertura report goes
    #[serde(default)]
    pub output: Option<PathBuf>,
    /// Fail when the total line rate drops below this value (0.0 - 1.0)
    #[serde(default)]
    pub min_line_rate: Option<f64>,
    #[serde(default)]
    pub input: PatternSet,
    #[serde(default)]
    pub sources: PatternSet,
}

/// Glob patterns, resolved relative to the config file's directory
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatternSet {
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(rate) = self.min_line_rate {
            if !(0.0..=1.0).contains(&rate) {
                anyhow::bail!("min_line_rate must be between 0.0 and 1.0, got {}", rate);
            }
        }

        if let Some(ref output) = self.output {
            if output.as_os_str().is_empty() {
                anyhow::bail!("output must not be empty");
            }
        }

        Ok(())
    }
}

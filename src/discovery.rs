//! Input discovery module
//!
//! Expands glob patterns from the command line or `lcovr.toml` into the
//! ordered lists of LCOV files and source roots the converter consumes.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Source roots found for a set of patterns
#[derive(Debug, Default)]
pub struct SourceRoots {
    pub dirs: Vec<PathBuf>,
    /// Patterns that matched no directory
    pub unmatched: Vec<String>,
}

/// Resolve LCOV input patterns to files.
///
/// Matches of each pattern are sorted, then patterns are concatenated in the
/// order given. A pattern matching no file is an error.
pub fn discover_inputs(base_dir: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();

    for pattern in patterns {
        let files: Vec<PathBuf> = expand(base_dir, pattern)?
            .into_iter()
            .filter(|p| p.is_file())
            .collect();

        if files.is_empty() {
            anyhow::bail!("No LCOV files match '{}'", pattern);
        }

        inputs.extend(files);
    }

    Ok(inputs)
}

/// Resolve source-root patterns to directories, keeping pattern order
pub fn discover_source_roots(base_dir: &Path, patterns: &[String]) -> Result<SourceRoots> {
    let mut roots = SourceRoots::default();

    for pattern in patterns {
        let dirs: Vec<PathBuf> = expand(base_dir, pattern)?
            .into_iter()
            .filter(|p| p.is_dir())
            .collect();

        if dirs.is_empty() {
            roots.unmatched.push(pattern.clone());
        }

        roots.dirs.extend(dirs);
    }

    Ok(roots)
}

fn expand(base_dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let glob_pattern = if Path::new(pattern).is_absolute() {
        pattern.to_string()
    } else {
        let base = glob::Pattern::escape(&base_dir.to_string_lossy());
        format!("{}/{}", base, pattern)
    };

    let mut paths: Vec<PathBuf> = glob::glob(&glob_pattern)
        .with_context(|| format!("Invalid pattern '{}'", pattern))?
        .filter_map(|p| p.ok())
        .collect();
    paths.sort();

    Ok(paths)
}

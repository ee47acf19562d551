//! Coverage module
//!
//! Provides:
//! - LCOV parsing
//! - Package grouping
//! - Cobertura XML writing
//! - Threshold validation

mod cobertura;
mod lcov;
mod package;
mod threshold;

pub use cobertura::*;
pub use lcov::*;
pub use package::*;
pub use threshold::*;

use std::collections::BTreeMap;

/// Coverage facts for a single source file, as read from one LCOV record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageRecord {
    path: String,
    line_hits: BTreeMap<u32, u64>,
    pub lines_found: u32,
    pub lines_hit: u32,
}

impl CoverageRecord {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            line_hits: BTreeMap::new(),
            lines_found: 0,
            lines_hit: 0,
        }
    }

    /// The source path exactly as it appeared after `SF:`
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Execution count per line number, in ascending line order
    pub fn line_hits(&self) -> &BTreeMap<u32, u64> {
        &self.line_hits
    }

    /// Record the execution count of a line. A later call for the same line wins.
    pub fn record_hits(&mut self, line_number: u32, hits: u64) {
        self.line_hits.insert(line_number, hits);
    }

    pub fn line_rate(&self) -> f64 {
        ratio(self.lines_hit as u64, self.lines_found as u64)
    }

    /// Branch coverage is not collected; always 0.0
    pub fn branch_rate(&self) -> f64 {
        0.0
    }

    /// Complexity is not collected; always 0.0
    pub fn complexity(&self) -> f64 {
        0.0
    }

    pub fn package_name(&self) -> String {
        let dotted = dotted_name(&self.path);
        match dotted.rfind('.') {
            Some(idx) => dotted[..idx].to_string(),
            None => String::new(),
        }
    }

    pub fn class_name(&self) -> String {
        let dotted = dotted_name(&self.path);
        match dotted.rfind('.') {
            Some(idx) => dotted[idx + 1..].to_string(),
            None => dotted,
        }
    }

    /// Package and class joined with a dot, or the bare class for top-level files
    pub fn full_class_name(&self) -> String {
        let package = self.package_name();
        if package.is_empty() {
            self.class_name()
        } else {
            format!("{}.{}", package, self.class_name())
        }
    }
}

/// Turn a file path into a dotted identifier: separators become dots and the
/// file extension is dropped (`com/acme/Foo.java` -> `com.acme.Foo`). Empty
/// segments are skipped, so `a/.hidden` gives `a.hidden`.
fn dotted_name(path: &str) -> String {
    let file_start = path.rfind(['/', '\\']).map(|i| i + 1).unwrap_or(0);
    let file_name = &path[file_start..];

    let stem_len = match file_name.rfind('.') {
        Some(0) | None => file_name.len(),
        Some(idx) => idx,
    };

    path[..file_start + stem_len]
        .split(['/', '\\', '.'])
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

/// `covered / total`, or 0.0 when nothing was instrumented
pub(crate) fn ratio(covered: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    covered as f64 / total as f64
}

/// Format a rate the way Cobertura consumers expect: plain decimal notation,
/// shortest round-trip digits, always with a fractional part.
pub fn format_rate(rate: f64) -> String {
    let formatted = rate.to_string();
    if formatted.contains('.') || !rate.is_finite() {
        formatted
    } else {
        format!("{}.0", formatted)
    }
}

//! Coverage threshold validation

use colored::Colorize;

use super::Report;

/// Result of threshold validation
#[derive(Debug, Clone)]
pub struct ThresholdResult {
    pub passed: bool,
    pub line_rate: f64,
    pub threshold: Option<f64>,
    pub delta: Option<f64>,
}

impl ThresholdResult {
    pub fn print_summary(&self) {
        if let Some(line) = self.summary_line() {
            println!("{}", line);
        }
    }

    fn summary_line(&self) -> Option<String> {
        let (Some(threshold), Some(delta)) = (self.threshold, self.delta) else {
            return None;
        };

        let status = if self.passed { "✓".green() } else { "✗".red() };
        let delta_str = if delta >= 0.0 {
            format!("+{:.1}%", delta * 100.0).green()
        } else {
            format!("{:.1}%", delta * 100.0).red()
        };

        Some(format!(
            "  {} Line coverage: {:.1}% (threshold: {:.1}%, {})",
            status,
            self.line_rate * 100.0,
            threshold * 100.0,
            delta_str
        ))
    }
}

/// Validate the report's total line rate against an optional minimum
pub fn check_threshold(report: &Report, min_line_rate: Option<f64>) -> ThresholdResult {
    let line_rate = report.total_line_rate();

    ThresholdResult {
        passed: min_line_rate.map(|t| line_rate >= t).unwrap_or(true),
        line_rate,
        threshold: min_line_rate,
        delta: min_line_rate.map(|t| line_rate - t),
    }
}

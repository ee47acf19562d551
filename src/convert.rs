//! LCOV to Cobertura conversion entry point

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::coverage::{parse_lcov, write_report, LcovError, Report, WriteError};

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("couldn't read LCOV file {}: {error}", path.display())]
    Input { path: PathBuf, error: LcovError },

    #[error(transparent)]
    Output(#[from] WriteError),

    #[error("couldn't resolve the current directory: {0}")]
    CurrentDir(std::io::Error),
}

/// What to convert and where to put it
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// LCOV tracefiles, parsed in this order
    pub inputs: Vec<PathBuf>,
    /// Directories listed in `<sources>`, in this order
    pub source_roots: Vec<PathBuf>,
    pub output: PathBuf,
}

/// Records read from one input file
#[derive(Debug, Clone)]
pub struct InputSummary {
    pub path: PathBuf,
    pub records: usize,
}

#[derive(Debug, Clone)]
pub struct ConversionSummary {
    pub inputs: Vec<InputSummary>,
    pub output: PathBuf,
    pub report: Report,
}

impl ConversionSummary {
    pub fn record_count(&self) -> usize {
        self.report.record_count()
    }

    pub fn package_count(&self) -> usize {
        self.report.packages.len()
    }

    pub fn line_rate(&self) -> f64 {
        self.report.total_line_rate()
    }
}

/// Parse every input, build the report and write it.
///
/// Inputs are read one after another and their records concatenated. Any
/// failure aborts the run before the output is touched.
pub fn convert(options: &ConvertOptions) -> Result<ConversionSummary, ConvertError> {
    let mut all_records = Vec::new();
    let mut inputs = Vec::with_capacity(options.inputs.len());

    for path in &options.inputs {
        let records = parse_lcov(path).map_err(|error| ConvertError::Input {
            path: path.clone(),
            error,
        })?;
        inputs.push(InputSummary {
            path: path.clone(),
            records: records.len(),
        });
        all_records.extend(records);
    }

    let source_roots = options
        .source_roots
        .iter()
        .map(|root| absolute(root))
        .collect::<Result<Vec<_>, _>>()
        .map_err(ConvertError::CurrentDir)?;

    let report = Report::now(all_records, source_roots);
    write_report(&report, &options.output)?;

    Ok(ConversionSummary {
        inputs,
        output: options.output.clone(),
        report,
    })
}

/// Resolve against the working directory without touching the filesystem
fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

//! lcovr - LCOV to Cobertura converter
//!
//! Turns LCOV tracefiles into a Cobertura `coverage-03` XML report:
//! - LCOV parsing into per-file coverage records
//! - Grouping of records into packages with line rates
//! - Deterministic Cobertura XML output
//! - Optional line-rate threshold checks

pub mod config;
pub mod convert;
pub mod coverage;
pub mod discovery;

pub use convert::{convert, ConversionSummary, ConvertError, ConvertOptions, InputSummary};
pub use coverage::{
    check_threshold, group_by_package, parse_lcov, parse_lcov_str, render, write_report,
    CoverageRecord, LcovError, PackageGroup, Report, ThresholdResult, WriteError,
};

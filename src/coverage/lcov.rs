//! LCOV format parser

use std::fs;
use std::path::Path;

use thiserror::Error;

use super::CoverageRecord;

/// Errors raised while reading an LCOV tracefile
#[derive(Debug, Error)]
pub enum LcovError {
    #[error("failed to read tracefile: {0}")]
    Io(#[from] std::io::Error),

    /// A numeric field could not be parsed as a base-10 integer
    #[error("line {line_number}: invalid number in `{line}`")]
    InvalidNumber { line_number: usize, line: String },

    /// A record field appeared without a preceding `SF:` line
    #[error("line {line_number}: `{line}` appears outside of a record (missing SF:)")]
    NoOpenRecord { line_number: usize, line: String },
}

enum ParseState {
    Idle,
    Open(CoverageRecord),
}

/// Parse an LCOV file
pub fn parse_lcov(path: &Path) -> Result<Vec<CoverageRecord>, LcovError> {
    let content = fs::read_to_string(path)?;
    parse_lcov_str(&content)
}

/// Parse LCOV content from a string.
///
/// Returns one record per `end_of_record`, in input order. Only line data
/// (`SF`, `DA`, `LF`, `LH`) is extracted; function and branch entries are skipped.
pub fn parse_lcov_str(content: &str) -> Result<Vec<CoverageRecord>, LcovError> {
    let mut records = Vec::new();
    let mut state = ParseState::Idle;

    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        let line_number = idx + 1;

        if line.is_empty() {
            continue;
        }

        if let Some(path) = line.strip_prefix("SF:") {
            // An unterminated record is dropped
            state = ParseState::Open(CoverageRecord::new(path));
        } else if let Some(rest) = line.strip_prefix("DA:") {
            // DA:<line number>,<execution count>[,<checksum>]
            let record = open_record(&mut state, line_number, line)?;
            let mut fields = rest.split(',');
            let number = parse_field::<u32>(fields.next(), line_number, line)?;
            let hits = parse_field::<u64>(fields.next(), line_number, line)?;
            record.record_hits(number, hits);
        } else if let Some(rest) = line.strip_prefix("LH:") {
            let record = open_record(&mut state, line_number, line)?;
            record.lines_hit = parse_field(Some(rest), line_number, line)?;
        } else if let Some(rest) = line.strip_prefix("LF:") {
            let record = open_record(&mut state, line_number, line)?;
            record.lines_found = parse_field(Some(rest), line_number, line)?;
        } else if line == "end_of_record" {
            match std::mem::replace(&mut state, ParseState::Idle) {
                ParseState::Open(record) => records.push(record),
                ParseState::Idle => {
                    return Err(LcovError::NoOpenRecord {
                        line_number,
                        line: line.to_string(),
                    })
                }
            }
        }
    }

    Ok(records)
}

fn open_record<'a>(
    state: &'a mut ParseState,
    line_number: usize,
    line: &str,
) -> Result<&'a mut CoverageRecord, LcovError> {
    match state {
        ParseState::Open(record) => Ok(record),
        ParseState::Idle => Err(LcovError::NoOpenRecord {
            line_number,
            line: line.to_string(),
        }),
    }
}

fn parse_field<T: std::str::FromStr>(
    field: Option<&str>,
    line_number: usize,
    line: &str,
) -> Result<T, LcovError> {
    field
        .and_then(|f| f.trim().parse::<T>().ok())
        .ok_or_else(|| LcovError::InvalidNumber {
            line_number,
            line: line.to_string(),
        })
}

//! Grouping of coverage records into packages

use std::collections::BTreeMap;

use super::{ratio, CoverageRecord};

/// All records sharing a derived package name
#[derive(Debug, Clone)]
pub struct PackageGroup {
    pub name: String,
    pub records: Vec<CoverageRecord>,
}

impl PackageGroup {
    pub fn lines_found(&self) -> u64 {
        self.records.iter().map(|r| r.lines_found as u64).sum()
    }

    pub fn lines_hit(&self) -> u64 {
        self.records.iter().map(|r| r.lines_hit as u64).sum()
    }

    pub fn line_rate(&self) -> f64 {
        ratio(self.lines_hit(), self.lines_found())
    }
}

/// Split records into package groups.
///
/// Packages come back in byte-wise name order and records within a package
/// in path order, so the output does not depend on input order. Records with
/// identical paths are all kept.
pub fn group_by_package(records: Vec<CoverageRecord>) -> Vec<PackageGroup> {
    let mut packages: BTreeMap<String, Vec<CoverageRecord>> = BTreeMap::new();

    for record in records {
        packages.entry(record.package_name()).or_default().push(record);
    }

    packages
        .into_iter()
        .map(|(name, mut records)| {
            records.sort_by(|a, b| a.path().cmp(b.path()));
            PackageGroup { name, records }
        })
        .collect()
}

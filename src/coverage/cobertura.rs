//! Cobertura XML report writer
//!
//! Emits documents following http://cobertura.sourceforge.net/xml/coverage-03.dtd

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{Builder, NamedTempFile};
use thiserror::Error;

use super::{format_rate, group_by_package, ratio, CoverageRecord, PackageGroup};

pub const COBERTURA_DTD: &str = "http://cobertura.sourceforge.net/xml/coverage-03.dtd";

/// Value of the root `version` attribute
pub const GENERATOR_VERSION: &str = concat!("lcovr ", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to build Cobertura document: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("failed to write {}: {error}", path.display())]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
}

impl WriteError {
    fn io(path: &Path, error: std::io::Error) -> Self {
        WriteError::Io {
            path: path.to_path_buf(),
            error,
        }
    }
}

/// Everything needed to render one Cobertura document
#[derive(Debug, Clone)]
pub struct Report {
    pub packages: Vec<PackageGroup>,
    pub source_roots: Vec<PathBuf>,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl Report {
    pub fn new(records: Vec<CoverageRecord>, source_roots: Vec<PathBuf>, timestamp: i64) -> Self {
        Self {
            packages: group_by_package(records),
            source_roots,
            timestamp,
        }
    }

    /// Build a report stamped with the current wall-clock time
    pub fn now(records: Vec<CoverageRecord>, source_roots: Vec<PathBuf>) -> Self {
        Self::new(records, source_roots, chrono::Utc::now().timestamp_millis())
    }

    pub fn record_count(&self) -> usize {
        self.packages.iter().map(|p| p.records.len()).sum()
    }

    pub fn lines_found(&self) -> u64 {
        self.packages.iter().map(|p| p.lines_found()).sum()
    }

    pub fn lines_hit(&self) -> u64 {
        self.packages.iter().map(|p| p.lines_hit()).sum()
    }

    pub fn total_line_rate(&self) -> f64 {
        ratio(self.lines_hit(), self.lines_found())
    }
}

/// Render the report as an indented Cobertura XML document
pub fn render(report: &Report) -> Result<Vec<u8>, WriteError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::DocType(BytesText::from_escaped(format!(
        "coverage SYSTEM \"{}\"",
        COBERTURA_DTD
    ))))?;

    let mut coverage = BytesStart::new("coverage");
    coverage.push_attribute(("timestamp", report.timestamp.to_string().as_str()));
    coverage.push_attribute(("branch-rate", "0.0"));
    coverage.push_attribute(("version", GENERATOR_VERSION));
    coverage.push_attribute(("line-rate", format_rate(report.total_line_rate()).as_str()));
    writer.write_event(Event::Start(coverage))?;

    writer.write_event(Event::Start(BytesStart::new("sources")))?;
    for root in &report.source_roots {
        let root = root.to_string_lossy();
        writer.write_event(Event::Start(BytesStart::new("source")))?;
        writer.write_event(Event::Text(BytesText::new(&root)))?;
        writer.write_event(Event::End(BytesEnd::new("source")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("sources")))?;

    writer.write_event(Event::Start(BytesStart::new("packages")))?;
    for package in &report.packages {
        write_package(&mut writer, package)?;
    }
    writer.write_event(Event::End(BytesEnd::new("packages")))?;

    writer.write_event(Event::End(BytesEnd::new("coverage")))?;

    let mut xml = writer.into_inner();
    xml.push(b'\n');
    Ok(xml)
}

fn write_package(writer: &mut Writer<Vec<u8>>, package: &PackageGroup) -> Result<(), WriteError> {
    let mut element = BytesStart::new("package");
    element.push_attribute(("name", package.name.as_str()));
    element.push_attribute(("branch-rate", "0.0"));
    element.push_attribute(("complexity", "0.0"));
    element.push_attribute(("line-rate", format_rate(package.line_rate()).as_str()));
    writer.write_event(Event::Start(element))?;

    writer.write_event(Event::Start(BytesStart::new("classes")))?;
    for record in &package.records {
        write_class(writer, record)?;
    }
    writer.write_event(Event::End(BytesEnd::new("classes")))?;

    writer.write_event(Event::End(BytesEnd::new("package")))?;
    Ok(())
}

fn write_class(writer: &mut Writer<Vec<u8>>, record: &CoverageRecord) -> Result<(), WriteError> {
    let mut element = BytesStart::new("class");
    element.push_attribute(("branch-rate", format_rate(record.branch_rate()).as_str()));
    element.push_attribute(("complexity", format_rate(record.complexity()).as_str()));
    element.push_attribute(("line-rate", format_rate(record.line_rate()).as_str()));
    element.push_attribute(("filename", record.path()));
    element.push_attribute(("name", record.full_class_name().as_str()));
    writer.write_event(Event::Start(element))?;

    // Method-level coverage is not collected
    writer.write_event(Event::Empty(BytesStart::new("methods")))?;

    writer.write_event(Event::Start(BytesStart::new("lines")))?;
    for (number, hits) in record.line_hits() {
        let mut line = BytesStart::new("line");
        line.push_attribute(("hits", hits.to_string().as_str()));
        line.push_attribute(("number", number.to_string().as_str()));
        writer.write_event(Event::Empty(line))?;
    }
    writer.write_event(Event::End(BytesEnd::new("lines")))?;

    writer.write_event(Event::End(BytesEnd::new("class")))?;
    Ok(())
}

/// Render the report and write it to `destination`.
///
/// The document goes to a temporary file next to the destination first and is
/// renamed into place, so a failed run never leaves a truncated report behind.
/// An existing report keeps its permissions; a new one gets the umask default.
pub fn write_report(report: &Report, destination: &Path) -> Result<(), WriteError> {
    let xml = render(report)?;

    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| WriteError::io(destination, e))?;

    let mut tmp = report_temp_file(dir, destination).map_err(|e| WriteError::io(destination, e))?;
    tmp.write_all(&xml).map_err(|e| WriteError::io(destination, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| WriteError::io(destination, e))?;
    tmp.persist(destination)
        .map_err(|e| WriteError::io(destination, e.error))?;

    Ok(())
}

fn report_temp_file(dir: &Path, destination: &Path) -> std::io::Result<NamedTempFile> {
    let mut builder = Builder::new();
    builder.prefix(".lcovr");

    // Temp files default to 0600; ask for 0666 and let the umask apply
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }

    let tmp = builder.tempfile_in(dir)?;

    if let Ok(existing) = fs::metadata(destination) {
        if existing.is_file() {
            fs::set_permissions(tmp.path(), existing.permissions())?;
        }
    }

    Ok(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::Reader;
    use std::collections::HashMap;

    #[derive(Debug)]
    struct Element {
        name: String,
        attrs: HashMap<String, String>,
    }

    /// Flatten a document into its elements, in document order
    fn elements(xml: &[u8]) -> Vec<Element> {
        let mut reader = Reader::from_reader(xml);
        reader.trim_text(true);

        let mut out = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                    let attrs = e
                        .attributes()
                        .filter_map(|a| a.ok())
                        .map(|a| {
                            (
                                String::from_utf8_lossy(a.key.as_ref()).to_string(),
                                a.unescape_value().unwrap().to_string(),
                            )
                        })
                        .collect();
                    out.push(Element {
                        name: String::from_utf8_lossy(e.name().as_ref()).to_string(),
                        attrs,
                    });
                }
                Ok(Event::Eof) => break,
                Err(e) => panic!("invalid xml: {}", e),
                _ => {}
            }
            buf.clear();
        }

        out
    }

    fn record(path: &str, found: u32, hit: u32, lines: &[(u32, u64)]) -> CoverageRecord {
        let mut record = CoverageRecord::new(path);
        record.lines_found = found;
        record.lines_hit = hit;
        for (number, hits) in lines {
            record.record_hits(*number, *hits);
        }
        record
    }

    fn sample_report() -> Report {
        let info1 = record(
            "com/mycompany/MyClass.java",
            4,
            3,
            &[(3, 1), (4, 1), (5, 1), (6, 0)],
        );
        let info2 = record(
            "com/mycompany/MyOtherClass.java",
            6,
            3,
            &[(3, 0), (4, 1), (5, 1), (6, 1), (7, 0), (8, 0)],
        );
        // Inserted out of order on purpose
        Report::new(
            vec![info2, info1],
            vec![PathBuf::from("/work/src/test/java"), PathBuf::from("/work/src/main/java")],
            1_300_000_000_000,
        )
    }

    #[test]
    fn test_document_header() {
        let xml = String::from_utf8(render(&sample_report()).unwrap()).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains(
            "<!DOCTYPE coverage SYSTEM \"http://cobertura.sourceforge.net/xml/coverage-03.dtd\">"
        ));
    }

    #[test]
    fn test_create_xml_document() {
        let xml = render(&sample_report()).unwrap();
        let doc = elements(&xml);
        let names: Vec<&str> = doc.iter().map(|e| e.name.as_str()).collect();

        assert_eq!(
            names,
            vec![
                "coverage", "sources", "source", "source", "packages", "package", "classes",
                "class", "methods", "lines", "line", "line", "line", "line", "class", "methods",
                "lines", "line", "line", "line", "line", "line", "line",
            ]
        );

        let root = &doc[0];
        assert_eq!(root.attrs["timestamp"], "1300000000000");
        assert_eq!(root.attrs["branch-rate"], "0.0");
        assert_eq!(root.attrs["line-rate"], "0.6");
        assert_eq!(root.attrs["version"], GENERATOR_VERSION);

        let package = &doc[5];
        assert_eq!(package.attrs["name"], "com.mycompany");
        assert_eq!(package.attrs["line-rate"], "0.6");
        assert_eq!(package.attrs["complexity"], "0.0");
        assert_eq!(package.attrs["branch-rate"], "0.0");

        let my_class = &doc[7];
        assert_eq!(my_class.attrs["name"], "com.mycompany.MyClass");
        assert_eq!(my_class.attrs["filename"], "com/mycompany/MyClass.java");
        assert_eq!(my_class.attrs["line-rate"], "0.75");
        assert_eq!(my_class.attrs["complexity"], "0.0");
        assert_eq!(my_class.attrs["branch-rate"], "0.0");

        let my_other_class = &doc[14];
        assert_eq!(my_other_class.attrs["name"], "com.mycompany.MyOtherClass");
        assert_eq!(my_other_class.attrs["line-rate"], "0.5");

        let lines: Vec<(&str, &str)> = doc[17..]
            .iter()
            .map(|e| (e.attrs["number"].as_str(), e.attrs["hits"].as_str()))
            .collect();
        assert_eq!(
            lines,
            vec![("3", "0"), ("4", "1"), ("5", "1"), ("6", "1"), ("7", "0"), ("8", "0")]
        );
    }

    #[test]
    fn test_sources_keep_caller_order() {
        let xml = String::from_utf8(render(&sample_report()).unwrap()).unwrap();
        let test_pos = xml.find("<source>/work/src/test/java</source>").unwrap();
        let main_pos = xml.find("<source>/work/src/main/java</source>").unwrap();
        assert!(test_pos < main_pos);
    }

    #[test]
    fn test_render_is_deterministic() {
        let first = render(&sample_report()).unwrap();
        let second = render(&sample_report()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_special_characters_are_escaped() {
        let report = Report::new(
            vec![record("a&b/<Odd>.java", 1, 1, &[(1, 1)])],
            vec![PathBuf::from("/tmp/R&D")],
            0,
        );
        let xml = String::from_utf8(render(&report).unwrap()).unwrap();
        assert!(xml.contains("filename=\"a&amp;b/&lt;Odd&gt;.java\""));
        assert!(xml.contains("<source>/tmp/R&amp;D</source>"));

        let doc = elements(xml.as_bytes());
        let class = doc.iter().find(|e| e.name == "class").unwrap();
        assert_eq!(class.attrs["filename"], "a&b/<Odd>.java");
    }

    #[test]
    fn test_empty_report() {
        let report = Report::new(Vec::new(), Vec::new(), 0);
        let doc = elements(&render(&report).unwrap());
        let names: Vec<&str> = doc.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["coverage", "sources", "packages"]);
        assert_eq!(doc[0].attrs["line-rate"], "0.0");
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("reports/coverage.xml");

        write_report(&sample_report(), &destination).unwrap();

        let written = fs::read(&destination).unwrap();
        assert_eq!(written, render(&sample_report()).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_write_report_keeps_existing_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("coverage.xml");

        for mode in [0o644, 0o640] {
            fs::write(&destination, "old").unwrap();
            fs::set_permissions(&destination, fs::Permissions::from_mode(mode)).unwrap();

            write_report(&sample_report(), &destination).unwrap();

            let after = fs::metadata(&destination).unwrap().permissions().mode() & 0o777;
            assert_eq!(after, mode);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_new_report_is_not_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("coverage.xml");
        let plain_file = dir.path().join("plain.txt");
        fs::write(&plain_file, "").unwrap();

        write_report(&sample_report(), &destination).unwrap();

        // Same bits as any file created normally under the current umask
        let expected = fs::metadata(&plain_file).unwrap().permissions().mode() & 0o777;
        let after = fs::metadata(&destination).unwrap().permissions().mode() & 0o777;
        assert_eq!(after, expected);
    }

    #[test]
    fn test_write_failure_keeps_previous_report() {
        let dir = tempfile::tempdir().unwrap();
        // A directory at the destination cannot be replaced by a file
        let destination = dir.path().join("coverage.xml");
        fs::create_dir(&destination).unwrap();

        let err = write_report(&sample_report(), &destination).unwrap_err();
        assert!(matches!(err, WriteError::Io { .. }));
        assert!(destination.is_dir());

        // No stray temp files left behind
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}

//! Per-file size report (cloc `--by-file --csv`) parsing.
//!
//! The report's first line is a header and its last data line is the
//! `SUM` grand total. Everything between is one file per line.

use std::collections::HashMap;
use std::io::BufRead;

use churnscope_core::{ChurnError, SizeReportEntry};

const TOTALS_PREFIX: &str = "SUM";
const FIELD_COUNT: usize = 5;

/// Immutable lookup of size-report entries keyed by file path.
///
/// # Examples
///
/// ```
/// use churnscope_ingest::size_report::SizeReport;
///
/// let report = SizeReport::parse(
///     "language,filename,blank,comment,code\n\
///      Rust,./src/main.rs,3,1,20\n\
///      SUM,,3,1,20\n",
/// )
/// .unwrap();
/// assert_eq!(report.get("src/main.rs").unwrap().code_lines, 20);
/// assert!(report.get("README.md").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SizeReport {
    entries: HashMap<String, SizeReportEntry>,
}

impl SizeReport {
    /// Parse a whole report held in memory.
    ///
    /// # Errors
    ///
    /// See [`SizeReport::from_lines`].
    pub fn parse(text: &str) -> Result<Self, ChurnError> {
        Self::from_lines(text.lines())
    }

    /// Read and parse a report from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::Io`] on read failure, otherwise as
    /// [`SizeReport::from_lines`].
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ChurnError> {
        let lines = reader.lines().collect::<std::io::Result<Vec<_>>>()?;
        Self::from_lines(lines)
    }

    /// Build the dictionary from report lines, header included.
    ///
    /// # Errors
    ///
    /// - [`ChurnError::MissingTotalsLine`] if no data line starts with `SUM`.
    /// - [`ChurnError::MalformedRecord`] if a line does not have exactly five
    ///   fields, has an empty filename, or a non-integer count.
    /// - [`ChurnError::DuplicateFileKey`] if a filename appears twice.
    pub fn from_lines<I, S>(lines: I) -> Result<Self, ChurnError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lines: Vec<S> = lines.into_iter().collect();
        let data = lines.get(1..).unwrap_or_default();

        let totals = data
            .iter()
            .rposition(|line| line.as_ref().starts_with(TOTALS_PREFIX))
            .ok_or(ChurnError::MissingTotalsLine)?;

        let mut entries = HashMap::with_capacity(totals);
        for line in &data[..totals] {
            let line = line.as_ref();
            if line.trim().is_empty() {
                continue;
            }
            let entry = parse_record(line)?;
            if entries.contains_key(&entry.file_path) {
                return Err(ChurnError::DuplicateFileKey(entry.file_path));
            }
            entries.insert(entry.file_path.clone(), entry);
        }

        Ok(Self { entries })
    }

    /// Look up a file; a leading `./` on `path` is ignored.
    pub fn get(&self, path: &str) -> Option<&SizeReportEntry> {
        self.entries.get(normalize_path(path))
    }

    /// Number of files in the report.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the report lists no files.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &SizeReportEntry> {
        self.entries.values()
    }
}

fn parse_record(line: &str) -> Result<SizeReportEntry, ChurnError> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != FIELD_COUNT {
        return Err(malformed(
            line,
            format!("expected {FIELD_COUNT} fields, found {}", fields.len()),
        ));
    }

    let file_path = normalize_path(fields[1].trim());
    if file_path.is_empty() {
        return Err(malformed(line, "empty filename".into()));
    }

    Ok(SizeReportEntry {
        language: fields[0].trim().to_string(),
        file_path: file_path.to_string(),
        blank_lines: parse_count(line, "blank", fields[2])?,
        comment_lines: parse_count(line, "comment", fields[3])?,
        code_lines: parse_count(line, "code", fields[4])?,
    })
}

fn parse_count(line: &str, name: &str, raw: &str) -> Result<u64, ChurnError> {
    raw.trim()
        .parse()
        .map_err(|_| malformed(line, format!("{name} count '{raw}' is not a number")))
}

fn malformed(line: &str, reason: String) -> ChurnError {
    ChurnError::MalformedRecord {
        line: line.to_string(),
        reason,
    }
}

fn normalize_path(path: &str) -> &str {
    path.strip_prefix("./").unwrap_or(path)
}

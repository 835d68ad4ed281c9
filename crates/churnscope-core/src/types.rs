use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// One per-file line of a code-size report.
///
/// # Examples
///
/// ```
/// use churnscope_core::SizeReportEntry;
///
/// let entry = SizeReportEntry {
///     language: "Rust".into(),
///     file_path: "src/main.rs".into(),
///     blank_lines: 4,
///     comment_lines: 2,
///     code_lines: 40,
/// };
/// assert_eq!(entry.code_lines, 40);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeReportEntry {
    /// Language detected by the size tool.
    pub language: String,
    /// File path relative to the repository root.
    pub file_path: String,
    /// Blank lines.
    pub blank_lines: u64,
    /// Comment lines.
    pub comment_lines: u64,
    /// Code lines.
    pub code_lines: u64,
}

/// A single file change within a commit, from a numstat line.
///
/// # Examples
///
/// ```
/// use churnscope_core::FileChange;
///
/// let change = FileChange::new("src/lib.rs", 10, 3);
/// assert_eq!(change.lines_add_del(), 13);
/// assert_eq!(change.code_lines, 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    /// File path relative to repo root, as printed by numstat.
    pub path: String,
    /// Lines added in this commit.
    pub lines_added: u64,
    /// Lines deleted in this commit.
    pub lines_deleted: u64,
    /// Current code lines from the size report, 0 when unknown.
    pub code_lines: u64,
    /// Current comment lines from the size report, 0 when unknown.
    pub comment_lines: u64,
    /// Current blank lines from the size report, 0 when unknown.
    pub blank_lines: u64,
}

impl FileChange {
    /// A change with no size-report data attached.
    pub fn new(path: impl Into<String>, lines_added: u64, lines_deleted: u64) -> Self {
        Self {
            path: path.into(),
            lines_added,
            lines_deleted,
            ..Self::default()
        }
    }

    /// Lines added plus lines deleted.
    pub fn lines_add_del(&self) -> u64 {
        self.lines_added + self.lines_deleted
    }
}

/// A parsed commit with its per-file changes.
///
/// # Examples
///
/// ```
/// use churnscope_core::{Commit, FileChange, parse_date};
///
/// let commit = Commit {
///     hash_short: "abc123".into(),
///     author_date: parse_date("2021-08-28").unwrap(),
///     author_name: "Alice".into(),
///     committer_name: "Alice".into(),
///     committer_date: parse_date("2021-09-10").unwrap(),
///     subject: "Initial".into(),
///     parents: vec![],
///     files: vec![FileChange::new("file.txt", 1, 2)],
/// };
/// assert!(commit.is_root());
/// assert!(!commit.is_merge());
/// assert_eq!(commit.lines_deleted(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    /// Abbreviated commit hash.
    pub hash_short: String,
    /// When the change was authored.
    pub author_date: DateTime<FixedOffset>,
    /// Author name.
    pub author_name: String,
    /// Committer name.
    pub committer_name: String,
    /// When the commit was recorded.
    pub committer_date: DateTime<FixedOffset>,
    /// First line of the commit message.
    pub subject: String,
    /// Parent hashes; empty for a root commit.
    pub parents: Vec<String>,
    /// Files touched; may be empty for merges.
    pub files: Vec<FileChange>,
}

impl Commit {
    /// Whether the commit has more than one parent.
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// Whether the commit has no parent.
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// Total lines added across all files.
    pub fn lines_added(&self) -> u64 {
        self.files.iter().map(|f| f.lines_added).sum()
    }

    /// Total lines deleted across all files.
    pub fn lines_deleted(&self) -> u64 {
        self.files.iter().map(|f| f.lines_deleted).sum()
    }

    /// Calendar day of the committer date, in the committer's own offset.
    pub fn committer_day(&self) -> NaiveDate {
        self.committer_date.date_naive()
    }
}

/// Parse a date as printed by `git log`, keeping its UTC offset.
///
/// Accepts `--date=short` (`2021-09-10`, mapped to midnight `+00:00`),
/// `--date=iso` (`2021-09-10 14:03:12 +0200`) and RFC 3339.
///
/// # Examples
///
/// ```
/// use chrono::Datelike;
/// use churnscope_core::parse_date;
///
/// assert_eq!(parse_date("2021-09-10").unwrap().year(), 2021);
/// assert!(parse_date("2021-09-10T08:00:00+02:00").is_some());
/// assert!(parse_date("yesterday").is_none());
/// ```
pub fn parse_date(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if let Ok(day) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(day.and_hms_opt(0, 0, 0)?.and_utc().fixed_offset());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt);
    }
    DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S %z").ok()
}

/// Output format for CLI results.
///
/// # Examples
///
/// ```
/// use churnscope_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable tables and summaries.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

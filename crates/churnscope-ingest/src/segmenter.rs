//! Commit-boundary detection over an unbounded line stream.
//!
//! A commit starts at every line beginning with the sentinel. The segmenter
//! never looks ahead and holds at most one commit's lines at a time.

use churnscope_core::ChurnError;
use tracing::debug;

/// The lines of one commit: header first, then one numstat line per file.
///
/// # Examples
///
/// ```
/// use churnscope_ingest::segmenter::RawCommitBuffer;
///
/// let buffer = RawCommitBuffer::new(vec!["§§§abc".into(), "1\t0\ta.rs".into()]);
/// assert_eq!(buffer.header(), "§§§abc");
/// assert_eq!(buffer.file_lines().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCommitBuffer {
    lines: Vec<String>,
}

impl RawCommitBuffer {
    /// Wrap already-grouped lines. `lines[0]` must be the header.
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// The header line.
    pub fn header(&self) -> &str {
        self.lines.first().map(String::as_str).unwrap_or_default()
    }

    /// Every line after the header.
    pub fn file_lines(&self) -> &[String] {
        self.lines.get(1..).unwrap_or_default()
    }

    /// All lines, header included.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

/// Splits a line stream into [`RawCommitBuffer`]s.
///
/// # Examples
///
/// ```
/// use churnscope_ingest::segmenter::CommitSegmenter;
///
/// let mut seg = CommitSegmenter::new("§§§");
/// assert!(seg.feed("§§§first".into()).is_none());
/// assert!(seg.feed("1\t1\ta.rs".into()).is_none());
/// let first = seg.feed("§§§second".into()).unwrap();
/// assert_eq!(first.lines().len(), 2);
/// let last = seg.finish().unwrap();
/// assert_eq!(last.header(), "§§§second");
/// ```
#[derive(Debug)]
pub struct CommitSegmenter {
    sentinel: String,
    current: Option<Vec<String>>,
}

impl CommitSegmenter {
    /// A segmenter that starts a commit at every line beginning with `sentinel`.
    pub fn new(sentinel: impl Into<String>) -> Self {
        Self {
            sentinel: sentinel.into(),
            current: None,
        }
    }

    /// Consume one line, returning the previous commit when `line` starts a new one.
    ///
    /// Blank lines are ignored. Lines before the first header are dropped.
    pub fn feed(&mut self, line: String) -> Option<RawCommitBuffer> {
        if line.trim().is_empty() {
            return None;
        }

        if line.starts_with(&self.sentinel) {
            let completed = self.current.replace(vec![line]);
            return completed.map(RawCommitBuffer::new);
        }

        match self.current.as_mut() {
            Some(buffer) => buffer.push(line),
            None => debug!(line = %line, "dropping line before first commit header"),
        }
        None
    }

    /// End of input: return the commit still being collected.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::NoCommitsFound`] if no header was ever seen.
    pub fn finish(self) -> Result<RawCommitBuffer, ChurnError> {
        self.current
            .map(RawCommitBuffer::new)
            .ok_or(ChurnError::NoCommitsFound)
    }
}

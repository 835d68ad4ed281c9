//! Lazy commit iteration over a line source.

use std::io;

use churnscope_core::{ChurnError, Commit, LogConfig};

use crate::record::build_commit;
use crate::segmenter::CommitSegmenter;
use crate::size_report::SizeReport;

/// Pulls lines from `lines` and yields one parsed [`Commit`] per header.
///
/// Works on any `io::Result<String>` iterator, so a `BufRead::lines()` over a
/// log too large for memory is read one commit at a time. A malformed commit
/// yields an error for that commit only; an I/O error ends iteration.
///
/// # Examples
///
/// ```
/// use std::io::{BufRead, Cursor};
/// use churnscope_core::LogConfig;
/// use churnscope_ingest::reader::CommitReader;
///
/// let log = "§§§a1§§§2021-01-01§§§A§§§A§§§2021-01-01§§§first\n\
///            3\t0\tREADME.md\n\
///            §§§b2§§§2021-01-02§§§B§§§B§§§2021-01-02§§§second§§§a1\n";
/// let format = LogConfig::default();
/// let commits: Vec<_> = CommitReader::new(Cursor::new(log).lines(), &format, None)
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(commits.len(), 2);
/// assert_eq!(commits[1].parents, vec!["a1"]);
/// ```
pub struct CommitReader<'a, I> {
    lines: I,
    segmenter: Option<CommitSegmenter>,
    format: &'a LogConfig,
    sizes: Option<&'a SizeReport>,
}

impl<'a, I> CommitReader<'a, I>
where
    I: Iterator<Item = io::Result<String>>,
{
    /// Wrap a line source.
    pub fn new(lines: I, format: &'a LogConfig, sizes: Option<&'a SizeReport>) -> Self {
        Self {
            lines,
            segmenter: Some(CommitSegmenter::new(format.sentinel.clone())),
            format,
            sizes,
        }
    }
}

impl<I> Iterator for CommitReader<'_, I>
where
    I: Iterator<Item = io::Result<String>>,
{
    type Item = Result<Commit, ChurnError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.segmenter.as_ref()?;

        loop {
            match self.lines.next() {
                Some(Ok(line)) => {
                    if let Some(buffer) = self.segmenter.as_mut()?.feed(line) {
                        return Some(build_commit(&buffer, self.format, self.sizes));
                    }
                }
                Some(Err(e)) => {
                    self.segmenter = None;
                    return Some(Err(e.into()));
                }
                None => {
                    let last = self.segmenter.take()?.finish();
                    return Some(
                        last.and_then(|buffer| build_commit(&buffer, self.format, self.sizes)),
                    );
                }
            }
        }
    }
}

/// Parse a complete in-memory history log.
///
/// # Errors
///
/// Returns the first error produced by [`CommitReader`], including
/// [`ChurnError::NoCommitsFound`] for a log without any header.
///
/// # Examples
///
/// ```
/// use churnscope_core::{ChurnError, LogConfig};
/// use churnscope_ingest::reader::parse_log;
///
/// let err = parse_log("1\t1\tlonely.rs\n", &LogConfig::default(), None).unwrap_err();
/// assert!(matches!(err, ChurnError::NoCommitsFound));
/// ```
pub fn parse_log(
    text: &str,
    format: &LogConfig,
    sizes: Option<&SizeReport>,
) -> Result<Vec<Commit>, ChurnError> {
    CommitReader::new(text.lines().map(|line| Ok(line.to_string())), format, sizes).collect()
}

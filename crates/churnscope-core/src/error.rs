/// Errors that can occur while ingesting or aggregating history exports.
///
/// Parse variants carry the offending raw line so a log-format mismatch can be
/// diagnosed without re-reading the input. Library crates use this type
/// directly; the binary converts to `miette::Report` at the boundary.
///
/// # Examples
///
/// ```
/// use churnscope_core::ChurnError;
///
/// let err = ChurnError::MalformedCommitHeader {
///     line: "§§§abc".into(),
///     expected: "7 or 8",
///     found: 2,
/// };
/// assert!(err.to_string().contains("found 2"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ChurnError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A commit header line did not split into the expected fields.
    #[error("malformed commit header (expected {expected} fields, found {found}): {line}")]
    MalformedCommitHeader {
        /// The raw header line.
        line: String,
        /// Human-readable expected field count.
        expected: &'static str,
        /// Observed field count.
        found: usize,
    },

    /// A header date field is not in a recognised `git log` date format.
    #[error("invalid date '{value}' in commit header: {line}")]
    InvalidDate {
        /// The raw header line.
        line: String,
        /// The unparseable field.
        value: String,
    },

    /// A numstat line did not split into `added\tdeleted\tpath`.
    #[error("malformed file stat (expected 3 tab-separated fields, found {found}): {line}")]
    MalformedFileStat {
        /// The raw file line.
        line: String,
        /// Observed field count.
        found: usize,
    },

    /// The history log contained no commit header at all.
    #[error("no commits found in history log")]
    NoCommitsFound,

    /// A size-report data line could not be parsed.
    #[error("malformed size report record ({reason}): {line}")]
    MalformedRecord {
        /// The raw report line.
        line: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The size report has no `SUM` grand-total line.
    #[error("size report has no SUM totals line")]
    MissingTotalsLine,

    /// The same file appears twice in the size report.
    #[error("duplicate file in size report: {0}")]
    DuplicateFileKey(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ChurnError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn config_error_displays_message() {
        let err = ChurnError::Config("bad value".into());
        assert_eq!(err.to_string(), "configuration error: bad value");
    }

    #[test]
    fn file_stat_error_shows_line_and_count() {
        let err = ChurnError::MalformedFileStat {
            line: "1 2 file.txt".into(),
            found: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("found 1"));
        assert!(msg.contains("1 2 file.txt"));
    }

    #[test]
    fn duplicate_key_shows_path() {
        let err = ChurnError::DuplicateFileKey("src/main.rs".into());
        assert!(err.to_string().contains("src/main.rs"));
    }
}

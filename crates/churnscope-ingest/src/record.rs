//! Conversion of raw commit buffers into [`Commit`] records.

use churnscope_core::{parse_date, ChurnError, Commit, FileChange, LogConfig};

use crate::segmenter::RawCommitBuffer;
use crate::size_report::SizeReport;

const ORPHAN_FIELDS: usize = 7;
const WITH_PARENTS_FIELDS: usize = 8;
const FILE_STAT_FIELDS: usize = 3;

/// Build a commit from its raw lines, merging size-report data when given.
///
/// The header is `sentinel hash sep authorDate sep author sep committer sep
/// committerDate sep subject [sep parents]`. The sentinel slot counts as the
/// first field, so a valid header has 7 fields (orphan) or 8 (with parents).
///
/// # Errors
///
/// - [`ChurnError::MalformedCommitHeader`] on any other header field count.
/// - [`ChurnError::InvalidDate`] if a date field cannot be parsed.
/// - [`ChurnError::MalformedFileStat`] if a file line lacks three tab-separated fields.
///
/// # Examples
///
/// ```
/// use chrono::Datelike;
/// use churnscope_core::LogConfig;
/// use churnscope_ingest::record::build_commit;
/// use churnscope_ingest::segmenter::RawCommitBuffer;
///
/// let buffer = RawCommitBuffer::new(vec![
///     "§§§abc123§§§2021-08-28§§§Alice§§§Alice§§§2021-09-10§§§Initial§§§parent1".into(),
///     "1\t2\tfile.txt".into(),
/// ]);
/// let commit = build_commit(&buffer, &LogConfig::default(), None).unwrap();
/// assert_eq!(commit.hash_short, "abc123");
/// assert_eq!(commit.committer_date.year(), 2021);
/// assert_eq!(commit.files[0].lines_deleted, 2);
/// ```
pub fn build_commit(
    buffer: &RawCommitBuffer,
    format: &LogConfig,
    sizes: Option<&SizeReport>,
) -> Result<Commit, ChurnError> {
    let mut commit = parse_header(buffer.header(), format)?;

    commit.files = buffer
        .file_lines()
        .iter()
        .map(|line| parse_file_stat(line).map(|change| with_sizes(change, sizes)))
        .collect::<Result<_, _>>()?;

    Ok(commit)
}

fn parse_header(line: &str, format: &LogConfig) -> Result<Commit, ChurnError> {
    let body = line.strip_prefix(format.sentinel.as_str()).unwrap_or(line);
    let fields: Vec<&str> = body.split(format.separator.as_str()).collect();
    // the stripped sentinel is field 0
    let found = fields.len() + 1;

    if found != ORPHAN_FIELDS && found != WITH_PARENTS_FIELDS {
        return Err(ChurnError::MalformedCommitHeader {
            line: line.to_string(),
            expected: "7 or 8",
            found,
        });
    }

    let date = |value: &str| {
        parse_date(value).ok_or_else(|| ChurnError::InvalidDate {
            line: line.to_string(),
            value: value.to_string(),
        })
    };

    let parents = fields
        .get(6)
        .map(|list| list.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();

    Ok(Commit {
        hash_short: fields[0].trim().to_string(),
        author_date: date(fields[1])?,
        author_name: fields[2].to_string(),
        committer_name: fields[3].to_string(),
        committer_date: date(fields[4])?,
        subject: fields[5].to_string(),
        parents,
        files: Vec::new(),
    })
}

/// Parse one `added\tdeleted\tpath` numstat line.
///
/// Non-numeric counts, such as the `-` git prints for binary files, become 0.
///
/// # Errors
///
/// Returns [`ChurnError::MalformedFileStat`] unless the line has exactly
/// three tab-separated fields.
///
/// # Examples
///
/// ```
/// use churnscope_ingest::record::parse_file_stat;
///
/// let change = parse_file_stat("-\t-\tlogo.png").unwrap();
/// assert_eq!((change.lines_added, change.lines_deleted), (0, 0));
/// assert!(parse_file_stat("12 3 main.rs").is_err());
/// ```
pub fn parse_file_stat(line: &str) -> Result<FileChange, ChurnError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != FILE_STAT_FIELDS {
        return Err(ChurnError::MalformedFileStat {
            line: line.to_string(),
            found: fields.len(),
        });
    }

    Ok(FileChange::new(
        fields[2],
        count_or_zero(fields[0]),
        count_or_zero(fields[1]),
    ))
}

fn count_or_zero(raw: &str) -> u64 {
    raw.trim().parse().unwrap_or(0)
}

fn with_sizes(mut change: FileChange, sizes: Option<&SizeReport>) -> FileChange {
    if let Some(entry) = sizes.and_then(|report| report.get(&change.path)) {
        change.code_lines = entry.code_lines;
        change.comment_lines = entry.comment_lines;
        change.blank_lines = entry.blank_lines;
    }
    change
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn buffer(lines: &[&str]) -> RawCommitBuffer {
        RawCommitBuffer::new(lines.iter().map(|l| (*l).to_string()).collect())
    }

    fn build(lines: &[&str]) -> Result<Commit, ChurnError> {
        build_commit(&buffer(lines), &LogConfig::default(), None)
    }

    #[test]
    fn header_with_parent_parses() {
        let commit = build(&[
            "§§§abc123§§§2021-08-28§§§Alice§§§Bob§§§2021-09-10§§§Initial§§§parent1",
            "1\t2\tfile.txt",
        ])
        .unwrap();

        assert_eq!(commit.hash_short, "abc123");
        assert_eq!(commit.author_date.month(), 8);
        assert_eq!(commit.author_name, "Alice");
        assert_eq!(commit.committer_name, "Bob");
        assert_eq!(commit.committer_date.year(), 2021);
        assert_eq!(commit.subject, "Initial");
        assert_eq!(commit.parents, vec!["parent1"]);
        assert_eq!(commit.files, vec![FileChange::new("file.txt", 1, 2)]);
    }

    #[test]
    fn orphan_header_has_no_parents() {
        let commit = build(&["§§§r00t§§§2021-01-01§§§A§§§A§§§2021-01-01§§§root"]).unwrap();
        assert!(commit.is_root());
        assert!(commit.files.is_empty());
    }

    #[test]
    fn empty_parent_field_means_orphan() {
        let commit = build(&["§§§r00t§§§2021-01-01§§§A§§§A§§§2021-01-01§§§root§§§"]).unwrap();
        assert!(commit.parents.is_empty());
    }

    #[test]
    fn merge_header_lists_all_parents() {
        let commit =
            build(&["§§§m§§§2021-01-01§§§A§§§A§§§2021-01-02§§§Merge branch§§§p1 p2"]).unwrap();
        assert!(commit.is_merge());
        assert_eq!(commit.parents, vec!["p1", "p2"]);
    }

    #[test]
    fn wrong_header_field_counts_fail() {
        for header in [
            "§§§abc§§§2021-01-01§§§A§§§A§§§2021-01-01",
            "§§§abc",
            "§§§a§§§2021-01-01§§§A§§§A§§§2021-01-01§§§s§§§p§§§extra",
        ] {
            match build(&[header]) {
                Err(ChurnError::MalformedCommitHeader { line, found, .. }) => {
                    assert_eq!(line, header);
                    assert!(found != 7 && found != 8);
                }
                other => panic!("expected malformed header for {header}, got {other:?}"),
            }
        }
    }

    #[test]
    fn bad_date_fails() {
        let err = build(&["§§§a§§§someday§§§A§§§A§§§2021-01-01§§§s"]).unwrap_err();
        assert!(matches!(err, ChurnError::InvalidDate { ref value, .. } if value == "someday"));
    }

    #[test]
    fn custom_separator_differs_from_sentinel() {
        let format = LogConfig {
            sentinel: "@@".into(),
            separator: "|".into(),
        };
        let commit = build_commit(
            &buffer(&["@@h1|2021-01-01|A|B|2021-01-03|subject|p0"]),
            &format,
            None,
        )
        .unwrap();
        assert_eq!(commit.hash_short, "h1");
        assert_eq!(commit.parents, vec!["p0"]);
    }

    #[test]
    fn binary_file_counts_become_zero() {
        let commit = build(&[
            "§§§a§§§2021-01-01§§§A§§§A§§§2021-01-01§§§s§§§p",
            "-\t-\timg/logo.png",
        ])
        .unwrap();
        assert_eq!(commit.files[0].path, "img/logo.png");
        assert_eq!(commit.files[0].lines_add_del(), 0);
    }

    #[test]
    fn malformed_file_line_fails() {
        let lines = ["§§§a§§§2021-01-01§§§A§§§A§§§2021-01-01§§§s§§§p", "1\t2"];
        let err = build(&lines).unwrap_err();
        assert!(matches!(err, ChurnError::MalformedFileStat { found: 2, .. }));
    }

    #[test]
    fn size_report_is_merged_and_misses_stay_zero() {
        let sizes = SizeReport::parse(
            "language,filename,blank,comment,code\nRust,src/lib.rs,4,3,50\nSUM,,4,3,50\n",
        )
        .unwrap();
        let commit = build_commit(
            &buffer(&[
                "§§§a§§§2021-01-01§§§A§§§A§§§2021-01-01§§§s§§§p",
                "5\t1\tsrc/lib.rs",
                "2\t0\tLICENSE",
            ]),
            &LogConfig::default(),
            Some(&sizes),
        )
        .unwrap();

        let lib = &commit.files[0];
        assert_eq!(
            (lib.code_lines, lib.comment_lines, lib.blank_lines),
            (50, 3, 4)
        );
        let license = &commit.files[1];
        assert_eq!(license.code_lines, 0);
    }
}

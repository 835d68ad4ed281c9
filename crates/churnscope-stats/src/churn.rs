//! Per-file churn accumulation and folder rollup.
//!
//! Folds `(commit, file change)` pairs into one [`FileChurn`] per path. With a
//! cutoff, every file still gets an entry but only commits strictly after the
//! cutoff add churn.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};
use churnscope_core::{Commit, FileChange};
use serde::Serialize;

/// Cumulative statistics of one file over the processed commit range.
///
/// # Examples
///
/// ```
/// use churnscope_core::{parse_date, Commit, FileChange};
/// use churnscope_stats::churn::ChurnAggregator;
///
/// let commit = Commit {
///     hash_short: "a1".into(),
///     author_date: parse_date("2021-01-01").unwrap(),
///     author_name: "alice".into(),
///     committer_name: "alice".into(),
///     committer_date: parse_date("2021-01-01").unwrap(),
///     subject: "init".into(),
///     parents: vec![],
///     files: vec![FileChange::new("src/main.rs", 10, 2)],
/// };
/// let mut churn = ChurnAggregator::new(None);
/// churn.observe_commits(std::slice::from_ref(&commit));
/// let files = churn.into_map();
/// assert_eq!(files["src/main.rs"].lines_add_del, 12);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChurn {
    /// File path relative to repo root.
    pub path: String,
    /// Commits touching the file after the cutoff.
    pub commits: u32,
    /// Lines added after the cutoff.
    pub lines_added: u64,
    /// Lines deleted after the cutoff.
    pub lines_deleted: u64,
    /// `lines_added + lines_deleted`.
    pub lines_add_del: u64,
    /// Earliest committer date touching the file.
    pub created: DateTime<FixedOffset>,
    /// Latest committer date touching the file.
    pub last_commit: DateTime<FixedOffset>,
    /// Current code lines from the size report, 0 when unknown.
    pub cloc: u64,
}

impl FileChurn {
    fn new(path: &str, date: DateTime<FixedOffset>) -> Self {
        Self {
            path: path.to_string(),
            commits: 0,
            lines_added: 0,
            lines_deleted: 0,
            lines_add_del: 0,
            created: date,
            last_commit: date,
            cloc: 0,
        }
    }

    fn record(&mut self, date: DateTime<FixedOffset>, change: &FileChange, counts: bool) {
        self.created = self.created.min(date);
        self.last_commit = self.last_commit.max(date);
        if change.code_lines > 0 {
            self.cloc = change.code_lines;
        }
        if counts {
            self.commits += 1;
            self.lines_added += change.lines_added;
            self.lines_deleted += change.lines_deleted;
            self.lines_add_del = self.lines_added + self.lines_deleted;
        }
    }
}

/// List-mode ordering. Numeric keys sort descending, ties by path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChurnSort {
    /// Total lines added plus deleted.
    LinesAddDel,
    /// Number of commits.
    Commits,
    /// Lines added.
    LinesAdded,
    /// Lines deleted.
    LinesDeleted,
    /// Most recently touched first.
    LastCommit,
    /// Path, ascending.
    Path,
}

impl ChurnSort {
    fn compare(self, a: &FileChurn, b: &FileChurn) -> Ordering {
        let primary = match self {
            ChurnSort::LinesAddDel => b.lines_add_del.cmp(&a.lines_add_del),
            ChurnSort::Commits => b.commits.cmp(&a.commits),
            ChurnSort::LinesAdded => b.lines_added.cmp(&a.lines_added),
            ChurnSort::LinesDeleted => b.lines_deleted.cmp(&a.lines_deleted),
            ChurnSort::LastCommit => b.last_commit.cmp(&a.last_commit),
            ChurnSort::Path => Ordering::Equal,
        };
        primary.then_with(|| a.path.cmp(&b.path))
    }
}

/// Accumulates [`FileChurn`] entries keyed by path.
#[derive(Debug, Default)]
pub struct ChurnAggregator {
    cutoff: Option<DateTime<FixedOffset>>,
    files: HashMap<String, FileChurn>,
}

impl ChurnAggregator {
    /// Commits at or before `cutoff` register files without adding churn.
    pub fn new(cutoff: Option<DateTime<FixedOffset>>) -> Self {
        Self {
            cutoff,
            files: HashMap::new(),
        }
    }

    /// Fold one file change of `commit`.
    pub fn observe(&mut self, commit: &Commit, change: &FileChange) {
        let date = commit.committer_date;
        let counts = !matches!(self.cutoff, Some(cutoff) if date <= cutoff);
        self.files
            .entry(change.path.clone())
            .or_insert_with(|| FileChurn::new(&change.path, date))
            .record(date, change, counts);
    }

    /// Fold every file change of every commit.
    pub fn observe_commits(&mut self, commits: &[Commit]) {
        for commit in commits {
            for change in &commit.files {
                self.observe(commit, change);
            }
        }
    }

    /// Number of distinct files seen.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no file has been seen.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Dictionary mode: the entries keyed by path.
    pub fn into_map(self) -> HashMap<String, FileChurn> {
        self.files
    }

    /// List mode with one of the built-in orderings.
    pub fn into_sorted(self, sort: ChurnSort) -> Vec<FileChurn> {
        self.into_sorted_by(|a, b| sort.compare(a, b))
    }

    /// List mode with a caller-supplied ordering.
    pub fn into_sorted_by<F>(self, compare: F) -> Vec<FileChurn>
    where
        F: FnMut(&FileChurn, &FileChurn) -> Ordering,
    {
        let mut files: Vec<FileChurn> = self.files.into_values().collect();
        files.sort_by(compare);
        files
    }
}

/// Churn of files grouped by their leading folders.
///
/// # Examples
///
/// ```
/// use churnscope_stats::churn::FolderChurn;
///
/// let folder = FolderChurn {
///     folder: "src".into(),
///     depth: 1,
///     files: 2,
///     commits: 5,
///     lines_added: 40,
///     lines_deleted: 10,
///     lines_add_del: 50,
///     cloc: 300,
///     created: chrono::Utc::now().fixed_offset(),
///     last_commit: chrono::Utc::now().fixed_offset(),
/// };
/// assert_eq!(folder.lines_add_del, folder.lines_added + folder.lines_deleted);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderChurn {
    /// Folder path, `.` for files at the repository root.
    pub folder: String,
    /// Number of leading path segments kept.
    pub depth: usize,
    /// Files under the folder.
    pub files: usize,
    /// Sum of per-file commit counts.
    pub commits: u32,
    /// Lines added.
    pub lines_added: u64,
    /// Lines deleted.
    pub lines_deleted: u64,
    /// `lines_added + lines_deleted`.
    pub lines_add_del: u64,
    /// Sum of current code lines.
    pub cloc: u64,
    /// Earliest file creation.
    pub created: DateTime<FixedOffset>,
    /// Latest file change.
    pub last_commit: DateTime<FixedOffset>,
}

/// Roll file churn up to folders of at most `depth` segments.
///
/// Returns folders sorted by `lines_add_del` descending, then name.
pub fn folder_churn<'a, I>(files: I, depth: usize) -> Vec<FolderChurn>
where
    I: IntoIterator<Item = &'a FileChurn>,
{
    let mut folders: HashMap<String, FolderChurn> = HashMap::new();

    for file in files {
        let name = folder_of(&file.path, depth);
        let folder = folders.entry(name.clone()).or_insert_with(|| FolderChurn {
            folder: name,
            depth,
            files: 0,
            commits: 0,
            lines_added: 0,
            lines_deleted: 0,
            lines_add_del: 0,
            cloc: 0,
            created: file.created,
            last_commit: file.last_commit,
        });
        folder.files += 1;
        folder.commits += file.commits;
        folder.lines_added += file.lines_added;
        folder.lines_deleted += file.lines_deleted;
        folder.lines_add_del = folder.lines_added + folder.lines_deleted;
        folder.cloc += file.cloc;
        folder.created = folder.created.min(file.created);
        folder.last_commit = folder.last_commit.max(file.last_commit);
    }

    let mut result: Vec<FolderChurn> = folders.into_values().collect();
    result.sort_by(|a, b| {
        b.lines_add_del
            .cmp(&a.lines_add_del)
            .then_with(|| a.folder.cmp(&b.folder))
    });
    result
}

fn folder_of(path: &str, depth: usize) -> String {
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    segments.pop();
    segments.truncate(depth);
    if segments.is_empty() {
        ".".to_string()
    } else {
        segments.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use churnscope_core::parse_date;

    fn commit(day: &str, files: Vec<FileChange>) -> Commit {
        Commit {
            hash_short: format!("h{day}"),
            author_date: parse_date(day).unwrap(),
            author_name: "alice".into(),
            committer_name: "alice".into(),
            committer_date: parse_date(day).unwrap(),
            subject: "change".into(),
            parents: vec!["p".into()],
            files,
        }
    }

    fn history() -> Vec<Commit> {
        vec![
            commit(
                "2021-01-01",
                vec![
                    FileChange::new("src/a.rs", 10, 0),
                    FileChange::new("README.md", 5, 0),
                ],
            ),
            commit("2021-02-01", vec![FileChange::new("src/a.rs", 3, 2)]),
            commit(
                "2021-03-01",
                vec![
                    FileChange::new("src/b.rs", 7, 1),
                    FileChange::new("src/a.rs", 1, 1),
                ],
            ),
        ]
    }

    #[test]
    fn accumulates_counts_and_dates() {
        let mut agg = ChurnAggregator::new(None);
        agg.observe_commits(&history());
        let files = agg.into_map();

        let a = &files["src/a.rs"];
        assert_eq!(a.commits, 3);
        assert_eq!((a.lines_added, a.lines_deleted), (14, 3));
        assert_eq!(a.created, parse_date("2021-01-01").unwrap());
        assert_eq!(a.last_commit, parse_date("2021-03-01").unwrap());
    }

    #[test]
    fn add_del_is_always_the_sum() {
        let mut agg = ChurnAggregator::new(parse_date("2021-01-15"));
        agg.observe_commits(&history());
        for f in agg.into_map().values() {
            assert_eq!(f.lines_add_del, f.lines_added + f.lines_deleted);
            assert!(f.created <= f.last_commit);
        }
    }

    #[test]
    fn cutoff_keeps_files_but_only_counts_later_commits() {
        let mut agg = ChurnAggregator::new(parse_date("2021-02-01"));
        agg.observe_commits(&history());
        let files = agg.into_map();

        assert_eq!(files.len(), 3);
        let readme = &files["README.md"];
        assert_eq!(readme.commits, 0);
        assert_eq!(readme.lines_add_del, 0);

        // the 2021-02-01 commit is on the cutoff, so only March counts
        let a = &files["src/a.rs"];
        assert_eq!(a.commits, 1);
        assert_eq!(a.lines_add_del, 2);
    }

    #[test]
    fn out_of_order_input_keeps_created_earliest() {
        let mut commits = history();
        commits.reverse();
        let mut agg = ChurnAggregator::new(None);
        agg.observe_commits(&commits);
        let a = &agg.into_map()["src/a.rs"];
        assert_eq!(a.created, parse_date("2021-01-01").unwrap());
        assert_eq!(a.last_commit, parse_date("2021-03-01").unwrap());
    }

    #[test]
    fn sorted_list_mode() {
        let mut agg = ChurnAggregator::new(None);
        agg.observe_commits(&history());
        let by_churn = agg.into_sorted(ChurnSort::LinesAddDel);
        let paths: Vec<_> = by_churn.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, ["src/a.rs", "src/b.rs", "README.md"]);
    }

    #[test]
    fn custom_ordering() {
        let mut agg = ChurnAggregator::new(None);
        agg.observe_commits(&history());
        let by_path = agg.into_sorted_by(|a, b| b.path.cmp(&a.path));
        assert_eq!(by_path[0].path, "src/b.rs");
    }

    #[test]
    fn cloc_comes_from_size_data() {
        let mut change = FileChange::new("src/a.rs", 1, 0);
        change.code_lines = 120;
        let mut agg = ChurnAggregator::new(None);
        agg.observe_commits(&[commit("2021-01-01", vec![change])]);
        assert_eq!(agg.into_map()["src/a.rs"].cloc, 120);
    }

    #[test]
    fn folders_roll_up_by_depth() {
        let mut agg = ChurnAggregator::new(None);
        agg.observe_commits(&history());
        let files = agg.into_map();
        let folders = folder_churn(files.values(), 1);

        assert_eq!(folders.len(), 2);
        assert_eq!(folders[0].folder, "src");
        assert_eq!(folders[0].files, 2);
        assert_eq!(folders[0].lines_add_del, 25);
        assert_eq!(folders[1].folder, ".");
        assert_eq!(folders[1].files, 1);
    }

    #[test]
    fn folder_of_respects_depth() {
        assert_eq!(folder_of("a/b/c/d.rs", 2), "a/b");
        assert_eq!(folder_of("a/b/c/d.rs", 9), "a/b/c");
        assert_eq!(folder_of("d.rs", 1), ".");
        assert_eq!(folder_of("a/d.rs", 0), ".");
    }
}

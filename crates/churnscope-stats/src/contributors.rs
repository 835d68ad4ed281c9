//! Author churn, top-N contributor selection, and day/week activity buckets.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate};
use churnscope_core::{Commit, Period};
use serde::Serialize;

/// Name of the synthetic author that sums everyone outside the top N.
pub const OTHERS: &str = "others";

/// Churn attributed to one author.
///
/// # Examples
///
/// ```
/// use churnscope_core::{parse_date, Commit, FileChange};
/// use churnscope_stats::contributors::author_churn;
///
/// let commit = Commit {
///     hash_short: "a1".into(),
///     author_date: parse_date("2021-01-01").unwrap(),
///     author_name: "alice".into(),
///     committer_name: "alice".into(),
///     committer_date: parse_date("2021-01-01").unwrap(),
///     subject: "init".into(),
///     parents: vec![],
///     files: vec![FileChange::new("a.rs", 4, 1)],
/// };
/// let authors = author_churn(&[commit]);
/// assert_eq!(authors[0].author, "alice");
/// assert_eq!(authors[0].lines_add_del, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorChurn {
    /// Author name as recorded in the log.
    pub author: String,
    /// Commits authored.
    pub commits: u32,
    /// Lines added.
    pub lines_added: u64,
    /// Lines deleted.
    pub lines_deleted: u64,
    /// `lines_added + lines_deleted`.
    pub lines_add_del: u64,
    /// Earliest committer date.
    pub first_commit: DateTime<FixedOffset>,
    /// Latest committer date.
    pub last_commit: DateTime<FixedOffset>,
}

impl AuthorChurn {
    fn new(author: &str, date: DateTime<FixedOffset>) -> Self {
        Self {
            author: author.to_string(),
            commits: 0,
            lines_added: 0,
            lines_deleted: 0,
            lines_add_del: 0,
            first_commit: date,
            last_commit: date,
        }
    }

    fn absorb(&mut self, other: &AuthorChurn) {
        self.commits += other.commits;
        self.lines_added += other.lines_added;
        self.lines_deleted += other.lines_deleted;
        self.lines_add_del = self.lines_added + self.lines_deleted;
        self.first_commit = self.first_commit.min(other.first_commit);
        self.last_commit = self.last_commit.max(other.last_commit);
    }
}

/// Per-author churn, highest `lines_add_del` first, ties by name.
pub fn author_churn(commits: &[Commit]) -> Vec<AuthorChurn> {
    let mut authors: HashMap<&str, AuthorChurn> = HashMap::new();
    for commit in commits {
        let date = commit.committer_date;
        let entry = authors
            .entry(commit.author_name.as_str())
            .or_insert_with(|| AuthorChurn::new(&commit.author_name, date));
        entry.absorb(&AuthorChurn {
            author: String::new(),
            commits: 1,
            lines_added: commit.lines_added(),
            lines_deleted: commit.lines_deleted(),
            lines_add_del: 0,
            first_commit: date,
            last_commit: date,
        });
    }

    let mut result: Vec<AuthorChurn> = authors.into_values().collect();
    sort_by_churn(&mut result);
    result
}

fn sort_by_churn(authors: &mut [AuthorChurn]) {
    authors.sort_by(|a, b| {
        b.lines_add_del
            .cmp(&a.lines_add_del)
            .then_with(|| a.author.cmp(&b.author))
    });
}

/// The N biggest contributors plus everyone else folded together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopContributors {
    /// At most N authors, highest churn first.
    pub top: Vec<AuthorChurn>,
    /// Sum of the remaining authors, named [`OTHERS`].
    pub others: Option<AuthorChurn>,
}

/// Keep the `n` highest-churn authors and fold the rest into one entry.
///
/// # Examples
///
/// ```
/// use churnscope_core::{parse_date, Commit, FileChange};
/// use churnscope_stats::contributors::{author_churn, top_contributors};
///
/// let commit = |author: &str, lines: u64| Commit {
///     hash_short: author.into(),
///     author_date: parse_date("2021-01-01").unwrap(),
///     author_name: author.into(),
///     committer_name: author.into(),
///     committer_date: parse_date("2021-01-01").unwrap(),
///     subject: String::new(),
///     parents: vec![],
///     files: vec![FileChange::new("a.rs", lines, 0)],
/// };
/// let authors = author_churn(&[commit("ann", 50), commit("bo", 20), commit("cy", 5)]);
/// let top = top_contributors(authors, 1);
/// assert_eq!(top.top[0].author, "ann");
/// assert_eq!(top.others.unwrap().lines_add_del, 25);
/// ```
pub fn top_contributors(mut authors: Vec<AuthorChurn>, n: usize) -> TopContributors {
    sort_by_churn(&mut authors);
    if authors.len() <= n {
        return TopContributors {
            top: authors,
            others: None,
        };
    }

    let rest = authors.split_off(n);
    let others = rest.iter().skip(1).fold(
        AuthorChurn {
            author: OTHERS.to_string(),
            ..rest[0].clone()
        },
        |mut acc, author| {
            acc.absorb(author);
            acc
        },
    );

    TopContributors {
        top: authors,
        others: Some(others),
    }
}

/// Activity of one day or week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSummary {
    /// First day of the bucket (a Monday for weeks).
    pub start: NaiveDate,
    /// Bucket size.
    pub period: Period,
    /// Commits in the bucket.
    pub number_of_commits: u32,
    /// Distinct authors in the bucket.
    pub number_of_authors: usize,
    /// Lines added.
    pub lines_added: u64,
    /// Lines deleted.
    pub lines_deleted: u64,
    /// Biggest contributors of the bucket.
    pub top_contributors: TopContributors,
}

/// First day of the bucket containing `day`.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use churnscope_core::Period;
/// use churnscope_stats::contributors::period_start;
///
/// let thursday = NaiveDate::from_ymd_opt(2021, 9, 9).unwrap();
/// assert_eq!(period_start(thursday, Period::Week), NaiveDate::from_ymd_opt(2021, 9, 6).unwrap());
/// assert_eq!(period_start(thursday, Period::Day), thursday);
/// ```
pub fn period_start(day: NaiveDate, period: Period) -> NaiveDate {
    match period {
        Period::Day => day,
        Period::Week => day - Duration::days(i64::from(day.weekday().num_days_from_monday())),
    }
}

/// Bucket commits by committer day or week, oldest bucket first.
pub fn period_summaries(commits: &[Commit], period: Period, top_n: usize) -> Vec<PeriodSummary> {
    let mut buckets: BTreeMap<NaiveDate, Vec<&Commit>> = BTreeMap::new();
    for commit in commits {
        buckets
            .entry(period_start(commit.committer_day(), period))
            .or_default()
            .push(commit);
    }

    buckets
        .into_iter()
        .map(|(start, bucket)| {
            let owned: Vec<Commit> = bucket.into_iter().cloned().collect();
            let authors = author_churn(&owned);
            PeriodSummary {
                start,
                period,
                number_of_commits: owned.len() as u32,
                number_of_authors: authors.len(),
                lines_added: owned.iter().map(Commit::lines_added).sum(),
                lines_deleted: owned.iter().map(Commit::lines_deleted).sum(),
                top_contributors: top_contributors(authors, top_n),
            }
        })
        .collect()
}

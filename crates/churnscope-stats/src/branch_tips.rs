//! Branch-tip tracking and per-day branch activity.
//!
//! A branch tip is a commit with no child in the history seen so far.
//! [`annotate_branch_tips`] snapshots the evolving tip set once per run of
//! same-day commits; [`day_summaries`] buckets annotated commits by committer day and compares
//! each day against the previous one and against the final tip set.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use churnscope_core::Commit;
use serde::Serialize;

/// A commit, with the branch tips visible right after it when it closes a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TippedCommit {
    /// The commit itself.
    #[serde(flatten)]
    pub commit: Commit,
    /// Childless commits once this commit is applied. Only set on the last
    /// commit before the committer day changes, and on the final commit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_tips: Option<BTreeSet<String>>,
}

/// Order commits parents-first and attach the tip set at each day boundary.
///
/// Works for both newest-first and oldest-first logs; unrelated commits keep
/// committer-date order, ties broken by input position. Parents outside the
/// exported range are ignored.
///
/// # Examples
///
/// ```
/// use churnscope_core::{parse_date, Commit};
/// use churnscope_stats::branch_tips::annotate_branch_tips;
///
/// let commit = |hash: &str, parents: &[&str]| Commit {
///     hash_short: hash.into(),
///     author_date: parse_date("2021-01-01").unwrap(),
///     author_name: "alice".into(),
///     committer_name: "alice".into(),
///     committer_date: parse_date("2021-01-01").unwrap(),
///     subject: String::new(),
///     parents: parents.iter().map(|p| p.to_string()).collect(),
///     files: vec![],
/// };
/// // newest first, as `git log` prints it
/// let tipped = annotate_branch_tips(vec![commit("b", &["a"]), commit("a", &[])]);
/// assert_eq!(tipped[0].commit.hash_short, "a");
/// assert!(tipped[0].branch_tips.is_none());
/// let tips = tipped[1].branch_tips.as_ref().unwrap();
/// assert!(tips.contains("b"));
/// assert!(!tips.contains("a"));
/// ```
pub fn annotate_branch_tips(commits: Vec<Commit>) -> Vec<TippedCommit> {
    let order = parents_first_order(&commits);
    let days: Vec<NaiveDate> = order.iter().map(|&i| commits[i].committer_day()).collect();

    let mut slots: Vec<Option<Commit>> = commits.into_iter().map(Some).collect();
    let mut tips: BTreeSet<String> = BTreeSet::new();
    let mut tipped = Vec::with_capacity(order.len());

    for (position, &index) in order.iter().enumerate() {
        let Some(commit) = slots[index].take() else {
            continue;
        };
        for parent in &commit.parents {
            tips.remove(parent);
        }
        tips.insert(commit.hash_short.clone());
        let closes_day = days.get(position + 1) != Some(&days[position]);
        tipped.push(TippedCommit {
            commit,
            branch_tips: closes_day.then(|| tips.clone()),
        });
    }

    tipped
}

fn parents_first_order(commits: &[Commit]) -> Vec<usize> {
    let mut by_hash: HashMap<&str, usize> = HashMap::with_capacity(commits.len());
    for (i, commit) in commits.iter().enumerate() {
        by_hash.entry(commit.hash_short.as_str()).or_insert(i);
    }

    let mut roots: Vec<usize> = (0..commits.len()).collect();
    roots.sort_by_key(|&i| (commits[i].committer_date, i));

    let mut visited = vec![false; commits.len()];
    let mut order = Vec::with_capacity(commits.len());
    // (commit, next parent to visit)
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in roots {
        if visited[root] {
            continue;
        }
        visited[root] = true;
        stack.push((root, 0));

        while let Some((index, cursor)) = stack.pop() {
            let parents = &commits[index].parents;
            if let Some(parent) = parents.get(cursor) {
                stack.push((index, cursor + 1));
                if let Some(&p) = by_hash.get(parent.as_str()) {
                    if !visited[p] {
                        visited[p] = true;
                        stack.push((p, 0));
                    }
                }
            } else {
                order.push(index);
            }
        }
    }

    order
}

/// Branch activity of one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    /// The committer day.
    pub day: NaiveDate,
    /// Hashes committed that day, in processing order.
    pub commit_hashes: Vec<String>,
    /// Tips after the day's last commit.
    pub branch_tips: Vec<String>,
    /// Commits that day.
    pub number_of_commits: u32,
    /// Merge commits that day.
    pub number_of_merges: u32,
    /// Lines added by non-merge commits.
    pub lines_added: u64,
    /// Lines deleted by non-merge commits.
    pub lines_deleted: u64,
    /// Lines added by merge commits.
    pub merge_lines_added: u64,
    /// Lines deleted by merge commits.
    pub merge_lines_deleted: u64,
    /// Change in tip count against the previous day.
    pub delta_branch_tips: i64,
    /// The day's commits that are still tips at the end of the range.
    pub commits_with_no_future_children: Vec<String>,
    /// The day's tips that later get a child.
    pub number_of_branch_tips_which_will_have_children: usize,
}

impl DaySummary {
    fn new(day: NaiveDate) -> Self {
        Self {
            day,
            commit_hashes: Vec::new(),
            branch_tips: Vec::new(),
            number_of_commits: 0,
            number_of_merges: 0,
            lines_added: 0,
            lines_deleted: 0,
            merge_lines_added: 0,
            merge_lines_deleted: 0,
            delta_branch_tips: 0,
            commits_with_no_future_children: Vec::new(),
            number_of_branch_tips_which_will_have_children: 0,
        }
    }

    fn add(&mut self, tipped: &TippedCommit) {
        let commit = &tipped.commit;
        self.commit_hashes.push(commit.hash_short.clone());
        self.number_of_commits += 1;
        if commit.is_merge() {
            self.number_of_merges += 1;
            self.merge_lines_added += commit.lines_added();
            self.merge_lines_deleted += commit.lines_deleted();
        } else {
            self.lines_added += commit.lines_added();
            self.lines_deleted += commit.lines_deleted();
        }
        if let Some(tips) = &tipped.branch_tips {
            self.branch_tips = tips.iter().cloned().collect();
        }
    }
}

/// Per-day branch statistics from chronologically ordered annotated commits.
///
/// # Examples
///
/// ```
/// use churnscope_core::{parse_date, Commit};
/// use churnscope_stats::branch_tips::{annotate_branch_tips, day_summaries};
///
/// let commit = |hash: &str, day: &str, parents: &[&str]| Commit {
///     hash_short: hash.into(),
///     author_date: parse_date(day).unwrap(),
///     author_name: "alice".into(),
///     committer_name: "alice".into(),
///     committer_date: parse_date(day).unwrap(),
///     subject: String::new(),
///     parents: parents.iter().map(|p| p.to_string()).collect(),
///     files: vec![],
/// };
/// let tipped = annotate_branch_tips(vec![
///     commit("a", "2021-01-01", &[]),
///     commit("b", "2021-01-02", &["a"]),
///     commit("c", "2021-01-02", &["a"]),
/// ]);
/// let days = day_summaries(&tipped);
/// let second = &days[&parse_date("2021-01-02").unwrap().date_naive()];
/// assert_eq!(second.delta_branch_tips, 1);
/// assert_eq!(second.commits_with_no_future_children, vec!["b", "c"]);
/// ```
pub fn day_summaries(commits: &[TippedCommit]) -> BTreeMap<NaiveDate, DaySummary> {
    let mut days: BTreeMap<NaiveDate, DaySummary> = BTreeMap::new();
    for tipped in commits {
        let day = tipped.commit.committer_day();
        days.entry(day)
            .or_insert_with(|| DaySummary::new(day))
            .add(tipped);
    }

    let final_tips = commits
        .iter()
        .rev()
        .find_map(|t| t.branch_tips.clone())
        .unwrap_or_default();

    let mut previous_tips: Option<usize> = None;
    for summary in days.values_mut() {
        let tips = summary.branch_tips.len();
        summary.delta_branch_tips = match previous_tips {
            Some(prev) => tips as i64 - prev as i64,
            None => tips as i64,
        };
        previous_tips = Some(tips);

        summary.commits_with_no_future_children = summary
            .commit_hashes
            .iter()
            .filter(|h| final_tips.contains(*h))
            .cloned()
            .collect();

        let surviving = summary
            .branch_tips
            .iter()
            .filter(|h| final_tips.contains(*h))
            .count();
        summary.number_of_branch_tips_which_will_have_children = tips - surviving;
    }

    days
}

#[cfg(test)]
mod tests {
    use super::*;
    use churnscope_core::{parse_date, FileChange};

    fn commit(hash: &str, day: &str, parents: &[&str], lines: (u64, u64)) -> Commit {
        Commit {
            hash_short: hash.into(),
            author_date: parse_date(day).unwrap(),
            author_name: "alice".into(),
            committer_name: "alice".into(),
            committer_date: parse_date(day).unwrap(),
            subject: format!("commit {hash}"),
            parents: parents.iter().map(|p| (*p).to_string()).collect(),
            files: vec![FileChange::new("f.rs", lines.0, lines.1)],
        }
    }

    fn day(s: &str) -> NaiveDate {
        parse_date(s).unwrap().date_naive()
    }

    /// a ── b ── d(merge)
    ///  └── c ──┘   └── e
    ///          └── f
    fn history_newest_first() -> Vec<Commit> {
        vec![
            commit("f", "2021-01-04", &["c"], (1, 0)),
            commit("e", "2021-01-04", &["d"], (1, 1)),
            commit("d", "2021-01-03", &["b", "c"], (5, 5)),
            commit("c", "2021-01-02", &["a"], (2, 0)),
            commit("b", "2021-01-02", &["a"], (3, 0)),
            commit("a", "2021-01-01", &[], (10, 0)),
        ]
    }

    fn tips(t: &TippedCommit) -> Vec<&str> {
        t.branch_tips.iter().flatten().map(String::as_str).collect()
    }

    #[test]
    fn annotation_puts_parents_first() {
        let tipped = annotate_branch_tips(history_newest_first());
        let order: Vec<_> = tipped
            .iter()
            .map(|t| t.commit.hash_short.as_str())
            .collect();
        let pos = |h: &str| order.iter().position(|x| *x == h).unwrap();
        assert_eq!(order.len(), 6);
        assert_eq!(order[0], "a");
        assert!(pos("d") > pos("b") && pos("d") > pos("c"));
        assert!(pos("e") > pos("d"));
        assert!(pos("f") > pos("c"));
    }

    #[test]
    fn tip_set_evolves_with_children() {
        let tipped = annotate_branch_tips(history_newest_first());
        let find = |h: &str| tipped.iter().find(|t| t.commit.hash_short == h).unwrap();
        assert_eq!(tips(find("a")), ["a"]);
        assert_eq!(tips(find("d")), ["d"]);
        assert_eq!(tips(tipped.last().unwrap()), ["e", "f"]);
    }

    #[test]
    fn same_result_for_oldest_first_input() {
        let mut oldest_first = history_newest_first();
        oldest_first.reverse();
        let a = annotate_branch_tips(oldest_first);
        let b = annotate_branch_tips(history_newest_first());
        assert_eq!(tips(a.last().unwrap()), tips(b.last().unwrap()));
    }

    #[test]
    fn long_linear_history_does_not_overflow() {
        let commits: Vec<Commit> = (0..50_000)
            .rev()
            .map(|i| {
                let hash = format!("c{i}");
                let parent = format!("c{}", i.max(1) - 1);
                let parents: Vec<&str> = if i == 0 {
                    vec![]
                } else {
                    vec![parent.as_str()]
                };
                commit(&hash, "2021-01-01", &parents, (1, 0))
            })
            .collect();
        let tipped = annotate_branch_tips(commits);
        assert_eq!(tipped[0].commit.hash_short, "c0");
        assert_eq!(tips(tipped.last().unwrap()), ["c49999"]);
        let snapshots = tipped.iter().filter(|t| t.branch_tips.is_some()).count();
        assert_eq!(snapshots, 1);
    }

    #[test]
    fn tips_are_snapshotted_once_per_day() {
        let tipped = annotate_branch_tips(history_newest_first());
        let snapshotted: Vec<_> = tipped
            .iter()
            .filter(|t| t.branch_tips.is_some())
            .map(|t| t.commit.hash_short.as_str())
            .collect();
        assert_eq!(snapshotted.len(), 4);
        assert_eq!(snapshotted[0], "a");
        assert_eq!(snapshotted[2], "d");

        let jan2: Vec<_> = tipped
            .iter()
            .filter(|t| t.commit.committer_day() == day("2021-01-02"))
            .collect();
        assert!(jan2[0].branch_tips.is_none());
        assert_eq!(tips(jan2[1]), ["b", "c"]);
    }

    #[test]
    fn first_day_delta_is_tip_count() {
        let days = day_summaries(&annotate_branch_tips(history_newest_first()));
        let first = days.values().next().unwrap();
        assert_eq!(first.delta_branch_tips, first.branch_tips.len() as i64);
    }

    #[test]
    fn day_statistics() {
        let days = day_summaries(&annotate_branch_tips(history_newest_first()));
        assert_eq!(days.len(), 4);

        let jan2 = &days[&day("2021-01-02")];
        assert_eq!(jan2.number_of_commits, 2);
        assert_eq!(jan2.branch_tips, vec!["b", "c"]);
        assert_eq!(jan2.delta_branch_tips, 1);
        assert_eq!((jan2.lines_added, jan2.lines_deleted), (5, 0));
        assert!(jan2.commits_with_no_future_children.is_empty());
        assert_eq!(jan2.number_of_branch_tips_which_will_have_children, 2);

        let jan3 = &days[&day("2021-01-03")];
        assert_eq!(jan3.number_of_merges, 1);
        assert_eq!((jan3.merge_lines_added, jan3.merge_lines_deleted), (5, 5));
        assert_eq!((jan3.lines_added, jan3.lines_deleted), (0, 0));
        assert_eq!(jan3.branch_tips, vec!["d"]);
        assert_eq!(jan3.delta_branch_tips, -1);

        let jan4 = &days[&day("2021-01-04")];
        assert_eq!(jan4.commits_with_no_future_children.len(), 2);
        assert_eq!(jan4.number_of_branch_tips_which_will_have_children, 0);
    }

    #[test]
    fn deltas_chain_across_days() {
        let days = day_summaries(&annotate_branch_tips(history_newest_first()));
        let mut previous = 0i64;
        for summary in days.values() {
            assert_eq!(
                summary.delta_branch_tips,
                summary.branch_tips.len() as i64 - previous
            );
            previous = summary.branch_tips.len() as i64;
        }
    }

    #[test]
    fn empty_input_gives_no_days() {
        assert!(day_summaries(&[]).is_empty());
    }
}

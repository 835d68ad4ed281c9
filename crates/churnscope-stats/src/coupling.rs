//! Windowed temporal coupling across one or more repositories.
//!
//! Commits are bucketed into fixed-length, non-overlapping day windows that
//! start at the earliest commit day of all streams. A single stream yields the
//! unordered file pairs of each window's touched set. With several streams,
//! one file from each stream's set forms a tuple, so `n` streams give n-file
//! tuples. A tuple never holds the same path twice.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::NaiveDate;
use churnscope_core::{Commit, CouplingConfig};
use serde::Serialize;
use tracing::{debug, warn};

const KEY_SEPARATOR: &str = "|";

/// Options for coupling detection.
///
/// # Examples
///
/// ```
/// use churnscope_stats::coupling::CouplingOptions;
///
/// let opts = CouplingOptions::default();
/// assert_eq!(opts.window_days, 1);
/// assert_eq!(opts.tuple_warning_threshold, 1_000_000);
/// ```
#[derive(Debug, Clone)]
pub struct CouplingOptions {
    /// Window length in days; 0 is treated as 1.
    pub window_days: u32,
    /// Generated tuple count after which one warning is logged.
    pub tuple_warning_threshold: usize,
}

impl Default for CouplingOptions {
    fn default() -> Self {
        Self::from(&CouplingConfig::default())
    }
}

impl From<&CouplingConfig> for CouplingOptions {
    fn from(config: &CouplingConfig) -> Self {
        Self {
            window_days: config.window_days,
            tuple_warning_threshold: config.tuple_warning_threshold,
        }
    }
}

/// One file taking part in a [`CouplingTuple`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouplingMember {
    /// File path; also the file's identity across repositories.
    pub path: String,
    /// Index of the input stream the file was first observed in.
    pub repository: usize,
    /// Commits in that stream touching the file.
    pub commits: u32,
    /// Windows in which the file changed at all.
    pub windows_with_commits: u32,
    /// `occurrences_in_window / windows_with_commits` of the owning tuple.
    pub ratio: f64,
}

/// Files that changed in the same windows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouplingTuple {
    /// Members ordered by path.
    pub members: Vec<CouplingMember>,
    /// Windows in which every member changed.
    pub occurrences_in_window: u32,
    /// Commits, across all streams, in the windows where the tuple occurred.
    pub total_commits: u32,
    /// Windows containing any commit in any stream.
    pub total_windows_with_commits: u32,
}

/// Result of [`couple_files`].
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouplingReport {
    /// First day of window 0, if there were commits.
    pub start: Option<NaiveDate>,
    /// Window length in days.
    pub window_days: u32,
    /// Windows containing any commit.
    pub windows_with_commits: u32,
    /// Tuple combinations generated before de-duplication.
    pub tuples_generated: usize,
    /// Tuples keyed by their sorted member paths joined with `|`.
    pub tuples: BTreeMap<String, CouplingTuple>,
}

impl CouplingReport {
    /// Tuples with at least `min_occurrences`, most frequent first.
    pub fn ranked(&self, min_occurrences: u32) -> Vec<(&str, &CouplingTuple)> {
        let mut ranked: Vec<(&str, &CouplingTuple)> = self
            .tuples
            .iter()
            .filter(|(_, t)| t.occurrences_in_window >= min_occurrences)
            .map(|(k, t)| (k.as_str(), t))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.occurrences_in_window
                .cmp(&a.1.occurrences_in_window)
                .then_with(|| a.0.cmp(b.0))
        });
        ranked
    }
}

#[derive(Default)]
struct Window<'a> {
    files: BTreeSet<&'a str>,
    commits: u32,
}

#[derive(Default)]
struct FileActivity {
    commits: u32,
    windows: u32,
}

struct StreamWindows<'a> {
    windows: BTreeMap<u32, Window<'a>>,
    files: HashMap<&'a str, FileActivity>,
}

/// Build coupling tuples from one or more commit streams.
///
/// # Examples
///
/// ```
/// use churnscope_core::{parse_date, Commit, FileChange};
/// use churnscope_stats::coupling::{couple_files, CouplingOptions};
///
/// let commit = Commit {
///     hash_short: "a1".into(),
///     author_date: parse_date("2021-01-01").unwrap(),
///     author_name: "alice".into(),
///     committer_name: "alice".into(),
///     committer_date: parse_date("2021-01-01").unwrap(),
///     subject: "api + client".into(),
///     parents: vec![],
///     files: vec![FileChange::new("api.rs", 1, 0), FileChange::new("client.rs", 1, 0)],
/// };
/// let commits = vec![commit];
/// let report = couple_files(&[&commits], &CouplingOptions::default());
/// assert_eq!(report.tuples["api.rs|client.rs"].occurrences_in_window, 1);
/// ```
pub fn couple_files(streams: &[&[Commit]], options: &CouplingOptions) -> CouplingReport {
    let window_days = options.window_days.max(1);
    let Some(start) = streams
        .iter()
        .flat_map(|s| s.iter())
        .map(Commit::committer_day)
        .min()
    else {
        return CouplingReport {
            window_days,
            ..CouplingReport::default()
        };
    };

    let per_stream: Vec<StreamWindows<'_>> = streams
        .iter()
        .map(|commits| bucket_stream(commits, start, window_days))
        .collect();
    for (i, stream) in per_stream.iter().enumerate() {
        debug!(
            stream = i,
            windows = stream.windows.len(),
            files = stream.files.len(),
            "bucketed commit stream"
        );
    }

    let active: BTreeSet<u32> = per_stream
        .iter()
        .flat_map(|s| s.windows.keys().copied())
        .collect();
    let windows_with_commits = active.len() as u32;

    // a slice passed twice is one repository; its commits count once per window
    let distinct: Vec<bool> = streams
        .iter()
        .enumerate()
        .map(|(i, s)| !streams[..i].iter().any(|t| std::ptr::eq(*t, *s)))
        .collect();

    let mut tuples: BTreeMap<String, CouplingTuple> = BTreeMap::new();
    let mut generated = 0usize;
    let mut warned = false;

    for window in &active {
        let sets: Option<Vec<Vec<&str>>> = per_stream
            .iter()
            .map(|s| {
                s.windows
                    .get(window)
                    .filter(|w| !w.files.is_empty())
                    .map(|w| w.files.iter().copied().collect::<Vec<_>>())
            })
            .collect();
        let Some(sets) = sets else {
            continue;
        };
        let window_commits: u32 = per_stream
            .iter()
            .zip(&distinct)
            .filter(|(_, first)| **first)
            .filter_map(|(s, _)| s.windows.get(window))
            .map(|w| w.commits)
            .sum();

        let combinations: Box<dyn Iterator<Item = Vec<(usize, &str)>> + '_> =
            match sets.as_slice() {
                [single] => Box::new(unordered_pairs(single)),
                _ => Box::new(CrossProduct::new(&sets)),
            };

        let mut seen_in_window: HashSet<String> = HashSet::new();
        for combination in combinations {
            if repeats_path(&combination) {
                continue;
            }
            generated += 1;
            if !warned && generated > options.tuple_warning_threshold {
                warn!(
                    generated,
                    threshold = options.tuple_warning_threshold,
                    window_days,
                    "coupling tuple count exceeded threshold; consider a shorter window"
                );
                warned = true;
            }

            let key = tuple_key(&combination);
            if !seen_in_window.insert(key.clone()) {
                continue;
            }
            let tuple = tuples
                .entry(key)
                .or_insert_with(|| new_tuple(&combination, &per_stream));
            tuple.occurrences_in_window += 1;
            tuple.total_commits += window_commits;
        }
    }

    for tuple in tuples.values_mut() {
        tuple.total_windows_with_commits = windows_with_commits;
        for member in &mut tuple.members {
            member.ratio = if member.windows_with_commits > 0 {
                f64::from(tuple.occurrences_in_window) / f64::from(member.windows_with_commits)
            } else {
                0.0
            };
        }
    }

    CouplingReport {
        start: Some(start),
        window_days,
        windows_with_commits,
        tuples_generated: generated,
        tuples,
    }
}

fn bucket_stream(commits: &[Commit], start: NaiveDate, window_days: u32) -> StreamWindows<'_> {
    let mut windows: BTreeMap<u32, Window<'_>> = BTreeMap::new();
    let mut files: HashMap<&str, FileActivity> = HashMap::new();

    for commit in commits {
        let offset = (commit.committer_day() - start).num_days().max(0);
        let index = (offset / i64::from(window_days)) as u32;
        let window = windows.entry(index).or_default();
        window.commits += 1;

        let touched: BTreeSet<&str> = commit.files.iter().map(|f| f.path.as_str()).collect();
        for path in touched {
            files.entry(path).or_default().commits += 1;
            window.files.insert(path);
        }
    }

    for window in windows.values() {
        for &path in &window.files {
            files.entry(path).or_default().windows += 1;
        }
    }

    StreamWindows { windows, files }
}

fn unordered_pairs<'s, 'a>(
    set: &'s [&'a str],
) -> impl Iterator<Item = Vec<(usize, &'a str)>> + 's {
    set.iter().enumerate().flat_map(move |(i, &a)| {
        set[i + 1..].iter().map(move |&b| vec![(0, a), (0, b)])
    })
}

fn repeats_path(combination: &[(usize, &str)]) -> bool {
    combination
        .iter()
        .enumerate()
        .any(|(i, (_, path))| combination[..i].iter().any(|(_, p)| p == path))
}

fn tuple_key(combination: &[(usize, &str)]) -> String {
    let mut paths: Vec<&str> = combination.iter().map(|(_, p)| *p).collect();
    paths.sort_unstable();
    paths.join(KEY_SEPARATOR)
}

fn new_tuple(combination: &[(usize, &str)], streams: &[StreamWindows<'_>]) -> CouplingTuple {
    let mut members: Vec<CouplingMember> = combination
        .iter()
        .map(|&(repository, path)| {
            let activity = streams[repository].files.get(path);
            CouplingMember {
                path: path.to_string(),
                repository,
                commits: activity.map_or(0, |a| a.commits),
                windows_with_commits: activity.map_or(0, |a| a.windows),
                ratio: 0.0,
            }
        })
        .collect();
    members.sort_by(|a, b| a.path.cmp(&b.path).then(a.repository.cmp(&b.repository)));

    CouplingTuple {
        members,
        occurrences_in_window: 0,
        total_commits: 0,
        total_windows_with_commits: 0,
    }
}

/// Odometer over one element from each set, tagged with the set index.
struct CrossProduct<'s, 'a> {
    sets: &'s [Vec<&'a str>],
    indices: Vec<usize>,
    done: bool,
}

impl<'s, 'a> CrossProduct<'s, 'a> {
    fn new(sets: &'s [Vec<&'a str>]) -> Self {
        Self {
            sets,
            indices: vec![0; sets.len()],
            done: sets.is_empty() || sets.iter().any(Vec::is_empty),
        }
    }
}

impl<'a> Iterator for CrossProduct<'_, 'a> {
    type Item = Vec<(usize, &'a str)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self
            .indices
            .iter()
            .enumerate()
            .map(|(set, &i)| (set, self.sets[set][i]))
            .collect();

        // advance the rightmost digit, carrying leftwards
        let mut pos = self.indices.len();
        loop {
            if pos == 0 {
                self.done = true;
                break;
            }
            pos -= 1;
            self.indices[pos] += 1;
            if self.indices[pos] < self.sets[pos].len() {
                break;
            }
            self.indices[pos] = 0;
        }

        Some(item)
    }
}

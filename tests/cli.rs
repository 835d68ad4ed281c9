use std::path::Path;
use std::process::{Command, Output};

const HISTORY: &str = "\
§§§d4§§§2021-01-03§§§Bob§§§Bob§§§2021-01-03§§§merge feature§§§b2 c3
1\t1\tsrc/lib.rs

§§§c3§§§2021-01-02§§§Ann§§§Ann§§§2021-01-02§§§feature§§§a1
5\t0\tsrc/feature.rs
2\t0\tsrc/lib.rs

§§§b2§§§2021-01-02§§§Bob§§§Bob§§§2021-01-02§§§fix readme§§§a1
0\t3\tREADME.md

§§§a1§§§2021-01-01§§§Ann§§§Ann§§§2021-01-01§§§init
10\t0\tsrc/lib.rs
4\t0\tREADME.md
";

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_churnscope"))
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap()
}

fn run_json(dir: &Path, args: &[&str]) -> serde_json::Value {
    let output = run(dir, args);
    assert!(
        output.status.success(),
        "churnscope {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("history.log"), HISTORY).unwrap();
    dir
}

#[test]
fn churn_json_ranks_files() {
    let dir = workspace();
    let files = run_json(
        dir.path(),
        &["churn", "--log", "history.log", "--format", "json"],
    );

    let files = files.as_array().unwrap();
    assert_eq!(files.len(), 3);
    assert_eq!(files[0]["path"], "src/lib.rs");
    assert_eq!(files[0]["commits"], 3);
    assert_eq!(files[0]["linesAddDel"], 14);
    assert_eq!(files[1]["path"], "README.md");
}

#[test]
fn churn_since_keeps_files_but_drops_old_churn() {
    let dir = workspace();
    let files = run_json(
        dir.path(),
        &[
            "churn",
            "--log",
            "history.log",
            "--since",
            "2021-01-02",
            "--format",
            "json",
        ],
    );

    let files = files.as_array().unwrap();
    assert_eq!(files.len(), 3);
    assert_eq!(files[0]["path"], "src/lib.rs");
    assert_eq!(files[0]["linesAddDel"], 2);
    assert!(files[1..].iter().all(|f| f["commits"] == 0));
}

#[test]
fn churn_merges_size_report() {
    let dir = workspace();
    std::fs::write(
        dir.path().join("cloc.csv"),
        "language,filename,blank,comment,code,\"github.com/AlDanial/cloc\"\n\
         Rust,./src/lib.rs,3,4,120\n\
         Markdown,README.md,1,0,9\n\
         SUM,,4,4,129\n",
    )
    .unwrap();

    let files = run_json(
        dir.path(),
        &[
            "churn",
            "--log",
            "history.log",
            "--cloc",
            "cloc.csv",
            "--format",
            "json",
        ],
    );
    assert_eq!(files[0]["cloc"], 120);
    assert_eq!(files[1]["cloc"], 9);
    assert_eq!(files[2]["cloc"], 0);
}

#[test]
fn branches_json_tracks_tips_per_day() {
    let dir = workspace();
    let days = run_json(
        dir.path(),
        &["branches", "--log", "history.log", "--format", "json"],
    );

    assert_eq!(days["2021-01-01"]["deltaBranchTips"], 1);
    assert_eq!(days["2021-01-02"]["numberOfCommits"], 2);
    assert_eq!(days["2021-01-02"]["deltaBranchTips"], 1);
    assert_eq!(days["2021-01-03"]["numberOfMerges"], 1);
    assert_eq!(days["2021-01-03"]["deltaBranchTips"], -1);
    assert_eq!(days["2021-01-03"]["branchTips"][0], "d4");
}

#[test]
fn coupling_json_lists_pairs() {
    let dir = workspace();
    let report = run_json(
        dir.path(),
        &[
            "coupling",
            "--log",
            "history.log",
            "--window-days",
            "7",
            "--format",
            "json",
        ],
    );

    assert_eq!(report["windowsWithCommits"], 1);
    let tuples = report["tuples"].as_array().unwrap();
    let pair = tuples
        .iter()
        .find(|t| t["key"] == "src/feature.rs|src/lib.rs")
        .unwrap();
    assert_eq!(pair["occurrencesInWindow"], 1);
    assert_eq!(pair["totalCommits"], 4);
    assert!(tuples.iter().all(|t| t["members"].as_array().unwrap().len() == 2));
    assert!(!tuples.iter().any(|t| t["key"] == "src/lib.rs|src/lib.rs"));
}

#[test]
fn config_file_changes_log_format() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(".churnscope.toml"),
        "[log]\nsentinel = \"##\"\nseparator = \"|\"\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("custom.log"),
        "##e5|2021-02-01|Cy|Cy|2021-02-01|custom\n1\t0\ta.rs\n",
    )
    .unwrap();

    let commits = run_json(
        dir.path(),
        &["commits", "--log", "custom.log", "--format", "json"],
    );
    assert_eq!(commits[0]["hashShort"], "e5");
    assert_eq!(commits[0]["files"][0]["path"], "a.rs");
}

#[test]
fn malformed_log_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("bad.log"), "§§§x§§§only\n").unwrap();

    let output = run(dir.path(), &["commits", "--log", "bad.log"]);
    assert!(!output.status.success());
    assert!(!output.stderr.is_empty());
}

#[test]
fn missing_log_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(dir.path(), &["churn", "--log", "nope.log"]);
    assert!(!output.status.success());
}

use std::fs::File;
use std::io::{BufRead, BufReader, IsTerminal};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use miette::{Context, IntoDiagnostic, Result};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use churnscope_core::{ChurnscopeConfig, Commit, OutputFormat, Period};
use churnscope_ingest::reader::CommitReader;
use churnscope_ingest::size_report::SizeReport;
use churnscope_stats::branch_tips::{annotate_branch_tips, day_summaries};
use churnscope_stats::churn::{folder_churn, ChurnAggregator, ChurnSort};
use churnscope_stats::contributors::{
    author_churn, period_summaries, top_contributors, PeriodSummary, TopContributors,
};
use churnscope_stats::coupling::{couple_files, CouplingOptions, CouplingTuple};

#[derive(Parser)]
#[command(
    name = "churnscope",
    version,
    about = "Churn, coupling, and branch statistics from exported git history",
    long_about = "Churnscope reads a delimited `git log --numstat` export (and optionally a\n\
                   `cloc --by-file --csv` report) and aggregates it into per-file churn,\n\
                   temporal coupling, branch-tip activity, and contributor summaries.\n\n\
                   Export a log with:\n  \
                     git log --numstat --date=short \\\n    \
                       --pretty=format:'§§§%h§§§%ad§§§%aN§§§%cN§§§%cd§§§%s§§§%p' > history.log\n\n\
                   Examples:\n  \
                     churnscope churn --log history.log --cloc cloc.csv\n  \
                     churnscope coupling --log api.log --log client.log --window-days 7\n  \
                     churnscope branches --log history.log --format json\n  \
                     churnscope authors --log history.log --period day"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .churnscope.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text  Human-readable tables and summaries (default)\n  \
                         json  Machine-readable JSON with camelCase keys"
    )]
    format: OutputFormat,

    /// Enable debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct LogInput {
    /// History log export (`-` reads stdin)
    #[arg(long)]
    log: PathBuf,

    /// Per-file size report from `cloc --by-file --csv`
    #[arg(long)]
    cloc: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the parsed commit stream
    Commits {
        #[command(flatten)]
        input: LogInput,

        /// Maximum commits to show
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Rank files by churn
    #[command(long_about = "Rank files by churn.\n\n\
        Every file seen in the log is listed. With --since, only commits strictly\n\
        after that date add to the churn counters.\n\n\
        Examples:\n  churnscope churn --log history.log\n  churnscope churn --log history.log --since 2021-01-01 --sort commits")]
    Churn {
        #[command(flatten)]
        input: LogInput,

        /// Count churn only from commits after this date (overrides churn.cutoff)
        #[arg(long)]
        since: Option<String>,

        /// Ordering of the list
        #[arg(long, default_value = "lines-add-del")]
        sort: SortKey,

        /// Maximum results to show (default: 20)
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Roll file churn up to folders
    Folders {
        #[command(flatten)]
        input: LogInput,

        /// Count churn only from commits after this date (overrides churn.cutoff)
        #[arg(long)]
        since: Option<String>,

        /// Path segments per folder (overrides churn.folder_depth)
        #[arg(long)]
        depth: Option<usize>,

        /// Maximum results to show (default: 20)
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Find files that change inside the same time window
    #[command(long_about = "Find files that change inside the same time window.\n\n\
        Pass --log once to couple files of one repository with each other, or once\n\
        per repository to couple files across repositories.\n\n\
        Examples:\n  churnscope coupling --log h.log\n  churnscope coupling --log api.log --log web.log --window-days 7")]
    Coupling {
        /// History log export, one per repository
        #[arg(long, required = true)]
        log: Vec<PathBuf>,

        /// Window length in days (overrides coupling.window_days)
        #[arg(long)]
        window_days: Option<u32>,

        /// Minimum windows a tuple must occur in (default: 1)
        #[arg(long, default_value = "1")]
        min_occurrences: u32,

        /// Maximum results to show (default: 20)
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Summarize merges and branch tips per day
    Branches {
        #[command(flatten)]
        input: LogInput,
    },
    /// Rank contributors overall and per day or week
    Authors {
        #[command(flatten)]
        input: LogInput,

        /// Authors named before the rest fold into "others" (overrides contributors.top)
        #[arg(long)]
        top: Option<usize>,

        /// Bucket size (overrides contributors.period)
        #[arg(long)]
        period: Option<Period>,
    },
    /// Create a default .churnscope.toml configuration file
    #[command(
        long_about = "Create a default .churnscope.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .churnscope.toml already exists."
    )]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SortKey {
    /// Lines added plus deleted
    LinesAddDel,
    /// Number of commits
    Commits,
    /// Lines added
    LinesAdded,
    /// Lines deleted
    LinesDeleted,
    /// Most recently changed first
    LastCommit,
    /// File path
    Path,
}

impl From<SortKey> for ChurnSort {
    fn from(key: SortKey) -> Self {
        match key {
            SortKey::LinesAddDel => ChurnSort::LinesAddDel,
            SortKey::Commits => ChurnSort::Commits,
            SortKey::LinesAdded => ChurnSort::LinesAdded,
            SortKey::LinesDeleted => ChurnSort::LinesDeleted,
            SortKey::LastCommit => ChurnSort::LastCommit,
            SortKey::Path => ChurnSort::Path,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CouplingOutput<'a> {
    start: Option<NaiveDate>,
    window_days: u32,
    windows_with_commits: u32,
    tuples_generated: usize,
    tuples: Vec<RankedTuple<'a>>,
}

#[derive(Serialize)]
struct RankedTuple<'a> {
    key: &'a str,
    #[serde(flatten)]
    tuple: &'a CouplingTuple,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthorsOutput {
    contributors: TopContributors,
    periods: Vec<PeriodSummary>,
}

const DEFAULT_CONFIG: &str = r#"# Churnscope Configuration

[log]
# Prefix of every commit header line, and the field separator inside it.
# sentinel = "§§§"
# separator = "§§§"

[churn]
# Only count churn from commits strictly after this date.
# cutoff = "2021-01-01"
# folder_depth = 1

[coupling]
# window_days = 1
# tuple_warning_threshold = 1000000

[contributors]
# top = 10
# period = "week"
"#;

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!("churnscope v{version}\n");

    println!("Quick start:");
    println!("  churnscope init                      Create a .churnscope.toml config file");
    println!("  churnscope churn --log history.log   Rank files by churn\n");

    println!("All commands:");
    println!("  commits   Print the parsed commit stream");
    println!("  churn     Per-file churn, optionally after a cutoff date");
    println!("  folders   Churn rolled up to folders");
    println!("  coupling  Files changing in the same time window");
    println!("  branches  Merges and branch tips per day");
    println!("  authors   Contributors overall and per day or week");
    println!("  init      Create default configuration\n");

    println!("Run 'churnscope <command> --help' for details.");
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ChurnscopeConfig> {
    let path = match path {
        Some(path) => path,
        None => {
            let default_path = Path::new(".churnscope.toml");
            if !default_path.exists() {
                return Ok(ChurnscopeConfig::default());
            }
            default_path
        }
    };
    ChurnscopeConfig::from_file(path)
        .into_diagnostic()
        .wrap_err(format!("loading {}", path.display()))
}

fn open_lines(path: &Path) -> Result<Box<dyn BufRead>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufReader::new(std::io::stdin().lock())));
    }
    let file = File::open(path)
        .into_diagnostic()
        .wrap_err(format!("opening {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

fn load_sizes(path: Option<&Path>) -> Result<Option<SizeReport>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let report = SizeReport::from_reader(open_lines(path)?)
        .into_diagnostic()
        .wrap_err(format!("reading size report {}", path.display()))?;
    tracing::debug!(files = report.len(), "loaded size report");
    Ok(Some(report))
}

fn spinner(message: String) -> Option<indicatif::ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = indicatif::ProgressBar::new_spinner();
    if let Ok(style) = indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
    {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    Some(pb)
}

fn read_commits(
    path: &Path,
    config: &ChurnscopeConfig,
    sizes: Option<&SizeReport>,
) -> Result<Vec<Commit>> {
    let progress = spinner(format!("Reading {}...", path.display()));
    let reader = CommitReader::new(open_lines(path)?.lines(), &config.log, sizes);

    let mut commits = Vec::new();
    for result in reader {
        let commit = result
            .into_diagnostic()
            .wrap_err(format!("parsing {}", path.display()))?;
        commits.push(commit);
        if let Some(pb) = &progress {
            if commits.len() % 1000 == 0 {
                pb.set_message(format!("Read {} commits", commits.len()));
            }
        }
    }

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    tracing::debug!(commits = commits.len(), log = %path.display(), "read history log");
    Ok(commits)
}

fn read_input(input: &LogInput, config: &ChurnscopeConfig) -> Result<Vec<Commit>> {
    let sizes = load_sizes(input.cloc.as_deref())?;
    read_commits(&input.log, config, sizes.as_ref())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}

fn apply_cutoff(config: &mut ChurnscopeConfig, since: Option<String>) -> Result<()> {
    if since.is_some() {
        config.churn.cutoff = since;
    }
    config.validate().into_diagnostic()
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = load_config(cli.config.as_deref())?;
    tracing::debug!(format = %cli.format, "configuration loaded");

    match cli.command {
        None => {
            print_welcome();
        }
        Some(Command::Commits { input, limit }) => {
            let commits = read_input(&input, &config)?;
            let shown = &commits[..limit.unwrap_or(commits.len()).min(commits.len())];

            match cli.format {
                OutputFormat::Json => print_json(&shown)?,
                OutputFormat::Text => {
                    for c in shown {
                        let kind = if c.is_merge() { "M" } else { " " };
                        println!(
                            "{kind} {:<10} {}  {:<20} +{:<6} -{:<6} {}",
                            c.hash_short,
                            c.committer_date.format("%Y-%m-%d"),
                            c.author_name,
                            c.lines_added(),
                            c.lines_deleted(),
                            c.subject,
                        );
                    }
                    eprintln!("{} of {} commits shown", shown.len(), commits.len());
                }
            }
        }
        Some(Command::Churn {
            input,
            since,
            sort,
            limit,
        }) => {
            apply_cutoff(&mut config, since)?;
            let cutoff = config.churn.cutoff_date().into_diagnostic()?;
            let commits = read_input(&input, &config)?;

            let mut aggregator = ChurnAggregator::new(cutoff);
            aggregator.observe_commits(&commits);
            let files = aggregator.into_sorted(sort.into());
            let shown = &files[..limit.min(files.len())];

            match cli.format {
                OutputFormat::Json => print_json(&shown)?,
                OutputFormat::Text => {
                    println!("File churn (top {limit} of {}):", files.len());
                    println!("{:-<96}", "");
                    for (i, f) in shown.iter().enumerate() {
                        println!(
                            "{:>3}. {:<44} commits={:<5} +{:<7} -{:<7} cloc={:<6} last={}",
                            i + 1,
                            f.path,
                            f.commits,
                            f.lines_added,
                            f.lines_deleted,
                            f.cloc,
                            f.last_commit.format("%Y-%m-%d"),
                        );
                    }
                }
            }
        }
        Some(Command::Folders {
            input,
            since,
            depth,
            limit,
        }) => {
            apply_cutoff(&mut config, since)?;
            let cutoff = config.churn.cutoff_date().into_diagnostic()?;
            let depth = depth.unwrap_or(config.churn.folder_depth);
            let commits = read_input(&input, &config)?;

            let mut aggregator = ChurnAggregator::new(cutoff);
            aggregator.observe_commits(&commits);
            let files = aggregator.into_map();
            let folders = folder_churn(files.values(), depth);
            let shown = &folders[..limit.min(folders.len())];

            match cli.format {
                OutputFormat::Json => print_json(&shown)?,
                OutputFormat::Text => {
                    println!(
                        "Folder churn at depth {depth} (top {limit} of {}):",
                        folders.len()
                    );
                    println!("{:-<88}", "");
                    for (i, f) in shown.iter().enumerate() {
                        println!(
                            "{:>3}. {:<36} files={:<5} commits={:<5} +{:<7} -{:<7} cloc={}",
                            i + 1,
                            f.folder,
                            f.files,
                            f.commits,
                            f.lines_added,
                            f.lines_deleted,
                            f.cloc,
                        );
                    }
                }
            }
        }
        Some(Command::Coupling {
            log,
            window_days,
            min_occurrences,
            limit,
        }) => {
            if let Some(days) = window_days {
                config.coupling.window_days = days;
            }
            config.validate().into_diagnostic()?;

            let streams = log
                .iter()
                .map(|path| read_commits(path, &config, None))
                .collect::<Result<Vec<_>>>()?;
            let slices: Vec<&[Commit]> = streams.iter().map(Vec::as_slice).collect();
            let report = couple_files(&slices, &CouplingOptions::from(&config.coupling));
            let ranked = report.ranked(min_occurrences);

            match cli.format {
                OutputFormat::Json => print_json(&CouplingOutput {
                    start: report.start,
                    window_days: report.window_days,
                    windows_with_commits: report.windows_with_commits,
                    tuples_generated: report.tuples_generated,
                    tuples: ranked
                        .iter()
                        .take(limit)
                        .map(|&(key, tuple)| RankedTuple { key, tuple })
                        .collect(),
                })?,
                OutputFormat::Text => {
                    println!(
                        "Coupling over {} windows of {} day(s), {} tuples generated:",
                        report.windows_with_commits, report.window_days, report.tuples_generated,
                    );
                    println!("{:-<72}", "");
                    if ranked.is_empty() {
                        println!("No coupled files found.");
                    }
                    for (i, (key, tuple)) in ranked.iter().take(limit).enumerate() {
                        let ratios: Vec<String> = tuple
                            .members
                            .iter()
                            .map(|m| format!("{:.2}", m.ratio))
                            .collect();
                        println!(
                            "{:>3}. {key}  windows={}  commits={}  ratio={}",
                            i + 1,
                            tuple.occurrences_in_window,
                            tuple.total_commits,
                            ratios.join("/"),
                        );
                    }
                }
            }
        }
        Some(Command::Branches { input }) => {
            let commits = read_input(&input, &config)?;
            let days = day_summaries(&annotate_branch_tips(commits));

            match cli.format {
                OutputFormat::Json => print_json(&days)?,
                OutputFormat::Text => {
                    println!(
                        "{:<10}  {:>7}  {:>6}  {:>5}  {:>5}  {:>9}  {:>9}",
                        "day", "commits", "merges", "tips", "delta", "+lines", "-lines"
                    );
                    println!("{:-<68}", "");
                    for d in days.values() {
                        println!(
                            "{:<10}  {:>7}  {:>6}  {:>5}  {:>+5}  {:>9}  {:>9}",
                            d.day.to_string(),
                            d.number_of_commits,
                            d.number_of_merges,
                            d.branch_tips.len(),
                            d.delta_branch_tips,
                            d.lines_added,
                            d.lines_deleted,
                        );
                    }
                }
            }
        }
        Some(Command::Authors { input, top, period }) => {
            let top = top.unwrap_or(config.contributors.top);
            let period = period.unwrap_or(config.contributors.period);
            let commits = read_input(&input, &config)?;

            let output = AuthorsOutput {
                contributors: top_contributors(author_churn(&commits), top),
                periods: period_summaries(&commits, period, top),
            };

            match cli.format {
                OutputFormat::Json => print_json(&output)?,
                OutputFormat::Text => {
                    println!("Top contributors:");
                    println!("{:-<72}", "");
                    let others = output.contributors.others.iter();
                    for (i, a) in output.contributors.top.iter().chain(others).enumerate() {
                        println!(
                            "{:>3}. {:<28} commits={:<5} +{:<7} -{:<7}",
                            i + 1,
                            a.author,
                            a.commits,
                            a.lines_added,
                            a.lines_deleted,
                        );
                    }

                    println!("\nPer {period}:");
                    println!("{:-<72}", "");
                    for p in &output.periods {
                        let names: Vec<&str> = p
                            .top_contributors
                            .top
                            .iter()
                            .map(|a| a.author.as_str())
                            .collect();
                        println!(
                            "{}  commits={:<5} authors={:<3} +{:<7} -{:<7} {}",
                            p.start,
                            p.number_of_commits,
                            p.number_of_authors,
                            p.lines_added,
                            p.lines_deleted,
                            names.join(", "),
                        );
                    }
                }
            }
        }
        Some(Command::Init) => {
            let path = Path::new(".churnscope.toml");
            if path.exists() {
                miette::bail!(miette::miette!(
                    help = "Edit the existing file or remove it first",
                    ".churnscope.toml already exists"
                ));
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created .churnscope.toml with default configuration");
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "churnscope", &mut std::io::stdout());
        }
    }

    Ok(())
}

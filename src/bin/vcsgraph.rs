use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{DateTime, FixedOffset};
use clap::{Parser, Subcommand};
use serde::Serialize;
use vcsgraph::{
    BlameOptions, BranchesOptions, CommitId, CommitsOptions, CommittersOptions, DiffOptions,
    OpenOptions, Repository, SearchOptions, Signature,
};

type CliResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "vcsgraph", version, about = "Query git history: log, ancestry, merge-bases and diffs")]
struct Cli {
    /// Repository directory (work tree or bare git dir).
    #[arg(long, global = true, env = "VCSGRAPH_REPO", default_value = ".")]
    repo: PathBuf,

    /// Never run the `git` executable.
    #[arg(long, global = true)]
    no_fallback: bool,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a revision to a full commit id.
    Resolve { rev: String },
    /// Show history reachable from a revision.
    Log {
        #[arg(default_value = "HEAD")]
        rev: String,
        /// Stop at this revision (excluded).
        #[arg(long)]
        base: Option<String>,
        #[arg(short = 'n', long, default_value_t = 0)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        skip: usize,
        /// Do not count the total.
        #[arg(long)]
        no_total: bool,
    },
    /// List local branches.
    Branches {
        /// Include each branch's head commit.
        #[arg(long)]
        commit: bool,
        /// Show behind/ahead counts relative to this branch.
        #[arg(long)]
        behind_ahead: Option<String>,
        /// Only branches containing this revision.
        #[arg(long)]
        contains: Option<String>,
        /// Only branches merged into this revision.
        #[arg(long)]
        merged: Option<String>,
    },
    /// List tags.
    Tags,
    /// Find the merge-base of two revisions.
    MergeBase {
        a: String,
        b: String,
        /// Print every lowest common ancestor.
        #[arg(long)]
        all: bool,
        /// Resolve `b` in this other repository.
        #[arg(long)]
        other: Option<PathBuf>,
    },
    /// Count commits unique to each of two revisions.
    BehindAhead { a: String, b: String },
    /// Exit 0 if the first revision is an ancestor of the second.
    IsAncestor { candidate: String, descendant: String },
    /// Unified diff between two revisions.
    Diff {
        base: String,
        head: String,
        /// Lines of context.
        #[arg(short = 'U', long, default_value_t = 3)]
        context: usize,
        /// Restrict to these paths.
        #[arg(last = true)]
        paths: Vec<String>,
    },
    /// Show what revision last modified each line of a file.
    Blame {
        path: String,
        #[arg(long)]
        rev: Option<String>,
        /// Line range `start,end` (1-based, inclusive).
        #[arg(short = 'L', value_parser = parse_range)]
        lines: Option<(u32, u32)>,
    },
    /// Search file contents for a fixed string.
    Search {
        query: String,
        #[arg(long, default_value = "HEAD")]
        rev: String,
        #[arg(short = 'C', long, default_value_t = 0)]
        context: u32,
        #[arg(long, default_value_t = 0)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Commit counts per author.
    Committers {
        rev: Option<String>,
        #[arg(long, default_value_t = 0)]
        limit: usize,
    },
}

fn parse_range(s: &str) -> Result<(u32, u32), String> {
    let (start, end) = s
        .split_once(',')
        .ok_or_else(|| format!("expected start,end: {:?}", s))?;
    let start = start.trim().parse().map_err(|e| format!("{}: {}", start, e))?;
    let end = end.trim().parse().map_err(|e| format!("{}: {}", end, e))?;
    Ok((start, end))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("vcsgraph: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<ExitCode> {
    let options = OpenOptions {
        no_fallback: cli.no_fallback,
        ..Default::default()
    };
    let repo = Repository::open(&cli.repo, options.clone())?;
    let json = cli.json;

    match cli.command {
        Command::Resolve { rev } => {
            let id = repo.resolve_revision(&rev)?;
            emit(json, &id, |id| println!("{}", id))?;
        }
        Command::Log {
            rev,
            base,
            limit,
            skip,
            no_total,
        } => {
            let head = repo.resolve_revision(&rev)?;
            let base = base.map(|b| repo.resolve_revision(&b)).transpose()?;
            let opts = CommitsOptions {
                base,
                limit,
                skip,
                no_total,
                ..CommitsOptions::new(head)
            };
            let (commits, total) = repo.commits(&opts)?;
            if json {
                print_json(&serde_json::json!({ "commits": commits, "total": total }))?;
            } else {
                for commit in &commits {
                    println!(
                        "{} {} {} {}",
                        commit.id.short(10),
                        format_date(&commit.author),
                        commit.author.name,
                        commit.summary()
                    );
                }
                if !no_total {
                    println!("({} of {} commits)", commits.len(), total);
                }
            }
        }
        Command::Branches {
            commit,
            behind_ahead,
            contains,
            merged,
        } => {
            let opts = BranchesOptions {
                include_commit: commit,
                behind_ahead_branch: behind_ahead,
                contains_commit: contains.map(|r| repo.resolve_revision(&r)).transpose()?,
                merged_into: merged.map(|r| repo.resolve_revision(&r)).transpose()?,
            };
            let branches = repo.branches(&opts)?;
            emit(json, &branches, |branches| {
                for b in branches {
                    let mut line = format!("{} {}", b.head.short(10), b.name);
                    if let Some(counts) = &b.counts {
                        line.push_str(&format!(" -{} +{}", counts.behind, counts.ahead));
                    }
                    if let Some(c) = &b.commit {
                        line.push_str(&format!(" {}", c.summary()));
                    }
                    println!("{}", line);
                }
            })?;
        }
        Command::Tags => {
            let tags = repo.tags()?;
            emit(json, &tags, |tags| {
                for t in tags {
                    println!("{} {}", t.commit_id.short(10), t.name);
                }
            })?;
        }
        Command::MergeBase { a, b, all, other } => {
            let a = repo.resolve_revision(&a)?;
            let bases = match other {
                Some(dir) => {
                    let other = Repository::open(dir, options)?;
                    let b = other.resolve_revision(&b)?;
                    vec![repo.cross_repo_merge_base(&a, &other, &b)?]
                }
                None => {
                    let b = repo.resolve_revision(&b)?;
                    if all {
                        repo.merge_bases(&a, &b)?
                    } else {
                        vec![repo.merge_base(&a, &b)?]
                    }
                }
            };
            emit(json, &bases, |bases| {
                for id in bases {
                    println!("{}", id);
                }
            })?;
        }
        Command::BehindAhead { a, b } => {
            let a = repo.resolve_revision(&a)?;
            let b = repo.resolve_revision(&b)?;
            let counts = repo.behind_ahead(&a, &b)?;
            emit(json, &counts, |c| println!("{}\t{}", c.behind, c.ahead))?;
        }
        Command::IsAncestor {
            candidate,
            descendant,
        } => {
            let candidate = repo.resolve_revision(&candidate)?;
            let descendant = repo.resolve_revision(&descendant)?;
            let yes = repo.is_ancestor(&candidate, &descendant)?;
            emit(json, &yes, |yes| println!("{}", yes))?;
            if !yes {
                return Ok(ExitCode::from(1));
            }
        }
        Command::Diff {
            base,
            head,
            context,
            paths,
        } => {
            let base = repo.resolve_revision(&base)?;
            let head = repo.resolve_revision(&head)?;
            let opts = DiffOptions {
                context,
                paths,
                ..Default::default()
            };
            let diff = repo.diff(&base, &head, &opts)?;
            if json {
                print_json(&serde_json::json!({
                    "base": diff.base,
                    "head": diff.head,
                    "raw": diff.text(),
                }))?;
            } else {
                std::io::stdout().write_all(&diff.raw)?;
            }
        }
        Command::Blame { path, rev, lines } => {
            let newest_commit = rev.map(|r| repo.resolve_revision(&r)).transpose()?;
            let opts = BlameOptions {
                newest_commit,
                start_line: lines.map(|(s, _)| s),
                end_line: lines.map(|(_, e)| e),
            };
            let hunks = repo.blame_file(&path, &opts)?;
            emit(json, &hunks, |hunks| {
                for h in hunks {
                    println!(
                        "{} {}-{} {} {}",
                        h.commit_id.short(10),
                        h.start_line,
                        h.end_line.saturating_sub(1),
                        format_date(&h.author),
                        h.author.name
                    );
                }
            })?;
        }
        Command::Search {
            query,
            rev,
            context,
            limit,
            offset,
        } => {
            let at: CommitId = repo.resolve_revision(&rev)?;
            let opts = SearchOptions {
                query,
                context_lines: context,
                limit,
                offset,
            };
            let results = repo.search(&at, &opts)?;
            emit(json, &results, |results| {
                for r in results {
                    if r.start_line == r.end_line {
                        println!("{}:{}:{}", r.file, r.start_line, r.matched);
                    } else {
                        println!("{}:{}-{}:", r.file, r.start_line, r.end_line);
                        println!("{}", r.context);
                    }
                }
            })?;
        }
        Command::Committers { rev, limit } => {
            let committers = repo.committers(&CommittersOptions { rev, limit })?;
            emit(json, &committers, |committers| {
                for c in committers {
                    println!("{:>6}\t{} <{}>", c.commits, c.name, c.email);
                }
            })?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Print `value` as JSON or through `text`.
fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce(&T)) -> CliResult<()> {
    if json {
        print_json(value)
    } else {
        text(value);
        Ok(())
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn format_date(sig: &Signature) -> String {
    let Some(utc) = DateTime::from_timestamp(sig.time, 0) else {
        return sig.time.to_string();
    };
    match FixedOffset::east_opt(sig.offset_minutes * 60) {
        Some(tz) => utc.with_timezone(&tz).format("%Y-%m-%d %H:%M %z").to_string(),
        None => utc.format("%Y-%m-%d %H:%M +0000").to_string(),
    }
}

//! Delegation to the `git` command-line toolchain.
//!
//! Operations the native engine does not cover (or covers only partially,
//! like revision syntax beyond plain ref names) are answered by running
//! `git` against the repository's git directory and parsing its porcelain
//! output. Nothing here writes to the repository except
//! [`Toolchain::fetch_all`].

use std::collections::{BTreeMap, HashMap};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::error::{Error, Result};
use crate::types::{
    BlameOptions, CloneOptions, CommitId, Committer, CommittersOptions, Diff, DiffOptions, Hunk,
    RefChange, SearchOptions, SearchResult, Signature, UpdateResult,
};

/// An external toolchain that can answer repository queries.
///
/// Cross-repository operations take the other repository's git directory;
/// implementations must not write to either repository to answer them.
pub trait Toolchain: Send + Sync {
    /// Resolve any revision expression the toolchain understands.
    fn resolve_revision(&self, spec: &str) -> Result<CommitId>;

    fn diff(&self, base: &CommitId, head: &CommitId, opts: &DiffOptions) -> Result<Diff>;

    /// Diff `base` in this repository against `head` in the repository at
    /// `head_dir`.
    fn cross_repo_diff(
        &self,
        base: &CommitId,
        head_dir: &Path,
        head: &CommitId,
        opts: &DiffOptions,
    ) -> Result<Diff>;

    fn blame_file(&self, path: &str, opts: &BlameOptions) -> Result<Vec<Hunk>>;

    fn search(&self, at: &CommitId, opts: &SearchOptions) -> Result<Vec<SearchResult>>;

    fn merge_base(&self, a: &CommitId, b: &CommitId) -> Result<CommitId>;

    fn cross_repo_merge_base(&self, a: &CommitId, other_dir: &Path, b: &CommitId) -> Result<CommitId>;

    fn committers(&self, opts: &CommittersOptions) -> Result<Vec<Committer>>;

    /// Fetch every remote and report which refs moved.
    fn fetch_all(&self) -> Result<UpdateResult>;

    fn describe(&self) -> String;
}

// ---------------------------------------------------------------------------
// GitCommand
// ---------------------------------------------------------------------------

/// [`Toolchain`] backed by a `git` executable.
///
/// Every invocation runs `git --git-dir=<dir> ...`; no retries, no timeout.
#[derive(Debug, Clone)]
pub struct GitCommand {
    dir: PathBuf,
    binary: PathBuf,
}

impl GitCommand {
    /// Toolchain for the git directory `dir`, using `git` from `PATH`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            binary: PathBuf::from("git"),
        }
    }

    /// Use a specific `git` executable.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Clone `url` into `dir`.
    ///
    /// # Errors
    /// [`Error::UpstreamFailure`] if `git clone` exits non-zero.
    pub fn clone_into(binary: &Path, url: &str, dir: &Path, opts: &CloneOptions) -> Result<()> {
        let mut cmd = Command::new(binary);
        cmd.arg("clone");
        if opts.mirror {
            cmd.arg("--mirror");
        } else if opts.bare {
            cmd.arg("--bare");
        }
        cmd.arg("--").arg(url).arg(dir);
        let cmdline = format!("git clone {} {}", url, dir.display());
        log::debug!("running {}", cmdline);
        let output = cmd.output().map_err(|e| Error::io(binary, e))?;
        check_status(&cmdline, output).map(|_| ())
    }

    fn command(&self, alternate: Option<&Path>) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(format!("--git-dir={}", self.dir.display()));
        if let Some(other) = alternate {
            cmd.env("GIT_ALTERNATE_OBJECT_DIRECTORIES", other.join("objects"));
        }
        cmd
    }

    /// Run `git <args>` and return its raw output regardless of exit status.
    fn output<I, S>(&self, args: I, alternate: Option<&Path>) -> Result<(String, Output)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = self.command(alternate);
        let mut cmdline = String::from("git");
        for arg in args {
            cmdline.push(' ');
            cmdline.push_str(&arg.as_ref().to_string_lossy());
            cmd.arg(arg);
        }
        log::debug!("running {} in {}", cmdline, self.dir.display());
        let output = cmd.output().map_err(|e| Error::io(&self.binary, e))?;
        Ok((cmdline, output))
    }

    /// Run `git <args>`; non-zero exit is an [`Error::UpstreamFailure`].
    fn run<I, S>(&self, args: I, alternate: Option<&Path>) -> Result<Vec<u8>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let (cmdline, output) = self.output(args, alternate)?;
        check_status(&cmdline, output)
    }

    fn run_diff(
        &self,
        base: &CommitId,
        head: &CommitId,
        opts: &DiffOptions,
        alternate: Option<&Path>,
    ) -> Result<Diff> {
        let mut args = vec![
            "diff".to_string(),
            "--full-index".into(),
            "--no-renames".into(),
            "--no-color".into(),
            "--no-ext-diff".into(),
            format!("--src-prefix={}", opts.a_prefix),
            format!("--dst-prefix={}", opts.b_prefix),
            format!("-U{}", opts.context),
            base.to_string(),
            head.to_string(),
            "--".into(),
        ];
        args.extend(opts.paths.iter().cloned());
        let raw = self.run(&args, alternate)?;
        Ok(Diff {
            base: base.clone(),
            head: head.clone(),
            raw,
        })
    }

    fn run_merge_base(&self, a: &CommitId, b: &CommitId, alternate: Option<&Path>) -> Result<CommitId> {
        let (cmdline, output) = self.output(["merge-base", a.as_str(), b.as_str()], alternate)?;
        if output.status.code() == Some(1) && output.stdout.iter().all(u8::is_ascii_whitespace) {
            return Err(Error::no_common_ancestor(a, b));
        }
        let stdout = check_status(&cmdline, output)?;
        CommitId::parse(String::from_utf8_lossy(&stdout).trim())
    }

    fn list_refs(&self) -> Result<BTreeMap<String, String>> {
        let out = self.run(["for-each-ref", "--format=%(objectname) %(refname)"], None)?;
        Ok(parse_ref_list(&String::from_utf8_lossy(&out)))
    }
}

impl Toolchain for GitCommand {
    fn resolve_revision(&self, spec: &str) -> Result<CommitId> {
        if spec.is_empty() || spec.starts_with('-') {
            return Err(Error::revision_not_found(spec));
        }
        let target = format!("{}^{{commit}}", spec);
        let (cmdline, output) =
            self.output(["rev-parse", "--verify", "--quiet", target.as_str()], None)?;
        if output.status.code() == Some(1) {
            return Err(Error::revision_not_found(spec));
        }
        let stdout = check_status(&cmdline, output)?;
        CommitId::parse(String::from_utf8_lossy(&stdout).trim())
    }

    fn diff(&self, base: &CommitId, head: &CommitId, opts: &DiffOptions) -> Result<Diff> {
        self.run_diff(base, head, opts, None)
    }

    fn cross_repo_diff(
        &self,
        base: &CommitId,
        head_dir: &Path,
        head: &CommitId,
        opts: &DiffOptions,
    ) -> Result<Diff> {
        self.run_diff(base, head, opts, Some(head_dir))
    }

    fn blame_file(&self, path: &str, opts: &BlameOptions) -> Result<Vec<Hunk>> {
        let mut args = vec!["blame".to_string(), "--porcelain".into()];
        if let (Some(start), Some(end)) = (opts.start_line, opts.end_line) {
            args.push("-L".into());
            args.push(format!("{},{}", start, end));
        }
        // Without a revision git would blame the working tree.
        match &opts.newest_commit {
            Some(id) => args.push(id.to_string()),
            None => args.push("HEAD".into()),
        }
        args.push("--".into());
        args.push(path.into());
        let out = self.run(&args, None)?;
        parse_blame_porcelain(&String::from_utf8_lossy(&out))
    }

    fn search(&self, at: &CommitId, opts: &SearchOptions) -> Result<Vec<SearchResult>> {
        if opts.query.is_empty() {
            return Ok(Vec::new());
        }
        let (cmdline, output) = self.output(
            [
                "grep",
                "--null",
                "-n",
                "-I",
                "-F",
                "--no-color",
                "-e",
                opts.query.as_str(),
                at.as_str(),
            ],
            None,
        )?;
        // Exit status 1 means "no match".
        if output.status.code() == Some(1) {
            return Ok(Vec::new());
        }
        let stdout = check_status(&cmdline, output)?;
        let matches = parse_grep_output(&String::from_utf8_lossy(&stdout), at.as_str());

        let take = if opts.limit == 0 { usize::MAX } else { opts.limit };
        let mut blobs: HashMap<String, String> = HashMap::new();
        let mut results = Vec::new();
        for m in matches.into_iter().skip(opts.offset).take(take) {
            if opts.context_lines == 0 {
                results.push(SearchResult {
                    file: m.file,
                    start_line: m.line,
                    end_line: m.line,
                    context: m.text.clone(),
                    matched: m.text,
                });
                continue;
            }
            if !blobs.contains_key(&m.file) {
                let spec = format!("{}:{}", at, m.file);
                let data = self.run(["cat-file", "blob", spec.as_str()], None)?;
                blobs.insert(m.file.clone(), String::from_utf8_lossy(&data).into_owned());
            }
            let content = blobs.get(&m.file).map(String::as_str).unwrap_or_default();
            let (start_line, end_line, context) = context_window(content, m.line, opts.context_lines);
            results.push(SearchResult {
                file: m.file,
                start_line,
                end_line,
                matched: m.text,
                context,
            });
        }
        Ok(results)
    }

    fn merge_base(&self, a: &CommitId, b: &CommitId) -> Result<CommitId> {
        self.run_merge_base(a, b, None)
    }

    fn cross_repo_merge_base(&self, a: &CommitId, other_dir: &Path, b: &CommitId) -> Result<CommitId> {
        self.run_merge_base(a, b, Some(other_dir))
    }

    fn committers(&self, opts: &CommittersOptions) -> Result<Vec<Committer>> {
        let mut args = vec!["shortlog".to_string(), "-sne".into()];
        if opts.limit > 0 {
            args.push(format!("--max-count={}", opts.limit));
        }
        args.push(opts.rev.clone().unwrap_or_else(|| "HEAD".into()));
        let out = self.run(&args, None)?;
        parse_shortlog(&String::from_utf8_lossy(&out))
    }

    fn fetch_all(&self) -> Result<UpdateResult> {
        let before = self.list_refs()?;
        self.run(["remote", "update", "--prune"], None)?;
        let after = self.list_refs()?;
        let changes = diff_refs(&before, &after);
        log::info!("fetched {}: {} ref(s) changed", self.dir.display(), changes.len());
        Ok(UpdateResult { changes })
    }

    fn describe(&self) -> String {
        format!("{} --git-dir={}", self.binary.display(), self.dir.display())
    }
}

fn check_status(cmdline: &str, output: Output) -> Result<Vec<u8>> {
    if output.status.success() {
        return Ok(output.stdout);
    }
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    log::debug!("{} failed: {}", cmdline, stderr);
    Err(Error::upstream(cmdline, output.status.to_string(), stderr))
}

// ---------------------------------------------------------------------------
// Porcelain parsers
// ---------------------------------------------------------------------------

/// One `git grep --null -n` match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GrepMatch {
    pub file: String,
    pub line: u32,
    pub text: String,
}

/// Parse `git grep --null -n ... <rev>` output (`<rev>:<file>\0<line>\0<text>`).
pub(crate) fn parse_grep_output(out: &str, rev: &str) -> Vec<GrepMatch> {
    let prefix = format!("{}:", rev);
    out.lines()
        .filter_map(|line| {
            let mut parts = line.splitn(3, '\0');
            let file = parts.next()?;
            let lineno = parts.next()?.parse().ok()?;
            let text = parts.next().unwrap_or_default();
            Some(GrepMatch {
                file: file.strip_prefix(&prefix).unwrap_or(file).to_string(),
                line: lineno,
                text: text.to_string(),
            })
        })
        .collect()
}

/// Lines `[line - radius, line + radius]` of `content`, clamped to the file.
pub(crate) fn context_window(content: &str, line: u32, radius: u32) -> (u32, u32, String) {
    let lines: Vec<&str> = content.lines().collect();
    let last = u32::try_from(lines.len()).unwrap_or(u32::MAX).max(1);
    let start = line.saturating_sub(radius).max(1);
    let end = line.saturating_add(radius).min(last).max(start);
    let text = lines
        .iter()
        .skip(start as usize - 1)
        .take((end - start + 1) as usize)
        .copied()
        .collect::<Vec<_>>()
        .join("\n");
    (start, end, text)
}

/// Parse `git blame --porcelain` into hunks of consecutive lines sharing a
/// commit.
pub(crate) fn parse_blame_porcelain(out: &str) -> Result<Vec<Hunk>> {
    let mut spans: Vec<(String, u32, u32)> = Vec::new();
    let mut authors: HashMap<String, Signature> = HashMap::new();
    let mut current: Option<String> = None;

    for line in out.lines() {
        if line.starts_with('\t') {
            continue;
        }
        let fields: Vec<&str> = line.split(' ').collect();
        if is_blame_header(&fields) {
            let sha = fields[0].to_string();
            current = Some(sha.clone());
            if fields.len() == 4 {
                let start: u32 = fields[2].parse().map_err(|_| bad_blame(line))?;
                let count: u32 = fields[3].parse().map_err(|_| bad_blame(line))?;
                match spans.last_mut() {
                    Some((prev, _, end)) if *prev == sha && *end == start => *end += count,
                    _ => spans.push((sha, start, start + count)),
                }
            }
            continue;
        }

        let Some(sha) = current.as_ref() else {
            continue;
        };
        let Some((key, value)) = line.split_once(' ') else {
            continue;
        };
        let sig = authors.entry(sha.clone()).or_insert_with(|| Signature {
            name: String::new(),
            email: String::new(),
            time: 0,
            offset_minutes: 0,
        });
        match key {
            "author" => sig.name = value.to_string(),
            "author-mail" => {
                sig.email = value.trim_start_matches('<').trim_end_matches('>').to_string()
            }
            "author-time" => sig.time = value.parse().map_err(|_| bad_blame(line))?,
            "author-tz" => sig.offset_minutes = parse_tz(value).ok_or_else(|| bad_blame(line))?,
            _ => {}
        }
    }

    spans
        .into_iter()
        .map(|(sha, start, end)| {
            let author = authors
                .get(&sha)
                .cloned()
                .ok_or_else(|| Error::git_msg(format!("blame output has no author for {}", sha)))?;
            Ok(Hunk {
                commit_id: CommitId::parse(&sha)?,
                start_line: start,
                end_line: end,
                author,
            })
        })
        .collect()
}

fn is_blame_header(fields: &[&str]) -> bool {
    (fields.len() == 3 || fields.len() == 4)
        && CommitId::is_full_hex(fields[0])
        && fields[1..].iter().all(|f| f.bytes().all(|b| b.is_ascii_digit()))
}

fn bad_blame(line: &str) -> Error {
    Error::git_msg(format!("unexpected blame output line: {:?}", line))
}

/// `+0130` -> 90, `-0800` -> -480.
fn parse_tz(tz: &str) -> Option<i32> {
    if tz.len() != 5 {
        return None;
    }
    let sign = match &tz[..1] {
        "+" => 1,
        "-" => -1,
        _ => return None,
    };
    let hours: i32 = tz[1..3].parse().ok()?;
    let minutes: i32 = tz[3..5].parse().ok()?;
    Some(sign * (hours * 60 + minutes))
}

/// Parse `git shortlog -sne` lines (`   12\tName <email>`).
pub(crate) fn parse_shortlog(out: &str) -> Result<Vec<Committer>> {
    let mut committers = Vec::new();
    for line in out.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (count, who) = line
            .split_once('\t')
            .ok_or_else(|| Error::git_msg(format!("unexpected shortlog line: {:?}", line)))?;
        let commits = count
            .trim()
            .parse()
            .map_err(|_| Error::git_msg(format!("bad shortlog count: {:?}", line)))?;
        let (name, email) = match who.rsplit_once(" <") {
            Some((name, email)) => (name, email.trim_end_matches('>')),
            None => (who, ""),
        };
        committers.push(Committer {
            name: name.to_string(),
            email: email.to_string(),
            commits,
        });
    }
    Ok(committers)
}

/// Parse `git for-each-ref --format='%(objectname) %(refname)'`.
pub(crate) fn parse_ref_list(out: &str) -> BTreeMap<String, String> {
    out.lines()
        .filter_map(|line| line.split_once(' '))
        .map(|(id, name)| (name.to_string(), id.to_string()))
        .collect()
}

/// Refs that were created, deleted or moved between two listings, by name.
pub(crate) fn diff_refs(before: &BTreeMap<String, String>, after: &BTreeMap<String, String>) -> Vec<RefChange> {
    let mut names: Vec<&String> = before.keys().chain(after.keys()).collect();
    names.sort();
    names.dedup();
    names
        .into_iter()
        .filter_map(|name| {
            let old = before.get(name);
            let new = after.get(name);
            if old == new {
                return None;
            }
            Some(RefChange {
                name: name.clone(),
                old_target: old.cloned(),
                new_target: new.cloned(),
            })
        })
        .collect()
}

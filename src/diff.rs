//! Unified-diff synthesis.
//!
//! Diffs are computed over byte lines with `similar` and rendered in the
//! format `git diff --full-index --no-renames` produces, so the output can
//! be fed to any patch tool. Lines end at `\n` only; content is never
//! re-encoded.

use std::collections::BTreeSet;
use std::io::Write as _;
use std::ops::Range;

use similar::{Algorithm, DiffTag};

use crate::error::{Error, Result};
use crate::store::ObjectStore;
use crate::tree::TreeSnapshot;
use crate::types::{CommitId, Diff, DiffOptions, TreeEntry, MODE_COMMIT};

/// Object-type bits of a git mode.
const MODE_TYPE_MASK: u32 = 0o170000;

/// One side of a file diff. A missing side (`None`) means the file was
/// created or deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    /// Content (blob) id as hex.
    pub id: String,
    pub path: String,
    pub mode: u32,
}

impl From<&TreeEntry> for DiffEntry {
    fn from(entry: &TreeEntry) -> Self {
        Self {
            id: entry.id.clone(),
            path: entry.path.clone(),
            mode: entry.mode,
        }
    }
}

/// Render the diff of one file between two states.
///
/// # Errors
/// [`Error::InvalidDiffInput`] if neither side carries a path; store
/// errors while reading either blob are propagated.
pub fn diff_entries(
    store: &dyn ObjectStore,
    a: Option<&DiffEntry>,
    b: Option<&DiffEntry>,
    opts: &DiffOptions,
) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_entry_diff(&mut out, store, a, b, opts)?;
    Ok(out)
}

/// Append the diff of one file to `out`.
///
/// A change of object type (regular file to symlink, say) is written as a
/// deletion followed by a creation, as git does. Switching between `100644`
/// and `100755` is a mode change.
pub fn write_entry_diff(
    out: &mut Vec<u8>,
    store: &dyn ObjectStore,
    a: Option<&DiffEntry>,
    b: Option<&DiffEntry>,
    opts: &DiffOptions,
) -> Result<()> {
    let (a_path, b_path) = header_paths(a, b, opts)?;
    if let (Some(x), Some(y)) = (a, b) {
        if x.mode & MODE_TYPE_MASK != y.mode & MODE_TYPE_MASK {
            write_entry_diff(out, store, Some(x), None, opts)?;
            return write_entry_diff(out, store, None, Some(y), opts);
        }
    }

    let old = match a {
        Some(entry) => store.read_blob(&entry.id)?,
        None => Vec::new(),
    };
    let new = match b {
        Some(entry) => store.read_blob(&entry.id)?,
        None => Vec::new(),
    };
    write_header(out, a, b, &a_path, &b_path);
    write_hunks(out, &old, &new, opts.context);
    Ok(())
}

/// Prefixed `a/` and `b/` paths for the header. A creation or deletion uses
/// the one path it has on both sides.
fn header_paths(
    a: Option<&DiffEntry>,
    b: Option<&DiffEntry>,
    opts: &DiffOptions,
) -> Result<(String, String)> {
    let a_name = a.map(|e| e.path.as_str()).filter(|p| !p.is_empty());
    let b_name = b.map(|e| e.path.as_str()).filter(|p| !p.is_empty());
    let (a_name, b_name) = match (a_name, b_name) {
        (None, None) => {
            return Err(Error::invalid_diff_input("no path for both versions"));
        }
        (Some(x), None) => (x, x),
        (None, Some(y)) => (y, y),
        (Some(x), Some(y)) => (x, y),
    };
    Ok((
        format!("{}{}", opts.a_prefix, a_name),
        format!("{}{}", opts.b_prefix, b_name),
    ))
}

// Writes into a Vec<u8> cannot fail, so write results are discarded below.

fn write_header(
    out: &mut Vec<u8>,
    a: Option<&DiffEntry>,
    b: Option<&DiffEntry>,
    a_path: &str,
    b_path: &str,
) {
    let zero = CommitId::zero();
    let _ = writeln!(out, "diff --git {} {}", a_path, b_path);
    match (a, b) {
        (None, Some(b)) => {
            let _ = writeln!(out, "new file mode {:o}", b.mode);
            let _ = writeln!(out, "index {}..{}", zero, b.id);
            let _ = writeln!(out, "--- /dev/null");
            let _ = writeln!(out, "+++ {}", b_path);
        }
        (Some(a), None) => {
            let _ = writeln!(out, "deleted file mode {:o}", a.mode);
            let _ = writeln!(out, "index {}..{}", a.id, zero);
            let _ = writeln!(out, "--- {}", a_path);
            let _ = writeln!(out, "+++ /dev/null");
        }
        (Some(a), Some(b)) if a.mode != b.mode => {
            let _ = writeln!(out, "old mode {:o}", a.mode);
            let _ = writeln!(out, "new mode {:o}", b.mode);
            if a.id != b.id {
                let _ = writeln!(out, "index {}..{}", a.id, b.id);
                let _ = writeln!(out, "--- {}", a_path);
                let _ = writeln!(out, "+++ {}", b_path);
            }
        }
        (Some(a), Some(b)) => {
            let _ = writeln!(out, "index {}..{} {:o}", a.id, b.id, b.mode);
            let _ = writeln!(out, "--- {}", a_path);
            let _ = writeln!(out, "+++ {}", b_path);
        }
        (None, None) => {}
    }
}

/// Append unified-diff hunks turning `old` into `new`. Identical inputs
/// produce nothing.
pub fn write_hunks(out: &mut Vec<u8>, old: &[u8], new: &[u8], context: usize) {
    if old == new {
        return;
    }
    let old_lines = split_lines(old);
    let new_lines = split_lines(new);
    let ops = similar::capture_diff_slices(Algorithm::Myers, &old_lines, &new_lines);

    for group in similar::group_diff_ops(ops, context) {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let old_range = first.old_range().start..last.old_range().end;
        let new_range = first.new_range().start..last.new_range().end;
        let _ = writeln!(
            out,
            "@@ -{} +{} @@",
            hunk_range(&old_range),
            hunk_range(&new_range)
        );
        for op in &group {
            let (tag, old_r, new_r) = op.as_tag_tuple();
            match tag {
                DiffTag::Equal => write_lines(out, b' ', &old_lines[old_r]),
                DiffTag::Delete => write_lines(out, b'-', &old_lines[old_r]),
                DiffTag::Insert => write_lines(out, b'+', &new_lines[new_r]),
                DiffTag::Replace => {
                    write_lines(out, b'-', &old_lines[old_r]);
                    write_lines(out, b'+', &new_lines[new_r]);
                }
            }
        }
    }
}

/// Split after every `\n`. A final line without one is kept as is.
fn split_lines(data: &[u8]) -> Vec<&[u8]> {
    data.split_inclusive(|&b| b == b'\n').collect()
}

/// `start,len` in git's hunk-header notation: 1-based, `,1` omitted, and an
/// empty range names the line before it.
fn hunk_range(range: &Range<usize>) -> String {
    match range.len() {
        0 => format!("{},0", range.start),
        1 => format!("{}", range.start + 1),
        n => format!("{},{}", range.start + 1, n),
    }
}

fn write_lines(out: &mut Vec<u8>, sign: u8, lines: &[&[u8]]) {
    for line in lines {
        out.push(sign);
        out.extend_from_slice(line);
        if !line.ends_with(b"\n") {
            out.extend_from_slice(b"\n\\ No newline at end of file\n");
        }
    }
}

/// Diff two flattened trees, one file block per changed path.
///
/// Paths are visited in sorted order. Renames are not detected: a moved
/// file shows up as a deletion and a creation. Submodule entries are
/// skipped.
pub fn diff_trees(
    store: &dyn ObjectStore,
    old: &TreeSnapshot,
    new: &TreeSnapshot,
    opts: &DiffOptions,
) -> Result<Vec<u8>> {
    let paths: BTreeSet<&str> = old
        .entries()
        .chain(new.entries())
        .map(|e| e.path.as_str())
        .filter(|p| path_selected(p, &opts.paths))
        .collect();

    let mut out = Vec::new();
    for path in paths {
        let a = old.get(path).filter(|e| e.mode != MODE_COMMIT);
        let b = new.get(path).filter(|e| e.mode != MODE_COMMIT);
        if let (Some(x), Some(y)) = (a, b) {
            if x.id == y.id && x.mode == y.mode {
                continue;
            }
        }
        if a.is_none() && b.is_none() {
            continue;
        }
        let a = a.map(DiffEntry::from);
        let b = b.map(DiffEntry::from);
        write_entry_diff(&mut out, store, a.as_ref(), b.as_ref(), opts)?;
    }
    Ok(out)
}

/// Diff the trees of two commits.
pub fn diff_commits(
    store: &dyn ObjectStore,
    base: &CommitId,
    head: &CommitId,
    opts: &DiffOptions,
) -> Result<Diff> {
    let old = store.get_tree(base)?;
    let new = store.get_tree(head)?;
    let raw = diff_trees(store, &old, &new, opts)?;
    Ok(Diff {
        base: base.clone(),
        head: head.clone(),
        raw,
    })
}

fn path_selected(path: &str, filters: &[String]) -> bool {
    if filters.is_empty() {
        return true;
    }
    filters.iter().any(|f| {
        let f = f.trim_matches('/');
        f.is_empty()
            || path == f
            || (path.len() > f.len() && path.starts_with(f) && path.as_bytes()[f.len()] == b'/')
    })
}

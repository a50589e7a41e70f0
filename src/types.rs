use std::borrow::Cow;
use std::fmt;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Mode constants
// ---------------------------------------------------------------------------

pub const MODE_BLOB: u32 = 0o100644;
pub const MODE_BLOB_EXEC: u32 = 0o100755;
pub const MODE_LINK: u32 = 0o120000;
pub const MODE_TREE: u32 = 0o040000;
pub const MODE_COMMIT: u32 = 0o160000;

// ---------------------------------------------------------------------------
// FileType
// ---------------------------------------------------------------------------

/// The type of a git tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FileType {
    Blob,
    Executable,
    Link,
    Tree,
    Submodule,
}

impl FileType {
    /// Convert a raw git mode to a `FileType`.
    pub fn from_mode(mode: u32) -> Option<Self> {
        match mode {
            MODE_BLOB => Some(Self::Blob),
            MODE_BLOB_EXEC => Some(Self::Executable),
            MODE_LINK => Some(Self::Link),
            MODE_TREE => Some(Self::Tree),
            MODE_COMMIT => Some(Self::Submodule),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// CommitId
// ---------------------------------------------------------------------------

/// A full hex commit hash. Equality is byte-equality of the hex string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct CommitId(String);

impl CommitId {
    /// Number of hex characters in a git (SHA-1) object id.
    pub const HEX_LEN: usize = 40;

    /// The all-zero id used for "no object" in diff headers.
    pub fn zero() -> Self {
        Self("0".repeat(Self::HEX_LEN))
    }

    /// Parse a full-length hex id, normalising it to lowercase.
    ///
    /// # Errors
    /// Returns [`Error::InvalidCommitId`] if `raw` is not exactly 40 hex digits.
    pub fn parse(raw: &str) -> Result<Self> {
        if Self::is_full_hex(raw) {
            Ok(Self(raw.to_ascii_lowercase()))
        } else {
            Err(Error::invalid_commit_id(raw))
        }
    }

    /// Whether `raw` looks like a full-length hex id.
    pub fn is_full_hex(raw: &str) -> bool {
        raw.len() == Self::HEX_LEN && raw.bytes().all(|b| b.is_ascii_hexdigit())
    }

    /// Wrap an id produced by a trusted source (an object store) without
    /// validation.
    pub fn from_trusted(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for display.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CommitId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<git2::Oid> for CommitId {
    fn from(oid: git2::Oid) -> Self {
        Self(oid.to_string())
    }
}

// ---------------------------------------------------------------------------
// Signature / Commit
// ---------------------------------------------------------------------------

/// Author/committer identity and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Signature {
    pub name: String,
    pub email: String,
    /// Seconds since the Unix epoch.
    pub time: i64,
    /// Offset from UTC in minutes, as recorded in the commit.
    pub offset_minutes: i32,
}

/// One commit's metadata and parent links.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Commit {
    pub id: CommitId,
    pub author: Signature,
    pub committer: Option<Signature>,
    pub message: String,
    /// Parent ids in declared order; the first is the mainline parent.
    pub parents: Vec<CommitId>,
}

impl Commit {
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// First line of the message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// Committer time if present, else author time.
    pub fn time(&self) -> i64 {
        self.committer
            .as_ref()
            .map(|c| c.time)
            .unwrap_or(self.author.time)
    }
}

// ---------------------------------------------------------------------------
// Refs
// ---------------------------------------------------------------------------

/// Asymmetric commit counts between two refs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BehindAhead {
    pub behind: u32,
    pub ahead: u32,
}

/// A branch and, optionally, its head commit and counts.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Branch {
    pub name: String,
    pub head: CommitId,
    /// Populated when [`BranchesOptions::include_commit`] is set.
    pub commit: Option<Commit>,
    /// Populated when [`BranchesOptions::behind_ahead_branch`] is set.
    pub counts: Option<BehindAhead>,
}

/// A tag name and the commit it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tag {
    pub name: String,
    pub commit_id: CommitId,
}

/// Describes a reference change during a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RefChange {
    pub name: String,
    pub old_target: Option<String>,
    pub new_target: Option<String>,
}

/// Summary of the ref changes made by [`crate::Repository::fetch_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UpdateResult {
    pub changes: Vec<RefChange>,
}

impl UpdateResult {
    pub fn in_sync(&self) -> bool {
        self.changes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Trees
// ---------------------------------------------------------------------------

/// A single non-tree entry of a flattened tree snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TreeEntry {
    /// Full forward-slash path from the tree root.
    pub path: String,
    /// Content (blob) id as hex.
    pub id: String,
    pub mode: u32,
}

impl TreeEntry {
    pub fn file_type(&self) -> Option<FileType> {
        FileType::from_mode(self.mode)
    }
}

// ---------------------------------------------------------------------------
// Diff / blame / search results
// ---------------------------------------------------------------------------

/// A unified diff between two commits.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Diff {
    pub base: CommitId,
    pub head: CommitId,
    /// Patch bytes. File contents are copied through unchanged, so this is
    /// only valid UTF-8 when the diffed files are.
    pub raw: Vec<u8>,
}

impl Diff {
    /// The patch as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.raw)
    }
}

/// A run of consecutive lines last changed by the same commit.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Hunk {
    pub commit_id: CommitId,
    /// 1-based, inclusive.
    pub start_line: u32,
    /// 1-based, exclusive.
    pub end_line: u32,
    pub author: Signature,
}

/// A match returned by a search.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchResult {
    pub file: String,
    /// 1-based line range `[start_line, end_line]` covered by `context`.
    pub start_line: u32,
    pub end_line: u32,
    /// The matching line, without its terminator.
    pub matched: String,
    /// The matching line plus the requested context lines.
    pub context: String,
}

/// Per-author commit statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Committer {
    pub name: String,
    pub email: String,
    pub commits: u32,
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Options for [`crate::Repository::commits`].
#[derive(Debug, Clone)]
pub struct CommitsOptions {
    /// Commit to start walking from.
    pub head: CommitId,
    /// Walk stops when it reaches this commit (exclusive).
    pub base: Option<CommitId>,
    /// Maximum number of commits to return; `0` means no limit.
    pub limit: usize,
    /// Number of visited commits to skip before emitting.
    pub skip: usize,
    /// Do not compute the total count (reported as `0`).
    pub no_total: bool,
}

impl CommitsOptions {
    pub fn new(head: CommitId) -> Self {
        Self {
            head,
            base: None,
            limit: 0,
            skip: 0,
            no_total: false,
        }
    }
}

/// Options for [`crate::Repository::branches`].
#[derive(Debug, Clone, Default)]
pub struct BranchesOptions {
    /// Include the head commit of each branch.
    pub include_commit: bool,
    /// Compute behind/ahead counts of each branch against this branch.
    pub behind_ahead_branch: Option<String>,
    /// Only branches whose history contains this commit.
    pub contains_commit: Option<CommitId>,
    /// Only branches fully merged into this commit.
    pub merged_into: Option<CommitId>,
}

/// Options for diff generation.
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Prefix for old-side paths.
    pub a_prefix: String,
    /// Prefix for new-side paths.
    pub b_prefix: String,
    /// Restrict the diff to these paths (or directories).
    pub paths: Vec<String>,
    /// Lines of context around each change.
    pub context: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            a_prefix: "a/".into(),
            b_prefix: "b/".into(),
            paths: Vec::new(),
            context: 3,
        }
    }
}

/// Options for [`crate::Repository::blame_file`].
#[derive(Debug, Clone, Default)]
pub struct BlameOptions {
    /// Blame as of this commit (default: HEAD).
    pub newest_commit: Option<CommitId>,
    /// 1-based inclusive line range; both must be set to take effect.
    pub start_line: Option<u32>,
    pub end_line: Option<u32>,
}

/// Options for [`crate::Repository::search`].
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Fixed-string query.
    pub query: String,
    /// Lines of context before and after each match.
    pub context_lines: u32,
    /// Maximum number of results; `0` means no limit.
    pub limit: usize,
    /// Number of matches to skip (for pagination).
    pub offset: usize,
}

/// Options for [`crate::Repository::committers`].
#[derive(Debug, Clone, Default)]
pub struct CommittersOptions {
    /// Revision to count from (default: HEAD).
    pub rev: Option<String>,
    /// Maximum number of commits to consider; `0` means no limit.
    pub limit: usize,
}

/// Options for [`crate::Repository::clone_from_url`].
#[derive(Debug, Clone, Default)]
pub struct CloneOptions {
    pub bare: bool,
    pub mirror: bool,
}

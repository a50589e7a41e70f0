use std::path::PathBuf;

use crate::dispatch::Operation;
use crate::types::CommitId;

/// All errors produced by vcsgraph.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("revision not found: {0}")]
    RevisionNotFound(String),

    #[error("tag not found: {0}")]
    TagNotFound(String),

    #[error("branch not found: {0}")]
    BranchNotFound(String),

    #[error("commit not found: {0}")]
    CommitNotFound(CommitId),

    #[error("invalid commit id: {0:?}")]
    InvalidCommitId(String),

    #[error("no common ancestor between {a} and {b}")]
    NoCommonAncestor { a: CommitId, b: CommitId },

    #[error("invalid diff input: {0}")]
    InvalidDiffInput(String),

    #[error("operation not supported: {0}")]
    UnsupportedOperation(Operation),

    #[error("`{command}` failed ({status}): {stderr}")]
    UpstreamFailure {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("is a directory: {0}")]
    IsADirectory(String),

    #[error("git error: {0}")]
    Git(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

// ---------------------------------------------------------------------------
// Convenience constructors
// ---------------------------------------------------------------------------

impl Error {
    pub fn revision_not_found(spec: impl Into<String>) -> Self {
        Self::RevisionNotFound(spec.into())
    }

    pub fn tag_not_found(name: impl Into<String>) -> Self {
        Self::TagNotFound(name.into())
    }

    pub fn branch_not_found(name: impl Into<String>) -> Self {
        Self::BranchNotFound(name.into())
    }

    pub fn commit_not_found(id: &CommitId) -> Self {
        Self::CommitNotFound(id.clone())
    }

    pub fn invalid_commit_id(raw: impl Into<String>) -> Self {
        Self::InvalidCommitId(raw.into())
    }

    pub fn no_common_ancestor(a: &CommitId, b: &CommitId) -> Self {
        Self::NoCommonAncestor {
            a: a.clone(),
            b: b.clone(),
        }
    }

    pub fn invalid_diff_input(msg: impl Into<String>) -> Self {
        Self::InvalidDiffInput(msg.into())
    }

    pub fn unsupported(op: Operation) -> Self {
        Self::UnsupportedOperation(op)
    }

    pub fn upstream(
        command: impl Into<String>,
        status: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::UpstreamFailure {
            command: command.into(),
            status: status.into(),
            stderr: stderr.into(),
        }
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::IsADirectory(path.into())
    }

    pub fn git(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Git(Box::new(err))
    }

    pub fn git_msg(msg: impl Into<String>) -> Self {
        Self::Git(msg.into().into())
    }

    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io(std::io::Error::new(
            err.kind(),
            format!("{}: {}", path.into().display(), err),
        ))
    }
}

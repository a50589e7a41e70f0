//! Per-operation routing between the native engine and the git toolchain.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};

/// Every repository operation that can be routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operation {
    ResolveRevision,
    GetCommit,
    Commits,
    Branches,
    Tags,
    IsAncestor,
    BehindAhead,
    MergeBase,
    CrossRepoMergeBase,
    Diff,
    CrossRepoDiff,
    BlameFile,
    Search,
    Committers,
    FetchAll,
}

impl Operation {
    pub const ALL: [Operation; 15] = [
        Operation::ResolveRevision,
        Operation::GetCommit,
        Operation::Commits,
        Operation::Branches,
        Operation::Tags,
        Operation::IsAncestor,
        Operation::BehindAhead,
        Operation::MergeBase,
        Operation::CrossRepoMergeBase,
        Operation::Diff,
        Operation::CrossRepoDiff,
        Operation::BlameFile,
        Operation::Search,
        Operation::Committers,
        Operation::FetchAll,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::ResolveRevision => "resolve-revision",
            Operation::GetCommit => "get-commit",
            Operation::Commits => "commits",
            Operation::Branches => "branches",
            Operation::Tags => "tags",
            Operation::IsAncestor => "is-ancestor",
            Operation::BehindAhead => "behind-ahead",
            Operation::MergeBase => "merge-base",
            Operation::CrossRepoMergeBase => "cross-repo-merge-base",
            Operation::Diff => "diff",
            Operation::CrossRepoDiff => "cross-repo-diff",
            Operation::BlameFile => "blame",
            Operation::Search => "search",
            Operation::Committers => "committers",
            Operation::FetchAll => "fetch-all",
        }
    }

    /// Whether the in-process engine implements this operation.
    pub fn has_native(self) -> bool {
        !matches!(
            self,
            Operation::CrossRepoDiff
                | Operation::BlameFile
                | Operation::Search
                | Operation::Committers
                | Operation::FetchAll
        )
    }

    /// Whether the git toolchain implements this operation.
    pub fn has_fallback(self) -> bool {
        matches!(
            self,
            Operation::ResolveRevision
                | Operation::MergeBase
                | Operation::CrossRepoMergeBase
                | Operation::Diff
                | Operation::CrossRepoDiff
                | Operation::BlameFile
                | Operation::Search
                | Operation::Committers
                | Operation::FetchAll
        )
    }

    /// Whether `strategy` can serve this operation at all.
    pub fn supports(self, strategy: Strategy) -> bool {
        match strategy {
            Strategy::Native => self.has_native(),
            Strategy::Fallback => self.has_fallback(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| Error::not_found(format!("operation {:?}", s)))
    }
}

/// Which implementation serves an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Strategy {
    Native,
    Fallback,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Native => f.write_str("native"),
            Strategy::Fallback => f.write_str("fallback"),
        }
    }
}

/// Operation -> strategy routing, fixed when a repository is opened.
///
/// The default routes every operation the native engine implements to it
/// and everything else to the toolchain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTable {
    routes: BTreeMap<Operation, Strategy>,
}

impl Default for DispatchTable {
    fn default() -> Self {
        let routes = Operation::ALL
            .into_iter()
            .map(|op| {
                let strategy = if op.has_native() {
                    Strategy::Native
                } else {
                    Strategy::Fallback
                };
                (op, strategy)
            })
            .collect();
        Self { routes }
    }
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table that prefers the toolchain wherever it is available.
    pub fn prefer_fallback() -> Self {
        let mut table = Self::default();
        for op in Operation::ALL {
            if op.has_fallback() {
                table.routes.insert(op, Strategy::Fallback);
            }
        }
        table
    }

    pub fn strategy(&self, op: Operation) -> Strategy {
        self.routes.get(&op).copied().unwrap_or(Strategy::Native)
    }

    /// Route `op` to `strategy`.
    ///
    /// # Errors
    /// [`Error::UnsupportedOperation`] if `strategy` does not implement `op`.
    pub fn route(&mut self, op: Operation, strategy: Strategy) -> Result<&mut Self> {
        if !op.supports(strategy) {
            return Err(Error::unsupported(op));
        }
        self.routes.insert(op, strategy);
        Ok(self)
    }

    /// Operations currently routed to the toolchain.
    pub fn fallback_operations(&self) -> Vec<Operation> {
        self.routes
            .iter()
            .filter(|(_, s)| **s == Strategy::Fallback)
            .map(|(op, _)| *op)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Operation, Strategy)> + '_ {
        self.routes.iter().map(|(op, s)| (*op, *s))
    }
}

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::ancestry;
use crate::diff::{self, DiffEntry};
use crate::dispatch::{DispatchTable, Operation, Strategy};
use crate::error::{Error, Result};
use crate::gitcmd::Toolchain;
use crate::resolve;
use crate::store::ObjectStore;
use crate::tree::FileSystem;
use crate::types::*;
use crate::walk;

/// A version-controlled repository.
///
/// Owns an object store, an optional toolchain fallback and the dispatch
/// table deciding which of the two serves each operation. The table is
/// fixed at construction; every query below consults it exactly once.
///
/// `Repository` is `Send + Sync` and read-only apart from
/// [`fetch_all`](Self::fetch_all).
pub struct Repository {
    store: Arc<dyn ObjectStore>,
    fallback: Option<Box<dyn Toolchain>>,
    table: DispatchTable,
}

impl Repository {
    /// Build a repository from injected collaborators.
    ///
    /// # Errors
    /// [`Error::UnsupportedOperation`] if `table` routes an operation to the
    /// fallback but `fallback` is `None`.
    pub fn from_parts(
        store: Arc<dyn ObjectStore>,
        fallback: Option<Box<dyn Toolchain>>,
        table: DispatchTable,
    ) -> Result<Self> {
        if fallback.is_none() {
            // Fallback-only operations stay routed there and fail per call;
            // anything with a native implementation must not be.
            if let Some(op) = table
                .iter()
                .find(|(op, s)| *s == Strategy::Fallback && op.has_native())
                .map(|(op, _)| op)
            {
                return Err(Error::unsupported(op));
            }
        }
        Ok(Self {
            store,
            fallback,
            table,
        })
    }

    /// A repository served entirely by `store`, with no toolchain.
    pub fn from_store(store: impl ObjectStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
            fallback: None,
            table: DispatchTable::default(),
        }
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    pub fn fallback(&self) -> Option<&dyn Toolchain> {
        self.fallback.as_deref()
    }

    pub fn dispatch_table(&self) -> &DispatchTable {
        &self.table
    }

    /// On-disk git directory, if any.
    pub fn git_dir(&self) -> Option<&Path> {
        self.store.git_dir()
    }

    /// Route `op` through the dispatch table.
    fn dispatch<T>(
        &self,
        op: Operation,
        native: impl FnOnce(&dyn ObjectStore) -> Result<T>,
        fallback: impl FnOnce(&dyn Toolchain) -> Result<T>,
    ) -> Result<T> {
        match self.table.strategy(op) {
            Strategy::Native if op.has_native() => {
                log::trace!("{}: native ({})", op, self.store.describe());
                native(self.store.as_ref())
            }
            Strategy::Native => Err(Error::unsupported(op)),
            Strategy::Fallback => match self.fallback.as_deref() {
                Some(toolchain) => {
                    log::debug!("{}: fallback ({})", op, toolchain.describe());
                    fallback(toolchain)
                }
                None => Err(Error::unsupported(op)),
            },
        }
    }

    // -- refs ---------------------------------------------------------------

    /// Resolve a tag, branch, commit id or (through the fallback) any other
    /// revision expression.
    ///
    /// # Errors
    /// [`Error::RevisionNotFound`] if nothing matches.
    pub fn resolve_revision(&self, spec: &str) -> Result<CommitId> {
        self.dispatch(
            Operation::ResolveRevision,
            |store| resolve::resolve_revision(store, self.fallback(), spec),
            |toolchain| {
                toolchain
                    .resolve_revision(spec)
                    .map_err(|_| Error::revision_not_found(spec))
            },
        )
    }

    pub fn resolve_tag(&self, name: &str) -> Result<CommitId> {
        self.dispatch(
            Operation::Tags,
            |store| store.resolve_tag(name),
            |_| Err(Error::unsupported(Operation::Tags)),
        )
    }

    pub fn resolve_branch(&self, name: &str) -> Result<CommitId> {
        self.dispatch(
            Operation::Branches,
            |store| store.resolve_branch(name),
            |_| Err(Error::unsupported(Operation::Branches)),
        )
    }

    /// All tags with the commit each one peels to, sorted by name.
    pub fn tags(&self) -> Result<Vec<Tag>> {
        self.dispatch(
            Operation::Tags,
            |store| {
                store
                    .list_tags()?
                    .into_iter()
                    .map(|name| {
                        let commit_id = store.resolve_tag(&name)?;
                        Ok(Tag { name, commit_id })
                    })
                    .collect()
            },
            |_| Err(Error::unsupported(Operation::Tags)),
        )
    }

    /// Local branches, sorted by name, filtered and annotated per `opts`.
    ///
    /// The head commit is only loaded when an option needs it.
    pub fn branches(&self, opts: &BranchesOptions) -> Result<Vec<Branch>> {
        self.dispatch(
            Operation::Branches,
            |store| list_branches(store, opts),
            |_| Err(Error::unsupported(Operation::Branches)),
        )
    }

    // -- commits ------------------------------------------------------------

    /// # Errors
    /// [`Error::CommitNotFound`] if no such commit exists.
    pub fn get_commit(&self, id: &CommitId) -> Result<Commit> {
        self.dispatch(
            Operation::GetCommit,
            |store| store.get_commit(id),
            |_| Err(Error::unsupported(Operation::GetCommit)),
        )
    }

    /// History from `opts.head` and the total number of reachable commits
    /// (see [`crate::walk::commits`]).
    pub fn commits(&self, opts: &CommitsOptions) -> Result<(Vec<Commit>, usize)> {
        self.dispatch(
            Operation::Commits,
            |store| walk::commits(store, opts),
            |_| Err(Error::unsupported(Operation::Commits)),
        )
    }

    // -- ancestry -----------------------------------------------------------

    /// Whether `candidate` is `descendant` or one of its ancestors.
    pub fn is_ancestor(&self, candidate: &CommitId, descendant: &CommitId) -> Result<bool> {
        self.dispatch(
            Operation::IsAncestor,
            |store| ancestry::is_ancestor(store, candidate, descendant),
            |_| Err(Error::unsupported(Operation::IsAncestor)),
        )
    }

    /// Commits unique to `b` (`behind`) and to `a` (`ahead`).
    pub fn behind_ahead(&self, a: &CommitId, b: &CommitId) -> Result<BehindAhead> {
        self.dispatch(
            Operation::BehindAhead,
            |store| ancestry::behind_ahead(store, a, b),
            |_| Err(Error::unsupported(Operation::BehindAhead)),
        )
    }

    /// # Errors
    /// [`Error::NoCommonAncestor`] if the histories are unrelated.
    pub fn merge_base(&self, a: &CommitId, b: &CommitId) -> Result<CommitId> {
        self.dispatch(
            Operation::MergeBase,
            |store| ancestry::merge_base(store, a, b),
            |toolchain| toolchain.merge_base(a, b),
        )
    }

    /// Every lowest common ancestor, preferred first. The fallback only
    /// reports the preferred one.
    pub fn merge_bases(&self, a: &CommitId, b: &CommitId) -> Result<Vec<CommitId>> {
        self.dispatch(
            Operation::MergeBase,
            |store| ancestry::merge_bases(store, a, b),
            |toolchain| Ok(vec![toolchain.merge_base(a, b)?]),
        )
    }

    /// Merge-base of `a` in this repository and `b` in `other`.
    pub fn cross_repo_merge_base(&self, a: &CommitId, other: &Repository, b: &CommitId) -> Result<CommitId> {
        self.dispatch(
            Operation::CrossRepoMergeBase,
            |store| ancestry::cross_repo_merge_base(store, a, other.store(), b),
            |toolchain| {
                let other_dir = other
                    .git_dir()
                    .ok_or_else(|| Error::unsupported(Operation::CrossRepoMergeBase))?;
                toolchain.cross_repo_merge_base(a, other_dir, b)
            },
        )
    }

    // -- diffs --------------------------------------------------------------

    /// Unified diff between the trees of two commits.
    pub fn diff(&self, base: &CommitId, head: &CommitId, opts: &DiffOptions) -> Result<Diff> {
        self.dispatch(
            Operation::Diff,
            |store| diff::diff_commits(store, base, head, opts),
            |toolchain| toolchain.diff(base, head, opts),
        )
    }

    /// Unified diff of one file between two states. Always served by the
    /// native diff engine.
    pub fn diff_entries(&self, a: Option<&DiffEntry>, b: Option<&DiffEntry>, opts: &DiffOptions) -> Result<Vec<u8>> {
        diff::diff_entries(self.store(), a, b, opts)
    }

    /// Diff `base` in this repository against `head` in `head_repo`.
    pub fn cross_repo_diff(
        &self,
        base: &CommitId,
        head_repo: &Repository,
        head: &CommitId,
        opts: &DiffOptions,
    ) -> Result<Diff> {
        self.dispatch(
            Operation::CrossRepoDiff,
            |_| Err(Error::unsupported(Operation::CrossRepoDiff)),
            |toolchain| {
                let head_dir = head_repo
                    .git_dir()
                    .ok_or_else(|| Error::unsupported(Operation::CrossRepoDiff))?;
                toolchain.cross_repo_diff(base, head_dir, head, opts)
            },
        )
    }

    // -- toolchain-only -----------------------------------------------------

    pub fn blame_file(&self, path: &str, opts: &BlameOptions) -> Result<Vec<Hunk>> {
        self.dispatch(
            Operation::BlameFile,
            |_| Err(Error::unsupported(Operation::BlameFile)),
            |toolchain| toolchain.blame_file(path, opts),
        )
    }

    pub fn search(&self, at: &CommitId, opts: &SearchOptions) -> Result<Vec<SearchResult>> {
        self.dispatch(
            Operation::Search,
            |_| Err(Error::unsupported(Operation::Search)),
            |toolchain| toolchain.search(at, opts),
        )
    }

    pub fn committers(&self, opts: &CommittersOptions) -> Result<Vec<Committer>> {
        self.dispatch(
            Operation::Committers,
            |_| Err(Error::unsupported(Operation::Committers)),
            |toolchain| toolchain.committers(opts),
        )
    }

    /// Fetch all remotes. The only operation that writes.
    pub fn fetch_all(&self) -> Result<UpdateResult> {
        self.dispatch(
            Operation::FetchAll,
            |_| Err(Error::unsupported(Operation::FetchAll)),
            |toolchain| toolchain.fetch_all(),
        )
    }

    // -- files --------------------------------------------------------------

    /// Read-only view of the files at commit `at`.
    pub fn file_system(&self, at: &CommitId) -> Result<FileSystem> {
        let snapshot = self.store.get_tree(at)?;
        Ok(FileSystem::new(Arc::clone(&self.store), snapshot))
    }
}

fn list_branches(store: &dyn ObjectStore, opts: &BranchesOptions) -> Result<Vec<Branch>> {
    let base_head = match &opts.behind_ahead_branch {
        Some(name) => Some(store.resolve_branch(name)?),
        None => None,
    };

    let mut branches = Vec::new();
    for name in store.list_branches()? {
        let head = store.resolve_branch(&name)?;
        if let Some(commit) = &opts.contains_commit {
            if !ancestry::is_ancestor(store, commit, &head)? {
                continue;
            }
        }
        if let Some(target) = &opts.merged_into {
            if !ancestry::is_ancestor(store, &head, target)? {
                continue;
            }
        }
        let commit = if opts.include_commit {
            Some(store.get_commit(&head)?)
        } else {
            None
        };
        let counts = match &base_head {
            Some(base) => Some(ancestry::behind_ahead(store, &head, base)?),
            None => None,
        };
        branches.push(Branch {
            name,
            head,
            commit,
            counts,
        });
    }
    Ok(branches)
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Repository({})", self.store.describe())
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("store", &self.store.describe())
            .field("fallback", &self.fallback.as_ref().map(|t| t.describe()))
            .field("table", &self.table)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn id(n: u8) -> CommitId {
        CommitId::from_trusted(format!("{:040x}", n))
    }

    /// master: 1 -> 2 -> 3; feature: 1 -> 4
    fn repo() -> Repository {
        let mut store = MemoryStore::new("branches");
        store.add_commit(&id(1), &[], 100);
        store.add_commit(&id(2), &[&id(1)], 200);
        store.add_commit(&id(3), &[&id(2)], 300);
        store.add_commit(&id(4), &[&id(1)], 250);
        store.set_branch("master", &id(3));
        store.set_branch("feature", &id(4));
        store.set_branch("old", &id(2));
        store.set_tag("v1", &id(1));
        Repository::from_store(store)
    }

    fn names(branches: &[Branch]) -> Vec<&str> {
        branches.iter().map(|b| b.name.as_str()).collect()
    }

    #[test]
    fn branches_without_options_skip_commits() {
        let branches = repo().branches(&BranchesOptions::default()).unwrap();
        assert_eq!(names(&branches), vec!["feature", "master", "old"]);
        assert!(branches.iter().all(|b| b.commit.is_none() && b.counts.is_none()));
    }

    #[test]
    fn branches_include_commit() {
        let opts = BranchesOptions {
            include_commit: true,
            ..Default::default()
        };
        let branches = repo().branches(&opts).unwrap();
        assert_eq!(branches[1].commit.as_ref().map(|c| c.id.clone()), Some(id(3)));
    }

    #[test]
    fn branches_merged_into_and_contains() {
        let repo = repo();
        let merged = repo
            .branches(&BranchesOptions {
                merged_into: Some(id(3)),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(names(&merged), vec!["master", "old"]);

        let containing = repo
            .branches(&BranchesOptions {
                contains_commit: Some(id(2)),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(names(&containing), vec!["master", "old"]);
    }

    #[test]
    fn branches_behind_ahead() {
        let opts = BranchesOptions {
            behind_ahead_branch: Some("master".into()),
            ..Default::default()
        };
        let branches = repo().branches(&opts).unwrap();
        assert_eq!(branches[0].counts, Some(BehindAhead { behind: 2, ahead: 1 }));
        assert_eq!(branches[1].counts, Some(BehindAhead::default()));
        assert_eq!(branches[2].counts, Some(BehindAhead { behind: 1, ahead: 0 }));
    }

    #[test]
    fn tags_are_resolved() {
        assert_eq!(
            repo().tags().unwrap(),
            vec![Tag {
                name: "v1".into(),
                commit_id: id(1)
            }]
        );
    }

    #[test]
    fn fallback_only_ops_without_toolchain_are_unsupported() {
        let repo = repo();
        assert!(matches!(
            repo.blame_file("f", &BlameOptions::default()),
            Err(Error::UnsupportedOperation(Operation::BlameFile))
        ));
        assert!(matches!(
            repo.cross_repo_diff(&id(1), &repo, &id(2), &DiffOptions::default()),
            Err(Error::UnsupportedOperation(Operation::CrossRepoDiff))
        ));
        assert!(matches!(
            repo.fetch_all(),
            Err(Error::UnsupportedOperation(Operation::FetchAll))
        ));
    }

    #[test]
    fn from_parts_rejects_fallback_routes_without_toolchain() {
        let err = Repository::from_parts(
            Arc::new(MemoryStore::new("x")),
            None,
            DispatchTable::prefer_fallback(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation(Operation::ResolveRevision)));
    }

    #[test]
    fn resolve_and_walk() {
        let repo = repo();
        let head = repo.resolve_revision("master").unwrap();
        let (commits, total) = repo.commits(&CommitsOptions::new(head)).unwrap();
        assert_eq!(commits.len(), 3);
        assert_eq!(total, 3);
        assert!(repo.is_ancestor(&id(1), &id(4)).unwrap());
        assert_eq!(repo.merge_base(&id(3), &id(4)).unwrap(), id(1));
    }
}

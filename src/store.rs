use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::tree::TreeSnapshot;
use crate::types::{Commit, CommitId, Signature, TreeEntry};

/// Read access to commits, trees, blobs and refs.
///
/// The graph algorithms only ever talk to this trait; they never parse raw
/// object encoding. Implementations must be safe to share across threads.
pub trait ObjectStore: Send + Sync {
    /// Fetch one commit.
    ///
    /// # Errors
    /// Returns [`Error::CommitNotFound`] if no such commit exists.
    fn get_commit(&self, id: &CommitId) -> Result<Commit>;

    /// Flattened file tree of a commit.
    fn get_tree(&self, id: &CommitId) -> Result<TreeSnapshot>;

    /// Raw content of a blob, by hex id.
    fn read_blob(&self, id: &str) -> Result<Vec<u8>>;

    /// Local branch names, sorted.
    fn list_branches(&self) -> Result<Vec<String>>;

    /// Tag names, sorted.
    fn list_tags(&self) -> Result<Vec<String>>;

    /// # Errors
    /// Returns [`Error::TagNotFound`] if the tag does not exist.
    fn resolve_tag(&self, name: &str) -> Result<CommitId>;

    /// # Errors
    /// Returns [`Error::BranchNotFound`] if the branch does not exist.
    fn resolve_branch(&self, name: &str) -> Result<CommitId>;

    /// Commit the symbolic `HEAD` points at.
    ///
    /// # Errors
    /// Returns [`Error::RevisionNotFound`] if `HEAD` is unborn or the store
    /// has no notion of it.
    fn resolve_head(&self) -> Result<CommitId> {
        Err(Error::revision_not_found("HEAD"))
    }

    /// On-disk git directory, if the store is backed by one.
    fn git_dir(&self) -> Option<&Path> {
        None
    }

    /// Human-readable description for logs and `Display`.
    fn describe(&self) -> String;
}

// ---------------------------------------------------------------------------
// GitObjectStore
// ---------------------------------------------------------------------------

/// Native object store reading a git repository in-process through libgit2.
///
/// `git2::Repository` is not `Sync`, so the handle sits behind a `Mutex`;
/// every lookup holds the lock only for the duration of one object read.
pub struct GitObjectStore {
    repo: Mutex<git2::Repository>,
    git_dir: PathBuf,
}

impl GitObjectStore {
    /// Open the repository at `dir`.
    ///
    /// If `dir/.git` exists it is used as the git directory; otherwise `dir`
    /// itself is opened (bare repositories).
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let mut dir = dir.as_ref().to_path_buf();
        if dir.join(".git").exists() {
            dir = dir.join(".git");
        }
        let repo = git2::Repository::open(&dir).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                Error::not_found(format!("repository not found: {}", dir.display()))
            } else {
                Error::git(e)
            }
        })?;
        let git_dir = repo.path().to_path_buf();
        Ok(Self {
            repo: Mutex::new(repo),
            git_dir,
        })
    }

    /// The git directory this store reads.
    pub fn path(&self) -> &Path {
        &self.git_dir
    }

    /// Helper: lock the repo mutex and call `f` with the repository.
    fn with_repo<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&git2::Repository) -> Result<T>,
    {
        let repo = self
            .repo
            .lock()
            .map_err(|e| Error::git_msg(e.to_string()))?;
        f(&repo)
    }

    /// Peel `refname` to the commit it ultimately points at.
    ///
    /// Returns `Ok(None)` when the reference does not exist or `refname` is
    /// not a valid reference name (e.g. `refs/heads/main~2`).
    fn peel_ref(&self, refname: &str) -> Result<Option<CommitId>> {
        self.with_repo(|repo| match repo.find_reference(refname) {
            Ok(reference) => {
                let commit = reference.peel_to_commit().map_err(Error::git)?;
                Ok(Some(commit.id().into()))
            }
            Err(e)
                if matches!(
                    e.code(),
                    git2::ErrorCode::NotFound | git2::ErrorCode::InvalidSpec
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(Error::git(e)),
        })
    }
}

impl ObjectStore for GitObjectStore {
    fn get_commit(&self, id: &CommitId) -> Result<Commit> {
        let oid = git2::Oid::from_str(id.as_str()).map_err(|_| Error::commit_not_found(id))?;
        self.with_repo(|repo| {
            let commit = match repo.find_commit(oid) {
                Ok(c) => c,
                Err(e) if e.code() == git2::ErrorCode::NotFound => {
                    return Err(Error::commit_not_found(id));
                }
                Err(e) => return Err(Error::git(e)),
            };
            Ok(to_commit(&commit))
        })
    }

    fn get_tree(&self, id: &CommitId) -> Result<TreeSnapshot> {
        let oid = git2::Oid::from_str(id.as_str()).map_err(|_| Error::commit_not_found(id))?;
        self.with_repo(|repo| {
            let commit = match repo.find_commit(oid) {
                Ok(c) => c,
                Err(e) if e.code() == git2::ErrorCode::NotFound => {
                    return Err(Error::commit_not_found(id));
                }
                Err(e) => return Err(Error::git(e)),
            };
            let tree = commit.tree().map_err(Error::git)?;

            let mut entries = Vec::new();
            tree.walk(git2::TreeWalkMode::PreOrder, |root, entry| {
                if entry.kind() == Some(git2::ObjectType::Tree) {
                    return git2::TreeWalkResult::Ok;
                }
                if let Some(name) = entry.name() {
                    entries.push(TreeEntry {
                        path: format!("{}{}", root, name),
                        id: entry.id().to_string(),
                        mode: entry.filemode() as u32,
                    });
                }
                git2::TreeWalkResult::Ok
            })
            .map_err(Error::git)?;

            Ok(TreeSnapshot::new(id.clone(), entries))
        })
    }

    fn read_blob(&self, id: &str) -> Result<Vec<u8>> {
        let oid = git2::Oid::from_str(id).map_err(|_| Error::not_found(format!("blob {}", id)))?;
        self.with_repo(|repo| match repo.find_blob(oid) {
            Ok(blob) => Ok(blob.content().to_vec()),
            Err(e) if e.code() == git2::ErrorCode::NotFound => {
                Err(Error::not_found(format!("blob {}", id)))
            }
            Err(e) => Err(Error::git(e)),
        })
    }

    fn list_branches(&self) -> Result<Vec<String>> {
        self.with_repo(|repo| {
            let mut names = Vec::new();
            for item in repo
                .branches(Some(git2::BranchType::Local))
                .map_err(Error::git)?
            {
                let (branch, _) = item.map_err(Error::git)?;
                if let Some(name) = branch.name().map_err(Error::git)? {
                    names.push(name.to_string());
                }
            }
            names.sort();
            Ok(names)
        })
    }

    fn list_tags(&self) -> Result<Vec<String>> {
        self.with_repo(|repo| {
            let tags = repo.tag_names(None).map_err(Error::git)?;
            let mut names: Vec<String> = tags.iter().flatten().map(str::to_string).collect();
            names.sort();
            Ok(names)
        })
    }

    fn resolve_tag(&self, name: &str) -> Result<CommitId> {
        self.peel_ref(&format!("refs/tags/{}", name))?
            .ok_or_else(|| Error::tag_not_found(name))
    }

    fn resolve_branch(&self, name: &str) -> Result<CommitId> {
        self.peel_ref(&format!("refs/heads/{}", name))?
            .ok_or_else(|| Error::branch_not_found(name))
    }

    fn resolve_head(&self) -> Result<CommitId> {
        self.with_repo(|repo| match repo.head() {
            Ok(head) => {
                let commit = head.peel_to_commit().map_err(Error::git)?;
                Ok(commit.id().into())
            }
            Err(e)
                if matches!(
                    e.code(),
                    git2::ErrorCode::UnbornBranch | git2::ErrorCode::NotFound
                ) =>
            {
                Err(Error::revision_not_found("HEAD"))
            }
            Err(e) => Err(Error::git(e)),
        })
    }

    fn git_dir(&self) -> Option<&Path> {
        Some(&self.git_dir)
    }

    fn describe(&self) -> String {
        format!("git repo at {}", self.git_dir.display())
    }
}

fn to_signature(sig: &git2::Signature<'_>) -> Signature {
    Signature {
        name: String::from_utf8_lossy(sig.name_bytes()).into_owned(),
        email: String::from_utf8_lossy(sig.email_bytes()).into_owned(),
        time: sig.when().seconds(),
        offset_minutes: sig.when().offset_minutes(),
    }
}

fn to_commit(commit: &git2::Commit<'_>) -> Commit {
    let message = String::from_utf8_lossy(commit.message_bytes());
    Commit {
        id: commit.id().into(),
        author: to_signature(&commit.author()),
        committer: Some(to_signature(&commit.committer())),
        message: message.strip_suffix('\n').unwrap_or(&message).to_string(),
        parents: commit.parent_ids().map(CommitId::from).collect(),
    }
}

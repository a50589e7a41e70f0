use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};
use crate::store::ObjectStore;
use crate::tree::TreeSnapshot;
use crate::types::{Commit, CommitId, Signature, TreeEntry};

/// An in-memory object store.
///
/// Holds a fixed commit graph plus optional trees, blobs and refs. Useful
/// for synthetic histories and for exercising the graph algorithms without
/// touching disk. Populate it with the builder methods, then hand it to
/// [`crate::Repository::from_parts`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    name: String,
    commits: HashMap<CommitId, Commit>,
    trees: HashMap<CommitId, TreeSnapshot>,
    blobs: HashMap<String, Vec<u8>>,
    branches: BTreeMap<String, CommitId>,
    head: Option<String>,
    tags: BTreeMap<String, CommitId>,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Insert (or replace) a commit.
    pub fn insert_commit(&mut self, commit: Commit) -> &mut Self {
        self.commits.insert(commit.id.clone(), commit);
        self
    }

    /// Insert a commit with a synthetic signature at `time` and the given
    /// parents, returning its id.
    pub fn add_commit(&mut self, id: &CommitId, parents: &[&CommitId], time: i64) -> CommitId {
        let sig = Signature {
            name: "test".into(),
            email: "test@localhost".into(),
            time,
            offset_minutes: 0,
        };
        self.insert_commit(Commit {
            id: id.clone(),
            author: sig.clone(),
            committer: Some(sig),
            message: format!("commit {}", id.short(7)),
            parents: parents.iter().map(|p| (*p).clone()).collect(),
        });
        id.clone()
    }

    /// Attach a tree to a commit and register the blob contents it references.
    pub fn insert_tree(
        &mut self,
        commit: &CommitId,
        files: impl IntoIterator<Item = (TreeEntry, Vec<u8>)>,
    ) -> &mut Self {
        let mut entries = Vec::new();
        for (entry, data) in files {
            self.blobs.insert(entry.id.clone(), data);
            entries.push(entry);
        }
        self.trees
            .insert(commit.clone(), TreeSnapshot::new(commit.clone(), entries));
        self
    }

    pub fn insert_blob(&mut self, id: impl Into<String>, data: impl Into<Vec<u8>>) -> &mut Self {
        self.blobs.insert(id.into(), data.into());
        self
    }

    pub fn set_branch(&mut self, name: impl Into<String>, head: &CommitId) -> &mut Self {
        self.branches.insert(name.into(), head.clone());
        self
    }

    /// Point the symbolic `HEAD` at branch `name`.
    pub fn set_head(&mut self, name: impl Into<String>) -> &mut Self {
        self.head = Some(name.into());
        self
    }

    pub fn set_tag(&mut self, name: impl Into<String>, target: &CommitId) -> &mut Self {
        self.tags.insert(name.into(), target.clone());
        self
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }
}

impl ObjectStore for MemoryStore {
    fn get_commit(&self, id: &CommitId) -> Result<Commit> {
        self.commits
            .get(id)
            .cloned()
            .ok_or_else(|| Error::commit_not_found(id))
    }

    fn get_tree(&self, id: &CommitId) -> Result<TreeSnapshot> {
        if !self.commits.contains_key(id) {
            return Err(Error::commit_not_found(id));
        }
        Ok(self
            .trees
            .get(id)
            .cloned()
            .unwrap_or_else(|| TreeSnapshot::new(id.clone(), Vec::new())))
    }

    fn read_blob(&self, id: &str) -> Result<Vec<u8>> {
        self.blobs
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("blob {}", id)))
    }

    fn list_branches(&self) -> Result<Vec<String>> {
        Ok(self.branches.keys().cloned().collect())
    }

    fn list_tags(&self) -> Result<Vec<String>> {
        Ok(self.tags.keys().cloned().collect())
    }

    fn resolve_tag(&self, name: &str) -> Result<CommitId> {
        self.tags
            .get(name)
            .cloned()
            .ok_or_else(|| Error::tag_not_found(name))
    }

    fn resolve_branch(&self, name: &str) -> Result<CommitId> {
        self.branches
            .get(name)
            .cloned()
            .ok_or_else(|| Error::branch_not_found(name))
    }

    fn resolve_head(&self) -> Result<CommitId> {
        self.head
            .as_ref()
            .and_then(|name| self.branches.get(name))
            .cloned()
            .ok_or_else(|| Error::revision_not_found("HEAD"))
    }

    fn describe(&self) -> String {
        format!("in-memory repo {:?}", self.name)
    }
}

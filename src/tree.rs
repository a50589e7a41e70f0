use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::store::ObjectStore;
use crate::types::{CommitId, FileType, TreeEntry, MODE_TREE};

/// The full file hierarchy at one commit, flattened to `path -> entry`.
///
/// Only non-tree entries are stored; directories are implied by path
/// prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeSnapshot {
    commit: CommitId,
    entries: BTreeMap<String, TreeEntry>,
}

impl TreeSnapshot {
    pub fn new(commit: CommitId, entries: impl IntoIterator<Item = TreeEntry>) -> Self {
        Self {
            commit,
            entries: entries
                .into_iter()
                .map(|e| (e.path.clone(), e))
                .collect(),
        }
    }

    pub fn commit(&self) -> &CommitId {
        &self.commit
    }

    /// Look up a non-tree entry by exact path.
    pub fn get(&self, path: &str) -> Option<&TreeEntry> {
        self.entries.get(path)
    }

    /// All entries in path order.
    pub fn entries(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `dir` is an implied directory (the root always is).
    pub fn is_dir(&self, dir: &str) -> bool {
        if dir.is_empty() {
            return true;
        }
        let prefix = format!("{}/", dir);
        self.entries
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(p, _)| p.starts_with(&prefix))
    }
}

/// One child of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    /// Blob id for files; `None` for directories.
    pub id: Option<String>,
    pub mode: u32,
}

impl DirEntry {
    pub fn file_type(&self) -> Option<FileType> {
        FileType::from_mode(self.mode)
    }
}

/// Result of [`FileSystem::stat`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatResult {
    pub file_type: FileType,
    pub mode: u32,
    /// Blob id; `None` for directories.
    pub id: Option<String>,
    /// Content size in bytes (0 for directories).
    pub size: u64,
}

// ---------------------------------------------------------------------------
// FileSystem
// ---------------------------------------------------------------------------

/// A read-only file view over a [`TreeSnapshot`].
///
/// Cheap to clone. Blob contents are read lazily from the object store.
#[derive(Clone)]
pub struct FileSystem {
    store: Arc<dyn ObjectStore>,
    snapshot: Arc<TreeSnapshot>,
}

impl FileSystem {
    pub(crate) fn new(store: Arc<dyn ObjectStore>, snapshot: TreeSnapshot) -> Self {
        Self {
            store,
            snapshot: Arc::new(snapshot),
        }
    }

    /// The commit this view was taken at.
    pub fn commit(&self) -> &CommitId {
        self.snapshot.commit()
    }

    pub fn snapshot(&self) -> &TreeSnapshot {
        &self.snapshot
    }

    /// Read file contents as bytes.
    ///
    /// # Errors
    /// [`Error::NotFound`] if the path is missing, [`Error::IsADirectory`]
    /// if it names a directory.
    pub fn read(&self, path: &str) -> Result<Vec<u8>> {
        let path = normalize(path);
        match self.snapshot.get(path) {
            Some(entry) if entry.mode == crate::types::MODE_COMMIT => {
                Err(Error::not_found(format!("{} is a submodule", path)))
            }
            Some(entry) => self.store.read_blob(&entry.id),
            None if self.snapshot.is_dir(path) => Err(Error::is_a_directory(path)),
            None => Err(Error::not_found(path)),
        }
    }

    /// Read file contents as UTF-8 text (lossy).
    pub fn read_text(&self, path: &str) -> Result<String> {
        let data = self.read(path)?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    pub fn exists(&self, path: &str) -> bool {
        let path = normalize(path);
        self.snapshot.get(path).is_some() || self.snapshot.is_dir(path)
    }

    pub fn is_dir(&self, path: &str) -> bool {
        self.snapshot.is_dir(normalize(path))
    }

    /// # Errors
    /// [`Error::NotFound`] if the path does not exist.
    pub fn file_type(&self, path: &str) -> Result<FileType> {
        Ok(self.stat(path)?.file_type)
    }

    /// Type, mode, id and size of the entry at `path`.
    pub fn stat(&self, path: &str) -> Result<StatResult> {
        let path = normalize(path);
        if let Some(entry) = self.snapshot.get(path) {
            let file_type = entry
                .file_type()
                .ok_or_else(|| Error::git_msg(format!("unknown mode {:o} at {}", entry.mode, path)))?;
            let size = if file_type == FileType::Submodule {
                0
            } else {
                self.store.read_blob(&entry.id)?.len() as u64
            };
            return Ok(StatResult {
                file_type,
                mode: entry.mode,
                id: Some(entry.id.clone()),
                size,
            });
        }
        if self.snapshot.is_dir(path) {
            return Ok(StatResult {
                file_type: FileType::Tree,
                mode: MODE_TREE,
                id: None,
                size: 0,
            });
        }
        Err(Error::not_found(path))
    }

    /// Immediate children of `dir`, sorted by name.
    ///
    /// # Errors
    /// [`Error::NotFound`] if `dir` is not a directory of this snapshot.
    pub fn read_dir(&self, dir: &str) -> Result<Vec<DirEntry>> {
        let dir = normalize(dir);
        if !self.snapshot.is_dir(dir) {
            return Err(Error::not_found(dir));
        }
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{}/", dir)
        };

        let mut children: BTreeMap<String, DirEntry> = BTreeMap::new();
        for entry in self.snapshot.entries() {
            let Some(rest) = entry.path.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((name, _)) => {
                    children.entry(name.to_string()).or_insert_with(|| DirEntry {
                        name: name.to_string(),
                        id: None,
                        mode: MODE_TREE,
                    });
                }
                None => {
                    children.insert(
                        rest.to_string(),
                        DirEntry {
                            name: rest.to_string(),
                            id: Some(entry.id.clone()),
                            mode: entry.mode,
                        },
                    );
                }
            }
        }
        Ok(children.into_values().collect())
    }
}

impl std::fmt::Debug for FileSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSystem")
            .field("store", &self.store.describe())
            .field("commit", self.snapshot.commit())
            .finish()
    }
}

/// Strip leading/trailing slashes so `"/a/b/"` and `"a/b"` name the same path.
fn normalize(path: &str) -> &str {
    path.trim_matches('/')
}

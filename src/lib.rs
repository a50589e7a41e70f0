//! A version-control abstraction layer over git repositories.
//!
//! `vcsgraph` answers history queries (revision resolution, log walks,
//! ancestry, merge-bases, behind/ahead counts) and produces unified diffs
//! natively, by walking the commit graph through an [`ObjectStore`]. Anything
//! the native engine does not cover (blame, search, committer statistics,
//! fetching, exotic revision syntax) is delegated to the `git` toolchain
//! through a per-operation [`DispatchTable`].
//!
//! # Key types
//!
//! - [`Repository`]: the uniform query API. Open one with
//!   [`Repository::open`] or build one from parts with
//!   [`Repository::from_parts`].
//! - [`ObjectStore`]: commit/tree/blob/ref lookups. [`GitObjectStore`] reads
//!   a repository in-process with libgit2; [`MemoryStore`] holds a synthetic
//!   graph.
//! - [`Toolchain`]: the fallback seam, implemented by [`GitCommand`].
//! - [`FileSystem`]: a read-only view of the files at one commit.
//!
//! # Quick example
//!
//! ```rust,no_run
//! use vcsgraph::{CommitsOptions, OpenOptions, Repository};
//!
//! let repo = Repository::open("/path/to/repo", OpenOptions::default()).unwrap();
//! let head = repo.resolve_revision("main").unwrap();
//! let (commits, total) = repo.commits(&CommitsOptions::new(head)).unwrap();
//! println!("{} of {} commits", commits.len(), total);
//! ```

pub mod ancestry;
pub mod diff;
pub mod dispatch;
pub mod error;
pub mod gitcmd;
pub mod memory;
pub mod open;
pub mod repo;
pub mod resolve;
pub mod store;
pub mod tree;
pub mod types;
pub mod walk;

// Re-export primary public types at crate root.
pub use diff::DiffEntry;
pub use dispatch::{DispatchTable, Operation, Strategy};
pub use error::{Error, Result};
pub use gitcmd::{GitCommand, Toolchain};
pub use memory::MemoryStore;
pub use open::{GitOpener, OpenOptions, Opener};
pub use repo::Repository;
pub use store::{GitObjectStore, ObjectStore};
pub use tree::{DirEntry, FileSystem, StatResult, TreeSnapshot};
pub use types::*;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::dispatch::DispatchTable;
use crate::error::Result;
use crate::gitcmd::{GitCommand, Toolchain};
use crate::repo::Repository;
use crate::store::GitObjectStore;
use crate::types::CloneOptions;

/// Options for [`Repository::open`].
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    /// Do not attach the `git` toolchain; fallback-only operations then
    /// fail with [`crate::Error::UnsupportedOperation`].
    pub no_fallback: bool,
    /// `git` executable to use instead of the one on `PATH`.
    pub git_binary: Option<PathBuf>,
    /// Operation routing.
    pub dispatch: DispatchTable,
}

impl OpenOptions {
    fn binary(&self) -> PathBuf {
        self.git_binary.clone().unwrap_or_else(|| PathBuf::from("git"))
    }
}

/// Something that can turn a directory into a [`Repository`].
///
/// Passed explicitly wherever a repository must be opened on demand, so the
/// choice of backend is made by the caller.
pub trait Opener: Send + Sync {
    fn open(&self, dir: &Path) -> Result<Repository>;
}

/// Opens git repositories with the native store and, unless disabled, the
/// `git` toolchain as fallback.
#[derive(Debug, Clone, Default)]
pub struct GitOpener {
    options: OpenOptions,
}

impl GitOpener {
    pub fn new(options: OpenOptions) -> Self {
        Self { options }
    }

    /// Clone `url` into `dir` through the toolchain, then open it.
    ///
    /// # Errors
    /// [`crate::Error::UpstreamFailure`] if `git clone` fails.
    pub fn clone_from_url(&self, url: &str, dir: &Path, opts: &CloneOptions) -> Result<Repository> {
        GitCommand::clone_into(&self.options.binary(), url, dir, opts)?;
        log::info!("cloned {} into {}", url, dir.display());
        self.open(dir)
    }
}

impl Opener for GitOpener {
    fn open(&self, dir: &Path) -> Result<Repository> {
        let store = GitObjectStore::open(dir)?;
        let fallback: Option<Box<dyn Toolchain>> = if self.options.no_fallback {
            None
        } else {
            let git_dir = store.path().to_path_buf();
            Some(Box::new(GitCommand::new(git_dir).with_binary(self.options.binary())))
        };
        log::debug!(
            "opened {} (fallback: {})",
            dir.display(),
            if fallback.is_some() { "git" } else { "none" }
        );
        Repository::from_parts(Arc::new(store), fallback, self.options.dispatch.clone())
    }
}

impl Repository {
    /// Open the git repository at `path` (a work tree or a bare git dir).
    ///
    /// # Arguments
    /// * `path` - Repository directory; `path/.git` is used when present.
    /// * `options` - Fallback and routing configuration.
    ///
    /// # Errors
    /// [`crate::Error::NotFound`] if there is no repository at `path`.
    pub fn open(path: impl AsRef<Path>, options: OpenOptions) -> Result<Self> {
        GitOpener::new(options).open(path.as_ref())
    }

    /// Clone `url` into `dir` and open the result.
    pub fn clone_from_url(
        url: &str,
        dir: impl AsRef<Path>,
        clone: &CloneOptions,
        options: OpenOptions,
    ) -> Result<Self> {
        GitOpener::new(options).clone_from_url(url, dir.as_ref(), clone)
    }

    /// Open `dir` with `opener`.
    pub fn open_with(opener: &dyn Opener, dir: impl AsRef<Path>) -> Result<Self> {
        opener.open(dir.as_ref())
    }
}

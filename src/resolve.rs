use crate::error::{Error, Result};
use crate::gitcmd::Toolchain;
use crate::store::ObjectStore;
use crate::types::CommitId;

/// Resolve a revision specifier to a commit id.
///
/// `HEAD` is read from the store first. Otherwise tries, in order: a tag
/// name, a branch name, a full 40-hex commit id present in the store, then the toolchain (if any) for the richer syntax
/// only it understands (`main~3`, `HEAD^2`, abbreviated ids, ...).
///
/// # Errors
/// [`Error::RevisionNotFound`] once every attempt has failed. Store
/// failures other than "not found" are returned as-is and stop the search.
pub fn resolve_revision(
    store: &dyn ObjectStore,
    fallback: Option<&dyn Toolchain>,
    spec: &str,
) -> Result<CommitId> {
    if spec == "HEAD" {
        match store.resolve_head() {
            Ok(id) => return Ok(id),
            Err(Error::RevisionNotFound(_)) => {}
            Err(e) => return Err(e),
        }
    }
    match store.resolve_tag(spec) {
        Ok(id) => return Ok(id),
        Err(Error::TagNotFound(_)) => {}
        Err(e) => return Err(e),
    }
    match store.resolve_branch(spec) {
        Ok(id) => return Ok(id),
        Err(Error::BranchNotFound(_)) => {}
        Err(e) => return Err(e),
    }
    if CommitId::is_full_hex(spec) {
        let id = CommitId::parse(spec)?;
        match store.get_commit(&id) {
            Ok(_) => return Ok(id),
            Err(Error::CommitNotFound(_)) => {}
            Err(e) => return Err(e),
        }
    }

    let Some(fallback) = fallback else {
        return Err(Error::revision_not_found(spec));
    };
    match fallback.resolve_revision(spec) {
        Ok(id) => {
            log::debug!("{:?} resolved by {}", spec, fallback.describe());
            Ok(id)
        }
        Err(e) => {
            log::debug!("{:?} not resolved by {}: {}", spec, fallback.describe(), e);
            Err(Error::revision_not_found(spec))
        }
    }
}

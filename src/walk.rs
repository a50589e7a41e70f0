use std::collections::HashSet;

use crate::error::Result;
use crate::store::ObjectStore;
use crate::types::{Commit, CommitId, CommitsOptions};

/// Stack-based traversal over the parent graph.
///
/// Each commit is yielded at most once. Parents are pushed in reverse so
/// the first (mainline) parent is popped next. Popping `base` halts the
/// traversal for good.
struct Walk<'a> {
    store: &'a dyn ObjectStore,
    base: Option<&'a CommitId>,
    stack: Vec<CommitId>,
    seen: HashSet<CommitId>,
    primed: Option<Commit>,
    halted: bool,
}

impl<'a> Walk<'a> {
    fn start(store: &'a dyn ObjectStore, head: &CommitId, base: Option<&'a CommitId>) -> Result<Self> {
        let head_commit = store.get_commit(head)?;
        Ok(Self {
            store,
            base,
            stack: vec![head.clone()],
            seen: HashSet::new(),
            primed: Some(head_commit),
            halted: false,
        })
    }

    fn next_commit(&mut self) -> Result<Option<Commit>> {
        while !self.halted {
            let Some(id) = self.stack.pop() else {
                return Ok(None);
            };
            if self.base == Some(&id) {
                self.halted = true;
                break;
            }
            if !self.seen.insert(id.clone()) {
                continue;
            }
            let commit = match self.primed.take() {
                Some(c) if c.id == id => c,
                _ => self.store.get_commit(&id)?,
            };
            self.stack.extend(commit.parents.iter().rev().cloned());
            return Ok(Some(commit));
        }
        Ok(None)
    }
}

/// Return the commits reachable from `opts.head`, and the total count.
///
/// The total is not subject to `limit`/`skip`. When `opts.no_total` is set
/// the walk stops as soon as `limit` commits have been collected and the
/// total is reported as `0`; otherwise the rest of the reachable history is
/// walked just to count it, which can be expensive on large histories.
///
/// # Errors
/// Returns [`crate::Error::CommitNotFound`] if `head` (or any commit on the
/// way) cannot be loaded. Partial results are never returned.
pub fn commits(store: &dyn ObjectStore, opts: &CommitsOptions) -> Result<(Vec<Commit>, usize)> {
    let mut walk = Walk::start(store, &opts.head, opts.base.as_ref())?;
    let mut commits = Vec::new();
    let mut total = 0usize;

    while opts.limit == 0 || commits.len() < opts.limit {
        let Some(commit) = walk.next_commit()? else {
            break;
        };
        if total >= opts.skip {
            commits.push(commit);
        }
        total += 1;
    }

    if opts.no_total {
        return Ok((commits, 0));
    }

    while walk.next_commit()?.is_some() {
        total += 1;
    }

    log::trace!(
        "walked {} from {}: {} returned, {} total",
        store.describe(),
        opts.head.short(7),
        commits.len(),
        total
    );
    Ok((commits, total))
}

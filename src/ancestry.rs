//! Ancestor, behind/ahead and merge-base queries.
//!
//! Behind/ahead and cross-repository merge-bases are set operations over
//! [`reachable`] maps: a breadth-first expansion over parent edges recording
//! each commit's minimum edge distance from a start point. Merge-bases
//! within one store paint both histories newest-first and stop as soon as
//! every pending commit lies below a common ancestor already found.
//! Traversal state lives only for the duration of one query.

use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use crate::error::{Error, Result};
use crate::store::ObjectStore;
use crate::types::{BehindAhead, CommitId};

/// Commit id -> minimum number of parent edges from the start commit.
pub type Reachable = HashMap<CommitId, usize>;

struct Node {
    parents: Vec<CommitId>,
    time: i64,
}

/// Per-query commit lookup, memoised so each commit is fetched once.
pub(crate) struct ParentCache<'a> {
    store: &'a dyn ObjectStore,
    nodes: HashMap<CommitId, Node>,
}

impl<'a> ParentCache<'a> {
    pub(crate) fn new(store: &'a dyn ObjectStore) -> Self {
        Self {
            store,
            nodes: HashMap::new(),
        }
    }

    fn node(&mut self, id: &CommitId) -> Result<&Node> {
        if !self.nodes.contains_key(id) {
            let commit = self.store.get_commit(id)?;
            let time = commit
                .committer
                .as_ref()
                .map_or(commit.author.time, |c| c.time);
            self.nodes.insert(
                id.clone(),
                Node {
                    parents: commit.parents,
                    time,
                },
            );
        }
        Ok(&self.nodes[id])
    }

    fn parents(&mut self, id: &CommitId) -> Result<&[CommitId]> {
        Ok(&self.node(id)?.parents)
    }

    /// Committer time, or author time when there is no committer.
    fn time(&mut self, id: &CommitId) -> Result<i64> {
        Ok(self.node(id)?.time)
    }
}

/// Every commit reachable from `start` (inclusive), with its distance.
///
/// # Errors
/// Any lookup failure aborts the whole expansion.
pub(crate) fn reachable(cache: &mut ParentCache<'_>, start: &CommitId) -> Result<Reachable> {
    let mut dist = Reachable::new();
    let mut queue = VecDeque::new();
    cache.parents(start)?;
    dist.insert(start.clone(), 0);
    queue.push_back(start.clone());

    while let Some(id) = queue.pop_front() {
        let d = dist[&id];
        let parents = cache.parents(&id)?.to_vec();
        for parent in parents {
            if !dist.contains_key(&parent) {
                dist.insert(parent.clone(), d + 1);
                queue.push_back(parent);
            }
        }
    }
    Ok(dist)
}

/// Whether `candidate` is reachable from `descendant` by parent edges.
///
/// Reflexive: a commit is its own ancestor. Stops as soon as `candidate`
/// is found.
pub fn is_ancestor(store: &dyn ObjectStore, candidate: &CommitId, descendant: &CommitId) -> Result<bool> {
    store.get_commit(candidate)?;
    reaches(&mut ParentCache::new(store), candidate, descendant)
}

fn reaches(cache: &mut ParentCache<'_>, candidate: &CommitId, descendant: &CommitId) -> Result<bool> {
    if candidate == descendant {
        return Ok(true);
    }
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([descendant.clone()]);
    seen.insert(descendant.clone());

    while let Some(id) = queue.pop_front() {
        let parents = cache.parents(&id)?.to_vec();
        for parent in parents {
            if parent == *candidate {
                return Ok(true);
            }
            if seen.insert(parent.clone()) {
                queue.push_back(parent);
            }
        }
    }
    Ok(false)
}

/// Commits unique to `a` (`ahead`) and unique to `b` (`behind`).
///
/// # Errors
/// [`Error::NoCommonAncestor`] if the two histories never converge.
pub fn behind_ahead(store: &dyn ObjectStore, a: &CommitId, b: &CommitId) -> Result<BehindAhead> {
    let mut cache = ParentCache::new(store);
    let from_a = reachable(&mut cache, a)?;
    let from_b = reachable(&mut cache, b)?;

    if !from_a.keys().any(|id| from_b.contains_key(id)) {
        return Err(Error::no_common_ancestor(a, b));
    }

    let ahead = from_a.keys().filter(|id| !from_b.contains_key(*id)).count();
    let behind = from_b.keys().filter(|id| !from_a.contains_key(*id)).count();
    log::debug!(
        "behind/ahead {} {}: behind={} ahead={}",
        a.short(7),
        b.short(7),
        behind,
        ahead
    );
    Ok(BehindAhead {
        behind: count_u32(behind),
        ahead: count_u32(ahead),
    })
}

/// All lowest common ancestors of `a` and `b`, best first.
///
/// A common ancestor is "lowest" when none of its children is itself a
/// common ancestor. Candidates are ordered by combined distance from `a`
/// and `b`, then by id, so the order is deterministic and symmetric.
pub fn merge_bases(store: &dyn ObjectStore, a: &CommitId, b: &CommitId) -> Result<Vec<CommitId>> {
    let mut cache = ParentCache::new(store);
    let found = paint_down(&mut cache, a, b)?;
    let lowest = remove_redundant(&mut cache, found)?;
    rank(&mut cache, a, b, lowest)
}

/// The preferred lowest common ancestor of `a` and `b`.
///
/// When several exist (criss-cross merges) the one closest to both inputs
/// wins; callers must not depend on which one that is.
///
/// # Errors
/// [`Error::NoCommonAncestor`] if the histories never converge.
pub fn merge_base(store: &dyn ObjectStore, a: &CommitId, b: &CommitId) -> Result<CommitId> {
    merge_bases(store, a, b)?
        .into_iter()
        .next()
        .ok_or_else(|| Error::no_common_ancestor(a, b))
}

/// Merge-base of two commits that live in two different object stores.
///
/// Reachability of `a` is computed against `store_a` and of `b` against
/// `store_b`; the sets are intersected by commit id, so a result exists only
/// if the histories actually share commit objects (e.g. a fork).
pub fn cross_repo_merge_base(
    store_a: &dyn ObjectStore,
    a: &CommitId,
    store_b: &dyn ObjectStore,
    b: &CommitId,
) -> Result<CommitId> {
    let mut cache_a = ParentCache::new(store_a);
    let mut cache_b = ParentCache::new(store_b);
    let from_a = reachable(&mut cache_a, a)?;
    let from_b = reachable(&mut cache_b, b)?;

    // Common commits are all in `from_a`, so their parents are already cached on side A.
    lowest_common(&mut cache_a, &from_a, &from_b)?
        .into_iter()
        .next()
        .ok_or_else(|| Error::no_common_ancestor(a, b))
}

fn lowest_common(cache: &mut ParentCache<'_>, from_a: &Reachable, from_b: &Reachable) -> Result<Vec<CommitId>> {
    let common: Vec<&CommitId> = from_a.keys().filter(|id| from_b.contains_key(*id)).collect();

    let mut dominated = HashSet::new();
    for id in &common {
        for parent in cache.parents(id)? {
            dominated.insert(parent.clone());
        }
    }

    let mut best: Vec<(usize, CommitId)> = common
        .into_iter()
        .filter(|id| !dominated.contains(*id))
        .map(|id| (from_a[id] + from_b[id], id.clone()))
        .collect();
    best.sort();
    log::debug!("merge-base candidates: {}", best.len());
    Ok(best.into_iter().map(|(_, id)| id).collect())
}

const FROM_A: u8 = 1;
const FROM_B: u8 = 2;
const STALE: u8 = 4;

/// Common ancestors of `a` and `b` with no common ancestor above them on
/// the paths painted so far. May include redundant entries (one an ancestor
/// of another); never misses a lowest one.
///
/// Commits are expanded newest first. A commit painted from both sides is
/// recorded and its ancestors are painted stale; the walk ends once only
/// stale commits are pending.
fn paint_down(cache: &mut ParentCache<'_>, a: &CommitId, b: &CommitId) -> Result<Vec<CommitId>> {
    let mut flags: HashMap<CommitId, u8> = HashMap::new();
    let mut queue = BinaryHeap::new();
    let mut found = Vec::new();

    flags.insert(a.clone(), FROM_A);
    *flags.entry(b.clone()).or_insert(0) |= FROM_B;
    queue.push((cache.time(a)?, a.clone()));
    queue.push((cache.time(b)?, b.clone()));

    let mut visited = 0usize;
    while queue
        .iter()
        .any(|(_, id)| flags.get(id).map_or(false, |f| f & STALE == 0))
    {
        let Some((_, id)) = queue.pop() else {
            break;
        };
        visited += 1;
        let mut f = flags.get(&id).copied().unwrap_or(0);
        if f & (FROM_A | FROM_B) == (FROM_A | FROM_B) && f & STALE == 0 {
            f |= STALE;
            flags.insert(id.clone(), f);
            found.push(id.clone());
        }
        let parents = cache.parents(&id)?.to_vec();
        for parent in parents {
            let painted = flags.entry(parent.clone()).or_insert(0);
            if *painted & f == f {
                continue;
            }
            *painted |= f;
            queue.push((cache.time(&parent)?, parent));
        }
    }
    log::trace!(
        "merge-base {} {}: {} candidates after {} steps",
        a.short(7),
        b.short(7),
        found.len(),
        visited
    );
    Ok(found)
}

/// Drop every candidate that is an ancestor of another candidate.
fn remove_redundant(cache: &mut ParentCache<'_>, found: Vec<CommitId>) -> Result<Vec<CommitId>> {
    if found.len() < 2 {
        return Ok(found);
    }
    let mut lowest = Vec::new();
    for candidate in &found {
        let mut redundant = false;
        for other in &found {
            if other != candidate && reaches(cache, candidate, other)? {
                redundant = true;
                break;
            }
        }
        if !redundant {
            lowest.push(candidate.clone());
        }
    }
    Ok(lowest)
}

/// Order merge-bases by combined distance from `a` and `b`, then by id.
fn rank(cache: &mut ParentCache<'_>, a: &CommitId, b: &CommitId, bases: Vec<CommitId>) -> Result<Vec<CommitId>> {
    if bases.len() < 2 {
        return Ok(bases);
    }
    let from_a = distances(cache, a, &bases)?;
    let from_b = distances(cache, b, &bases)?;
    let mut ranked: Vec<(usize, CommitId)> = bases
        .into_iter()
        .map(|id| {
            let d_a = from_a.get(&id).copied().unwrap_or(usize::MAX);
            let d_b = from_b.get(&id).copied().unwrap_or(usize::MAX);
            (d_a.saturating_add(d_b), id)
        })
        .collect();
    ranked.sort();
    log::debug!("merge-base candidates: {}", ranked.len());
    Ok(ranked.into_iter().map(|(_, id)| id).collect())
}

/// Edge distance from `start` to each of `targets`, stopping once all are
/// reached.
fn distances(cache: &mut ParentCache<'_>, start: &CommitId, targets: &[CommitId]) -> Result<Reachable> {
    let mut pending: HashSet<&CommitId> = targets.iter().collect();
    let mut dist = Reachable::new();
    let mut found = Reachable::new();
    let mut queue = VecDeque::from([start.clone()]);
    dist.insert(start.clone(), 0);

    while let Some(id) = queue.pop_front() {
        let d = dist[&id];
        if pending.remove(&id) {
            found.insert(id.clone(), d);
            if pending.is_empty() {
                break;
            }
        }
        let parents = cache.parents(&id)?.to_vec();
        for parent in parents {
            if !dist.contains_key(&parent) {
                dist.insert(parent.clone(), d + 1);
                queue.push_back(parent);
            }
        }
    }
    Ok(found)
}

fn count_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

mod common;

use std::sync::Arc;

use vcsgraph::*;

// ---------------------------------------------------------------------------
// single repository
// ---------------------------------------------------------------------------

#[test]
fn fork_merge_base_and_counts() {
    let dir = tempfile::tempdir().unwrap();
    let git = common::init_repo(dir.path());
    let f = common::forked(&git);
    let repo = common::open_native(dir.path());

    assert_eq!(repo.merge_base(&f.c, &f.d).unwrap(), f.a);
    assert_eq!(repo.merge_base(&f.d, &f.c).unwrap(), f.a);
    assert_eq!(
        repo.behind_ahead(&f.c, &f.d).unwrap(),
        BehindAhead { behind: 1, ahead: 2 }
    );
    assert_eq!(
        repo.behind_ahead(&f.d, &f.c).unwrap(),
        BehindAhead { behind: 2, ahead: 1 }
    );
    assert_eq!(repo.behind_ahead(&f.c, &f.c).unwrap(), BehindAhead::default());
}

#[test]
fn ancestry_relation() {
    let dir = tempfile::tempdir().unwrap();
    let git = common::init_repo(dir.path());
    let f = common::forked(&git);
    let repo = common::open_native(dir.path());

    assert!(repo.is_ancestor(&f.a, &f.a).unwrap());
    assert!(repo.is_ancestor(&f.a, &f.c).unwrap());
    assert!(repo.is_ancestor(&f.a, &f.d).unwrap());
    assert!(repo.is_ancestor(&f.b, &f.c).unwrap());
    assert!(!repo.is_ancestor(&f.c, &f.b).unwrap());
    assert!(!repo.is_ancestor(&f.b, &f.d).unwrap());
}

#[test]
fn unrelated_roots_have_no_merge_base() {
    let dir = tempfile::tempdir().unwrap();
    let git = common::init_repo(dir.path());
    let f = common::forked(&git);
    let orphan = common::commit(&git, &[("other", "x\n")], &[], 5_000, "orphan");
    let repo = common::open_native(dir.path());

    assert!(matches!(
        repo.merge_base(&f.c, &orphan),
        Err(Error::NoCommonAncestor { .. })
    ));
    assert!(matches!(
        repo.behind_ahead(&f.c, &orphan),
        Err(Error::NoCommonAncestor { .. })
    ));
    assert!(!repo.is_ancestor(&orphan, &f.c).unwrap());
}

#[test]
fn criss_cross_merge_bases() {
    let dir = tempfile::tempdir().unwrap();
    let git = common::init_repo(dir.path());
    let root = common::commit(&git, &[("f", "0\n")], &[], 1_000, "root");
    let x = common::commit(&git, &[("f", "x\n")], &[&root], 2_000, "x");
    let y = common::commit(&git, &[("f", "y\n")], &[&root], 2_000, "y");
    let m1 = common::commit(&git, &[("f", "m1\n")], &[&x, &y], 3_000, "m1");
    let m2 = common::commit(&git, &[("f", "m2\n")], &[&y, &x], 3_000, "m2");
    let repo = common::open_native(dir.path());

    let bases = repo.merge_bases(&m1, &m2).unwrap();
    let mut expected = vec![x.clone(), y.clone()];
    expected.sort();
    assert_eq!(bases, expected);

    let chosen = repo.merge_base(&m1, &m2).unwrap();
    assert_eq!(chosen, repo.merge_base(&m2, &m1).unwrap());
    assert_eq!(chosen, expected[0]);
}

#[test]
fn native_merge_base_agrees_with_git() {
    if !common::git_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let git = common::init_repo(dir.path());
    let f = common::forked(&git);
    let repo = common::open(dir.path());

    let fallback = Repository::from_parts(
        Arc::new(GitObjectStore::open(dir.path()).unwrap()),
        Some(Box::new(GitCommand::new(repo.git_dir().unwrap()))),
        DispatchTable::prefer_fallback(),
    )
    .unwrap();

    assert_eq!(fallback.merge_base(&f.c, &f.d).unwrap(), f.a);
    assert_eq!(
        repo.merge_base(&f.b, &f.d).unwrap(),
        fallback.merge_base(&f.b, &f.d).unwrap()
    );
    let orphan = common::commit(&git, &[("o", "o\n")], &[], 9_000, "orphan");
    assert!(matches!(
        fallback.merge_base(&f.c, &orphan),
        Err(Error::NoCommonAncestor { .. })
    ));
}

// ---------------------------------------------------------------------------
// cross-repository
// ---------------------------------------------------------------------------

/// Two repositories sharing root `A`; left adds `B`, right adds `C -> D`.
fn shared_root(left_dir: &std::path::Path, right_dir: &std::path::Path) -> (CommitId, CommitId, CommitId) {
    let left = common::init_repo(left_dir);
    let right = common::init_repo(right_dir);
    let a_left = common::commit(&left, &[("f", "a\n")], &[], 1_000, "A");
    let a_right = common::commit(&right, &[("f", "a\n")], &[], 1_000, "A");
    assert_eq!(a_left, a_right);
    let b = common::commit(&left, &[("f", "b\n")], &[&a_left], 2_000, "B");
    let c = common::commit(&right, &[("f", "c\n")], &[&a_right], 2_000, "C");
    let d = common::commit(&right, &[("f", "d\n")], &[&c], 3_000, "D");
    common::set_branch(&left, "main", &b);
    common::set_branch(&right, "main", &d);
    (a_left, b, d)
}

#[test]
fn cross_repo_merge_base_shared_root() {
    let left_dir = tempfile::tempdir().unwrap();
    let right_dir = tempfile::tempdir().unwrap();
    let (a, b, d) = shared_root(left_dir.path(), right_dir.path());

    let left = common::open_native(left_dir.path());
    let right = common::open_native(right_dir.path());
    assert_eq!(left.cross_repo_merge_base(&b, &right, &d).unwrap(), a);
    assert_eq!(right.cross_repo_merge_base(&d, &left, &b).unwrap(), a);
}

#[test]
fn cross_repo_merge_base_without_shared_history() {
    let left_dir = tempfile::tempdir().unwrap();
    let right_dir = tempfile::tempdir().unwrap();
    let left_git = common::init_repo(left_dir.path());
    let right_git = common::init_repo(right_dir.path());
    let l = common::commit(&left_git, &[("f", "l\n")], &[], 1_000, "left root");
    let r = common::commit(&right_git, &[("f", "r\n")], &[], 1_000, "right root");

    let left = common::open_native(left_dir.path());
    let right = common::open_native(right_dir.path());
    assert!(matches!(
        left.cross_repo_merge_base(&l, &right, &r),
        Err(Error::NoCommonAncestor { .. })
    ));
}

#[test]
fn cross_repo_merge_base_through_git() {
    if !common::git_available() {
        return;
    }
    let left_dir = tempfile::tempdir().unwrap();
    let right_dir = tempfile::tempdir().unwrap();
    let (a, b, d) = shared_root(left_dir.path(), right_dir.path());

    let mut table = DispatchTable::default();
    table
        .route(Operation::CrossRepoMergeBase, Strategy::Fallback)
        .unwrap();
    let left = Repository::open(
        left_dir.path(),
        OpenOptions {
            dispatch: table,
            ..Default::default()
        },
    )
    .unwrap();
    let right = common::open(right_dir.path());
    assert_eq!(left.cross_repo_merge_base(&b, &right, &d).unwrap(), a);
}

#[test]
fn cross_repo_merge_base_over_memory_stores() {
    let id = |n: u8| CommitId::from_trusted(format!("{:040x}", n));
    let mut left = MemoryStore::new("left");
    left.add_commit(&id(1), &[], 100);
    left.add_commit(&id(2), &[&id(1)], 200);
    let mut right = MemoryStore::new("right");
    right.add_commit(&id(1), &[], 100);
    right.add_commit(&id(3), &[&id(1)], 300);

    let left = Repository::from_store(left);
    let right = Repository::from_store(right);
    assert_eq!(left.cross_repo_merge_base(&id(2), &right, &id(3)).unwrap(), id(1));
}

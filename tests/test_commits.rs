mod common;

use vcsgraph::*;

/// root -> c1 -> c2 -> c3 on `main`.
fn linear(dir: &std::path::Path) -> Vec<CommitId> {
    let git = common::init_repo(dir);
    let root = common::commit(&git, &[("f", "0\n")], &[], 1_000, "root");
    let c1 = common::commit(&git, &[("f", "1\n")], &[&root], 2_000, "c1");
    let c2 = common::commit(&git, &[("f", "2\n")], &[&c1], 3_000, "c2");
    let c3 = common::commit(&git, &[("f", "3\n")], &[&c2], 4_000, "c3\n\nbody text\n");
    common::set_branch(&git, "main", &c3);
    vec![root, c1, c2, c3]
}

fn ids(commits: &[Commit]) -> Vec<CommitId> {
    commits.iter().map(|c| c.id.clone()).collect()
}

// ---------------------------------------------------------------------------
// get_commit
// ---------------------------------------------------------------------------

#[test]
fn get_commit_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let c = linear(dir.path());
    let repo = common::open_native(dir.path());

    let commit = repo.get_commit(&c[3]).unwrap();
    assert_eq!(commit.id, c[3]);
    assert_eq!(commit.parents, vec![c[2].clone()]);
    assert_eq!(commit.author.name, "Test User");
    assert_eq!(commit.author.email, "test@example.com");
    assert_eq!(commit.author.time, 4_000);
    assert_eq!(commit.committer.as_ref().unwrap().time, 4_000);
    assert_eq!(commit.message, "c3\n\nbody text");
    assert_eq!(commit.summary(), "c3");
    assert!(repo.get_commit(&c[0]).unwrap().is_root());
}

#[test]
fn get_missing_commit() {
    let dir = tempfile::tempdir().unwrap();
    linear(dir.path());
    let repo = common::open_native(dir.path());
    let missing = CommitId::parse("1234567890123456789012345678901234567890").unwrap();
    assert!(matches!(repo.get_commit(&missing), Err(Error::CommitNotFound(_))));
}

// ---------------------------------------------------------------------------
// commits
// ---------------------------------------------------------------------------

#[test]
fn walk_to_base_excludes_base() {
    let dir = tempfile::tempdir().unwrap();
    let c = linear(dir.path());
    let repo = common::open_native(dir.path());

    let opts = CommitsOptions {
        base: Some(c[0].clone()),
        ..CommitsOptions::new(c[3].clone())
    };
    let (commits, total) = repo.commits(&opts).unwrap();
    assert_eq!(ids(&commits), vec![c[3].clone(), c[2].clone(), c[1].clone()]);
    assert_eq!(total, 3);
}

#[test]
fn walk_whole_history() {
    let dir = tempfile::tempdir().unwrap();
    let c = linear(dir.path());
    let repo = common::open_native(dir.path());

    let (commits, total) = repo.commits(&CommitsOptions::new(c[3].clone())).unwrap();
    assert_eq!(commits.len(), 4);
    assert_eq!(total, 4);
    assert_eq!(commits.last().unwrap().id, c[0]);
}

#[test]
fn skip_limit_no_total() {
    let dir = tempfile::tempdir().unwrap();
    let c = linear(dir.path());
    let repo = common::open_native(dir.path());

    let opts = CommitsOptions {
        limit: 1,
        skip: 1,
        no_total: true,
        ..CommitsOptions::new(c[3].clone())
    };
    let (commits, total) = repo.commits(&opts).unwrap();
    assert_eq!(ids(&commits), vec![c[2].clone()]);
    assert_eq!(total, 0);
}

#[test]
fn limit_keeps_counting_total() {
    let dir = tempfile::tempdir().unwrap();
    let c = linear(dir.path());
    let repo = common::open_native(dir.path());

    let opts = CommitsOptions {
        limit: 2,
        ..CommitsOptions::new(c[3].clone())
    };
    let (commits, total) = repo.commits(&opts).unwrap();
    assert_eq!(ids(&commits), vec![c[3].clone(), c[2].clone()]);
    assert_eq!(total, 4);
}

#[test]
fn merge_history_visits_each_commit_once() {
    let dir = tempfile::tempdir().unwrap();
    let git = common::init_repo(dir.path());
    let root = common::commit(&git, &[("f", "r\n")], &[], 1_000, "root");
    let left = common::commit(&git, &[("f", "l\n")], &[&root], 2_000, "left");
    let right = common::commit(&git, &[("g", "r\n")], &[&root], 2_100, "right");
    let merge = common::commit(&git, &[("f", "l\n"), ("g", "r\n")], &[&left, &right], 3_000, "merge");
    let repo = common::open_native(dir.path());

    let (commits, total) = repo.commits(&CommitsOptions::new(merge.clone())).unwrap();
    assert_eq!(total, 4);
    assert_eq!(ids(&commits), vec![merge, left, root, right]);
}

#[test]
fn walk_from_missing_head_fails() {
    let dir = tempfile::tempdir().unwrap();
    linear(dir.path());
    let repo = common::open_native(dir.path());
    let missing = CommitId::parse("1234567890123456789012345678901234567890").unwrap();
    assert!(matches!(
        repo.commits(&CommitsOptions::new(missing)),
        Err(Error::CommitNotFound(_))
    ));
}

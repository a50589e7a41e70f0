#![allow(dead_code)]

use std::path::Path;
use std::process::Command;

use git2::build::TreeUpdateBuilder;
use git2::{FileMode, Time};

use vcsgraph::*;

/// Create a non-bare repository whose HEAD points at `refs/heads/main`.
pub fn init_repo(dir: &Path) -> git2::Repository {
    let mut opts = git2::RepositoryInitOptions::new();
    opts.initial_head("main");
    git2::Repository::init_opts(dir, &opts).unwrap()
}

/// Write a commit whose tree holds exactly `files`, without touching any ref.
///
/// Paths may be nested. The signature and timestamp are fixed, so the same
/// arguments always produce the same commit id, in any repository.
pub fn commit(
    repo: &git2::Repository,
    files: &[(&str, &str)],
    parents: &[&CommitId],
    time: i64,
    message: &str,
) -> CommitId {
    commit_as(repo, "Test User", "test@example.com", files, parents, time, message)
}

pub fn commit_as(
    repo: &git2::Repository,
    name: &str,
    email: &str,
    files: &[(&str, &str)],
    parents: &[&CommitId],
    time: i64,
    message: &str,
) -> CommitId {
    let entries: Vec<(&str, &str, FileMode)> = files
        .iter()
        .map(|(path, data)| (*path, *data, FileMode::Blob))
        .collect();
    commit_entries(repo, name, email, &entries, parents, time, message)
}

pub fn commit_entries(
    repo: &git2::Repository,
    name: &str,
    email: &str,
    files: &[(&str, &str, FileMode)],
    parents: &[&CommitId],
    time: i64,
    message: &str,
) -> CommitId {
    let files: Vec<(&str, &[u8], FileMode)> = files
        .iter()
        .map(|(path, data, mode)| (*path, data.as_bytes(), *mode))
        .collect();
    write_commit(repo, name, email, &files, parents, time, message)
}

/// Like [`commit`], for arbitrary (possibly non-UTF-8) contents and modes.
pub fn commit_bytes(
    repo: &git2::Repository,
    files: &[(&str, &[u8], FileMode)],
    parents: &[&CommitId],
    time: i64,
    message: &str,
) -> CommitId {
    write_commit(repo, "Test User", "test@example.com", files, parents, time, message)
}

fn write_commit(
    repo: &git2::Repository,
    name: &str,
    email: &str,
    files: &[(&str, &[u8], FileMode)],
    parents: &[&CommitId],
    time: i64,
    message: &str,
) -> CommitId {
    let empty = repo.treebuilder(None).unwrap().write().unwrap();
    let baseline = repo.find_tree(empty).unwrap();
    let mut update = TreeUpdateBuilder::new();
    for (path, data, mode) in files {
        let blob = repo.blob(data).unwrap();
        update.upsert(*path, blob, *mode);
    }
    let tree_id = update.create_updated(repo, &baseline).unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    let sig = git2::Signature::new(name, email, &Time::new(time, 0)).unwrap();
    let parents: Vec<git2::Commit<'_>> = parents
        .iter()
        .map(|p| repo.find_commit(git2::Oid::from_str(p.as_str()).unwrap()).unwrap())
        .collect();
    let parent_refs: Vec<&git2::Commit<'_>> = parents.iter().collect();
    let oid = repo
        .commit(None, &sig, &sig, message, &tree, &parent_refs)
        .unwrap();
    CommitId::from(oid)
}

pub fn set_branch(repo: &git2::Repository, name: &str, id: &CommitId) {
    let oid = git2::Oid::from_str(id.as_str()).unwrap();
    repo.reference(&format!("refs/heads/{}", name), oid, true, "test")
        .unwrap();
}

pub fn set_tag(repo: &git2::Repository, name: &str, id: &CommitId) {
    let oid = git2::Oid::from_str(id.as_str()).unwrap();
    repo.reference(&format!("refs/tags/{}", name), oid, true, "test")
        .unwrap();
}

pub fn set_annotated_tag(repo: &git2::Repository, name: &str, id: &CommitId) {
    let obj = repo
        .find_object(git2::Oid::from_str(id.as_str()).unwrap(), None)
        .unwrap();
    let sig = git2::Signature::new("Tagger", "tagger@example.com", &Time::new(1_000, 0)).unwrap();
    repo.tag(name, &obj, &sig, "annotated", true).unwrap();
}

/// Open with the `git` fallback attached.
pub fn open(dir: &Path) -> Repository {
    Repository::open(dir, OpenOptions::default()).unwrap()
}

/// Open with the native store only.
pub fn open_native(dir: &Path) -> Repository {
    Repository::open(
        dir,
        OpenOptions {
            no_fallback: true,
            ..Default::default()
        },
    )
    .unwrap()
}

/// Whether a working `git` executable is on `PATH`.
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Commits of the fork fixture:
///
/// ```text
/// main:    A -> B -> C
/// feature: A -> D
/// ```
pub struct Forked {
    pub a: CommitId,
    pub b: CommitId,
    pub c: CommitId,
    pub d: CommitId,
}

pub fn forked(repo: &git2::Repository) -> Forked {
    let a = commit(repo, &[("file.txt", "a\n")], &[], 1_000, "A");
    let b = commit(repo, &[("file.txt", "a\nb\n")], &[&a], 2_000, "B");
    let c = commit(repo, &[("file.txt", "a\nb\nc\n")], &[&b], 3_000, "C");
    let d = commit(repo, &[("file.txt", "a\n"), ("feature.txt", "d\n")], &[&a], 2_500, "D");
    set_branch(repo, "main", &c);
    set_branch(repo, "feature", &d);
    Forked { a, b, c, d }
}

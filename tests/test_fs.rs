mod common;

use git2::FileMode;
use vcsgraph::*;

fn snapshot_repo(dir: &std::path::Path) -> (Repository, CommitId) {
    let git = common::init_repo(dir);
    let id = common::commit_entries(
        &git,
        "T",
        "t@t",
        &[
            ("README.md", "# readme\n", FileMode::Blob),
            ("src/lib.rs", "pub fn f() {}\n", FileMode::Blob),
            ("src/bin/tool.sh", "#!/bin/sh\n", FileMode::BlobExecutable),
            ("link", "README.md", FileMode::Link),
        ],
        &[],
        1_000,
        "files",
    );
    (common::open_native(dir), id)
}

// ---------------------------------------------------------------------------
// read
// ---------------------------------------------------------------------------

#[test]
fn read_files() {
    let dir = tempfile::tempdir().unwrap();
    let (repo, id) = snapshot_repo(dir.path());
    let fs = repo.file_system(&id).unwrap();

    assert_eq!(fs.commit(), &id);
    assert_eq!(fs.read("README.md").unwrap(), b"# readme\n");
    assert_eq!(fs.read_text("/src/lib.rs").unwrap(), "pub fn f() {}\n");
}

#[test]
fn read_errors() {
    let dir = tempfile::tempdir().unwrap();
    let (repo, id) = snapshot_repo(dir.path());
    let fs = repo.file_system(&id).unwrap();

    assert!(matches!(fs.read("nope.txt"), Err(Error::NotFound(_))));
    assert!(matches!(fs.read("src"), Err(Error::IsADirectory(_))));
    assert!(matches!(fs.read(""), Err(Error::IsADirectory(_))));
}

#[test]
fn file_system_at_missing_commit() {
    let dir = tempfile::tempdir().unwrap();
    let (repo, _) = snapshot_repo(dir.path());
    let missing = CommitId::parse("1234567890123456789012345678901234567890").unwrap();
    assert!(matches!(
        repo.file_system(&missing),
        Err(Error::CommitNotFound(_))
    ));
}

// ---------------------------------------------------------------------------
// stat / exists
// ---------------------------------------------------------------------------

#[test]
fn stat_types_and_sizes() {
    let dir = tempfile::tempdir().unwrap();
    let (repo, id) = snapshot_repo(dir.path());
    let fs = repo.file_system(&id).unwrap();

    let readme = fs.stat("README.md").unwrap();
    assert_eq!(readme.file_type, FileType::Blob);
    assert_eq!(readme.mode, MODE_BLOB);
    assert_eq!(readme.size, 9);
    assert!(readme.id.is_some());

    assert_eq!(fs.file_type("src/bin/tool.sh").unwrap(), FileType::Executable);
    assert_eq!(fs.file_type("link").unwrap(), FileType::Link);

    let src = fs.stat("src").unwrap();
    assert_eq!(src.file_type, FileType::Tree);
    assert_eq!(src.id, None);

    assert!(matches!(fs.stat("missing"), Err(Error::NotFound(_))));
}

#[test]
fn exists_and_is_dir() {
    let dir = tempfile::tempdir().unwrap();
    let (repo, id) = snapshot_repo(dir.path());
    let fs = repo.file_system(&id).unwrap();

    assert!(fs.exists("README.md"));
    assert!(fs.exists("src/bin"));
    assert!(!fs.exists("src/main.rs"));
    assert!(fs.is_dir("src"));
    assert!(fs.is_dir(""));
    assert!(!fs.is_dir("README.md"));
}

// ---------------------------------------------------------------------------
// read_dir
// ---------------------------------------------------------------------------

#[test]
fn read_dir_lists_immediate_children() {
    let dir = tempfile::tempdir().unwrap();
    let (repo, id) = snapshot_repo(dir.path());
    let fs = repo.file_system(&id).unwrap();

    let root: Vec<String> = fs.read_dir("").unwrap().into_iter().map(|e| e.name).collect();
    assert_eq!(root, vec!["README.md", "link", "src"]);

    let src = fs.read_dir("src").unwrap();
    assert_eq!(src.len(), 2);
    assert_eq!(src[0].name, "bin");
    assert_eq!(src[0].file_type(), Some(FileType::Tree));
    assert_eq!(src[1].name, "lib.rs");
    assert_eq!(src[1].file_type(), Some(FileType::Blob));

    assert!(matches!(fs.read_dir("README.md"), Err(Error::NotFound(_))));
}

#[test]
fn memory_store_file_system() {
    let id = CommitId::from_trusted(format!("{:040x}", 1));
    let mut store = MemoryStore::new("files");
    store.add_commit(&id, &[], 100);
    store.insert_tree(
        &id,
        vec![(
            TreeEntry {
                path: "a/b.txt".into(),
                id: "b0b".into(),
                mode: MODE_BLOB,
            },
            b"bee\n".to_vec(),
        )],
    );
    let repo = Repository::from_store(store);
    let fs = repo.file_system(&id).unwrap();
    assert_eq!(fs.read_text("a/b.txt").unwrap(), "bee\n");
    assert!(fs.is_dir("a"));
}

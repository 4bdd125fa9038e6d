use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use vfs_core::{Backend, OpenMode, VfsError};
use vfs_host::HostFs;
use vfs_uri::Reference;

fn reference_for(path: &Path) -> Reference {
    Reference::parse(&format!("file://{}", path.display())).unwrap()
}

fn child(dir: &TempDir, name: &str) -> Reference {
    reference_for(&dir.path().join(name))
}

#[test]
fn predicates_on_files_and_folders() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("f.txt"), b"body").unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();

    let fs_ = HostFs::new();
    let file = child(&dir, "f.txt");
    let folder = child(&dir, "sub");
    let missing = child(&dir, "nope");

    assert!(fs_.exists(&file).unwrap());
    assert!(fs_.is_file(&file).unwrap());
    assert!(!fs_.is_folder(&file).unwrap());

    assert!(fs_.is_folder(&folder).unwrap());
    assert!(!fs_.is_file(&folder).unwrap());

    assert!(!fs_.exists(&missing).unwrap());
    assert!(fs_.can_read(&file).unwrap());
    assert!(fs_.can_write(&file).unwrap());
}

#[test]
fn size_mtime_and_mimetype() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("f.txt"), b"12345").unwrap();

    let fs_ = HostFs::new();
    let file = child(&dir, "f.txt");
    assert_eq!(fs_.get_size(&file).unwrap(), 5);
    assert!(fs_.get_mtime(&file).is_ok());
    assert_eq!(fs_.get_mimetype(&file).unwrap(), "text/plain");
    assert_eq!(
        fs_.get_mimetype(&reference_for(dir.path())).unwrap(),
        "application/x-not-regular-file"
    );
}

#[test]
fn missing_resources_map_to_not_found() {
    let dir = TempDir::new().unwrap();
    let fs_ = HostFs::new();
    let missing = child(&dir, "nope");

    assert!(matches!(
        fs_.get_size(&missing),
        Err(VfsError::NotFound(_))
    ));
    assert!(matches!(
        fs_.open(&missing, OpenMode::READ),
        Err(VfsError::NotFound(_))
    ));
    assert!(matches!(fs_.remove(&missing), Err(VfsError::NotFound(_))));
}

#[test]
fn open_reads_and_append_appends() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("f"), b"one").unwrap();

    let fs_ = HostFs::new();
    let file = child(&dir, "f");

    let mut handle = fs_.open(&file, OpenMode::APPEND).unwrap();
    handle.write_all(b"+two").unwrap();
    drop(handle);

    let mut body = String::new();
    fs_.open(&file, OpenMode::READ)
        .unwrap()
        .read_to_string(&mut body)
        .unwrap();
    assert_eq!(body, "one+two");
}

#[test]
fn open_write_truncates_existing_content() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("f"), b"a longer body").unwrap();

    let fs_ = HostFs::new();
    let file = child(&dir, "f");
    fs_.open_write(&file).unwrap().write_all(b"x").unwrap();

    assert_eq!(fs::read(dir.path().join("f")).unwrap(), b"x");
}

#[test]
fn make_file_creates_parents_and_reports_collisions() {
    let dir = TempDir::new().unwrap();
    let fs_ = HostFs::new();
    let deep = child(&dir, "a/b/new.txt");

    fs_.make_file(&deep).unwrap().write_all(b"ok").unwrap();
    assert!(fs_.is_file(&deep).unwrap());

    assert!(matches!(
        fs_.make_file(&deep),
        Err(VfsError::AlreadyExists(_))
    ));
}

#[test]
fn make_folder_and_remove_tree() {
    let dir = TempDir::new().unwrap();
    let fs_ = HostFs::new();
    let folder = child(&dir, "tree");

    fs_.make_folder(&folder).unwrap();
    assert!(matches!(
        fs_.make_folder(&folder),
        Err(VfsError::AlreadyExists(_))
    ));

    fs::write(dir.path().join("tree/inner.txt"), b"x").unwrap();
    fs_.remove(&folder).unwrap();
    assert!(!fs_.exists(&folder).unwrap());
}

#[test]
fn get_names_is_sorted_and_checks_folderness() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("b"), b"").unwrap();
    fs::write(dir.path().join("a"), b"").unwrap();
    fs::create_dir(dir.path().join("c")).unwrap();

    let fs_ = HostFs::new();
    assert_eq!(
        fs_.get_names(&reference_for(dir.path())).unwrap(),
        vec!["a", "b", "c"]
    );
    assert!(matches!(
        fs_.get_names(&child(&dir, "a")),
        Err(VfsError::NotADirectory(_))
    ));
}

#[test]
fn move_to_renames() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("old"), b"body").unwrap();

    let fs_ = HostFs::new();
    fs_.move_to(&child(&dir, "old"), &child(&dir, "new")).unwrap();
    assert!(!fs_.exists(&child(&dir, "old")).unwrap());
    assert_eq!(fs::read(dir.path().join("new")).unwrap(), b"body");
}

#[test]
fn metadata_cache_invalidates_on_mtime_change() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("f.txt"), b"first").unwrap();

    let fs_ = HostFs::new();
    let file = child(&dir, "f.txt");
    let capable = fs_.as_metadata().unwrap();

    let before = capable.get_metadata(&file).unwrap();
    assert_eq!(before.size, 5);
    assert_eq!(before.mimetype, "text/plain");

    // A second read with an unchanged mtime comes from the cache.
    assert_eq!(capable.get_metadata(&file).unwrap(), before);

    sleep(Duration::from_millis(20));
    fs::write(dir.path().join("f.txt"), b"rewritten!").unwrap();
    let after = capable.get_metadata(&file).unwrap();
    assert_eq!(after.size, 10);
}

#[test]
fn mmap_views_file_bytes() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("f"), b"mapped bytes").unwrap();

    let fs_ = HostFs::new();
    let capable = fs_.as_mmap().unwrap();
    let map = capable.open_mmap(&child(&dir, "f")).unwrap();
    assert_eq!((*map).as_ref(), b"mapped bytes");
}

//! Tests for Storage
//!
//! These tests verify:
//! - Missing files read as empty
//! - Whole-file replacement and block-sized reads
//! - Backup fallback and leftover temporary files
//! - Failed writes leave the previous contents in place

use std::fs;
use std::path::{Path, PathBuf};

use archivekv::storage::{FileStorage, MemoryStorage, Storage, BACKUP_SUFFIX, TEMPORARY_INFIX};
use archivekv::{Archive, ArchiveConfig, ArchiveError, Result};
use bytes::Bytes;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_storage() -> (TempDir, PathBuf, FileStorage) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("dataset.archive");
    let storage = FileStorage::new(&path);
    (temp_dir, path, storage)
}

fn chunks_of<T: AsRef<[u8]>>(parts: &[T]) -> std::vec::IntoIter<Result<Bytes>> {
    parts
        .iter()
        .map(|p| Ok(Bytes::copy_from_slice(p.as_ref())))
        .collect::<Vec<_>>()
        .into_iter()
}

fn read_all(storage: &impl Storage) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in storage.read().unwrap() {
        out.extend_from_slice(&chunk.unwrap());
    }
    out
}

fn random_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|_| rand::random::<u8>()).collect()
}

/// Names of everything in `dir` except `keep`
fn siblings(dir: &Path, keep: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p != keep)
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

// =============================================================================
// Read Tests
// =============================================================================

#[test]
fn test_read_missing_file_is_empty() {
    let (_temp, _path, storage) = setup_temp_storage();

    assert_eq!(storage.read().unwrap().count(), 0);
}

#[test]
fn test_short_reads() {
    let (_temp, path, storage) = setup_temp_storage();

    fs::write(&path, "abcdefghi").unwrap();
    assert_eq!(read_all(&storage), b"abcdefghi");

    fs::write(&path, "1234567890").unwrap();
    assert_eq!(read_all(&storage), b"1234567890");
}

#[test]
fn test_reads_in_fixed_blocks() {
    let (_temp, path, _) = setup_temp_storage();
    let storage = FileStorage::with_block_size(&path, 64 * 1024);

    let blocks = [
        random_bytes(64 * 1024),
        random_bytes(64 * 1024),
        random_bytes(64 * 1024),
    ];
    fs::write(&path, blocks.concat()).unwrap();

    let read: Vec<Bytes> = storage.read().unwrap().map(|c| c.unwrap()).collect();
    assert_eq!(read.len(), 3);
    for (chunk, block) in read.iter().zip(blocks.iter()) {
        assert_eq!(&chunk[..], &block[..]);
    }
}

#[test]
fn test_partial_last_block() {
    let (_temp, path, _) = setup_temp_storage();
    let storage = FileStorage::with_block_size(&path, 4);

    fs::write(&path, "abcdefghij").unwrap();

    let sizes: Vec<usize> = storage.read().unwrap().map(|c| c.unwrap().len()).collect();
    assert_eq!(sizes, vec![4, 4, 2]);
}

#[test]
fn test_read_falls_back_to_backup() {
    let (temp, path, storage) = setup_temp_storage();

    let backup = temp.path().join(format!("dataset.archive{}", BACKUP_SUFFIX));
    fs::write(&backup, "previous contents").unwrap();
    assert!(!path.exists());

    assert_eq!(read_all(&storage), b"previous contents");
}

#[test]
fn test_primary_wins_over_backup() {
    let (_temp, path, storage) = setup_temp_storage();

    fs::write(&path, "new").unwrap();
    fs::write(storage.backup_path(), "old").unwrap();

    assert_eq!(read_all(&storage), b"new");
}

#[test]
fn test_read_error_other_than_missing_is_io() {
    let (_temp, path, storage) = setup_temp_storage();

    // a directory where the archive file should be
    fs::create_dir(&path).unwrap();

    let result = storage
        .read()
        .and_then(|chunks| chunks.collect::<Result<Vec<Bytes>>>());
    assert!(matches!(result, Err(ArchiveError::Io(_))));

    let archive = Archive::open_path(&path, ArchiveConfig::default()).unwrap();
    assert!(matches!(archive.get("x"), Err(ArchiveError::Io(_))));
}

// =============================================================================
// Write Tests
// =============================================================================

#[test]
fn test_short_writes() {
    let (_temp, path, storage) = setup_temp_storage();

    storage.write(chunks_of(&[b"abc", b"def", b"ghi"])).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "abcdefghi");

    storage.write(chunks_of(&[b"123", b"456", b"789"])).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "123456789");
}

#[test]
fn test_write_then_read_various_sizes() {
    let (_temp, _path, storage) = setup_temp_storage();

    let cases: Vec<Vec<Vec<u8>>> = vec![
        vec![random_bytes(8)],
        vec![random_bytes(32)],
        vec![random_bytes(8), random_bytes(8)],
        vec![random_bytes(32 * 1024)],
        vec![random_bytes(64 * 1024)],
        vec![random_bytes(128 * 1024)],
        vec![random_bytes(256 * 1024)],
        vec![],
    ];

    for case in cases {
        let parts: Vec<&[u8]> = case.iter().map(|c| c.as_slice()).collect();
        storage.write(chunks_of(&parts)).unwrap();
        assert_eq!(read_all(&storage), case.concat());
    }
}

#[test]
fn test_write_leaves_no_backup_or_temporary() {
    let (temp, path, storage) = setup_temp_storage();

    storage.write(chunks_of(&[b"first"])).unwrap();
    storage.write(chunks_of(&[b"second"])).unwrap();

    assert!(path.exists());
    assert!(siblings(temp.path(), &path).is_empty());
}

#[test]
fn test_write_removes_stale_backup() {
    let (temp, path, storage) = setup_temp_storage();

    fs::write(&path, "current").unwrap();
    fs::write(storage.backup_path(), "stale").unwrap();

    storage.write(chunks_of(&[b"replacement"])).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "replacement");
    assert!(siblings(temp.path(), &path).is_empty());
}

#[test]
fn test_failed_write_keeps_previous_contents() {
    let (temp, path, storage) = setup_temp_storage();

    storage.write(chunks_of(&[b"keep me"])).unwrap();

    let failing = vec![
        Ok(Bytes::from_static(b"partial")),
        Err(ArchiveError::MalformedInput("source failed".to_string())),
    ];
    let result = storage.write(failing.into_iter());

    assert!(matches!(result, Err(ArchiveError::MalformedInput(_))));
    assert_eq!(fs::read_to_string(&path).unwrap(), "keep me");
    assert!(siblings(temp.path(), &path).is_empty(), "temporary file removed");
}

#[test]
fn test_first_write_failure_creates_nothing() {
    let (temp, path, storage) = setup_temp_storage();

    let failing = vec![Err(ArchiveError::Codec("boom".to_string()))];
    assert!(storage.write(failing.into_iter()).is_err());

    assert!(!path.exists());
    assert!(fs::read_dir(temp.path()).unwrap().next().is_none());
}

#[test]
fn test_write_into_missing_directory_fails() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileStorage::new(temp_dir.path().join("no/such/dir/archive"));

    let result = storage.write(chunks_of(&[b"x"]));
    assert!(matches!(result, Err(ArchiveError::Io(_))));
}

// =============================================================================
// Crash Window Tests
// =============================================================================

#[test]
fn test_crash_after_temporary_written() {
    let (temp, path, storage) = setup_temp_storage();

    storage.write(chunks_of(&[b"committed"])).unwrap();

    // interrupted before any rename: a finished temporary file sits next to the primary
    let orphan = temp
        .path()
        .join(format!("dataset.archive{}kx1-abc", TEMPORARY_INFIX));
    fs::write(&orphan, "never committed").unwrap();

    assert_eq!(read_all(&storage), b"committed");

    // the next write is unaffected by the orphan
    storage.write(chunks_of(&[b"next"])).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "next");
    assert_eq!(fs::read_to_string(&orphan).unwrap(), "never committed");
}

#[test]
fn test_crash_between_renames() {
    let (temp, path, storage) = setup_temp_storage();

    storage.write(chunks_of(&[b"old state"])).unwrap();

    // interrupted after primary → backup, before temporary → primary
    fs::rename(&path, storage.backup_path()).unwrap();
    let orphan = temp
        .path()
        .join(format!("dataset.archive{}kx1-abc", TEMPORARY_INFIX));
    fs::write(&orphan, "new state").unwrap();

    // reads recover the old state from the backup
    assert_eq!(read_all(&storage), b"old state");
    // and the new state is intact in the temporary file
    assert_eq!(fs::read_to_string(&orphan).unwrap(), "new state");

    storage.write(chunks_of(&[b"after recovery"])).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "after recovery");
    assert!(!storage.backup_path().exists());
}

// =============================================================================
// Memory Storage Tests
// =============================================================================

#[test]
fn test_memory_storage_replace() {
    let storage = MemoryStorage::new();
    assert!(storage.is_empty());
    assert_eq!(storage.read().unwrap().count(), 0);

    storage.write(chunks_of(&[b"ab", b"cd"])).unwrap();
    assert_eq!(read_all(&storage), b"abcd");
    assert_eq!(storage.len(), 4);

    storage.write(chunks_of(&[b"x"])).unwrap();
    assert_eq!(read_all(&storage), b"x");
}

#[test]
fn test_memory_storage_failed_write_keeps_contents() {
    let storage = MemoryStorage::new();
    storage.write(chunks_of(&[b"keep"])).unwrap();

    let failing = vec![Ok(Bytes::from_static(b"x")), Err(ArchiveError::Codec("bad".into()))];
    assert!(storage.write(failing.into_iter()).is_err());

    assert_eq!(read_all(&storage), b"keep");
}

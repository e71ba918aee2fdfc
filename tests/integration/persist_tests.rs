use dupindex::duplicates::Gatherer;
use dupindex::scanner::{ContentHash, Fingerprint};
use dupindex::store::{DuplicateIndex, FileRecord, StoreError, DEFAULT_STORE_FILE_NAME};
use std::fs;
use std::time::{Duration, UNIX_EPOCH};
use tempfile::tempdir;

fn populate(dir: &std::path::Path) {
    fs::write(dir.join("a.txt"), b"alpha").unwrap();
    fs::write(dir.join("b.txt"), b"alpha").unwrap();
    fs::create_dir(dir.join("sub")).unwrap();
    fs::write(dir.join("sub").join("c.txt"), b"gamma").unwrap();
}

#[test]
fn test_store_roundtrip_through_gatherer() {
    let dir = tempdir().unwrap();
    populate(dir.path());

    let (first, _) = Gatherer::with_defaults().run(dir.path()).unwrap();
    let root = dir.path().canonicalize().unwrap();
    let loaded = DuplicateIndex::open(&root, &root.join(DEFAULT_STORE_FILE_NAME)).unwrap();

    assert_eq!(loaded, first);
    assert_eq!(loaded.last_update(), first.last_update());
    loaded.check_invariants().unwrap();
}

#[test]
fn test_relocated_root_triggers_full_rescan() {
    let original = tempdir().unwrap();
    populate(original.path());
    Gatherer::with_defaults().run(original.path()).unwrap();

    let moved = tempdir().unwrap();
    populate(moved.path());
    fs::copy(
        original.path().join(DEFAULT_STORE_FILE_NAME),
        moved.path().join(DEFAULT_STORE_FILE_NAME),
    )
    .unwrap();

    let (index, summary) = Gatherer::with_defaults().run(moved.path()).unwrap();
    assert!(summary.store_reset);
    assert_eq!(summary.hashed, 3);
    assert_eq!(index.root(), moved.path().canonicalize().unwrap());

    let root = moved.path().canonicalize().unwrap();
    let reopened = DuplicateIndex::open(&root, &root.join(DEFAULT_STORE_FILE_NAME)).unwrap();
    assert_eq!(reopened.len(), 3);
}

#[test]
fn test_open_for_other_root_reports_mismatch() {
    let dir = tempdir().unwrap();
    populate(dir.path());
    Gatherer::with_defaults().run(dir.path()).unwrap();

    let other = tempdir().unwrap();
    let err = DuplicateIndex::open(other.path(), &dir.path().join(DEFAULT_STORE_FILE_NAME))
        .unwrap_err();
    assert!(matches!(err, StoreError::RootMismatch { .. }));
}

#[test]
fn test_truncated_store_is_rebuilt() {
    let dir = tempdir().unwrap();
    populate(dir.path());
    Gatherer::with_defaults().run(dir.path()).unwrap();

    let store = dir.path().join(DEFAULT_STORE_FILE_NAME);
    let bytes = fs::read(&store).unwrap();
    fs::write(&store, &bytes[..bytes.len() / 2]).unwrap();

    let root = dir.path().canonicalize().unwrap();
    assert!(matches!(
        DuplicateIndex::open(&root, &store),
        Err(StoreError::Corrupt { .. })
    ));

    let (index, summary) = Gatherer::with_defaults().run(dir.path()).unwrap();
    assert!(summary.store_reset);
    assert_eq!(index.len(), 3);
    assert!(DuplicateIndex::open(&root, &store).is_ok());
}

#[test]
fn test_no_temp_file_left_behind() {
    let dir = tempdir().unwrap();
    populate(dir.path());
    Gatherer::with_defaults().run(dir.path()).unwrap();

    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_saved_store_preserves_empty_bucket_state_after_compact() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(DEFAULT_STORE_FILE_NAME);
    let fp = Fingerprint::new(1, UNIX_EPOCH + Duration::from_secs(1));

    let mut index = DuplicateIndex::new(dir.path());
    index.add_if_unknown(FileRecord::from_relative("a", fp, ContentHash::from_bytes([1; 32])));
    index.add_if_unknown(FileRecord::from_relative("b", fp, ContentHash::from_bytes([2; 32])));
    index.remove("a").unwrap();
    index.compact();
    index.save(&path).unwrap();

    let loaded = DuplicateIndex::open(dir.path(), &path).unwrap();
    assert_eq!(loaded.groups_by_hash().count(), 1);
    assert!(loaded.groups_by_hash().all(|(_, paths)| !paths.is_empty()));
}

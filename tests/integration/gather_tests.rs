use dupindex::duplicates::{content_groups, duplicate_groups, Gatherer, GathererConfig};
use dupindex::scanner::content_hash_of;
use dupindex::store::{DuplicateIndex, DEFAULT_STORE_FILE_NAME};
use filetime::FileTime;
use std::fs::{self, File};
use std::io::Write;
use tempfile::tempdir;

fn write(path: &std::path::Path, content: &[u8]) {
    File::create(path).unwrap().write_all(content).unwrap();
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let (index, summary) = Gatherer::with_defaults().run(dir.path()).unwrap();

    assert!(index.is_empty());
    assert_eq!(summary.files_seen, 0);
    assert!(duplicate_groups(&index).is_empty());
    assert!(!summary.persisted);
}

#[test]
fn test_scan_duplicate_files() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"duplicate");
    write(&dir.path().join("b.txt"), b"duplicate");
    write(&dir.path().join("c.txt"), b"unique");

    let (index, summary) = Gatherer::with_defaults().run(dir.path()).unwrap();
    assert_eq!(summary.files_seen, 3);
    assert_eq!(summary.hashed, 3);

    let groups = duplicate_groups(&index);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);
    assert_eq!(groups[0].hash, content_hash_of(&dir.path().join("a.txt")).unwrap());
    assert_eq!(groups[0].size, 9);
}

#[test]
fn test_scan_nested_directories() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("subdir");
    fs::create_dir(&sub).unwrap();
    write(&dir.path().join("a.txt"), b"nested duplicate");
    write(&sub.join("b.txt"), b"nested duplicate");

    let (index, _) = Gatherer::with_defaults().run(dir.path()).unwrap();
    assert!(index.contains("subdir/b.txt"));

    let groups = duplicate_groups(&index);
    assert_eq!(groups.len(), 1);
    let root = dir.path().canonicalize().unwrap();
    assert!(groups[0].paths.contains(&root.join("subdir").join("b.txt")));
}

#[test]
fn test_modified_file_is_rehashed_and_regrouped() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    write(&a, b"same");
    write(&b, b"same");
    let gatherer = Gatherer::with_defaults();

    let (index, _) = gatherer.run(dir.path()).unwrap();
    assert_eq!(duplicate_groups(&index).len(), 1);

    write(&b, b"changed!");
    filetime::set_file_mtime(&b, FileTime::from_unix_time(1_800_000_000, 0)).unwrap();

    let (index, summary) = gatherer.run(dir.path()).unwrap();
    assert_eq!(summary.hashed, 1);
    assert_eq!(summary.unchanged, 1);
    assert!(duplicate_groups(&index).is_empty());
    assert_eq!(content_groups(&index).len(), 2);
    index.check_invariants().unwrap();
}

#[test]
fn test_touched_but_identical_file_is_rehashed_only() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.txt");
    write(&a, b"stable");
    let gatherer = Gatherer::with_defaults();
    gatherer.run(dir.path()).unwrap();

    filetime::set_file_mtime(&a, FileTime::from_unix_time(1_700_000_000, 0)).unwrap();
    let (index, summary) = gatherer.run(dir.path()).unwrap();

    assert_eq!(summary.hashed, 1);
    assert_eq!(index.len(), 1);
    assert_eq!(content_groups(&index).len(), 1);
    assert!(summary.persisted);
}

#[test]
fn test_changing_patterns_drops_excluded_files() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.png"), b"img");
    write(&dir.path().join("b.png"), b"img");
    write(&dir.path().join("notes.txt"), b"text");

    let (index, _) = Gatherer::with_defaults().run(dir.path()).unwrap();
    assert_eq!(index.len(), 3);
    assert!(index.filters().is_none());

    let config = GathererConfig::default().with_patterns(vec!["*.png".to_string()]);
    let (index, summary) = Gatherer::new(config).run(dir.path()).unwrap();
    assert_eq!(index.len(), 2);
    assert_eq!(summary.removed, 1);
    assert_eq!(summary.hashed, 0);
    assert_eq!(index.filters(), Some(&["*.png".to_string()][..]));
}

#[test]
fn test_exclude_pattern() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("keep.txt"), b"x");
    write(&dir.path().join("skip.part"), b"x");

    let config = GathererConfig::default().with_patterns(vec!["*".to_string(), "!*.part".to_string()]);
    let (index, _) = Gatherer::new(config).run(dir.path()).unwrap();
    assert!(index.contains("keep.txt"));
    assert!(!index.contains("skip.part"));
}

#[test]
fn test_skip_hidden() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("visible.txt"), b"x");
    write(&dir.path().join(".hidden.txt"), b"x");

    let (index, _) = Gatherer::with_defaults().run(dir.path()).unwrap();
    assert_eq!(index.len(), 2);

    let config = GathererConfig::default().with_skip_hidden(true);
    let (index, _) = Gatherer::new(config).run(dir.path()).unwrap();
    assert_eq!(index.len(), 1);
    assert!(index.contains("visible.txt"));
}

#[test]
fn test_store_file_is_never_indexed() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"x");
    let gatherer = Gatherer::with_defaults();
    gatherer.run(dir.path()).unwrap();
    assert!(dir.path().join(DEFAULT_STORE_FILE_NAME).exists());

    let (index, summary) = gatherer.run(dir.path()).unwrap();
    assert_eq!(summary.files_seen, 1);
    assert!(!index.contains(DEFAULT_STORE_FILE_NAME));
}

#[test]
fn test_custom_store_file_name() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"x");

    let config = GathererConfig::default().with_store_file_name(".custom.json.gz");
    let (index, _) = Gatherer::new(config).run(dir.path()).unwrap();
    assert!(dir.path().join(".custom.json.gz").exists());
    assert!(!dir.path().join(DEFAULT_STORE_FILE_NAME).exists());
    assert_eq!(index.len(), 1);
}

#[test]
fn test_single_thread_and_mmap_hashing_agree() {
    let dir = tempdir().unwrap();
    let content = vec![42u8; 256 * 1024];
    write(&dir.path().join("a.bin"), &content);
    write(&dir.path().join("b.bin"), &content);

    let config = GathererConfig::default()
        .with_io_threads(1)
        .with_mmap_threshold(1024)
        .with_persist(false);
    let (index, _) = Gatherer::new(config).run(dir.path()).unwrap();

    let groups = duplicate_groups(&index);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].hash, content_hash_of(&dir.path().join("a.bin")).unwrap());
}

#[test]
fn test_pre_epoch_mtime_is_persisted() {
    let dir = tempdir().unwrap();
    let old = dir.path().join("old.txt");
    write(&old, b"vintage");
    write(&dir.path().join("new.txt"), b"vintage");
    filetime::set_file_mtime(&old, FileTime::from_unix_time(-86_400, 0)).unwrap();
    let gatherer = Gatherer::with_defaults();

    let (index, summary) = gatherer.run(dir.path()).unwrap();
    assert!(summary.persisted);
    assert_eq!(duplicate_groups(&index).len(), 1);

    let root = dir.path().canonicalize().unwrap();
    let loaded = DuplicateIndex::open(&root, &root.join(DEFAULT_STORE_FILE_NAME)).unwrap();
    assert_eq!(loaded, index);
    assert_eq!(
        FileTime::from_system_time(loaded.record("old.txt").unwrap().modified),
        FileTime::from_unix_time(-86_400, 0)
    );

    let (_, summary) = gatherer.run(dir.path()).unwrap();
    assert_eq!(summary.hashed, 0);
    assert_eq!(summary.unchanged, 2);
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_is_partial_success() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    write(&dir.path().join("ok.txt"), b"fine");
    let locked = dir.path().join("locked.txt");
    write(&locked, b"secret");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Root ignores permission bits; nothing to test in that case.
    if File::open(&locked).is_ok() {
        return;
    }

    let (index, summary) = Gatherer::with_defaults().run(dir.path()).unwrap();
    assert!(summary.is_partial());
    assert_eq!(summary.errors, 1);
    assert!(index.contains("ok.txt"));
    assert!(!index.contains("locked.txt"));
    index.check_invariants().unwrap();

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
}

use dupindex::duplicates::{duplicate_groups, Gatherer, GathererConfig};
use dupindex::scanner::{identity_of, relative_path};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

#[test]
fn test_unicode_file_names() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("日本語.txt"), b"same").unwrap();
    fs::write(dir.path().join("émoji 🎉.txt"), b"same").unwrap();

    let (index, _) = Gatherer::with_defaults().run(dir.path()).unwrap();
    assert!(index.contains("日本語.txt"));
    assert!(index.contains("émoji 🎉.txt"));
    assert_eq!(duplicate_groups(&index).len(), 1);
}

#[test]
fn test_decomposed_name_has_composed_identity() {
    let dir = tempdir().unwrap();
    let decomposed = "cafe\u{301}.txt";
    let composed = "caf\u{e9}.txt";
    fs::write(dir.path().join(decomposed), b"x").unwrap();

    let (index, _) = Gatherer::with_defaults().run(dir.path()).unwrap();
    assert!(index.contains(composed));
    assert_eq!(index.paths().collect::<Vec<_>>(), vec![composed]);
}

#[test]
fn test_spaces_and_deep_nesting() {
    let dir = tempdir().unwrap();
    let deep = dir.path().join("a b").join("c d").join("e f");
    fs::create_dir_all(&deep).unwrap();
    fs::write(deep.join("file with spaces.txt"), b"x").unwrap();

    let (index, _) = Gatherer::with_defaults().run(dir.path()).unwrap();
    assert!(index.contains("a b/c d/e f/file with spaces.txt"));
}

#[test]
fn test_identity_independent_of_root_location() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    let in_a = a.path().join("x").join("y.txt");
    let in_b = b.path().join("x").join("y.txt");

    assert_eq!(relative_path(a.path(), &in_a), "x/y.txt");
    assert_eq!(identity_of(a.path(), &in_a), identity_of(b.path(), &in_b));
    assert_eq!(identity_of(a.path(), &in_a), identity_of(a.path(), Path::new("x/y.txt")));
    assert_ne!(
        identity_of(a.path(), &in_a),
        identity_of(a.path(), Path::new("x/z.txt"))
    );
}

#[test]
fn test_relative_root_argument() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"x").unwrap();
    let canonical = dir.path().canonicalize().unwrap();
    let with_dot = canonical.join(".");

    let config = GathererConfig::default().with_persist(false);
    let (index, _) = Gatherer::new(config).run(&with_dot).unwrap();
    assert_eq!(index.root(), canonical);
    assert!(index.contains("a.txt"));
}

#[cfg(unix)]
#[test]
fn test_symlinks_followed_only_on_request() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("target.txt"), b"linked").unwrap();
    std::os::unix::fs::symlink(dir.path().join("target.txt"), dir.path().join("link.txt")).unwrap();

    let config = GathererConfig::default().with_persist(false);
    let (index, _) = Gatherer::new(config).run(dir.path()).unwrap();
    assert_eq!(index.len(), 1);

    let config = GathererConfig::default()
        .with_persist(false)
        .with_follow_symlinks(true);
    let (index, _) = Gatherer::new(config).run(dir.path()).unwrap();
    assert_eq!(index.len(), 2);
    assert_eq!(duplicate_groups(&index).len(), 1);
}

#[cfg(target_os = "linux")]
#[test]
fn test_non_utf8_names_are_reported_not_merged() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = tempdir().unwrap();
    fs::write(dir.path().join(OsStr::from_bytes(b"\xff.txt")), b"one").unwrap();
    fs::write(dir.path().join(OsStr::from_bytes(b"\xfe.txt")), b"two").unwrap();
    fs::write(dir.path().join("plain.txt"), b"three").unwrap();

    let (index, summary) = Gatherer::with_defaults().run(dir.path()).unwrap();
    assert_eq!(index.len(), 1);
    assert!(index.contains("plain.txt"));
    assert_eq!(summary.files_seen, 1);
    assert_eq!(summary.errors, 2);
    assert!(summary.is_partial());
    for (_, paths) in index.groups_by_hash() {
        for path in paths {
            assert!(index.absolute_path(path).exists());
        }
    }
}

#[cfg(target_os = "linux")]
#[test]
fn test_composed_and_decomposed_siblings_keep_one_stable_record() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("caf\u{e9}.txt"), b"composed").unwrap();
    fs::write(dir.path().join("cafe\u{301}.txt"), b"decomposed!").unwrap();
    let gatherer = Gatherer::with_defaults();

    let (index, summary) = gatherer.run(dir.path()).unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(summary.files_seen, 1);
    assert_eq!(summary.errors, 1);
    let kept = index.record("caf\u{e9}.txt").unwrap().clone();

    let (index, summary) = gatherer.run(dir.path()).unwrap();
    assert_eq!(summary.hashed, 0);
    assert_eq!(summary.unchanged, 1);
    assert_eq!(index.record("caf\u{e9}.txt"), Some(&kept));
}

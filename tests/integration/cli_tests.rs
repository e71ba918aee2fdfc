use clap::Parser;
use dupindex::cli::Cli;
use dupindex::duplicates::GatherError;
use dupindex::error::ExitCode;
use dupindex::run_app;
use dupindex::store::DEFAULT_STORE_FILE_NAME;
use std::fs;
use tempfile::tempdir;

fn cli(args: &[&str]) -> Cli {
    let mut full = vec!["dupindex", "-q"];
    full.extend_from_slice(args);
    Cli::try_parse_from(full).unwrap()
}

#[test]
fn test_run_app_success_and_store_written() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"same").unwrap();
    fs::write(dir.path().join("b.txt"), b"same").unwrap();
    let root = dir.path().to_str().unwrap();

    let code = run_app(cli(&["--show-duplicates", root])).unwrap();
    assert_eq!(code, ExitCode::Success);
    assert!(dir.path().join(DEFAULT_STORE_FILE_NAME).exists());
}

#[test]
fn test_run_app_no_store() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"x").unwrap();
    let root = dir.path().to_str().unwrap();

    let code = run_app(cli(&["--no-store", "--output", "json", "--show-content", root])).unwrap();
    assert_eq!(code, ExitCode::Success);
    assert!(!dir.path().join(DEFAULT_STORE_FILE_NAME).exists());
}

#[test]
fn test_run_app_missing_directory() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing");

    let err = run_app(cli(&[missing.to_str().unwrap()])).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<GatherError>(),
        Some(GatherError::PathNotFound(_))
    ));
}

#[test]
fn test_run_app_invalid_pattern() {
    let dir = tempdir().unwrap();
    let root = dir.path().to_str().unwrap();

    let err = run_app(cli(&[root, "a["])).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<GatherError>(),
        Some(GatherError::Scan(_))
    ));
    assert!(format!("{err:#}").contains("a["));
}

#[test]
fn test_run_app_rejects_bad_config_file() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "store_file_name = \"nested/store.gz\"\n").unwrap();
    let data = dir.path().join("data");
    fs::create_dir(&data).unwrap();

    let err = run_app(cli(&[
        "--config",
        config.to_str().unwrap(),
        data.to_str().unwrap(),
    ]))
    .unwrap_err();
    assert!(err.to_string().contains("Invalid configuration"));
}

#[test]
fn test_run_app_uses_configured_store_name() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "store_file_name = \".idx.json.gz\"\nio_threads = 1\n").unwrap();
    let data = dir.path().join("data");
    fs::create_dir(&data).unwrap();
    fs::write(data.join("a.txt"), b"x").unwrap();

    run_app(cli(&[
        "--config",
        config.to_str().unwrap(),
        data.to_str().unwrap(),
    ]))
    .unwrap();
    assert!(data.join(".idx.json.gz").exists());
}

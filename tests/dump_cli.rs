//! Runs the built `flatcfg-dump` binary against files on disk.

use std::io::Write;
use std::process::{Command, Output};

use tempfile::NamedTempFile;

fn write_conf(content: &str) -> NamedTempFile {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(content.as_bytes()).unwrap();
    f
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_flatcfg-dump"))
        .args(args)
        .output()
        .expect("failed to run flatcfg-dump")
}

#[test]
fn test_dump_prints_entries_in_file_order() {
    // Arrange
    let f = write_conf("SERVER_NAME = skv-srv\nBIND_ADDR = 0.0.0.0:7171\n");

    // Act
    let out = run(&[f.path().to_str().unwrap()]);

    // Assert
    assert!(out.status.success());
    assert_eq!(
        String::from_utf8_lossy(&out.stdout),
        "server_name = skv-srv\nbind_addr = 0.0.0.0:7171\n"
    );
}

#[test]
fn test_dump_key_prints_value_or_default() {
    let f = write_conf("LOG_LEVEL = INFO\n");
    let path = f.path().to_str().unwrap();

    let present = run(&[path, "--key", "log_level", "--default", "WARN"]);
    let absent = run(&[path, "--key", "SEND_LOG", "--default", "false"]);

    assert_eq!(String::from_utf8_lossy(&present.stdout), "INFO\n");
    assert_eq!(String::from_utf8_lossy(&absent.stdout), "false\n");
}

#[test]
fn test_dump_absent_key_without_default_prints_empty_line() {
    let f = write_conf("a = 1\n");
    let out = run(&[f.path().to_str().unwrap(), "--key", "b"]);
    assert_eq!(String::from_utf8_lossy(&out.stdout), "\n");
}

#[test]
fn test_dump_exits_1_on_missing_file() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.conf");

    // Act
    let out = run(&[path.to_str().unwrap()]);

    // Assert
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    assert!(String::from_utf8_lossy(&out.stderr).contains("ERROR:"));
}

#[test]
fn test_dump_exits_1_on_malformed_file() {
    let f = write_conf("a = 1\njusttoken\n");

    let out = run(&[f.path().to_str().unwrap()]);

    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("justtoken"), "stderr: {stderr}");
}

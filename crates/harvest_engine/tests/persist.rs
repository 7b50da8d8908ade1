use std::fs;
use std::io::{self, Write};

use harvest_engine::{ensure_output_dir, AtomicFileWriter, PersistError};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out").join("nested");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn output_dir_that_is_a_file_is_rejected() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("plain");
    fs::write(&file_path, "x").unwrap();
    assert!(matches!(
        ensure_output_dir(&file_path),
        Err(PersistError::OutputDir(_))
    ));
}

#[test]
fn atomic_write_replaces_existing_file() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("data.json", b"[1]").unwrap();
    assert_eq!(first.file_name().unwrap(), "data.json");
    assert_eq!(fs::read_to_string(&first).unwrap(), "[1]");

    let second = writer.write("data.json", b"[2]").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "[2]");
}

#[test]
fn failed_fill_publishes_nothing() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let result: Result<_, PersistError> = writer.write_with("half.json", |out| {
        out.write_all(b"[{\"id\":1},").map_err(PersistError::from)?;
        Err(io::Error::new(io::ErrorKind::Other, "disk went away").into())
    });

    assert!(result.is_err());
    assert!(!temp.path().join("half.json").exists());
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[test]
fn remove_ignores_missing_file() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());
    writer.write("gone.json", b"{}").unwrap();

    writer.remove("gone.json").unwrap();
    writer.remove("gone.json").unwrap();
    assert!(!temp.path().join("gone.json").exists());
}

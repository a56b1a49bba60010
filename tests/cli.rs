// E2E tests for the photocull CLI commands
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::fs;

mod common;
use common::{photocull, setup_photo_dir};

#[test]
fn test_list_command_orders_by_name() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    setup_photo_dir(&temp_dir, &["b.jpg", "A.png", "c.jpeg"]);
    temp_dir.child("notes.txt").write_str("not a photo").unwrap();

    let output = photocull()
        .arg("list")
        .arg(temp_dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let names: Vec<&str> = stdout
        .lines()
        .filter_map(|line| line.rsplit('/').next())
        .collect();
    assert_eq!(names, vec!["A.png", "b.jpg", "c.jpeg"]);
}

#[test]
fn test_list_json_output() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    setup_photo_dir(&temp_dir, &["a.jpg", "b.jpg"]);

    let output = photocull()
        .arg("list")
        .arg(temp_dir.path())
        .arg("--output")
        .arg("json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let assets = json["assets"].as_array().unwrap();
    assert_eq!(assets.len(), 2);
    assert_eq!(assets[0]["filename"], "a.jpg");
    assert_eq!(assets[0]["motion"], false);
    assert_eq!(assets[0]["frame_count"], 1);
    assert_eq!(assets[0]["tag"], "unmarked");
}

#[test]
fn test_list_missing_directory_fails() {
    let temp_dir = assert_fs::TempDir::new().unwrap();

    photocull()
        .arg("list")
        .arg(temp_dir.path().join("missing"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load"));
}

#[test]
fn test_commit_command() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    setup_photo_dir(&temp_dir, &["a.jpg", "b.jpg", "c.jpg"]);

    photocull()
        .arg("commit")
        .arg(temp_dir.path())
        .arg("--select")
        .arg("a.jpg")
        .arg("--remove")
        .arg("c.jpg")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 files copied"))
        .stdout(predicate::str::contains("1 files moved"))
        .stdout(predicate::str::contains("0 failed"));

    // Selected photos are copied, the original stays
    temp_dir.child("a.jpg").assert("photo bytes of a.jpg");
    temp_dir.child("SELECTED/a.jpg").assert("photo bytes of a.jpg");

    // Unmarked photos are untouched
    temp_dir.child("b.jpg").assert("photo bytes of b.jpg");
    temp_dir.child("SELECTED/b.jpg").assert(predicate::path::missing());
    temp_dir.child("TOBEREMOVED/b.jpg").assert(predicate::path::missing());

    // Photos marked for removal are moved, never deleted
    temp_dir.child("c.jpg").assert(predicate::path::missing());
    temp_dir.child("TOBEREMOVED/c.jpg").assert("photo bytes of c.jpg");

    temp_dir
        .child("commit_log.txt")
        .assert(predicate::str::contains("COPY: a.jpg"))
        .assert(predicate::str::contains("MOVE: c.jpg"));
}

#[test]
fn test_commit_no_log_file() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    setup_photo_dir(&temp_dir, &["a.jpg"]);

    photocull()
        .arg("commit")
        .arg(temp_dir.path())
        .arg("--select")
        .arg("a.jpg")
        .arg("--no-log-file")
        .assert()
        .success();

    temp_dir.child("SELECTED/a.jpg").assert(predicate::path::exists());
    temp_dir.child("commit_log.txt").assert(predicate::path::missing());
}

#[test]
fn test_dry_run_commit() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    setup_photo_dir(&temp_dir, &["a.jpg", "b.jpg"]);

    photocull()
        .arg("commit")
        .arg(temp_dir.path())
        .arg("--select")
        .arg("a.jpg")
        .arg("--remove")
        .arg("b.jpg")
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("[DRY RUN] Would copy"))
        .stdout(predicate::str::contains("[DRY RUN] Would move"));

    // Nothing touched
    temp_dir.child("a.jpg").assert(predicate::path::exists());
    temp_dir.child("b.jpg").assert(predicate::path::exists());
    temp_dir.child("SELECTED").assert(predicate::path::missing());
    temp_dir.child("TOBEREMOVED").assert(predicate::path::missing());
    temp_dir.child("commit_log.txt").assert(predicate::path::missing());
}

#[test]
fn test_commit_never_overwrites() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    setup_photo_dir(&temp_dir, &["a.jpg"]);
    temp_dir.child("SELECTED").create_dir_all().unwrap();
    temp_dir.child("SELECTED/a.jpg").write_str("an earlier export").unwrap();

    photocull()
        .arg("commit")
        .arg(temp_dir.path())
        .arg("--select")
        .arg("a.jpg")
        .assert()
        .success();

    temp_dir.child("SELECTED/a.jpg").assert("an earlier export");
    temp_dir.child("SELECTED/a_1.jpg").assert("photo bytes of a.jpg");
}

#[test]
fn test_commit_twice_keeps_both_copies() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    setup_photo_dir(&temp_dir, &["a.jpg"]);

    for _ in 0..2 {
        photocull()
            .arg("commit")
            .arg(temp_dir.path())
            .arg("--select")
            .arg("a.jpg")
            .assert()
            .success();
    }

    let mut exported: Vec<String> = fs::read_dir(temp_dir.child("SELECTED").path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    exported.sort();
    assert_eq!(exported, vec!["a.jpg", "a_1.jpg"]);
}

#[test]
fn test_commit_unknown_name_fails() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    setup_photo_dir(&temp_dir, &["a.jpg"]);

    photocull()
        .arg("commit")
        .arg(temp_dir.path())
        .arg("--select")
        .arg("missing.jpg")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown asset"));

    temp_dir.child("SELECTED").assert(predicate::path::missing());
}

#[test]
fn test_commit_invalid_frame_fails() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    setup_photo_dir(&temp_dir, &["a.jpg"]);

    photocull()
        .arg("commit")
        .arg(temp_dir.path())
        .arg("--select")
        .arg("a.jpg")
        .arg("--frame")
        .arg("a.jpg=1")
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));

    temp_dir.child("SELECTED").assert(predicate::path::missing());
}

#[test]
fn test_commit_nothing_tagged() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    setup_photo_dir(&temp_dir, &["a.jpg"]);

    photocull()
        .arg("commit")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to commit"));

    temp_dir.child("a.jpg").assert(predicate::path::exists());
    temp_dir.child("commit_log.txt").assert(predicate::path::missing());
}

#[test]
fn test_commit_json_report() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    setup_photo_dir(&temp_dir, &["a.jpg", "b.jpg"]);

    let output = photocull()
        .arg("commit")
        .arg(temp_dir.path())
        .arg("--select")
        .arg("a.jpg")
        .arg("--select")
        .arg("b.jpg")
        .arg("--output")
        .arg("json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["copied"].as_array().unwrap().len(), 2);
    assert_eq!(json["moved"].as_array().unwrap().len(), 0);
    assert_eq!(json["failures"].as_array().unwrap().len(), 0);
}

#[test]
fn test_frames_of_ordinary_photo() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let image = image::RgbImage::from_fn(8, 8, |x, y| {
        if (x + y) % 2 == 0 { image::Rgb([255, 255, 255]) } else { image::Rgb([0, 0, 0]) }
    });
    image.save(temp_dir.child("still.png").path()).unwrap();

    photocull()
        .arg("frames")
        .arg(temp_dir.child("still.png").path())
        .arg("--output")
        .arg("paths")
        .assert()
        .success()
        .stdout(predicate::str::diff("0\n"));
}

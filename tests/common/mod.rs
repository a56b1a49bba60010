use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;

/// Folder of ordinary photos. The contents are not real images; nothing
/// in a commit of ordinary photos needs to decode them.
pub fn setup_photo_dir(temp_dir: &TempDir, names: &[&str]) {
    for name in names {
        temp_dir
            .child(name)
            .write_str(&format!("photo bytes of {}", name))
            .unwrap();
    }
}

pub fn photocull() -> Command {
    let mut cmd = Command::cargo_bin("photocull").unwrap();
    // Point at executables that do not exist so tests never depend on a local ffmpeg.
    cmd.arg("--ffmpeg")
        .arg("photocull-test-missing-ffmpeg")
        .arg("--ffprobe")
        .arg("photocull-test-missing-ffprobe");
    cmd
}

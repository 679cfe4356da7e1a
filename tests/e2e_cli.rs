//! CLI end-to-end tests
//!
//! Tests for the gifforge command-line interface. Conversions that need a
//! real ffmpeg skip themselves when it is not installed.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the gifforge binary
#[allow(deprecated)]
fn gifforge_cmd() -> Command {
    Command::cargo_bin("gifforge").unwrap()
}

/// Render a two-second test clip with ffmpeg, or `None` if ffmpeg is absent.
fn synth_clip(dir: &Path) -> Option<std::path::PathBuf> {
    let ffmpeg = which::which("ffmpeg").ok()?;
    let path = dir.join("clip.mp4");
    let status = Command::new(ffmpeg)
        .args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-y",
            "-f",
            "lavfi",
            "-i",
            "testsrc=duration=2:size=320x240:rate=25",
            "-pix_fmt",
            "yuv420p",
        ])
        .arg(&path)
        .status()
        .ok()?;
    status.success().then_some(path)
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = gifforge_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = gifforge_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("gifforge"))
        .stdout(predicate::str::contains("convert"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = gifforge_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "gifforge {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_cli_check_tools_command() {
    let mut cmd = gifforge_cmd();
    cmd.arg("check-tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("ffmpeg"))
        .stdout(predicate::str::contains("ffprobe"));
}

#[test]
fn test_cli_check_tools_json() {
    let output = gifforge_cmd()
        .args(["check-tools", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let tools: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = tools
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert_eq!(names, vec!["ffmpeg", "ffprobe"]);
}

#[test]
fn test_cli_validate_defaults() {
    let mut cmd = gifforge_cmd();
    cmd.arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("using defaults"))
        .stdout(predicate::str::contains("Frame rate: 30"));
}

#[test]
fn test_cli_validate_config_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("gifforge.toml");
    fs::write(
        &config_path,
        "[conversion]\ndefault_frame_rate = 90\nscale_width = 320\n",
    )
    .unwrap();

    let mut cmd = gifforge_cmd();
    cmd.arg("validate")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("Frame rate: 60"))
        .stdout(predicate::str::contains("320px"))
        .stdout(predicate::str::contains("default_frame_rate"));
}

#[test]
fn test_cli_validate_malformed_config() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("bad.toml");
    fs::write(&config_path, "[conversion\n").unwrap();

    let mut cmd = gifforge_cmd();
    cmd.arg("validate").arg(&config_path).assert().failure();
}

#[test]
fn test_cli_convert_missing_input() {
    let mut cmd = gifforge_cmd();
    cmd.args(["convert", "/nonexistent/clip.mp4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_cli_convert_rejects_non_video() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("notes.txt");
    fs::write(&input, "not a video").unwrap();

    let mut cmd = gifforge_cmd();
    cmd.current_dir(dir.path())
        .arg("convert")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a video type"));
    assert!(!dir.path().join("converted.gif").exists());
}

#[test]
fn test_cli_convert_rejects_declared_mime() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("clip.mp4");
    fs::write(&input, "bytes").unwrap();

    let mut cmd = gifforge_cmd();
    cmd.arg("convert")
        .arg(&input)
        .args(["--mime", "text/plain"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a video type"));
}

#[test]
fn test_cli_convert_real_clip() {
    let dir = tempdir().unwrap();
    let Some(input) = synth_clip(dir.path()) else {
        eprintln!("ffmpeg not found, skipping");
        return;
    };
    let out_dir = dir.path().join("out");
    fs::create_dir(&out_dir).unwrap();

    let mut cmd = gifforge_cmd();
    cmd.arg("convert")
        .arg(&input)
        .args(["--fps", "15", "--output"])
        .arg(&out_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("converted.gif"))
        .stderr(predicate::str::contains("Done"));

    let gif = fs::read(out_dir.join("converted.gif")).unwrap();
    assert_eq!(&gif[..6], b"GIF89a");
}

//! End-to-end tests for the countdown binary.
//!
//! Each test points `--config-dir` at a fresh temporary directory so settings
//! never leak between tests or into the user's real config.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

fn countdown(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("countdown").unwrap();
    cmd.arg("--config-dir").arg(dir.path());
    cmd
}

// ============================================================================
// Help and listings
// ============================================================================

#[test]
fn test_help_lists_subcommands() {
    Command::cargo_bin("countdown")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("sound"))
        .stdout(predicate::str::contains("settings"));
}

#[test]
fn test_presets_lists_builtin_durations() {
    let dir = TempDir::new().unwrap();

    countdown(&dir)
        .arg("presets")
        .assert()
        .success()
        .stdout(predicate::str::contains("25m"))
        .stdout(predicate::str::contains("00:25:00"))
        .stdout(predicate::str::contains("01:00:00"));
}

#[test]
fn test_sound_list_marks_default_selection() {
    let dir = TempDir::new().unwrap();

    countdown(&dir)
        .args(["sound", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("* bell"))
        .stdout(predicate::str::contains("silent"))
        .stdout(predicate::str::contains("custom"));
}

// ============================================================================
// Persisted preferences
// ============================================================================

#[test]
fn test_volume_persists_across_runs() {
    let dir = TempDir::new().unwrap();

    countdown(&dir)
        .args(["volume", "75"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Volume set to 75%"));

    countdown(&dir)
        .arg("settings")
        .assert()
        .success()
        .stdout(predicate::str::contains("Volume:  75%"));

    assert!(dir.path().join("settings.json").exists());
}

#[test]
fn test_volume_out_of_range_is_rejected() {
    let dir = TempDir::new().unwrap();

    countdown(&dir).args(["volume", "140"]).assert().failure();
}

#[test]
fn test_sound_set_persists() {
    let dir = TempDir::new().unwrap();

    countdown(&dir).args(["sound", "set", "bark"]).assert().success();

    countdown(&dir)
        .arg("settings")
        .assert()
        .success()
        .stdout(predicate::str::contains("Sound:   bark"));
}

#[test]
fn test_mute_and_theme_persist() {
    let dir = TempDir::new().unwrap();

    countdown(&dir).arg("mute").assert().success();
    countdown(&dir).args(["theme", "light"]).assert().success();

    countdown(&dir)
        .arg("settings")
        .assert()
        .success()
        .stdout(predicate::str::contains("Muted:   yes"))
        .stdout(predicate::str::contains("Theme:   light"));
}

#[test]
fn test_corrupt_settings_fall_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("settings.json"), "{ not json").unwrap();

    countdown(&dir)
        .arg("settings")
        .assert()
        .success()
        .stdout(predicate::str::contains("Sound:   bell"));
}

// ============================================================================
// Uploads and previews
// ============================================================================

#[test]
fn test_upload_rejects_non_mp3() {
    let dir = TempDir::new().unwrap();
    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, "just text").unwrap();

    countdown(&dir)
        .args(["sound", "upload"])
        .arg(&notes)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("MP3"));

    countdown(&dir)
        .arg("settings")
        .assert()
        .success()
        .stdout(predicate::str::contains("Custom:  (none)"));
}

#[test]
fn test_upload_mp3_selects_custom() {
    let dir = TempDir::new().unwrap();
    let song = dir.path().join("song.mp3");
    std::fs::write(&song, b"ID3\x04\x00\x00\x00\x00\x00\x00tail").unwrap();

    countdown(&dir)
        .args(["sound", "upload"])
        .arg(&song)
        .assert()
        .success()
        .stdout(predicate::str::contains("Custom sound uploaded and selected"));

    countdown(&dir)
        .arg("settings")
        .assert()
        .success()
        .stdout(predicate::str::contains("Sound:   custom"))
        .stdout(predicate::str::contains("custom.mp3"));

    countdown(&dir)
        .args(["sound", "clear-custom"])
        .assert()
        .success();

    countdown(&dir)
        .arg("settings")
        .assert()
        .success()
        .stdout(predicate::str::contains("Sound:   bell"))
        .stdout(predicate::str::contains("Custom:  (none)"));
}

#[test]
fn test_preview_silent_reports_no_sound() {
    let dir = TempDir::new().unwrap();

    countdown(&dir)
        .args(["sound", "preview", "silent"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No Sound"));
}

// ============================================================================
// Sessions
// ============================================================================

#[test]
fn test_run_without_input_reaches_completion() {
    let dir = TempDir::new().unwrap();
    countdown(&dir).arg("mute").assert().success();

    countdown(&dir)
        .args(["run", "1s"])
        .write_stdin("")
        .timeout(std::time::Duration::from_secs(20))
        .assert()
        .success()
        .stdout(predicate::str::contains("Time's Up!"))
        .stdout(predicate::str::contains("Alarm is silent"));
}

#[test]
fn test_alarm_keeps_ringing_after_input_closes() {
    let dir = TempDir::new().unwrap();

    countdown(&dir)
        .args(["run", "1s"])
        .write_stdin("")
        .timeout(std::time::Duration::from_secs(4))
        .assert()
        .interrupted()
        .stdout(predicate::str::contains("Time's Up!"))
        .stdout(predicate::str::contains("Alarm started"));
}

#[test]
fn test_session_commands_from_stdin() {
    let dir = TempDir::new().unwrap();

    countdown(&dir)
        .arg("run")
        .write_stdin("preset 5m\nstart\npause\nreset\nquit\n")
        .timeout(std::time::Duration::from_secs(20))
        .assert()
        .success()
        .stdout(predicate::str::contains("Preset 5m selected"))
        .stdout(predicate::str::contains("Paused"))
        .stdout(predicate::str::contains("Reset"));
}

#[test]
fn test_session_reports_unknown_command() {
    let dir = TempDir::new().unwrap();

    countdown(&dir)
        .arg("run")
        .write_stdin("dance\nquit\n")
        .timeout(std::time::Duration::from_secs(20))
        .assert()
        .success()
        .stderr(predicate::str::contains("unknown command 'dance'"));
}

use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn lists_asia_timezones_in_catalog_order() {
    let mut cmd = cargo_bin_cmd!("worldclock");
    cmd.arg("--list-timezones")
        .arg("--filter")
        .arg("asia")
        .assert()
        .success()
        .stdout(predicate::str::contains("Asia/Tokyo\nAsia/Shanghai\nAsia/Dubai"))
        .stdout(predicate::str::contains("Europe/London").not());
}

#[test]
fn added_clock_is_persisted_and_exported() {
    let dir = tempdir().expect("tempdir");

    let mut add = cargo_bin_cmd!("worldclock");
    add.arg("--data-dir")
        .arg(dir.path())
        .arg("--add")
        .arg("Tokyo=Asia/Tokyo")
        .assert()
        .success()
        .stdout(predicate::str::contains("added Tokyo (Asia/Tokyo)"));

    let stored = fs::read_to_string(dir.path().join("storage.json")).expect("storage file");
    assert!(stored.contains("worldClockCities"));

    let mut export = cargo_bin_cmd!("worldclock");
    export
        .arg("--data-dir")
        .arg(dir.path())
        .arg("--export")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""name": "Tokyo""#))
        .stdout(predicate::str::contains(r#""timezone": "Asia/Tokyo""#));
}

#[test]
fn duplicate_name_fails_with_clear_error() {
    let dir = tempdir().expect("tempdir");
    cargo_bin_cmd!("worldclock")
        .arg("--data-dir")
        .arg(dir.path())
        .arg("--add")
        .arg("Paris=Europe/Paris")
        .assert()
        .success();

    let mut cmd = cargo_bin_cmd!("worldclock");
    cmd.arg("--data-dir")
        .arg(dir.path())
        .arg("--add")
        .arg("Paris=Europe/London")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn removing_unknown_clock_leaves_storage_alone() {
    let dir = tempdir().expect("tempdir");
    cargo_bin_cmd!("worldclock")
        .arg("--data-dir")
        .arg(dir.path())
        .arg("--add")
        .arg("Cairo=Africa/Cairo")
        .assert()
        .success();
    let before = fs::read_to_string(dir.path().join("storage.json")).expect("storage file");

    let mut cmd = cargo_bin_cmd!("worldclock");
    cmd.arg("--data-dir")
        .arg(dir.path())
        .arg("--remove")
        .arg("Atlantis")
        .assert()
        .success()
        .stdout(predicate::str::contains("no clock named Atlantis"));

    let after = fs::read_to_string(dir.path().join("storage.json")).expect("storage file");
    assert_eq!(before, after);
}

#[test]
fn unknown_timezone_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let mut cmd = cargo_bin_cmd!("worldclock");
    cmd.arg("--data-dir")
        .arg(dir.path())
        .arg("--add")
        .arg("Base=Mars/Olympus")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown timezone"));
}

#[test]
fn zone_outside_catalog_is_rejected_and_nothing_is_saved() {
    let dir = tempdir().expect("tempdir");
    let mut cmd = cargo_bin_cmd!("worldclock");
    cmd.arg("--data-dir")
        .arg(dir.path())
        .arg("--add")
        .arg("Lima=America/Lima")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown timezone"));
    assert!(!dir.path().join("storage.json").exists());
}

#[test]
fn corrupt_storage_reads_as_empty() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("storage.json"), "{ not-valid-json ").expect("write");

    let mut cmd = cargo_bin_cmd!("worldclock");
    cmd.arg("--data-dir")
        .arg(dir.path())
        .arg("--snapshot")
        .assert()
        .success()
        .stdout(predicate::str::contains("no clocks configured"));
}

#[test]
fn snapshot_prints_hand_angles() {
    let dir = tempdir().expect("tempdir");
    cargo_bin_cmd!("worldclock")
        .arg("--data-dir")
        .arg(dir.path())
        .arg("--add")
        .arg("London=Europe/London")
        .assert()
        .success();

    let mut cmd = cargo_bin_cmd!("worldclock");
    cmd.arg("--data-dir")
        .arg(dir.path())
        .arg("--snapshot")
        .assert()
        .success()
        .stdout(predicate::str::contains("London"))
        .stdout(predicate::str::contains("Europe/London"))
        .stdout(predicate::str::contains("second"));
}

#[test]
fn headless_stops_after_requested_ticks() {
    let dir = tempdir().expect("tempdir");
    let mut cmd = cargo_bin_cmd!("worldclock");
    cmd.arg("--data-dir")
        .arg(dir.path())
        .arg("--add")
        .arg("Sydney=Australia/Sydney")
        .arg("--headless")
        .arg("--ticks")
        .arg("2")
        .arg("--mute")
        .assert()
        .success()
        .stdout(predicate::str::contains("second").count(2));
}

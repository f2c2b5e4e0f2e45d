//! Integration tests for the romdeck CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to get a romdeck command
fn romdeck() -> Command {
    Command::cargo_bin("romdeck").unwrap()
}

const ROMLIST: &str = "\
#Name;Title;Emulator;CloneOf;Year;Manufacturer;Category\n\
pacman;Pac-Man;mame;;1980;Namco;Maze\n\
mspacman;Ms. Pac-Man;mame;pacman;1981;Midway;Maze\n\
galaga;Galaga;mame;;1981;Namco;Shooter\n\
outrun;Out Run;mame;;1986;Sega;Racing\n";

const VIEW: &str = "\
name: arcade
romlist: mame
clone_grouping: true
filters:
  - name: All
    sort_by: Title
  - name: Favourites
    rules:
      - Favourite equals 1
";

/// Helper to create an initialized frontend with one romlist and one view
fn setup_frontend() -> TempDir {
    let tmp = TempDir::new().unwrap();
    romdeck()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success();

    fs::write(tmp.path().join("romlists/mame.txt"), ROMLIST).unwrap();
    fs::write(tmp.path().join("views/arcade.yaml"), VIEW).unwrap();
    tmp
}

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    romdeck()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("game launcher"));
}

#[test]
fn test_version_displays() {
    romdeck()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("romdeck"));
}

#[test]
fn test_init_creates_structure() {
    let tmp = TempDir::new().unwrap();
    romdeck()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized"));

    assert!(tmp.path().join(".romdeck/config.yaml").exists());
    assert!(tmp.path().join("romlists").is_dir());
    assert!(tmp.path().join("views").is_dir());
}

#[test]
fn test_commands_fail_outside_frontend() {
    let tmp = TempDir::new().unwrap();
    romdeck()
        .current_dir(tmp.path())
        .arg("views")
        .assert()
        .failure();
}

// ============================================================================
// View Building
// ============================================================================

#[test]
fn test_views_lists_configuration() {
    let tmp = setup_frontend();
    romdeck()
        .current_dir(tmp.path())
        .arg("views")
        .assert()
        .success()
        .stdout(predicate::str::contains("arcade"))
        .stdout(predicate::str::contains("Favourites"));
}

#[test]
fn test_list_builds_grouped_sorted_view() {
    let tmp = setup_frontend();
    let assert = romdeck()
        .current_dir(tmp.path())
        .args(["list", "arcade"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pac-Man"))
        .stdout(predicate::str::contains("Galaga"));

    // Clone grouping is on: mspacman collapses under pacman
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(!stdout.contains("mspacman"));
    assert!(stdout.contains("3 of 3"));
}

#[test]
fn test_list_populates_cache() {
    let tmp = setup_frontend();
    romdeck()
        .current_dir(tmp.path())
        .args(["list", "arcade"])
        .assert()
        .success();

    let cache = tmp.path().join(".romdeck/cache/mame");
    assert!(cache.join("romlist.arcade.json").exists());
    assert!(cache.join("romlist.arcade.filter.0.json").exists());
    assert!(cache.join("romlist.arcade.filter.1.json").exists());
    assert!(cache.join("snapshot.arcade.json").exists());

    // A second run hits the cache and produces the same listing
    romdeck()
        .current_dir(tmp.path())
        .args(["list", "arcade"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 of 3"));
}

#[test]
fn test_list_by_filter_name() {
    let tmp = setup_frontend();
    romdeck()
        .current_dir(tmp.path())
        .args(["list", "arcade", "--filter", "favourites"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 of 0"));
}

#[test]
fn test_romlist_change_invalidates_cache() {
    let tmp = setup_frontend();
    romdeck()
        .current_dir(tmp.path())
        .args(["list", "arcade"])
        .assert()
        .success();

    // Append a record: the source snapshot no longer matches
    let romlist = tmp.path().join("romlists/mame.txt");
    let mut body = fs::read_to_string(&romlist).unwrap();
    body.push_str("dkong;Donkey Kong;mame;;1981;Nintendo;Platform\n");
    fs::write(&romlist, body).unwrap();

    romdeck()
        .current_dir(tmp.path())
        .args(["list", "arcade"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Donkey Kong"))
        .stdout(predicate::str::contains("4 of 4"));
}

#[test]
fn test_corrupt_cache_recovers() {
    let tmp = setup_frontend();
    romdeck()
        .current_dir(tmp.path())
        .args(["list", "arcade"])
        .assert()
        .success();

    // Wreck the catalog snapshot; the next run falls back to the romlist
    let entry = tmp.path().join(".romdeck/cache/mame/romlist.arcade.json");
    fs::write(&entry, "{\"version\":999,\"payload\":[]}").unwrap();

    romdeck()
        .current_dir(tmp.path())
        .args(["list", "arcade"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 of 3"));
}

// ============================================================================
// Favourites / Tags / Stats
// ============================================================================

#[test]
fn test_fav_updates_filter_and_side_file() {
    let tmp = setup_frontend();
    romdeck()
        .current_dir(tmp.path())
        .args(["fav", "galaga", "--view", "arcade"])
        .assert()
        .success()
        .stdout(predicate::str::contains("favourites"));

    let fav_file = tmp.path().join("views/arcade.fav");
    let body = fs::read_to_string(&fav_file).unwrap();
    assert!(body.contains("galaga;mame"));

    romdeck()
        .current_dir(tmp.path())
        .args(["list", "arcade", "--filter", "Favourites"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Galaga"))
        .stdout(predicate::str::contains("1 of 1"));

    // Removing it empties the filter again
    romdeck()
        .current_dir(tmp.path())
        .args(["fav", "galaga", "--view", "arcade", "--remove"])
        .assert()
        .success();
    romdeck()
        .current_dir(tmp.path())
        .args(["list", "arcade", "--filter", "Favourites"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 of 0"));
}

#[test]
fn test_tag_writes_tag_file() {
    let tmp = setup_frontend();
    romdeck()
        .current_dir(tmp.path())
        .args(["tag", "pacman", "classic", "--view", "arcade"])
        .assert()
        .success();

    let tag_file = tmp.path().join("views/arcade/classic.tag");
    let body = fs::read_to_string(&tag_file).unwrap();
    assert!(body.contains("pacman;mame"));
}

#[test]
fn test_played_writes_stat_file() {
    let tmp = setup_frontend();
    romdeck()
        .current_dir(tmp.path())
        .args(["played", "outrun", "90", "--view", "arcade"])
        .assert()
        .success()
        .stdout(predicate::str::contains("played 1 time(s)"));

    let stat_file = tmp.path().join("stats/mame/outrun.stat");
    let body = fs::read_to_string(&stat_file).unwrap();
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines[0], "1");
    assert_eq!(lines[1], "90");
}

// ============================================================================
// Cache Management
// ============================================================================

#[test]
fn test_cache_status_and_clear() {
    let tmp = setup_frontend();
    romdeck()
        .current_dir(tmp.path())
        .args(["list", "arcade"])
        .assert()
        .success();

    romdeck()
        .current_dir(tmp.path())
        .args(["cache", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Entries:"));

    romdeck()
        .current_dir(tmp.path())
        .args(["cache", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cache cleared"));

    assert!(!tmp
        .path()
        .join(".romdeck/cache/mame/romlist.arcade.json")
        .exists());
}

#[test]
fn test_cache_invalidate_view() {
    let tmp = setup_frontend();
    romdeck()
        .current_dir(tmp.path())
        .args(["list", "arcade"])
        .assert()
        .success();

    romdeck()
        .current_dir(tmp.path())
        .args(["cache", "invalidate", "arcade"])
        .assert()
        .success();

    let cache = tmp.path().join(".romdeck/cache/mame");
    assert!(!cache.join("romlist.arcade.json").exists());
    assert!(!cache.join("romlist.arcade.filter.0.json").exists());
}

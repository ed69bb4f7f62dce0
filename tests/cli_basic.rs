//! Integration tests for basic CLI behavior.
//!
//! Tests that the binary exists, accepts standard flags, and each subcommand
//! responds to `--help` with appropriate text. Nothing here touches the
//! network.

#![allow(deprecated)] // cargo_bin deprecation — replacement not yet stable

use assert_cmd::Command;
use predicates::prelude::*;

/// Helper: get a Command for the `trova` binary.
fn trova() -> Command {
    Command::cargo_bin("trova").expect("binary 'trova' should be built")
}

// ─── Top-level flags ─────────────────────────────────────────────────────────

#[test]
fn help_flag_shows_usage() {
    trova()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: trova"))
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("episodes"))
        .stdout(predicate::str::contains("stream"))
        .stdout(predicate::str::contains("channel"))
        .stdout(predicate::str::contains("build-cache"))
        .stdout(predicate::str::contains("show-cache"));
}

#[test]
fn version_flag_shows_semver() {
    trova()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^trova \d+\.\d+\.\d+\n$").unwrap());
}

#[test]
fn no_args_shows_error_and_usage() {
    trova()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage: trova"));
}

#[test]
fn invalid_subcommand_fails() {
    trova()
        .arg("this-is-not-a-real-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

// ─── Subcommand help ─────────────────────────────────────────────────────────

#[test]
fn search_help() {
    trova()
        .args(["search", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Search the anime catalog"))
        .stdout(predicate::str::contains("<QUERY>"))
        .stdout(predicate::str::contains("--dubbed"));
}

#[test]
fn episodes_help() {
    trova()
        .args(["episodes", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("List all episodes"))
        .stdout(predicate::str::contains("<ANIME_ID>"));
}

#[test]
fn stream_help() {
    trova()
        .args(["stream", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("embed and direct MP4"))
        .stdout(predicate::str::contains("<ANIME_ID>"))
        .stdout(predicate::str::contains("<SLUG>"))
        .stdout(predicate::str::contains("<EPISODE_ID>"));
}

#[test]
fn channel_help() {
    trova()
        .args(["channel", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Resolve a channel name"))
        .stdout(predicate::str::contains("<NAME>"))
        .stdout(predicate::str::contains("--original-link"))
        .stdout(predicate::str::contains("--group"));
}

#[test]
fn channels_help() {
    trova()
        .args(["channels", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dump the raw channel catalog"))
        .stdout(predicate::str::contains("--group"));
}

#[test]
fn build_cache_help() {
    trova()
        .args(["build-cache", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("persist the name->URL cache"))
        .stdout(predicate::str::contains("--output"));
}

#[test]
fn show_cache_help() {
    trova()
        .args(["show-cache", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("previously built cache"))
        .stdout(predicate::str::contains("--file"));
}

// ─── Subcommand argument validation ──────────────────────────────────────────

#[test]
fn search_missing_query_fails() {
    trova()
        .arg("search")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<QUERY>"));
}

#[test]
fn episodes_missing_id_fails() {
    trova()
        .arg("episodes")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<ANIME_ID>"));
}

#[test]
fn stream_missing_args_fails() {
    trova()
        .arg("stream")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<ANIME_ID>"));
}

#[test]
fn channel_missing_name_fails() {
    trova()
        .arg("channel")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<NAME>"));
}

#[test]
fn episodes_non_numeric_id_fails() {
    trova()
        .args(["episodes", "not-a-number"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

// ─── Config handling ─────────────────────────────────────────────────────────

#[test]
fn missing_domain_config_exits_unexpected() {
    // Exit code 5 is the "unexpected error" lane; a missing config file
    // lands there before any network traffic happens.
    trova()
        .args(["search", "anything", "--config", "/nonexistent/domains.json"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn show_cache_missing_file_exits_unexpected() {
    trova()
        .args(["show-cache", "--file", "/nonexistent/cache.json"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("cannot read cache"));
}

//! Behavioural smoke test for the CLI entrypoint.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;

#[test]
fn cli_help_lists_snapshot_commands() {
    let mut cmd = cargo_bin_cmd!("longhorn-snapshotter");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(contains("create-snapshot"))
        .stdout(contains("delete-snapshot"));
}

#[test]
fn cli_rejects_malformed_probe_concurrency() {
    let mut cmd = cargo_bin_cmd!("longhorn-snapshotter");
    cmd.arg("list-volumes")
        .env("LONGHORN_PROBE_CONCURRENCY", "0")
        .assert()
        .failure()
        .stderr(contains("LONGHORN_PROBE_CONCURRENCY"));
}

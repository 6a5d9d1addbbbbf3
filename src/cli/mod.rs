//! Command-line interface definitions for the `longhorn-snapshotter` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `longhorn-snapshotter` binary.
#[derive(Debug, Parser)]
#[command(
    name = "longhorn-snapshotter",
    about = "Create, locate, and delete Longhorn volume snapshots",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Snapshot a Longhorn volume and print the snapshot ID.
    #[command(name = "create-snapshot")]
    CreateSnapshot(CreateSnapshotCommand),
    /// Find the volume owning a snapshot and delete the snapshot.
    #[command(name = "delete-snapshot")]
    DeleteSnapshot(DeleteSnapshotCommand),
    /// Print the filesystem type recorded for a persistent volume.
    #[command(name = "volume-info")]
    VolumeInfo(VolumeCommand),
    /// Print the CSI volume handle recorded for a persistent volume.
    #[command(name = "volume-id")]
    VolumeId(VolumeCommand),
    /// List the volumes known to the Longhorn manager.
    #[command(name = "list-volumes")]
    ListVolumes,
}

/// Arguments for `create-snapshot`.
#[derive(Debug, Parser)]
pub(crate) struct CreateSnapshotCommand {
    /// Longhorn volume ID or name to snapshot.
    #[arg(long, value_name = "VOLUME")]
    pub(crate) volume: String,
    /// Tag to attach, as KEY=VALUE. Longhorn ignores snapshot tags; they are
    /// accepted for parity with the orchestrator interface.
    #[arg(long = "tag", value_name = "KEY=VALUE")]
    pub(crate) tags: Vec<String>,
}

/// Arguments for `delete-snapshot`.
#[derive(Debug, Parser)]
pub(crate) struct DeleteSnapshotCommand {
    /// Snapshot ID or name returned by `create-snapshot`.
    #[arg(long, value_name = "SNAPSHOT")]
    pub(crate) snapshot: String,
}

/// Arguments for commands that address a persistent volume.
#[derive(Debug, Parser)]
pub(crate) struct VolumeCommand {
    /// Persistent volume name.
    #[arg(long, value_name = "NAME")]
    pub(crate) volume: String,
}

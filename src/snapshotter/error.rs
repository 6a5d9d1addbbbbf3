//! Error types for the snapshot lifecycle coordinator.

use thiserror::Error;

use crate::backend::BackendError;
use crate::cluster::ClusterError;
use crate::config::ConfigError;
use crate::volume_record::VolumeRecordError;

/// Errors surfaced to the orchestrator by snapshotter operations.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SnapshotterError {
    /// Backend transport, status, or decoding failure, passed through as-is.
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// Raised when the backend created a snapshot but returned neither an ID
    /// nor a name for it.
    #[error("backend returned an empty snapshot id for volume {volume_id}")]
    EmptySnapshotId {
        /// Volume the snapshot was taken from.
        volume_id: String,
    },
    /// Raised when no listed volume acknowledges the snapshot.
    #[error(
        "cannot find the volume for snapshot {snapshot_id} \
         ({scanned} volumes probed, {unreachable} unreachable)"
    )]
    VolumeNotFoundForSnapshot {
        /// Snapshot being located.
        snapshot_id: String,
        /// Number of probe results examined.
        scanned: usize,
        /// Number of probes that failed at the transport level.
        unreachable: usize,
    },
    /// Raised when a persistent volume has no CSI spec.
    #[error("persistent volume {volume} has no CSI spec")]
    MissingCsiSpec {
        /// Name of the persistent volume.
        volume: String,
    },
    /// Raised when a persistent volume has no CSI volume handle.
    #[error("persistent volume {volume} has no CSI volume handle")]
    MissingVolumeHandle {
        /// Name of the persistent volume.
        volume: String,
    },
    /// Raised when a persistent volume has no CSI filesystem type.
    #[error("persistent volume {volume} has no CSI filesystem type")]
    MissingFsType {
        /// Name of the persistent volume.
        volume: String,
    },
    /// Raised when a persistent-volume record is structurally invalid.
    #[error("invalid persistent volume record: {message}")]
    InvalidVolumeRecord {
        /// Description of the structural problem.
        message: String,
    },
    /// Raised when the cluster has no persistent volume with the given name.
    #[error("persistent volume {volume_id} not found")]
    VolumeNotFound {
        /// Name that was looked up.
        volume_id: String,
    },
    /// Raised when initialisation cannot reach the cluster API.
    #[error("cannot initialise cluster access: {message}")]
    ClusterConfig {
        /// Underlying error message.
        message: String,
    },
    /// Raised when a cluster API request fails after initialisation.
    #[error("cluster request failed: {message}")]
    Cluster {
        /// Underlying error message.
        message: String,
    },
    /// Raised when the plugin configuration map carries an invalid value.
    #[error("invalid plugin configuration: {0}")]
    Config(#[from] ConfigError),
    /// Raised when a cluster-backed operation runs before `init`.
    #[error("snapshotter used before init")]
    NotInitialized,
    /// Raised by operations the backend cannot support.
    #[error("{operation} is not supported by the Longhorn snapshotter")]
    Unsupported {
        /// Name of the unsupported operation.
        operation: String,
    },
}

impl From<VolumeRecordError> for SnapshotterError {
    fn from(value: VolumeRecordError) -> Self {
        match value {
            VolumeRecordError::MissingCsiSpec { volume } => Self::MissingCsiSpec { volume },
            VolumeRecordError::MissingVolumeHandle { volume } => {
                Self::MissingVolumeHandle { volume }
            }
            VolumeRecordError::MissingFsType { volume } => Self::MissingFsType { volume },
            VolumeRecordError::Malformed { message } => Self::InvalidVolumeRecord { message },
        }
    }
}

impl From<ClusterError> for SnapshotterError {
    fn from(value: ClusterError) -> Self {
        match value {
            ClusterError::Config { .. } => Self::ClusterConfig {
                message: value.to_string(),
            },
            ClusterError::Request { .. } => Self::Cluster {
                message: value.to_string(),
            },
        }
    }
}

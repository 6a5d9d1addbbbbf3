//! Core library for the Longhorn volume snapshotter.
//!
//! The crate adapts a backup orchestrator's volume-snapshot lifecycle to the
//! Longhorn manager REST API. A [`SnapshotBackend`] abstraction wraps the four
//! backend calls; [`LonghornSnapshotter`] coordinates them, resolving which
//! volume owns a snapshot by probing the volume listing, and keeps the CSI
//! volume handle of persistent-volume records in sync.

pub mod backend;
pub mod cluster;
pub mod config;
pub mod longhorn;
pub mod snapshotter;
pub mod test_support;
pub mod volume_record;

pub use backend::{
    BackendError, ProbeOutcome, ResourceRef, SnapshotBackend, SnapshotEntry, VolumeEntry,
};
pub use cluster::{ClusterConnector, ClusterError, KubeConnector, VolumeRecordStore};
pub use config::{ConfigError, PluginOverrides, SnapshotterConfig};
pub use longhorn::LonghornBackend;
pub use snapshotter::{
    LonghornSnapshotter, PLUGIN_NAME, SnapshotterError, VolumeFromSnapshotRequest, VolumeInfo,
    VolumeSnapshotter,
};
pub use volume_record::{UnstructuredVolume, VolumeRecordError};

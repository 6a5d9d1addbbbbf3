//! Snapshot lifecycle coordinator.
//!
//! Implements the orchestrator-facing volume snapshotter capability on top of
//! a [`SnapshotBackend`] and an injected cluster connection. Every call is an
//! independent transaction: backend state is re-read on each request and
//! nothing backend-side is cached between calls.

mod error;
mod scan;

use std::collections::HashMap;
use std::num::NonZeroUsize;

use k8s_openapi::api::core::v1::PersistentVolume;
use tracing::{info, warn};

use crate::backend::{BackendFuture, SnapshotBackend};
use crate::cluster::{ClusterConnector, VolumeRecordStore};
use crate::config::PluginOverrides;
use crate::volume_record::{UnstructuredVolume, filesystem_type};

pub use error::SnapshotterError;

/// Name under which the snapshotter registers with the orchestrator.
pub const PLUGIN_NAME: &str = "longhorn.io/longhorn";

/// Future returned by snapshotter operations.
pub type SnapshotterFuture<'a, T> = BackendFuture<'a, T, SnapshotterError>;

/// Parameters of a restore request.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct VolumeFromSnapshotRequest {
    /// Snapshot to restore from.
    pub snapshot_id: String,
    /// Requested volume type.
    pub volume_type: String,
    /// Requested availability zone.
    pub volume_az: String,
    /// Requested provisioned IOPS.
    pub iops: Option<i64>,
}

/// Type and IOPS reported for a volume.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VolumeInfo {
    /// Filesystem type taken from the volume's CSI spec.
    pub volume_type: String,
    /// Provisioned IOPS. Longhorn has no such concept, so this is always
    /// `None`.
    pub iops: Option<i64>,
}

/// Capability interface the backup orchestrator drives.
pub trait VolumeSnapshotter {
    /// Prepares the snapshotter for use. May be called repeatedly; each call
    /// re-establishes the cluster connection, and a failed call leaves the
    /// snapshotter uninitialised.
    fn init<'a, S>(&'a mut self, config: &'a HashMap<String, String, S>) -> SnapshotterFuture<'a, ()>
    where
        S: std::hash::BuildHasher + Sync + 'a;

    /// Creates a volume from a snapshot.
    fn create_volume_from_snapshot<'a>(
        &'a self,
        request: &'a VolumeFromSnapshotRequest,
    ) -> SnapshotterFuture<'a, String>;

    /// Returns the type and IOPS of a volume.
    fn get_volume_info<'a>(
        &'a self,
        volume_id: &'a str,
        volume_az: &'a str,
    ) -> SnapshotterFuture<'a, VolumeInfo>;

    /// Snapshots a volume and returns the snapshot ID.
    fn create_snapshot<'a, S>(
        &'a self,
        volume_id: &'a str,
        volume_az: &'a str,
        tags: &'a HashMap<String, String, S>,
    ) -> SnapshotterFuture<'a, String>
    where
        S: std::hash::BuildHasher + Sync + 'a;

    /// Deletes a snapshot identified only by its ID.
    fn delete_snapshot<'a>(&'a self, snapshot_id: &'a str) -> SnapshotterFuture<'a, ()>;

    /// Returns the external volume handle of a persistent-volume record.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotterError::MissingCsiSpec`] or
    /// [`SnapshotterError::MissingVolumeHandle`] for non-CSI records.
    fn get_volume_id(&self, record: &UnstructuredVolume) -> Result<String, SnapshotterError>;

    /// Returns a copy of the record pointing at a different volume handle.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotterError::MissingCsiSpec`] for non-CSI records.
    fn set_volume_id(
        &self,
        record: &UnstructuredVolume,
        volume_id: &str,
    ) -> Result<UnstructuredVolume, SnapshotterError>;
}

/// Snapshotter backed by Longhorn.
pub struct LonghornSnapshotter<B, C: ClusterConnector> {
    backend: B,
    connector: C,
    store: Option<C::Store>,
    probe_window: NonZeroUsize,
}

impl<B, C> LonghornSnapshotter<B, C>
where
    B: SnapshotBackend,
    C: ClusterConnector,
{
    /// Creates an uninitialised snapshotter that probes volumes one at a
    /// time.
    #[must_use]
    pub const fn new(backend: B, connector: C) -> Self {
        Self {
            backend,
            connector,
            store: None,
            probe_window: NonZeroUsize::MIN,
        }
    }

    /// Overrides how many snapshot probes may be in flight at once.
    #[must_use]
    pub const fn with_probe_window(mut self, window: NonZeroUsize) -> Self {
        self.probe_window = window;
        self
    }

    /// Returns the current probe window.
    #[must_use]
    pub const fn probe_window(&self) -> NonZeroUsize {
        self.probe_window
    }

    /// Returns the backend in use.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns `true` once `init` has established a cluster connection.
    #[must_use]
    pub const fn is_initialised(&self) -> bool {
        self.store.is_some()
    }
}

impl<B, C> LonghornSnapshotter<B, C>
where
    B: SnapshotBackend + Send + Sync,
    C: ClusterConnector + Send + Sync,
    C::Store: Send + Sync,
{
    /// Fetches a persistent-volume record in unstructured form through the
    /// connection established by `init`.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotterError::NotInitialized`] before `init` has
    /// succeeded and [`SnapshotterError::VolumeNotFound`] when the cluster has
    /// no such volume.
    pub fn volume_record<'a>(&'a self, name: &'a str) -> SnapshotterFuture<'a, UnstructuredVolume> {
        Box::pin(async move {
            let volume = self.persistent_volume(name).await?;
            Ok(UnstructuredVolume::from_persistent_volume(&volume)?)
        })
    }

    fn persistent_volume<'a>(&'a self, name: &'a str) -> SnapshotterFuture<'a, PersistentVolume> {
        Box::pin(async move {
            let store = self.store.as_ref().ok_or(SnapshotterError::NotInitialized)?;
            store
                .get_persistent_volume(name)
                .await?
                .ok_or_else(|| SnapshotterError::VolumeNotFound {
                    volume_id: name.to_owned(),
                })
        })
    }
}

impl<B, C> VolumeSnapshotter for LonghornSnapshotter<B, C>
where
    B: SnapshotBackend + Send + Sync,
    C: ClusterConnector + Send + Sync,
    C::Store: Send + Sync,
{
    fn init<'a, S>(&'a mut self, config: &'a HashMap<String, String, S>) -> SnapshotterFuture<'a, ()>
    where
        S: std::hash::BuildHasher + Sync + 'a,
    {
        Box::pin(async move {
            self.store = None;
            let overrides = PluginOverrides::from_map(config)?;
            let store = self.connector.connect().await?;
            self.store = Some(store);
            if let Some(window) = overrides.probe_concurrency {
                self.probe_window = window;
            }
            info!(
                plugin = PLUGIN_NAME,
                probe_window = self.probe_window.get(),
                "initialised snapshotter"
            );
            Ok(())
        })
    }

    fn create_volume_from_snapshot<'a>(
        &'a self,
        request: &'a VolumeFromSnapshotRequest,
    ) -> SnapshotterFuture<'a, String> {
        Box::pin(async move {
            info!(
                snapshot_id = %request.snapshot_id,
                volume_type = %request.volume_type,
                volume_az = %request.volume_az,
                iops = ?request.iops,
                "create volume from snapshot requested"
            );
            Err(SnapshotterError::Unsupported {
                operation: String::from("CreateVolumeFromSnapshot"),
            })
        })
    }

    fn get_volume_info<'a>(
        &'a self,
        volume_id: &'a str,
        volume_az: &'a str,
    ) -> SnapshotterFuture<'a, VolumeInfo> {
        Box::pin(async move {
            info!(volume_id, volume_az, "getting volume info");
            let volume = self.persistent_volume(volume_id).await?;
            let volume_type = filesystem_type(&volume)?;
            Ok(VolumeInfo {
                volume_type,
                iops: None,
            })
        })
    }

    fn create_snapshot<'a, S>(
        &'a self,
        volume_id: &'a str,
        volume_az: &'a str,
        tags: &'a HashMap<String, String, S>,
    ) -> SnapshotterFuture<'a, String>
    where
        S: std::hash::BuildHasher + Sync + 'a,
    {
        Box::pin(async move {
            info!(volume_id, volume_az, tags = tags.len(), "creating snapshot");
            if !tags.is_empty() {
                warn!(volume_id, "snapshot tags are not supported by Longhorn and were dropped");
            }
            let snapshot = self.backend.create_snapshot(volume_id).await?;
            let snapshot_id = snapshot
                .reference()
                .ok_or_else(|| SnapshotterError::EmptySnapshotId {
                    volume_id: volume_id.to_owned(),
                })?
                .into_string();
            info!(volume_id, snapshot_id = %snapshot_id, "created snapshot");
            Ok(snapshot_id)
        })
    }

    fn delete_snapshot<'a>(&'a self, snapshot_id: &'a str) -> SnapshotterFuture<'a, ()> {
        Box::pin(async move {
            info!(snapshot_id, "deleting snapshot");
            let volumes = self.backend.list_volumes().await?;
            let scan =
                scan::find_owner(&self.backend, &volumes, snapshot_id, self.probe_window).await;
            let Some(owner) = scan.owner else {
                return Err(SnapshotterError::VolumeNotFoundForSnapshot {
                    snapshot_id: snapshot_id.to_owned(),
                    scanned: scan.scanned,
                    unreachable: scan.unreachable,
                });
            };
            self.backend
                .delete_snapshot(owner.as_str(), snapshot_id)
                .await?;
            info!(snapshot_id, volume_id = %owner, "deleted snapshot");
            Ok(())
        })
    }

    fn get_volume_id(&self, record: &UnstructuredVolume) -> Result<String, SnapshotterError> {
        Ok(record.volume_handle()?)
    }

    fn set_volume_id(
        &self,
        record: &UnstructuredVolume,
        volume_id: &str,
    ) -> Result<UnstructuredVolume, SnapshotterError> {
        Ok(record.with_volume_handle(volume_id)?)
    }
}

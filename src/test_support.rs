//! Test support utilities shared across unit and integration tests.
//!
//! Provides a scripted snapshot backend that records every call, plus an
//! in-memory persistent-volume store and a connector that hands it out.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use k8s_openapi::api::core::v1::{
    CSIPersistentVolumeSource, PersistentVolume, PersistentVolumeSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::backend::{
    BackendError, BackendFuture, ProbeOutcome, SnapshotBackend, SnapshotEntry, VolumeEntry,
};
use crate::cluster::{ClusterConnector, ClusterError, VolumeRecordStore};

/// Base URL used for scripted snapshot-get action URLs.
pub const SCRIPTED_BACKEND_URL: &str = "http://backend";

/// Builds a volume entry whose snapshot-get action URL is derived from the
/// first non-empty identifier.
#[must_use]
pub fn volume_entry(id: Option<&str>, name: Option<&str>) -> VolumeEntry {
    let key = id
        .filter(|value| !value.is_empty())
        .or(name)
        .unwrap_or_default();
    VolumeEntry {
        id: id.map(str::to_owned),
        name: name.map(str::to_owned),
        snapshot_get_url: Some(snapshot_get_url(key)),
    }
}

/// Returns the scripted snapshot-get action URL for a volume key.
#[must_use]
pub fn snapshot_get_url(volume_key: &str) -> String {
    format!("{SCRIPTED_BACKEND_URL}/v1/volumes/{volume_key}?action=snapshotGet")
}

/// Builds a persistent volume with an optional CSI spec.
#[must_use]
pub fn persistent_volume(name: &str, csi: Option<(&str, Option<&str>)>) -> PersistentVolume {
    PersistentVolume {
        metadata: ObjectMeta {
            name: Some(name.to_owned()),
            ..ObjectMeta::default()
        },
        spec: Some(PersistentVolumeSpec {
            csi: csi.map(|(handle, fs_type)| CSIPersistentVolumeSource {
                driver: String::from("driver.longhorn.io"),
                volume_handle: handle.to_owned(),
                fs_type: fs_type.map(str::to_owned),
                ..CSIPersistentVolumeSource::default()
            }),
            ..PersistentVolumeSpec::default()
        }),
        status: None,
    }
}

/// A snapshot probe recorded by [`ScriptedBackend`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProbeCall {
    /// Action URL the probe was sent to.
    pub url: String,
    /// Snapshot name the volume was asked about.
    pub snapshot_name: String,
}

impl ProbeCall {
    /// Builds the call expected for a probe of `volume_key` about
    /// `snapshot_name`.
    #[must_use]
    pub fn new(volume_key: &str, snapshot_name: &str) -> Self {
        Self {
            url: snapshot_get_url(volume_key),
            snapshot_name: snapshot_name.to_owned(),
        }
    }
}

/// A delete call recorded by [`ScriptedBackend`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeleteCall {
    /// Volume the delete was issued against.
    pub volume_id: String,
    /// Snapshot name sent in the payload.
    pub snapshot_name: String,
}

#[derive(Debug, Default)]
struct ScriptedState {
    volumes: Vec<VolumeEntry>,
    owning_urls: Vec<String>,
    unreachable_urls: Vec<String>,
    snapshot: SnapshotEntry,
    list_failure: Option<BackendError>,
    create_failure: Option<BackendError>,
    delete_failure: Option<BackendError>,
    created: Vec<String>,
    probes: Vec<ProbeCall>,
    deletes: Vec<DeleteCall>,
    list_calls: usize,
}

/// Snapshot backend driven by pre-seeded responses.
///
/// Clones share state, so a test can keep a handle for assertions after
/// moving the backend into a snapshotter.
#[derive(Clone, Debug, Default)]
pub struct ScriptedBackend {
    state: Arc<Mutex<ScriptedState>>,
}

impl ScriptedBackend {
    /// Creates a backend with no volumes and an empty snapshot response.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ScriptedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the volume listing.
    pub fn set_volumes(&self, volumes: Vec<VolumeEntry>) {
        self.state().volumes = volumes;
    }

    /// Makes probes against `url` report ownership.
    pub fn own_snapshot_at(&self, url: impl Into<String>) {
        self.state().owning_urls.push(url.into());
    }

    /// Makes probes against `url` fail at the transport level.
    pub fn unreachable_at(&self, url: impl Into<String>) {
        self.state().unreachable_urls.push(url.into());
    }

    /// Sets the entry returned by snapshot creation.
    pub fn respond_to_create(&self, snapshot: SnapshotEntry) {
        self.state().snapshot = snapshot;
    }

    /// Makes the volume listing fail.
    pub fn fail_list(&self, error: BackendError) {
        self.state().list_failure = Some(error);
    }

    /// Makes snapshot creation fail.
    pub fn fail_create(&self, error: BackendError) {
        self.state().create_failure = Some(error);
    }

    /// Makes snapshot deletion fail.
    pub fn fail_delete(&self, error: BackendError) {
        self.state().delete_failure = Some(error);
    }

    /// Volume IDs passed to snapshot creation, in call order.
    #[must_use]
    pub fn created(&self) -> Vec<String> {
        self.state().created.clone()
    }

    /// Probes issued, in call order.
    #[must_use]
    pub fn probes(&self) -> Vec<ProbeCall> {
        self.state().probes.clone()
    }

    /// Delete calls issued, in call order.
    #[must_use]
    pub fn deletes(&self) -> Vec<DeleteCall> {
        self.state().deletes.clone()
    }

    /// Number of volume listings requested.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.state().list_calls
    }
}

impl SnapshotBackend for ScriptedBackend {
    fn list_volumes(&self) -> BackendFuture<'_, Vec<VolumeEntry>, BackendError> {
        Box::pin(async move {
            let mut state = self.state();
            state.list_calls += 1;
            match state.list_failure.clone() {
                Some(error) => Err(error),
                None => Ok(state.volumes.clone()),
            }
        })
    }

    fn create_snapshot<'a>(
        &'a self,
        volume_id: &'a str,
    ) -> BackendFuture<'a, SnapshotEntry, BackendError> {
        Box::pin(async move {
            let mut state = self.state();
            state.created.push(volume_id.to_owned());
            match state.create_failure.clone() {
                Some(error) => Err(error),
                None => Ok(state.snapshot.clone()),
            }
        })
    }

    fn probe_snapshot<'a>(
        &'a self,
        volume: &'a VolumeEntry,
        snapshot_name: &'a str,
    ) -> BackendFuture<'a, ProbeOutcome, BackendError> {
        Box::pin(async move {
            let Some(url) = volume.snapshot_get_url.clone() else {
                return Ok(ProbeOutcome::Absent { status: None });
            };
            let mut state = self.state();
            state.probes.push(ProbeCall {
                url: url.clone(),
                snapshot_name: snapshot_name.to_owned(),
            });
            if state.unreachable_urls.contains(&url) {
                return Err(BackendError::Unreachable {
                    operation: String::from("snapshotGet"),
                    message: format!("connection reset by {url}"),
                });
            }
            if state.owning_urls.contains(&url) {
                Ok(ProbeOutcome::Owned)
            } else {
                Ok(ProbeOutcome::Absent { status: Some(404) })
            }
        })
    }

    fn delete_snapshot<'a>(
        &'a self,
        volume_id: &'a str,
        snapshot_name: &'a str,
    ) -> BackendFuture<'a, (), BackendError> {
        Box::pin(async move {
            let mut state = self.state();
            state.deletes.push(DeleteCall {
                volume_id: volume_id.to_owned(),
                snapshot_name: snapshot_name.to_owned(),
            });
            match state.delete_failure.clone() {
                Some(error) => Err(error),
                None => Ok(()),
            }
        })
    }
}

/// In-memory persistent-volume store.
#[derive(Clone, Debug, Default)]
pub struct MemoryVolumeStore {
    volumes: Arc<Mutex<HashMap<String, PersistentVolume>>>,
}

impl MemoryVolumeStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a persistent volume, keyed by its name.
    pub fn insert(&self, volume: PersistentVolume) {
        let name = volume.metadata.name.clone().unwrap_or_default();
        self.volumes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, volume);
    }
}

impl VolumeRecordStore for MemoryVolumeStore {
    fn get_persistent_volume<'a>(
        &'a self,
        name: &'a str,
    ) -> BackendFuture<'a, Option<PersistentVolume>, ClusterError> {
        Box::pin(async move {
            Ok(self
                .volumes
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(name)
                .cloned())
        })
    }
}

/// Connector that always returns the same [`MemoryVolumeStore`].
#[derive(Clone, Debug, Default)]
pub struct StaticConnector {
    store: MemoryVolumeStore,
    connects: Arc<AtomicUsize>,
    failure: Arc<Mutex<Option<ClusterError>>>,
}

impl StaticConnector {
    /// Creates a connector handing out `store`.
    #[must_use]
    pub fn new(store: MemoryVolumeStore) -> Self {
        Self {
            store,
            connects: Arc::new(AtomicUsize::new(0)),
            failure: Arc::new(Mutex::new(None)),
        }
    }

    /// Creates a connector whose every connection attempt fails.
    #[must_use]
    pub fn failing(error: ClusterError) -> Self {
        let connector = Self::default();
        connector.fail_connections(error);
        connector
    }

    /// Makes every later connection attempt fail, including those made
    /// through clones of this connector.
    pub fn fail_connections(&self, error: ClusterError) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(error);
    }

    /// Number of connection attempts made so far.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl ClusterConnector for StaticConnector {
    type Store = MemoryVolumeStore;

    fn connect(&self) -> BackendFuture<'_, Self::Store, ClusterError> {
        Box::pin(async move {
            self.connects.fetch_add(1, Ordering::SeqCst);
            let failure = self
                .failure
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            match failure {
                Some(error) => Err(error),
                None => Ok(self.store.clone()),
            }
        })
    }
}

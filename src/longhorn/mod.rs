//! Longhorn manager implementation of the snapshot backend.
//!
//! The manager offers no endpoint for finding a snapshot by ID, so the
//! client exposes the primitives the coordinator needs to scan volumes: a
//! volume listing and a per-volume `snapshotGet` probe that follows the action
//! URL advertised by each volume.

mod wire;

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{RequestBuilder, StatusCode, Url};
use tracing::debug;

use crate::backend::{
    BackendError, BackendFuture, ProbeOutcome, SnapshotBackend, SnapshotEntry, VolumeEntry,
};
use crate::config::{ConfigError, SnapshotterConfig};
use wire::{SnapshotName, SnapshotResource, VolumeCollection};

const VOLUMES_PATH: [&str; 2] = ["v1", "volumes"];
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const EMPTY_OBJECT: &str = "{}";

const LIST_VOLUMES: &str = "listVolumes";
const SNAPSHOT_CREATE: &str = "snapshotCreate";
const SNAPSHOT_DELETE: &str = "snapshotDelete";
const SNAPSHOT_GET: &str = "snapshotGet";

/// Backend that talks to the Longhorn manager REST API.
#[derive(Clone, Debug)]
pub struct LonghornBackend {
    client: reqwest::Client,
    base_url: String,
}

impl LonghornBackend {
    /// Creates a backend rooted at `base_url` with the given transport
    /// timeout. Trailing slashes are trimmed from the URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: base_url.into().trim().trim_end_matches('/').to_owned(),
        }
    }

    /// Constructs a backend from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the configuration fails validation.
    pub fn from_config(config: &SnapshotterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(
            config.normalised_backend_url(),
            config.request_timeout(),
        ))
    }

    /// Returns the base URL requests are issued against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds `<base>/v1/volumes[/<volume_id>]` with the volume ID
    /// percent-encoded as a single path segment.
    fn volumes_url(&self, volume_id: Option<&str>, operation: &str) -> Result<Url, BackendError> {
        let invalid = |message: String| BackendError::Unreachable {
            operation: operation.to_owned(),
            message: format!("invalid backend URL {}: {message}", self.base_url),
        };
        let mut url = Url::parse(&self.base_url).map_err(|err| invalid(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid(String::from("URL cannot carry a path")))?
            .pop_if_empty()
            .extend(VOLUMES_PATH)
            .extend(volume_id);
        Ok(url)
    }

    fn volume_action_url(&self, volume_id: &str, action: &str) -> Result<Url, BackendError> {
        let mut url = self.volumes_url(Some(volume_id), action)?;
        url.query_pairs_mut().append_pair("action", action);
        Ok(url)
    }

    /// Sends a request and returns the status and raw body.
    async fn execute(
        request: RequestBuilder,
        operation: &str,
    ) -> Result<(StatusCode, Vec<u8>), BackendError> {
        let unreachable = |err: reqwest::Error| BackendError::Unreachable {
            operation: operation.to_owned(),
            message: err.to_string(),
        };
        let response = request.send().await.map_err(unreachable)?;
        let status = response.status();
        let body = response.bytes().await.map_err(unreachable)?;
        Ok((status, body.to_vec()))
    }

    /// Sends a request that must succeed and returns its body.
    async fn execute_checked(
        request: RequestBuilder,
        operation: &str,
    ) -> Result<Vec<u8>, BackendError> {
        let (status, body) = Self::execute(request, operation).await?;
        if status.is_success() {
            return Ok(body);
        }
        Err(BackendError::Status {
            operation: operation.to_owned(),
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }

    fn decode<T: serde::de::DeserializeOwned>(
        body: &[u8],
        operation: &str,
    ) -> Result<T, BackendError> {
        serde_json::from_slice(body).map_err(|err| BackendError::Decode {
            operation: operation.to_owned(),
            message: err.to_string(),
        })
    }

    fn snapshot_name_body(name: &str, operation: &str) -> Result<Vec<u8>, BackendError> {
        serde_json::to_vec(&SnapshotName { name }).map_err(|err| BackendError::Decode {
            operation: operation.to_owned(),
            message: err.to_string(),
        })
    }
}

impl SnapshotBackend for LonghornBackend {
    fn list_volumes(&self) -> BackendFuture<'_, Vec<VolumeEntry>, BackendError> {
        Box::pin(async move {
            let request = self.client.get(self.volumes_url(None, LIST_VOLUMES)?);
            let body = Self::execute_checked(request, LIST_VOLUMES).await?;
            let collection: VolumeCollection = Self::decode(&body, LIST_VOLUMES)?;
            let entries = collection.into_entries();
            debug!(count = entries.len(), "listed backend volumes");
            Ok(entries)
        })
    }

    fn create_snapshot<'a>(
        &'a self,
        volume_id: &'a str,
    ) -> BackendFuture<'a, SnapshotEntry, BackendError> {
        Box::pin(async move {
            let request = self
                .client
                .post(self.volume_action_url(volume_id, SNAPSHOT_CREATE)?)
                .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
                .body(EMPTY_OBJECT);
            let body = Self::execute_checked(request, SNAPSHOT_CREATE).await?;
            let snapshot: SnapshotResource = Self::decode(&body, SNAPSHOT_CREATE)?;
            Ok(snapshot.into())
        })
    }

    fn probe_snapshot<'a>(
        &'a self,
        volume: &'a VolumeEntry,
        snapshot_name: &'a str,
    ) -> BackendFuture<'a, ProbeOutcome, BackendError> {
        Box::pin(async move {
            let Some(url) = volume.snapshot_get_url.as_deref() else {
                return Ok(ProbeOutcome::Absent { status: None });
            };
            let request = self
                .client
                .post(url)
                .json(&SnapshotName {
                    name: snapshot_name,
                });
            let (status, _) = Self::execute(request, SNAPSHOT_GET).await?;
            if status.is_success() {
                Ok(ProbeOutcome::Owned)
            } else {
                Ok(ProbeOutcome::Absent {
                    status: Some(status.as_u16()),
                })
            }
        })
    }

    fn delete_snapshot<'a>(
        &'a self,
        volume_id: &'a str,
        snapshot_name: &'a str,
    ) -> BackendFuture<'a, (), BackendError> {
        Box::pin(async move {
            let payload = Self::snapshot_name_body(snapshot_name, SNAPSHOT_DELETE)?;
            let request = self
                .client
                .post(self.volume_action_url(volume_id, SNAPSHOT_DELETE)?)
                .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
                .body(payload);
            Self::execute_checked(request, SNAPSHOT_DELETE).await?;
            Ok(())
        })
    }
}

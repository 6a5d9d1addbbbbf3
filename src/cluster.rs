//! Cluster access for persistent-volume records.
//!
//! The coordinator never holds a global client. A [`ClusterConnector`] is
//! injected at construction and asked for a fresh [`VolumeRecordStore`] each
//! time the plugin is initialised.

use k8s_openapi::api::core::v1::PersistentVolume;
use kube::Api;
use thiserror::Error;

use crate::backend::BackendFuture;

/// Errors raised while talking to the cluster API.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ClusterError {
    /// Raised when no usable cluster configuration or client can be built.
    #[error("cluster configuration error: {message}")]
    Config {
        /// Underlying error message.
        message: String,
    },
    /// Raised when a request against the cluster API fails.
    #[error("cluster request for {name} failed: {message}")]
    Request {
        /// Name of the object being requested.
        name: String,
        /// Underlying error message.
        message: String,
    },
}

/// Read access to persistent-volume records, keyed by volume name.
pub trait VolumeRecordStore {
    /// Fetches a persistent volume by name, returning `None` when the cluster
    /// has no such object.
    fn get_persistent_volume<'a>(
        &'a self,
        name: &'a str,
    ) -> BackendFuture<'a, Option<PersistentVolume>, ClusterError>;
}

/// Establishes connections to the cluster API.
pub trait ClusterConnector {
    /// Store produced by a successful connection.
    type Store: VolumeRecordStore;

    /// Builds a new connection using ambient credentials.
    fn connect(&self) -> BackendFuture<'_, Self::Store, ClusterError>;
}

/// Connector that uses the in-cluster service account, or the local
/// kubeconfig when running outside a cluster.
#[derive(Clone, Copy, Debug, Default)]
pub struct KubeConnector;

impl ClusterConnector for KubeConnector {
    type Store = KubeVolumeStore;

    fn connect(&self) -> BackendFuture<'_, Self::Store, ClusterError> {
        Box::pin(async move {
            let client = kube::Client::try_default()
                .await
                .map_err(|err| ClusterError::Config {
                    message: err.to_string(),
                })?;
            Ok(KubeVolumeStore {
                api: Api::all(client),
            })
        })
    }
}

/// Persistent-volume store backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeVolumeStore {
    api: Api<PersistentVolume>,
}

impl VolumeRecordStore for KubeVolumeStore {
    fn get_persistent_volume<'a>(
        &'a self,
        name: &'a str,
    ) -> BackendFuture<'a, Option<PersistentVolume>, ClusterError> {
        Box::pin(async move {
            self.api
                .get_opt(name)
                .await
                .map_err(|err| ClusterError::Request {
                    name: name.to_owned(),
                    message: err.to_string(),
                })
        })
    }
}

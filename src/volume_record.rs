//! Accessors for the CSI volume handle stored in persistent-volume records.
//!
//! Records arrive from the orchestrator in unstructured form. Reads and
//! writes go through the JSON document directly so that every field other
//! than `spec.csi.volumeHandle` survives a round trip unchanged, including
//! fields the typed `PersistentVolume` model does not know about.

use k8s_openapi::api::core::v1::PersistentVolume;
use serde_json::{Map, Value};
use thiserror::Error;

const VOLUME_HANDLE_FIELD: &str = "volumeHandle";
const UNNAMED: &str = "<unnamed>";

/// Errors raised when a record does not carry the expected CSI fields.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum VolumeRecordError {
    /// Raised when the record has no `spec.csi` section.
    #[error("persistent volume {volume} has no CSI spec")]
    MissingCsiSpec {
        /// Name of the offending record.
        volume: String,
    },
    /// Raised when the CSI spec has no usable volume handle.
    #[error("persistent volume {volume} has no CSI volume handle")]
    MissingVolumeHandle {
        /// Name of the offending record.
        volume: String,
    },
    /// Raised when the CSI spec has no filesystem type.
    #[error("persistent volume {volume} has no CSI filesystem type")]
    MissingFsType {
        /// Name of the offending record.
        volume: String,
    },
    /// Raised when the record is not shaped like a persistent volume.
    #[error("malformed persistent volume record: {message}")]
    Malformed {
        /// Description of the structural problem.
        message: String,
    },
}

/// A persistent-volume record in unstructured (JSON) form.
#[derive(Clone, Debug, PartialEq)]
pub struct UnstructuredVolume(Value);

impl UnstructuredVolume {
    /// Wraps a JSON document.
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self(value)
    }

    /// Converts a typed persistent volume into unstructured form.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeRecordError::Malformed`] when serialisation fails.
    pub fn from_persistent_volume(volume: &PersistentVolume) -> Result<Self, VolumeRecordError> {
        serde_json::to_value(volume)
            .map(Self)
            .map_err(|err| VolumeRecordError::Malformed {
                message: err.to_string(),
            })
    }

    /// Borrows the underlying JSON document.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }

    /// Returns the underlying JSON document.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Returns `metadata.name`, or a placeholder for unnamed records.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0
            .pointer("/metadata/name")
            .and_then(Value::as_str)
            .unwrap_or(UNNAMED)
    }

    /// Checks that the record decodes as a typed persistent volume. Only the
    /// JSON document is ever written back.
    fn ensure_persistent_volume(&self) -> Result<(), VolumeRecordError> {
        serde_json::from_value::<PersistentVolume>(self.0.clone())
            .map(drop)
            .map_err(|err| VolumeRecordError::Malformed {
                message: format!("record {} is not a persistent volume: {err}", self.name()),
            })
    }

    fn csi_spec(&self) -> Result<&Map<String, Value>, VolumeRecordError> {
        self.ensure_persistent_volume()?;
        match self.0.pointer("/spec/csi") {
            None | Some(Value::Null) => Err(VolumeRecordError::MissingCsiSpec {
                volume: self.name().to_owned(),
            }),
            Some(Value::Object(csi)) => Ok(csi),
            Some(_) => Err(VolumeRecordError::Malformed {
                message: format!("spec.csi of {} is not an object", self.name()),
            }),
        }
    }

    /// Returns the CSI volume handle.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeRecordError::Malformed`] when the record does not
    /// decode as a persistent volume,
    /// [`VolumeRecordError::MissingCsiSpec`] when it has no CSI spec and
    /// [`VolumeRecordError::MissingVolumeHandle`] when the handle is absent or
    /// empty.
    pub fn volume_handle(&self) -> Result<String, VolumeRecordError> {
        self.csi_spec()?
            .get(VOLUME_HANDLE_FIELD)
            .and_then(Value::as_str)
            .filter(|handle| !handle.is_empty())
            .map(str::to_owned)
            .ok_or_else(|| VolumeRecordError::MissingVolumeHandle {
                volume: self.name().to_owned(),
            })
    }

    /// Returns a copy of the record with the CSI volume handle replaced.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeRecordError::MissingCsiSpec`] when the record has no CSI
    /// spec and [`VolumeRecordError::MissingVolumeHandle`] when `handle` is
    /// empty.
    pub fn with_volume_handle(&self, handle: &str) -> Result<Self, VolumeRecordError> {
        self.csi_spec()?;
        if handle.is_empty() {
            return Err(VolumeRecordError::MissingVolumeHandle {
                volume: self.name().to_owned(),
            });
        }
        let mut updated = self.0.clone();
        let csi = updated
            .pointer_mut("/spec/csi")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| VolumeRecordError::Malformed {
                message: String::from("spec.csi disappeared while updating"),
            })?;
        csi.insert(
            VOLUME_HANDLE_FIELD.to_owned(),
            Value::String(handle.to_owned()),
        );
        Ok(Self(updated))
    }
}

impl From<Value> for UnstructuredVolume {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Returns the CSI filesystem type of a typed persistent volume.
///
/// # Errors
///
/// Returns [`VolumeRecordError::MissingCsiSpec`] or
/// [`VolumeRecordError::MissingFsType`] when the fields are absent.
pub fn filesystem_type(volume: &PersistentVolume) -> Result<String, VolumeRecordError> {
    let name = || volume.metadata.name.clone().unwrap_or_else(|| UNNAMED.to_owned());
    let csi = volume
        .spec
        .as_ref()
        .and_then(|spec| spec.csi.as_ref())
        .ok_or_else(|| VolumeRecordError::MissingCsiSpec { volume: name() })?;
    csi.fs_type
        .as_deref()
        .filter(|fs_type| !fs_type.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| VolumeRecordError::MissingFsType { volume: name() })
}

//! Backend abstraction for the volume snapshot REST surface.
//!
//! The backend exposes four operations: list volumes, probe a volume for a
//! snapshot, create a snapshot, and delete a snapshot. Identifiers returned by
//! the backend may be either a true ID or a human-readable name, so every
//! entry is canonicalised through [`ResourceRef`].

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

/// Canonical identifier of a backend resource.
///
/// The backend does not guarantee which of its two identifier fields is
/// populated. The ID field takes precedence; the name is the fallback.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum ResourceRef {
    /// A backend-assigned identifier.
    Id(String),
    /// A human-readable name used as the identifier.
    Name(String),
}

impl ResourceRef {
    /// Canonicalises an `id`/`name` pair, preferring a non-empty ID.
    ///
    /// Returns `None` when both fields are absent or empty.
    #[must_use]
    pub fn from_parts(id: Option<&str>, name: Option<&str>) -> Option<Self> {
        fn non_empty(value: Option<&str>) -> Option<&str> {
            value.filter(|candidate| !candidate.is_empty())
        }

        non_empty(id)
            .map(|value| Self::Id(value.to_owned()))
            .or_else(|| non_empty(name).map(|value| Self::Name(value.to_owned())))
    }

    /// Returns the identifier text regardless of its origin.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Id(value) | Self::Name(value) => value.as_str(),
        }
    }

    /// Consumes the reference and returns the identifier text.
    #[must_use]
    pub fn into_string(self) -> String {
        match self {
            Self::Id(value) | Self::Name(value) => value,
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the backend's volume listing.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct VolumeEntry {
    /// Backend identifier, when populated.
    pub id: Option<String>,
    /// Human-readable volume name, when populated.
    pub name: Option<String>,
    /// Volume-specific action URL used to ask whether a snapshot exists.
    pub snapshot_get_url: Option<String>,
}

impl VolumeEntry {
    /// Returns the canonical volume identifier (ID, else name).
    #[must_use]
    pub fn reference(&self) -> Option<ResourceRef> {
        ResourceRef::from_parts(self.id.as_deref(), self.name.as_deref())
    }
}

/// Result of a snapshot-create call.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SnapshotEntry {
    /// Backend identifier, when populated.
    pub id: Option<String>,
    /// Snapshot name, when populated.
    pub name: Option<String>,
}

impl SnapshotEntry {
    /// Returns the canonical snapshot identifier (ID, else name).
    #[must_use]
    pub fn reference(&self) -> Option<ResourceRef> {
        ResourceRef::from_parts(self.id.as_deref(), self.name.as_deref())
    }
}

/// Answer to "does this volume own the named snapshot?".
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProbeOutcome {
    /// The volume acknowledged the snapshot.
    Owned,
    /// The volume did not acknowledge the snapshot.
    Absent {
        /// HTTP status returned by the probe, or `None` when the volume has
        /// no snapshot-get action and no request was sent.
        status: Option<u16>,
    },
}

/// Errors raised by snapshot backends.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum BackendError {
    /// Raised when the backend cannot be reached at the transport level.
    #[error("backend unreachable during {operation}: {message}")]
    Unreachable {
        /// Backend operation being attempted.
        operation: String,
        /// Transport error message.
        message: String,
    },
    /// Raised when the backend answers with a non-success status.
    #[error("backend rejected {operation} with status {status}: {body}")]
    Status {
        /// Backend operation being attempted.
        operation: String,
        /// HTTP status code.
        status: u16,
        /// Response body returned by the backend.
        body: String,
    },
    /// Raised when a backend response cannot be decoded.
    #[error("failed to decode {operation} response: {message}")]
    Decode {
        /// Backend operation being attempted.
        operation: String,
        /// Parser error message.
        message: String,
    },
}

/// Future returned by backend operations.
pub type BackendFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Minimal interface implemented by snapshot backends.
pub trait SnapshotBackend {
    /// Lists every volume known to the backend, in listing order.
    fn list_volumes(&self) -> BackendFuture<'_, Vec<VolumeEntry>, BackendError>;

    /// Creates a snapshot of the given volume.
    fn create_snapshot<'a>(
        &'a self,
        volume_id: &'a str,
    ) -> BackendFuture<'a, SnapshotEntry, BackendError>;

    /// Asks a volume, through its own snapshot-get action, whether it owns
    /// the named snapshot.
    ///
    /// A non-success status is reported as [`ProbeOutcome::Absent`]; only
    /// transport failures are returned as errors.
    fn probe_snapshot<'a>(
        &'a self,
        volume: &'a VolumeEntry,
        snapshot_name: &'a str,
    ) -> BackendFuture<'a, ProbeOutcome, BackendError>;

    /// Deletes the named snapshot from the given volume.
    fn delete_snapshot<'a>(
        &'a self,
        volume_id: &'a str,
        snapshot_name: &'a str,
    ) -> BackendFuture<'a, (), BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("snap-id"), Some("snap-name"), Some(ResourceRef::Id(String::from("snap-id"))))]
    #[case(Some("snap-id"), None, Some(ResourceRef::Id(String::from("snap-id"))))]
    #[case(Some(""), Some("snap-name"), Some(ResourceRef::Name(String::from("snap-name"))))]
    #[case(None, Some("snap-name"), Some(ResourceRef::Name(String::from("snap-name"))))]
    #[case(Some(""), Some(""), None)]
    #[case(None, None, None)]
    fn reference_prefers_id_then_name(
        #[case] id: Option<&str>,
        #[case] name: Option<&str>,
        #[case] expected: Option<ResourceRef>,
    ) {
        assert_eq!(ResourceRef::from_parts(id, name), expected);
    }

    #[rstest]
    fn volume_entry_reference_uses_same_precedence() {
        let entry = VolumeEntry {
            id: None,
            name: Some(String::from("vol-2")),
            snapshot_get_url: None,
        };
        assert_eq!(
            entry.reference(),
            Some(ResourceRef::Name(String::from("vol-2")))
        );
    }

    #[rstest]
    fn reference_displays_identifier_text() {
        let reference = ResourceRef::Id(String::from("vol-1"));
        assert_eq!(reference.to_string(), "vol-1");
        assert_eq!(reference.into_string(), "vol-1");
    }

    #[rstest]
    fn status_error_mentions_operation_and_code() {
        let error = BackendError::Status {
            operation: String::from("snapshotDelete"),
            status: 500,
            body: String::from("boom"),
        };
        assert_eq!(
            error.to_string(),
            "backend rejected snapshotDelete with status 500: boom"
        );
    }
}

//! JSON payloads exchanged with the Longhorn manager API.

use serde::{Deserialize, Serialize};

use crate::backend::{SnapshotEntry, VolumeEntry};

/// Response body of `GET /v1/volumes`.
#[derive(Debug, Default, Deserialize)]
pub(super) struct VolumeCollection {
    #[serde(default)]
    data: Option<Vec<VolumeResource>>,
}

#[derive(Debug, Deserialize)]
struct VolumeResource {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    actions: Option<VolumeActions>,
}

#[derive(Debug, Default, Deserialize)]
struct VolumeActions {
    #[serde(default, rename = "snapshotGet")]
    snapshot_get: Option<String>,
}

impl VolumeCollection {
    pub(super) fn into_entries(self) -> Vec<VolumeEntry> {
        self.data
            .unwrap_or_default()
            .into_iter()
            .map(|volume| VolumeEntry {
                id: volume.id,
                name: volume.name,
                snapshot_get_url: volume
                    .actions
                    .and_then(|actions| actions.snapshot_get)
                    .filter(|url| !url.is_empty()),
            })
            .collect()
    }
}

/// Response body of the `snapshotCreate` action.
#[derive(Debug, Default, Deserialize)]
pub(super) struct SnapshotResource {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl From<SnapshotResource> for SnapshotEntry {
    fn from(value: SnapshotResource) -> Self {
        Self {
            id: value.id,
            name: value.name,
        }
    }
}

/// Request body naming a snapshot, shared by `snapshotGet` and
/// `snapshotDelete`.
#[derive(Debug, Serialize)]
pub(super) struct SnapshotName<'a> {
    pub(super) name: &'a str,
}

//! Locates the volume that owns a snapshot by probing the volume listing.

use std::num::NonZeroUsize;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::backend::{
    BackendError, BackendFuture, ProbeOutcome, ResourceRef, SnapshotBackend, VolumeEntry,
};

/// Result of scanning the volume listing for a snapshot owner.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(super) struct OwnerScan {
    /// Canonical identifier of the first volume, in listing order, that
    /// acknowledged the snapshot.
    pub(super) owner: Option<ResourceRef>,
    /// Probe results examined before the scan stopped.
    pub(super) scanned: usize,
    /// Probes that failed at the transport level.
    pub(super) unreachable: usize,
}

/// Probes volumes in listing order and stops at the first owner.
///
/// Probe futures are built up front but stay idle until polled; at most
/// `window` of them run at once. Results are consumed in listing order, so the
/// earliest owner wins regardless of which probe finishes first. Returning
/// drops the stream, cancelling in-flight probes and never starting the rest.
///
/// Transport failures are not retried: the volume is counted as unreachable
/// and the scan moves on.
pub(super) async fn find_owner<B>(
    backend: &B,
    volumes: &[VolumeEntry],
    snapshot_id: &str,
    window: NonZeroUsize,
) -> OwnerScan
where
    B: SnapshotBackend + Sync,
{
    let pending: Vec<BackendFuture<'_, ProbeOutcome, BackendError>> = volumes
        .iter()
        .map(|volume| backend.probe_snapshot(volume, snapshot_id))
        .collect();
    let mut probes = stream::iter(volumes).zip(stream::iter(pending).buffered(window.get()));

    let mut scan = OwnerScan::default();
    while let Some((volume, outcome)) = probes.next().await {
        scan.scanned += 1;
        match outcome {
            Ok(ProbeOutcome::Owned) => {
                if let Some(owner) = volume.reference() {
                    scan.owner = Some(owner);
                    return scan;
                }
                warn!(
                    snapshot_id,
                    "volume acknowledged snapshot but carries neither id nor name"
                );
            }
            Ok(ProbeOutcome::Absent { status }) => {
                debug!(
                    snapshot_id,
                    volume = ?volume.reference(),
                    ?status,
                    "volume does not own snapshot"
                );
            }
            Err(err) => {
                scan.unreachable += 1;
                warn!(
                    snapshot_id,
                    volume = ?volume.reference(),
                    error = %err,
                    "snapshot probe failed; treating volume as not owning snapshot"
                );
            }
        }
    }
    scan
}

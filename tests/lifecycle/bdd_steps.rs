//! BDD step definitions for the snapshot lifecycle.

use std::collections::HashMap;

use longhorn_snapshotter::test_support::{DeleteCall, snapshot_get_url, volume_entry};
use longhorn_snapshotter::{SnapshotEntry, VolumeSnapshotter};
use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Runtime;

use super::test_helpers::{LifecycleContext, LifecycleOutcome};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

fn runtime() -> Result<Runtime, StepError> {
    Runtime::new().map_err(|err| StepError::Assertion(err.to_string()))
}

#[given("the backend names new snapshots \"{name}\"")]
fn backend_names_snapshots(lifecycle_context: &LifecycleContext, name: String) {
    lifecycle_context.backend.respond_to_create(SnapshotEntry {
        id: None,
        name: Some(name),
    });
}

#[given("the backend returns an empty snapshot")]
fn backend_returns_empty_snapshot(lifecycle_context: &LifecycleContext) {
    lifecycle_context
        .backend
        .respond_to_create(SnapshotEntry::default());
}

#[given("the backend lists volume id \"{id}\" and volume name \"{name}\"")]
fn backend_lists_volumes(lifecycle_context: &LifecycleContext, id: String, name: String) {
    lifecycle_context.backend.set_volumes(vec![
        volume_entry(Some(id.as_str()), None),
        volume_entry(None, Some(name.as_str())),
    ]);
}

#[given("volume \"{volume}\" owns the snapshot")]
fn volume_owns_snapshot(lifecycle_context: &LifecycleContext, volume: String) {
    lifecycle_context
        .backend
        .own_snapshot_at(snapshot_get_url(&volume));
}

#[when("I create a snapshot of volume \"{volume}\"")]
fn create_snapshot(lifecycle_context: &LifecycleContext, volume: String) -> Result<(), StepError> {
    let tags = HashMap::new();
    let result = runtime()?.block_on(
        lifecycle_context
            .snapshotter
            .create_snapshot(&volume, "", &tags),
    );
    lifecycle_context.record(match result {
        Ok(snapshot_id) => LifecycleOutcome::Created(snapshot_id),
        Err(err) => LifecycleOutcome::Failure(err.to_string()),
    });
    Ok(())
}

#[when("I delete snapshot \"{snapshot}\"")]
fn delete_snapshot(lifecycle_context: &LifecycleContext, snapshot: String) -> Result<(), StepError> {
    let result = runtime()?.block_on(lifecycle_context.snapshotter.delete_snapshot(&snapshot));
    lifecycle_context.record(match result {
        Ok(()) => LifecycleOutcome::Deleted,
        Err(err) => LifecycleOutcome::Failure(err.to_string()),
    });
    Ok(())
}

#[then("the snapshot ID is \"{expected}\"")]
fn snapshot_id_is(lifecycle_context: &LifecycleContext, expected: String) -> Result<(), StepError> {
    match lifecycle_context.outcome() {
        Some(LifecycleOutcome::Created(snapshot_id)) if snapshot_id == expected => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected snapshot {expected}, got {other:?}"
        ))),
    }
}

#[then("the operation fails with \"{fragment}\"")]
fn operation_fails_with(
    lifecycle_context: &LifecycleContext,
    fragment: String,
) -> Result<(), StepError> {
    match lifecycle_context.outcome() {
        Some(LifecycleOutcome::Failure(message)) if message.contains(&fragment) => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected failure mentioning {fragment:?}, got {other:?}"
        ))),
    }
}

#[then("the snapshot is deleted from volume \"{volume}\"")]
fn snapshot_deleted_from(
    lifecycle_context: &LifecycleContext,
    volume: String,
) -> Result<(), StepError> {
    if lifecycle_context.outcome() != Some(LifecycleOutcome::Deleted) {
        return Err(StepError::Assertion(format!(
            "expected deletion, got {:?}",
            lifecycle_context.outcome()
        )));
    }
    let deletes = lifecycle_context.backend.deletes();
    match deletes.as_slice() {
        [DeleteCall { volume_id, .. }] if *volume_id == volume => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected one delete against {volume}, got {other:?}"
        ))),
    }
}

#[then("{count:u32} volumes were probed")]
fn volumes_probed(lifecycle_context: &LifecycleContext, count: u32) -> Result<(), StepError> {
    let probes = lifecycle_context.backend.probes();
    if probes.len() == count as usize {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} probes, got {probes:?}"
        )))
    }
}

#[then("no snapshot is deleted")]
fn no_snapshot_deleted(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    let deletes = lifecycle_context.backend.deletes();
    if deletes.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected no deletes, got {deletes:?}"
        )))
    }
}

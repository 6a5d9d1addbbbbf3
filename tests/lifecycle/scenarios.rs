//! BDD scenarios for the snapshot lifecycle.

use rstest_bdd_macros::scenario;

use super::test_helpers::{LifecycleContext, lifecycle_context};

#[scenario(
    path = "tests/features/snapshot_lifecycle.feature",
    name = "Create a snapshot when the backend only returns a name"
)]
fn scenario_create_by_name(lifecycle_context: LifecycleContext) {
    let _ = lifecycle_context;
}

#[scenario(
    path = "tests/features/snapshot_lifecycle.feature",
    name = "Reject a snapshot without an identifier"
)]
fn scenario_reject_empty_snapshot(lifecycle_context: LifecycleContext) {
    let _ = lifecycle_context;
}

#[scenario(
    path = "tests/features/snapshot_lifecycle.feature",
    name = "Delete a snapshot owned by a volume listed by name"
)]
fn scenario_delete_owned_snapshot(lifecycle_context: LifecycleContext) {
    let _ = lifecycle_context;
}

#[scenario(
    path = "tests/features/snapshot_lifecycle.feature",
    name = "Refuse to delete a snapshot no volume owns"
)]
fn scenario_delete_unowned_snapshot(lifecycle_context: LifecycleContext) {
    let _ = lifecycle_context;
}

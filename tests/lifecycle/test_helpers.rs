//! Shared fixtures for snapshot lifecycle scenarios.

use std::cell::RefCell;

use longhorn_snapshotter::LonghornSnapshotter;
use longhorn_snapshotter::test_support::{MemoryVolumeStore, ScriptedBackend, StaticConnector};
use rstest::fixture;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LifecycleOutcome {
    Created(String),
    Deleted,
    Failure(String),
}

pub struct LifecycleContext {
    pub backend: ScriptedBackend,
    pub snapshotter: LonghornSnapshotter<ScriptedBackend, StaticConnector>,
    pub outcome: RefCell<Option<LifecycleOutcome>>,
}

#[fixture]
pub fn lifecycle_context() -> LifecycleContext {
    let backend = ScriptedBackend::new();
    let connector = StaticConnector::new(MemoryVolumeStore::new());
    LifecycleContext {
        snapshotter: LonghornSnapshotter::new(backend.clone(), connector),
        backend,
        outcome: RefCell::new(None),
    }
}

impl LifecycleContext {
    pub fn record(&self, outcome: LifecycleOutcome) {
        self.outcome.replace(Some(outcome));
    }

    pub fn outcome(&self) -> Option<LifecycleOutcome> {
        self.outcome.borrow().clone()
    }
}

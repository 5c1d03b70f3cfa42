//! Per-task state `T(p)` and its lifecycle storage.

use std::collections::HashMap;

use crate::ids::TaskId;
use crate::weight::WeightCache;

/// `T(p)`: everything the scheduler tracks for one task beyond the fields
/// the runtime's task handle already exposes (`weight`, `slice_remaining`,
/// `dsq_vtime`).
#[derive(Debug, Clone, Copy)]
pub struct TaskState {
    /// Eligible-time pointer `v_e`.
    pub v_e: u64,
    /// Cached weight + reciprocal.
    pub weight: WeightCache,
    /// Set on `enqueue`, used only for telemetry.
    pub enqueued_at: Option<u64>,
}

impl TaskState {
    fn new_at_enable(v_e: u64, w: u32) -> Self {
        Self {
            v_e,
            weight: WeightCache::new(w),
            enqueued_at: None,
        }
    }
}

/// Task-local storage keyed by the runtime's opaque task id.
///
/// Allocated on `enable`, released on `disable`. Accessed only by the
/// handler currently processing that task, so a plain `HashMap` (no
/// interior mutability) is enough — unlike `GlobalState`, there's no
/// cross-task sharing to guard against.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: HashMap<TaskId, TaskState>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `enable(p)`: allocates state if absent, initializing `v_e := V` only
    /// the first time — a task with prior service history keeps its `v_e`
    /// across re-enable.
    pub fn enable(&mut self, id: TaskId, current_v: u64, w: u32) -> TaskState {
        let state = self
            .tasks
            .entry(id)
            .or_insert_with(|| TaskState::new_at_enable(current_v, w));
        state.weight.refresh(w);
        *state
    }

    /// Existing per-task state, if the task has been enabled.
    pub fn get(&self, id: TaskId) -> Option<TaskState> {
        self.tasks.get(&id).copied()
    }

    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut TaskState> {
        self.tasks.get_mut(&id)
    }

    /// `disable(p)`: releases the per-task storage.
    pub fn disable(&mut self, id: TaskId) -> Option<TaskState> {
        self.tasks.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enable_sets_v_e_only_on_first_call() {
        let mut store = TaskStore::new();
        let id = TaskId(1);
        let s1 = store.enable(id, 1000, 4);
        assert_eq!(s1.v_e, 1000);
        let s2 = store.enable(id, 2000, 4);
        assert_eq!(s2.v_e, 1000, "second enable must not reset v_e");
    }

    #[test]
    fn disable_releases_storage() {
        let mut store = TaskStore::new();
        let id = TaskId(7);
        store.enable(id, 0, 1);
        assert!(store.get(id).is_some());
        store.disable(id);
        assert!(store.get(id).is_none());
    }
}

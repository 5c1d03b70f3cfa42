//! The abstract runtime contract: everything the scheduler core consumes
//! from "the host kernel scheduling framework", which is out of scope for
//! this crate. A real attachment implements [`Runtime`] over whatever
//! primitives its kernel integration exposes (BPF dispatch-queue helpers,
//! in this scheduler's case); tests implement it over plain in-memory
//! queues.

use crate::ids::{CpuId, Dsq, TaskId};

/// A runtime-owned task handle exposing exactly the fields the scheduler
/// core needs: `weight`, `slice_remaining`, `dsq_vtime`.
pub trait TaskHandle {
    fn id(&self) -> TaskId;
    fn weight(&self) -> u32;
    fn slice_remaining(&self) -> u64;
    fn dsq_vtime(&self) -> u64;
    fn set_dsq_vtime(&mut self, v: u64);
}

/// The primitives the scheduler core consumes from its runtime.
pub trait Runtime {
    type Task: TaskHandle;

    /// Monotonic clock reading (used only for telemetry timestamps).
    fn now(&self) -> u64;

    /// The runtime's fixed default time slice, `SLICE`.
    fn default_slice(&self) -> u64;

    /// `cpu_capacity(cpu)` as currently known to the runtime (i.e. whatever
    /// the agent last wrote). The scheduler core keeps its own
    /// [`crate::capacity::CapacityTable`] in sync with this independently;
    /// handlers read through that table, not this method, for task
    /// placement. Exposed here only so a real attachment and this trait
    /// agree on where the number ultimately comes from.
    fn cpu_capacity(&self, cpu: CpuId) -> u32;

    /// The CPU a task is currently assigned to / running on.
    fn current_cpu(&self, task: &Self::Task) -> CpuId;

    /// Creates a named dispatch queue. Fatal on failure.
    fn create_dsq(&mut self, dsq: Dsq) -> Result<(), crate::error::InitError>;

    /// Inserts `task` into `dsq`, sorted by `vtime`, with the given slice.
    fn insert_vtime(&mut self, dsq: Dsq, task: &mut Self::Task, vtime: u64, slice: u64);

    /// Inserts `task` directly into `cpu`'s local queue (fast path).
    fn insert_local(&mut self, cpu: CpuId, task: &mut Self::Task, slice: u64);

    /// Moves the minimum-`v_d` task from `dsq` into `cpu`'s local queue.
    /// Returns `false` if `dsq` was empty.
    fn move_min_vtime_to_local(&mut self, dsq: Dsq, cpu: CpuId) -> bool;

    /// Runtime's own idle-CPU picker. Returns the candidate CPU and whether
    /// it is currently idle.
    fn pick_idle_cpu(&self, task: &Self::Task, prev: CpuId) -> (CpuId, bool);

    /// Any idle CPU in `class` from the task's allowed set, if one exists.
    fn pick_idle_cpu_in_class(&self, task: &Self::Task, class: crate::ids::Class) -> Option<CpuId>;

    /// Number of free dispatch slots the runtime offers this tick; `dispatch`
    /// moves at most `min(this, MAX_DISPATCH_BATCH)` tasks.
    fn dispatch_slots(&self, cpu: CpuId) -> u32;
}

//! Event handlers: the scheduler's only public surface.
//!
//! Each method here corresponds to one runtime callback and is modeled as a
//! pure-ish transition over `(G, T(p), inputs) -> (G', T'(p), outputs)`.
//! None of them suspend; they are meant to run inside whatever
//! non-blocking callback context the runtime invokes them from.

use crate::capacity::CapacityTable;
use crate::dispatch::{self, ClassChoice};
use crate::error::InitError;
use crate::fixed::{CAP_SCALE, MAX_DISPATCH_BATCH, SCALE};
use crate::global::GlobalState;
use crate::ids::{Class, CpuId, Dsq, TaskId};
use crate::maps::SharedMaps;
use crate::runtime::{Runtime, TaskHandle};
use crate::task::TaskStore;
use crate::weight::normalize_weight;

/// Owns the scheduler's own state (`G`, the capacity table, and per-task
/// storage) and exposes the runtime callback surface over it. Generic over
/// the `Runtime` it is attached to, so the same logic drives both the fake
/// runtime in tests and a real attachment.
#[derive(Debug, Default)]
pub struct Scheduler {
    global: GlobalState,
    capacity: CapacityTable,
    tasks: TaskStore,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global(&self) -> &GlobalState {
        &self.global
    }

    pub fn capacity(&self) -> &CapacityTable {
        &self.capacity
    }

    pub fn capacity_mut(&mut self) -> &mut CapacityTable {
        &mut self.capacity
    }

    /// Number of currently-enabled tasks with live per-task storage.
    pub fn enabled_task_count(&self) -> usize {
        self.tasks.len()
    }

    fn q_max(&self, rt: &impl Runtime) -> u64 {
        dispatch::q_max(self.global.rho_max(), rt.default_slice())
    }

    /// Shared lag/class resolution used by both `enqueue` and `select_cpu`.
    fn resolve_class<R: Runtime>(&self, rt: &R, task: &R::Task, rho_max: u32, qmax: u64) -> Class {
        let v = self.global.v();
        let v_e = self.tasks.get(task.id()).map(|s| s.v_e).unwrap_or(v);
        let lag = v as i64 - v_e as i64;
        match dispatch::desired_class(lag, qmax) {
            ClassChoice::Specific(c) => c,
            ClassChoice::CurrentCpuClass => {
                self.capacity.class_of(rt.current_cpu(task), rho_max)
            }
        }
    }

    /// `init()`: creates both named queues; defaults `rho_max`.
    pub fn init<R: Runtime>(&mut self, rt: &mut R) -> Result<(), InitError> {
        rt.create_dsq(Dsq::Big)?;
        rt.create_dsq(Dsq::Little)?;
        self.global.init_rho_max_if_unset(CAP_SCALE);
        Ok(())
    }

    /// `enable(p)`.
    pub fn enable<R: Runtime>(&mut self, task: &R::Task) {
        let w = normalize_weight(task.weight()) as u64;
        let v = self.global.v();
        let state = self.tasks.enable(task.id(), v, task.weight());
        self.global.enable_task(w, state.v_e);
    }

    /// `disable(p)`: releases per-task storage.
    pub fn disable<R: Runtime>(&mut self, task: &R::Task) {
        let w = normalize_weight(task.weight()) as u64;
        if let Some(state) = self.tasks.disable(task.id()) {
            self.global.disable_task(w, state.v_e);
        }
    }

    /// `set_weight(p, w_new)`.
    pub fn set_weight<R: Runtime>(&mut self, task: &R::Task, w_new: u32) {
        let id = task.id();
        let w_old = self
            .tasks
            .get(id)
            .map(|s| s.weight.weight() as u64)
            .unwrap_or(1);
        let v_e = self.tasks.get(id).map(|s| s.v_e).unwrap_or_else(|| self.global.v());
        let w_new_norm = normalize_weight(w_new) as u64;
        self.global.reindex_weight(w_old, w_new_norm, v_e);
        if let Some(state) = self.tasks.get_mut(id) {
            state.weight.refresh(w_new);
        }
    }

    /// `enqueue(p, flags)`: computes `v_d` and deposits `p` into BIG or
    /// LITTLE.
    pub fn enqueue<R: Runtime>(
        &mut self,
        rt: &mut R,
        task: &mut R::Task,
        _flags: u64,
        maps: &impl SharedMaps,
    ) {
        let snap = self.global.snapshot();
        let qmax = dispatch::q_max(snap.rho_max, rt.default_slice());
        let v_floor = snap.v.saturating_sub(qmax);

        let id = task.id();
        // A task must have been enabled before it can be enqueued; fall
        // back to initializing storage defensively so a malformed call
        // sequence still clamps instead of panicking.
        let w = task.weight();
        self.tasks.enable(id, snap.v, w);
        let now = rt.now();
        let state = {
            let s = self.tasks.get_mut(id).expect("just ensured present");
            if s.v_e < v_floor {
                log::debug!("task {id:?} lag exceeded Q_max, clamping v_e {} -> {v_floor}", s.v_e);
                s.v_e = v_floor;
            }
            s.enqueued_at = Some(now);
            *s
        };

        let v_d = state.v_e.saturating_add(state.weight.divide(qmax.saturating_mul(SCALE)));
        task.set_dsq_vtime(v_d);

        let target = self.resolve_class(rt, task, snap.rho_max, qmax);
        rt.insert_vtime(target.dsq(), task, v_d, rt.default_slice());
        maps.record_enqueue(rt.current_cpu(task));
    }

    /// `select_cpu(p, prev, flags)`.
    pub fn select_cpu<R: Runtime>(
        &mut self,
        rt: &mut R,
        task: &mut R::Task,
        prev: CpuId,
        maps: &impl SharedMaps,
    ) -> CpuId {
        let rho_max = self.global.rho_max();
        let qmax = self.q_max(rt);
        let (cpu, idle) = rt.pick_idle_cpu(task, prev);
        let selected = self.capacity.class_of(cpu, rho_max);
        let desired = self.resolve_class(rt, task, rho_max, qmax);

        let mut chosen = cpu;
        let mut idle_hit = idle;
        if !idle && desired != selected {
            if let Some(alt) = rt.pick_idle_cpu_in_class(task, desired) {
                chosen = alt;
                idle_hit = true;
            }
        }

        if idle_hit {
            maps.record_select_cpu_idle_hit(chosen);
        }

        if idle && self.capacity.class_of(chosen, rho_max) == desired {
            rt.insert_local(chosen, task, rt.default_slice());
        }
        chosen
    }

    /// `dispatch(cpu, prev)`: preferred-class affinity with an asymmetric
    /// spill into the opposite class.
    pub fn dispatch<R: Runtime>(&mut self, rt: &mut R, cpu: CpuId) {
        let rho_max = self.global.rho_max();
        let local = self.capacity.class_of(cpu, rho_max);
        let other = local.opposite();
        let slots = rt.dispatch_slots(cpu).min(MAX_DISPATCH_BATCH);
        for _ in 0..slots {
            if rt.move_min_vtime_to_local(local.dsq(), cpu) {
                continue;
            }
            if rt.move_min_vtime_to_local(other.dsq(), cpu) {
                continue;
            }
            break;
        }
    }

    /// `running(p)`: `G.V := max(G.V, v_e)`. Also drains the enqueue-to-run
    /// latency sample recorded at `enqueue` into the per-CPU histogram, and
    /// bumps the `running` telemetry counter.
    pub fn running<R: Runtime>(&mut self, rt: &R, task: &R::Task, maps: &impl SharedMaps) {
        let cpu = rt.current_cpu(task);
        if let Some(state) = self.tasks.get(task.id()) {
            self.global.bump_v_to(state.v_e);
            if let Some(enqueued_at) = state.enqueued_at {
                maps.record_latency(cpu, rt.now().saturating_sub(enqueued_at));
            }
        }
        maps.record_running_update(cpu);
    }

    /// `stopping(p, runnable)`. `runnable` is informational only — the
    /// vtime accounting here does not branch on it.
    pub fn stopping<R: Runtime>(&mut self, rt: &R, task: &mut R::Task, _runnable: bool) {
        let id = task.id();
        let cap = self.capacity.get(rt.current_cpu(task)) as u64;
        let consumed = rt.default_slice().saturating_sub(task.slice_remaining());
        let s = ((consumed as u128 * cap as u128 * SCALE as u128) / CAP_SCALE as u128) as u64;

        if let Some(state) = self.tasks.get_mut(id) {
            let delta = state.weight.divide(s);
            state.v_e = state.v_e.saturating_add(delta);
        }
        self.global.advance_v_by_service(s);
    }
}

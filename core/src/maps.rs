//! Userspace-to-core shared surface.
//!
//! In a real sched_ext-style attachment these four tables live in BPF maps
//! shared between the kernel-side scheduler and the userspace agent; a
//! concrete attachment would satisfy [`SharedMaps`] by wrapping
//! `libbpf-rs` map file descriptors. This crate only needs the in-process
//! implementation, [`InMemoryMaps`], since the attaching framework itself
//! is out of scope here.
//!
//! The control-plane contract holds here too: nothing in this module, nor
//! anything the agent calls, ever touches `V`, `W`, or per-task state —
//! only `rho_c` and `rho_max` get written from this side.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::ids::CpuId;

/// Number of log2-sized latency buckets kept per CPU.
pub const HIST_BUCKETS: usize = 32;

/// `global_data[0]` mirror: `rho_max` as last written by the agent, plus
/// whatever `V`/`W` the core last published. The agent only ever reads `v`
/// and `w`; it never writes them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlobalData {
    pub v: u64,
    pub w: u64,
    pub rho_max: u32,
    pub _pad: u32,
}

/// Four monotonic per-CPU counters.
#[derive(Debug, Default)]
pub struct StatCounters {
    pub select_cpu_idle_hits: AtomicU64,
    pub enqueue_events: AtomicU64,
    pub running_updates: AtomicU64,
    pub reserved: AtomicU64,
}

impl StatCounters {
    fn snapshot(&self) -> [u64; 4] {
        [
            self.select_cpu_idle_hits.load(Ordering::Relaxed),
            self.enqueue_events.load(Ordering::Relaxed),
            self.running_updates.load(Ordering::Relaxed),
            self.reserved.load(Ordering::Relaxed),
        ]
    }
}

/// Per-CPU log2-bucket latency histogram.
#[derive(Debug, Default)]
pub struct LatencyHistogram {
    buckets: Mutex<[u64; HIST_BUCKETS]>,
}

impl LatencyHistogram {
    pub fn record(&self, value_ns: u64) {
        let idx = bucket_of(value_ns);
        self.buckets.lock().unwrap()[idx] += 1;
    }

    /// Reads and zeroes the histogram in one step.
    pub fn take(&self) -> [u64; HIST_BUCKETS] {
        std::mem::take(&mut self.buckets.lock().unwrap())
    }
}

fn bucket_of(value_ns: u64) -> usize {
    if value_ns == 0 {
        0
    } else {
        (64 - value_ns.leading_zeros()) as usize
    }
    .min(HIST_BUCKETS - 1)
}

/// Computes the p95 latency (the smallest bucket whose cumulative count
/// reaches 95% of the total) from a summed-across-CPUs histogram. Returns
/// `None` when there are no samples, so callers can report `samples: 0`
/// instead of a bogus bucket.
pub fn p95_bucket(buckets: &[u64; HIST_BUCKETS]) -> Option<usize> {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return None;
    }
    let need = (total as u128 * 95).div_ceil(100) as u64;
    let mut cumulative = 0u64;
    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= need {
            return Some(i);
        }
    }
    Some(HIST_BUCKETS - 1)
}

/// The four shared tables (capacities, global data, latency histograms,
/// stat counters), gathered behind one handle so the agent and (in tests)
/// the scheduler can be pointed at the same instance.
pub trait SharedMaps {
    fn set_cpu_capacity(&self, cpu: CpuId, rho_c: u32);
    fn cpu_capacity(&self, cpu: CpuId) -> Option<u32>;
    fn known_cpus(&self) -> Vec<CpuId>;

    fn global_data(&self) -> GlobalData;
    fn set_rho_max(&self, rho_max: u32);

    fn record_latency(&self, cpu: CpuId, value_ns: u64);
    fn take_histogram(&self, cpu: CpuId) -> [u64; HIST_BUCKETS];

    fn stats(&self, cpu: CpuId) -> [u64; 4];
    fn record_select_cpu_idle_hit(&self, cpu: CpuId);
    fn record_enqueue(&self, cpu: CpuId);
    fn record_running_update(&self, cpu: CpuId);
}

/// In-process implementation of [`SharedMaps`], backing both the agent
/// binary and this crate's own integration tests.
#[derive(Debug, Default)]
pub struct InMemoryMaps {
    capacities: Mutex<HashMap<CpuId, u32>>,
    global: Mutex<GlobalData>,
    histograms: Mutex<HashMap<CpuId, LatencyHistogram>>,
    stats: Mutex<HashMap<CpuId, StatCounters>>,
}

impl InMemoryMaps {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_hist<T>(&self, cpu: CpuId, f: impl FnOnce(&LatencyHistogram) -> T) -> T {
        let mut map = self.histograms.lock().unwrap();
        f(map.entry(cpu).or_default())
    }

    fn with_stats<T>(&self, cpu: CpuId, f: impl FnOnce(&StatCounters) -> T) -> T {
        let mut map = self.stats.lock().unwrap();
        f(map.entry(cpu).or_default())
    }
}

impl SharedMaps for InMemoryMaps {
    fn set_cpu_capacity(&self, cpu: CpuId, rho_c: u32) {
        self.capacities.lock().unwrap().insert(cpu, rho_c);
    }

    fn cpu_capacity(&self, cpu: CpuId) -> Option<u32> {
        self.capacities.lock().unwrap().get(&cpu).copied()
    }

    fn known_cpus(&self) -> Vec<CpuId> {
        self.capacities.lock().unwrap().keys().copied().collect()
    }

    fn global_data(&self) -> GlobalData {
        *self.global.lock().unwrap()
    }

    fn set_rho_max(&self, rho_max: u32) {
        self.global.lock().unwrap().rho_max = rho_max;
    }

    fn record_latency(&self, cpu: CpuId, value_ns: u64) {
        self.with_hist(cpu, |h| h.record(value_ns));
    }

    fn take_histogram(&self, cpu: CpuId) -> [u64; HIST_BUCKETS] {
        self.with_hist(cpu, |h| h.take())
    }

    fn stats(&self, cpu: CpuId) -> [u64; 4] {
        self.with_stats(cpu, |s| s.snapshot())
    }

    fn record_select_cpu_idle_hit(&self, cpu: CpuId) {
        self.with_stats(cpu, |s| {
            s.select_cpu_idle_hits.fetch_add(1, Ordering::Relaxed);
        });
    }

    fn record_enqueue(&self, cpu: CpuId) {
        self.with_stats(cpu, |s| {
            s.enqueue_events.fetch_add(1, Ordering::Relaxed);
        });
    }

    fn record_running_update(&self, cpu: CpuId) {
        self.with_stats(cpu, |s| {
            s.running_updates.fetch_add(1, Ordering::Relaxed);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p95_on_empty_histogram_is_none() {
        let buckets = [0u64; HIST_BUCKETS];
        assert_eq!(p95_bucket(&buckets), None);
    }

    #[test]
    fn p95_picks_bucket_covering_95_percent() {
        let mut buckets = [0u64; HIST_BUCKETS];
        buckets[2] = 90;
        buckets[5] = 10;
        // 90/100 = 90% < 95%, need bucket 5 to cross the threshold.
        assert_eq!(p95_bucket(&buckets), Some(5));
    }

    #[test]
    fn in_memory_maps_round_trip_capacity_and_stats() {
        let maps = InMemoryMaps::new();
        let cpu = CpuId(3);
        assert_eq!(maps.cpu_capacity(cpu), None);
        maps.set_cpu_capacity(cpu, 512);
        assert_eq!(maps.cpu_capacity(cpu), Some(512));

        maps.record_enqueue(cpu);
        maps.record_enqueue(cpu);
        maps.record_select_cpu_idle_hit(cpu);
        assert_eq!(maps.stats(cpu), [1, 2, 0, 0]);
    }

    #[test]
    fn histogram_take_resets() {
        let maps = InMemoryMaps::new();
        let cpu = CpuId(0);
        maps.record_latency(cpu, 1_000);
        maps.record_latency(cpu, 2_000);
        let first = maps.take_histogram(cpu);
        assert!(first.iter().sum::<u64>() == 2);
        let second = maps.take_histogram(cpu);
        assert_eq!(second, [0u64; HIST_BUCKETS]);
    }
}

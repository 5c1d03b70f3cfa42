//! Telemetry aggregation: the third step of the agent's 1 s pass.

use hetsched_core::maps::{p95_bucket, SharedMaps, HIST_BUCKETS};
use log::info;

/// One pass's worth of aggregated telemetry, reported via `log::info!`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pub samples: u64,
    pub p95_bucket: Option<usize>,
    pub select_cpu_idle_hits: u64,
    pub enqueue_events: u64,
    pub running_updates: u64,
}

/// Sums per-CPU histograms, drains them, and rolls up the four stat
/// counters across every CPU `maps` currently knows about.
pub fn collect(maps: &impl SharedMaps) -> Report {
    let cpus = maps.known_cpus();
    let mut combined = [0u64; HIST_BUCKETS];
    let mut select_cpu_idle_hits = 0u64;
    let mut enqueue_events = 0u64;
    let mut running_updates = 0u64;

    for cpu in cpus {
        for (bucket, count) in maps.take_histogram(cpu).into_iter().enumerate() {
            combined[bucket] += count;
        }
        let [idle_hits, enqueues, running, _reserved] = maps.stats(cpu);
        select_cpu_idle_hits += idle_hits;
        enqueue_events += enqueues;
        running_updates += running;
    }

    Report {
        samples: combined.iter().sum(),
        p95_bucket: p95_bucket(&combined),
        select_cpu_idle_hits,
        enqueue_events,
        running_updates,
    }
}

/// Logs a collected report at `info` level; a zero-sample report still
/// reports the event counters.
pub fn log_report(report: &Report) {
    match report.p95_bucket {
        Some(bucket) => info!(
            "telemetry: samples={} p95_bucket={} select_cpu_idle_hits={} enqueue_events={} running_updates={}",
            report.samples, bucket, report.select_cpu_idle_hits, report.enqueue_events, report.running_updates
        ),
        None => info!(
            "telemetry: samples=0 select_cpu_idle_hits={} enqueue_events={} running_updates={}",
            report.select_cpu_idle_hits, report.enqueue_events, report.running_updates
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hetsched_core::maps::InMemoryMaps;
    use hetsched_core::CpuId;

    #[test]
    fn collect_sums_histograms_and_resets_them() {
        let maps = InMemoryMaps::new();
        maps.set_cpu_capacity(CpuId(0), 1024);
        maps.set_cpu_capacity(CpuId(1), 512);
        maps.record_latency(CpuId(0), 1_000);
        maps.record_latency(CpuId(1), 1_000);
        maps.record_enqueue(CpuId(0));

        let report = collect(&maps);
        assert_eq!(report.samples, 2);
        assert!(report.p95_bucket.is_some());
        assert_eq!(report.enqueue_events, 1);

        let second = collect(&maps);
        assert_eq!(second.samples, 0);
        assert_eq!(second.p95_bucket, None);
    }

    #[test]
    fn collect_with_no_known_cpus_is_empty() {
        let maps = InMemoryMaps::new();
        let report = collect(&maps);
        assert_eq!(report.samples, 0);
        assert_eq!(report.p95_bucket, None);
    }
}

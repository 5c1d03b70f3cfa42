//! Capacity enumeration: the first two steps of the agent's 1 s pass.

use anyhow::{Context, Result};
use hetsched_core::maps::SharedMaps;
use hetsched_core::CpuId;
use scx_utils::Topology;

/// Reads the host's current CPU topology and writes any changed capacities
/// into `maps`, then recomputes and (if changed) republishes `rho_max`.
///
/// Returns `Ok(true)` if `rho_max` changed this pass. A topology scan
/// failure is not fatal: the caller logs it and keeps the capacity table as
/// it stood after the previous successful scan, which in turn falls back to
/// `CAP_SCALE` for any CPU it has never seen.
pub fn scan_and_apply(maps: &impl SharedMaps) -> Result<bool> {
    let topo = Topology::new().context("failed to gather CPU topology")?;

    for (&id, cpu) in topo.all_cpus.iter() {
        let rho_c = (cpu.cpu_capacity as u32).clamp(1, hetsched_core::fixed::CAP_SCALE);
        maps.set_cpu_capacity(CpuId(id as u32), rho_c);
    }

    let rho_max = maps
        .known_cpus()
        .into_iter()
        .filter_map(|cpu| maps.cpu_capacity(cpu))
        .max()
        .unwrap_or(hetsched_core::fixed::CAP_SCALE);

    let changed = maps.global_data().rho_max != rho_max;
    if changed {
        maps.set_rho_max(rho_max);
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hetsched_core::maps::InMemoryMaps;

    /// The rho_max-recompute half of `scan_and_apply`, exercised directly
    /// since the topology-scan half needs a real host to query.
    #[test]
    fn recompute_rho_max_reports_change_only_when_it_moves() {
        let maps = InMemoryMaps::new();
        maps.set_cpu_capacity(CpuId(0), 1024);
        maps.set_cpu_capacity(CpuId(1), 512);
        maps.set_rho_max(0);

        let rho_max = maps
            .known_cpus()
            .into_iter()
            .filter_map(|cpu| maps.cpu_capacity(cpu))
            .max()
            .unwrap_or(1024);
        assert_eq!(rho_max, 1024);

        let changed = maps.global_data().rho_max != rho_max;
        assert!(changed);
        maps.set_rho_max(rho_max);
        assert!(!(maps.global_data().rho_max != rho_max));
    }
}

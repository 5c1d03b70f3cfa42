//! Capacity table: maps CPU id -> capacity `rho_c`.
//!
//! Written only by the userspace agent, read by every event handler.
//! Lookups default to `CAP_SCALE` when a CPU has never been populated, so
//! handlers never need to special-case an unconfigured CPU.

use std::collections::HashMap;

use crate::fixed::{BIG_PCT, CAP_SCALE};
use crate::ids::{Class, CpuId};

/// `cpu_id -> rho_c`. `rho_max` is *not* stored here — it lives alongside
/// `G`, so [`crate::global::GlobalState`] owns the single source of truth
/// and callers pass it in to `class_of`.
#[derive(Debug, Default)]
pub struct CapacityTable {
    capacities: HashMap<CpuId, u32>,
}

impl CapacityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `rho_c`, defaulting to `CAP_SCALE` for an unpopulated CPU.
    pub fn get(&self, cpu: CpuId) -> u32 {
        self.capacities.get(&cpu).copied().unwrap_or(CAP_SCALE)
    }

    /// Agent-only write path. Returns whether the value actually changed,
    /// so the agent can skip a wasted `rho_max` recompute.
    pub fn set(&mut self, cpu: CpuId, rho_c: u32) -> bool {
        let clamped = rho_c.clamp(1, CAP_SCALE);
        if clamped != rho_c {
            log::debug!("cpu {cpu:?} reported capacity {rho_c}, clamping to {clamped}");
        }
        let changed = self.capacities.get(&cpu) != Some(&clamped);
        self.capacities.insert(cpu, clamped);
        changed
    }

    /// Recomputes `rho_max` across every populated CPU. Callers still need
    /// at least one populated entry; an empty table reduces to `CAP_SCALE`.
    pub fn recompute_rho_max(&self) -> u32 {
        self.capacities
            .values()
            .copied()
            .max()
            .unwrap_or(CAP_SCALE)
    }

    /// `class_of(cpu) = BIG` iff `100 * rho_c >= BIG_PCT * rho_max`.
    pub fn class_of(&self, cpu: CpuId, rho_max: u32) -> Class {
        let rho_c = self.get(cpu) as u64;
        let rho_max = rho_max.max(1) as u64;
        if 100 * rho_c >= BIG_PCT as u64 * rho_max {
            Class::Big
        } else {
            Class::Little
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_cpu_defaults_to_cap_scale() {
        let t = CapacityTable::new();
        assert_eq!(t.get(CpuId(0)), CAP_SCALE);
    }

    #[test]
    fn class_of_splits_big_and_little() {
        let mut t = CapacityTable::new();
        t.set(CpuId(0), 1024);
        t.set(CpuId(1), 512);
        let rho_max = t.recompute_rho_max();
        assert_eq!(rho_max, 1024);
        assert_eq!(t.class_of(CpuId(0), rho_max), Class::Big);
        assert_eq!(t.class_of(CpuId(1), rho_max), Class::Little);
    }

    #[test]
    fn ninety_percent_boundary_is_big() {
        let mut t = CapacityTable::new();
        t.set(CpuId(0), 1024);
        t.set(CpuId(1), 922); // 100*922 = 92200 >= 90*1024 = 92160
        let rho_max = t.recompute_rho_max();
        assert_eq!(t.class_of(CpuId(1), rho_max), Class::Big);
        t.set(CpuId(1), 921); // 92100 < 92160
        assert_eq!(t.class_of(CpuId(1), rho_max), Class::Little);
    }

    #[test]
    fn set_reports_whether_value_changed() {
        let mut t = CapacityTable::new();
        assert!(t.set(CpuId(0), 700));
        assert!(!t.set(CpuId(0), 700));
        assert!(t.set(CpuId(0), 800));
    }
}

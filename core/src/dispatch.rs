//! Lag-driven class selection.

use crate::fixed::CAP_SCALE;
use crate::ids::Class;

/// One max-quantum of work in virtual-time units: `rho_max * SLICE /
/// CAP_SCALE`.
pub fn q_max(rho_max: u32, slice: u64) -> u64 {
    (rho_max as u64 * slice) / CAP_SCALE as u64
}

/// `desired_class(p)`'s three-way outcome: steer to a specific class, or
/// fall back to whatever class the task's current CPU belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassChoice {
    Specific(Class),
    CurrentCpuClass,
}

/// `ell = V - v_e`; steers starving tasks to BIG, ahead-of-schedule tasks to
/// LITTLE, otherwise defers to the task's current CPU class.
pub fn desired_class(lag: i64, q_max: u64) -> ClassChoice {
    let band = (q_max / 4) as i64 + 1;
    if lag > band {
        ClassChoice::Specific(Class::Big)
    } else if lag < -band {
        ClassChoice::Specific(Class::Little)
    } else {
        ClassChoice::CurrentCpuClass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn q_max_scales_with_capacity_and_slice() {
        assert_eq!(q_max(1024, 1000), 1000);
        assert_eq!(q_max(512, 1000), 500);
    }

    #[test]
    fn starving_task_routes_big() {
        let qm = q_max(1024, 1000); // 1000
        let band = qm as i64 / 4 + 1; // 251
        assert_eq!(desired_class(band + 1, qm), ClassChoice::Specific(Class::Big));
    }

    #[test]
    fn ahead_of_schedule_task_routes_little() {
        let qm = q_max(1024, 1000);
        let band = qm as i64 / 4 + 1;
        assert_eq!(
            desired_class(-(band + 1), qm),
            ClassChoice::Specific(Class::Little)
        );
    }

    #[test]
    fn in_band_lag_defers_to_current_cpu() {
        let qm = q_max(1024, 1000);
        let band = qm as i64 / 4 + 1;
        assert_eq!(desired_class(0, qm), ClassChoice::CurrentCpuClass);
        assert_eq!(desired_class(band, qm), ClassChoice::CurrentCpuClass);
        assert_eq!(desired_class(-band, qm), ClassChoice::CurrentCpuClass);
    }
}

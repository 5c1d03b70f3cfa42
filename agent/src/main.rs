//! Userspace telemetry agent: scans CPU capacities, publishes `rho_max`,
//! and reports latency/stat telemetry at a 1 s cadence.

mod capacity_scan;
mod telemetry;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use hetsched_core::maps::InMemoryMaps;
use log::{info, warn};

/// Capacities are rescanned every `CAPACITY_REFRESH_TICKS`-th pass; every
/// other pass only drains and reports telemetry.
const CAPACITY_REFRESH_TICKS: u64 = 5;
const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, clap::Parser)]
#[command(
    name = "hetsched-agent",
    version,
    about = "Capacity-scan and telemetry agent for the heterogeneous-aware EEVDF scheduler"
)]
struct Opts {}

fn init_logger() -> Result<()> {
    let mut cfg = simplelog::ConfigBuilder::new();
    cfg.set_time_level(simplelog::LevelFilter::Error)
        .set_location_level(simplelog::LevelFilter::Off)
        .set_target_level(simplelog::LevelFilter::Off)
        .set_thread_level(simplelog::LevelFilter::Off);
    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        cfg.build(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;
    Ok(())
}

fn main() -> Result<()> {
    let _opts = Opts::parse();
    init_logger().context("failed to install terminal logger")?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    ctrlc::set_handler(move || {
        shutdown_clone.store(true, Ordering::Relaxed);
    })
    .context("failed to install Ctrl-C handler")?;

    let maps = InMemoryMaps::new();
    info!("hetsched-agent starting, {CAPACITY_REFRESH_TICKS}-tick capacity refresh cadence");

    let mut tick: u64 = 0;
    while !shutdown.load(Ordering::Relaxed) {
        if tick % CAPACITY_REFRESH_TICKS == 0 {
            match capacity_scan::scan_and_apply(&maps) {
                Ok(changed) if changed => info!("rho_max updated to {}", maps.global_data().rho_max),
                Ok(_) => {}
                Err(e) => warn!("capacity scan failed, keeping last known table: {e:#}"),
            }
        }

        telemetry::log_report(&telemetry::collect(&maps));

        tick = tick.wrapping_add(1);
        std::thread::sleep(TICK_INTERVAL);
    }

    info!("hetsched-agent shutting down");
    Ok(())
}

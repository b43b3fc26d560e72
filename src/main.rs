//! Wellflow controller: main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  sysfs Hardware     LogEventSink   FileStore     SystemClock   │
//! │  (Level+Pump)       (EventSink)    (Storage)     (Clock)       │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              Controller (pure logic)                   │    │
//! │  │  WellEstimator · StateMachine · History                │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::path::Path;
use std::sync::mpsc;

use anyhow::{Context, Result};
use log::{info, warn};

use wellflow::adapters::file_store::FileStore;
use wellflow::adapters::hardware::{self, Wiring};
use wellflow::adapters::log_sink::LogEventSink;
use wellflow::adapters::time::SystemClock;
use wellflow::app::controller::Controller;
use wellflow::config::{RuntimeConfig, Settings};
use wellflow::drivers::sysfs_gpio::SYSFS_GPIO_ROOT;

fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("╔══════════════════════════════════════╗");
    info!("║  Wellflow v{}                     ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let runtime = RuntimeConfig::from_env().context("reading WELLFLOW_* environment")?;
    let settings = Settings::load(&runtime.settings_path).context("loading settings")?;
    info!(
        "Poll every {} ms, heartbeat {} s",
        runtime.poll_interval.as_millis(),
        runtime.heartbeat.as_secs()
    );

    // ── 3. Adapters ───────────────────────────────────────────
    let hw = hardware::open_sysfs(&settings, Path::new(SYSFS_GPIO_ROOT), Wiring::default())
        .context("opening GPIO lines")?;
    let store = FileStore::new(&runtime.snapshot_path, &runtime.history_path);
    let mut sink = LogEventSink::new();

    // ── 4. Controller (restores state, forces pumps off) ──────
    let mut controller = Controller::new(
        settings,
        hw,
        store,
        SystemClock::new(),
        runtime.heartbeat,
        &mut sink,
    )
    .context("starting controller")?;

    // ── 5. Stop on SIGINT / SIGTERM ───────────────────────────
    let (stop_tx, stop_rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        if stop_tx.send(()).is_err() {
            warn!("Stop signal arrived after the loop ended");
        }
    })
    .context("installing signal handler")?;

    // ── 6. Control loop ───────────────────────────────────────
    controller
        .run(&mut sink, runtime.poll_interval, &stop_rx)
        .context("control loop aborted")?;
    info!("Stopped cleanly");
    Ok(())
}

//! Subcommand implementations

use std::io::{self, BufRead};
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use tracing::{error, info, warn};

use electroplater_core::monitor::ThreadRunner;
use electroplater_core::session::SessionEnd;
use electroplater_core::time::{StdDelay, SystemClock};
use electroplater_core::traits::PowerSupply;
use electroplater_core::{PlatingController, PrintFinished, SessionHandle};

use crate::config::{self, AppConfig};
use crate::hw;

type HostController = PlatingController<SystemClock, StdDelay, ThreadRunner>;

/// Poll interval while waiting for a session to end
const WAIT_POLL: Duration = Duration::from_secs(1);

fn controller(app: &AppConfig) -> Result<HostController> {
    let hardware = hw::open_hardware(&app.devices)?;
    Ok(PlatingController::new(
        hardware,
        app.station.clone(),
        SystemClock,
        StdDelay,
        ThreadRunner,
    ))
}

fn print_status(handle: &SessionHandle) {
    let Some(session) = handle.status() else {
        println!("idle");
        return;
    };
    let elapsed_min = session
        .elapsed(Instant::now())
        .map_or(0, |elapsed| elapsed.as_secs() / 60);
    println!(
        "{}: {} of {} min plated, {} priming bursts, last current {:.3} A",
        session.phase(),
        elapsed_min,
        session.parameters().duration().as_secs() / 60,
        session.priming_bursts(),
        session.last_observed_current(),
    );
    if let Some(SessionEnd::Faulted(reason)) = session.end() {
        println!("fault: {}", reason);
    }
}

/// Event loop fed from stdin
pub fn run(config_path: &Path, app: &AppConfig) -> Result<()> {
    let mut controller = controller(app)?;
    controller
        .ensure_safe_idle()
        .context("failed to bring the station to a safe idle state")?;
    let handle = controller.session_handle();

    let (tx, rx) = mpsc::channel::<PrintFinished>();
    let worker = thread::Builder::new()
        .name("plating-controller".into())
        .spawn(move || {
            for event in rx {
                match controller.on_print_finished(event) {
                    Ok(outcome) => info!(?outcome, "Print finished handled"),
                    Err(e) => error!(error = %e, "Plating did not run"),
                }
            }
        })
        .context("failed to spawn controller thread")?;

    info!("Ready; commands: print-done, stop, status, ack, quit");
    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read stdin")?;
        match line.trim() {
            "print-done" => {
                let phase = handle.phase();
                if phase.is_active() {
                    warn!(%phase, "Plating session already active, print ignored");
                    continue;
                }
                match config::load_plating_settings(config_path) {
                    Ok(settings) => {
                        let event = PrintFinished {
                            plate: settings.plate_after_print,
                            settings,
                        };
                        if tx.send(event).is_err() {
                            bail!("controller thread exited");
                        }
                    }
                    Err(e) => error!(error = %e, "Could not read plating settings"),
                }
            }
            "stop" => {
                handle.stop();
            }
            "status" => print_status(&handle),
            "ack" => {
                if !handle.acknowledge() {
                    warn!("Nothing to acknowledge");
                }
            }
            "quit" => break,
            "" => {}
            other => warn!(command = other, "Unknown command"),
        }
    }

    if handle.phase().is_active() {
        info!("Stopping active session before exit");
        handle.stop();
    }
    drop(tx);
    worker
        .join()
        .map_err(|_| anyhow!("controller thread panicked"))?;
    Ok(())
}

/// Plate once and wait for the session to end
pub fn plate(app: &AppConfig) -> Result<()> {
    let mut controller = controller(app)?;
    controller.ensure_safe_idle()?;
    let handle = controller.session_handle();

    controller.on_print_finished(PrintFinished {
        plate: true,
        settings: app.plating.clone(),
    })?;

    while handle.phase().is_active() {
        thread::sleep(WAIT_POLL);
    }
    print_status(&handle);

    match handle.status().and_then(|session| session.end()) {
        Some(SessionEnd::Faulted(reason)) => bail!("plating faulted: {}", reason),
        _ => Ok(()),
    }
}

/// Safety shutdown with no session
pub fn shutdown(app: &AppConfig) -> Result<()> {
    let controller = controller(app)?;
    let report = controller.ensure_safe_idle()?;

    for (step, e) in report.failures() {
        println!("{}: {}", step, e);
    }
    println!("shutdown completed at {}", report.completed_at().format("%Y-%m-%d %H:%M:%S"));
    if !report.is_clean() {
        bail!("{} shutdown steps failed", report.failures().len());
    }
    Ok(())
}

/// Print power supply identity and readings
pub fn identify(app: &AppConfig) -> Result<()> {
    let mut psu = hw::open_psu(&app.devices)?;

    let identity = psu.identify().context("power supply did not identify")?;
    let volts = psu.read_voltage().context("failed to read voltage")?;
    let amps = psu.read_current().context("failed to read current")?;

    println!("power supply {} on {}", identity, app.devices.psu_port);
    println!("output {:.2} V {:.3} A", volts, amps);
    Ok(())
}

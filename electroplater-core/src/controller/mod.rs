//! Plating controller
//!
//! Drives one plating session at a time:
//! - Positions the anode over the printed cup
//! - Primes electrolyte until the plating circuit conducts
//! - Hands the timed plating phase to a periodic monitor
//! - Runs the safety shutdown on completion, stop or any fault

mod handle;
mod station;

pub use handle::SessionHandle;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, PlatingParameters, PlatingSettings, StationConfig};
use crate::monitor::{MonitorError, MonitorRunner, PeriodicMonitor};
use crate::safety::ShutdownReport;
use crate::session::{plating_window_open, FaultKind, PlatingSession, SessionEnd};
use crate::state::{Event, Phase};
use crate::time::Clock;
use crate::traits::{Hardware, HardwareError, MoveTo};

use station::{lock, read_output, SharedStation, Station};

/// Longest uninterrupted wait; stop requests are noticed within this
const PAUSE_SLICE: Duration = Duration::from_millis(1000);

/// Host notification that a print has finished
#[derive(Debug, Clone, PartialEq)]
pub struct PrintFinished {
    /// Whether the operator asked for plating after this print
    pub plate: bool,
    /// Plating settings as read when the print finished
    pub settings: PlatingSettings,
}

/// What the controller did with a print-finished notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatingOutcome {
    /// Plating was not requested
    Skipped,
    /// The session reached the timed plating phase
    Plating,
}

/// Reasons a session could not start or did not reach plating
#[derive(Debug, Error)]
pub enum PlatingError {
    /// Parameters failed validation; nothing was started
    #[error("invalid plating parameters")]
    Configuration(#[from] ConfigError),
    /// A session is already active
    #[error("a plating session is already {0}")]
    SessionConflict(Phase),
    /// A device failed; the session is faulted
    #[error("hardware failure during {phase}")]
    Hardware {
        phase: Phase,
        #[source]
        source: HardwareError,
    },
    /// Priming never produced current; the session is faulted
    #[error("no current after {bursts} pump bursts")]
    PrimingExhausted { bursts: u32 },
    /// The operator stopped the session
    #[error("plating session stopped during {0}")]
    Stopped(Phase),
    /// The plating monitor could not start; the session is faulted
    #[error("plating monitor unavailable")]
    Monitor(#[source] MonitorError),
}

/// Why the foreground sequence gave up
#[derive(Debug)]
enum Interrupt {
    Hardware(HardwareError),
    PrimingExhausted(u32),
    Stopped,
    Monitor(MonitorError),
}

/// Plating controller
///
/// Owns the station hardware. [`start`](Self::start) runs positioning and
/// priming on the calling thread and returns once the timed plating phase
/// has been handed to the monitor runner.
pub struct PlatingController<C: Clock, D: DelayNs, R: MonitorRunner> {
    station: SharedStation,
    config: StationConfig,
    cancel: Arc<AtomicBool>,
    clock: C,
    delay: D,
    runner: R,
}

impl<C: Clock, D: DelayNs, R: MonitorRunner> PlatingController<C, D, R> {
    /// Create a controller
    ///
    /// # Arguments
    /// - `hardware`: the station's device proxies
    /// - `config`: station layout and timings
    /// - `clock`: time source for the plating window
    /// - `delay`: blocking delay for positioning and priming waits
    /// - `runner`: scheduler for the plating monitor
    pub fn new(hardware: Hardware, config: StationConfig, clock: C, delay: D, runner: R) -> Self {
        Self {
            station: Arc::new(Mutex::new(Station::new(hardware, config.clone()))),
            config,
            cancel: Arc::new(AtomicBool::new(false)),
            clock,
            delay,
            runner,
        }
    }

    /// Handle for stopping and inspecting sessions from other threads
    pub fn session_handle(&self) -> SessionHandle {
        SessionHandle::new(Arc::clone(&self.station), Arc::clone(&self.cancel))
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        lock(&self.station).phase()
    }

    /// Snapshot of the current session
    pub fn status(&self) -> Option<PlatingSession> {
        lock(&self.station).session.clone()
    }

    /// Clear a completed or faulted session
    pub fn acknowledge(&self) -> bool {
        lock(&self.station).acknowledge()
    }

    /// Bring the hardware to a safe state when no session is running
    ///
    /// Meant for process start, when a previous run may have left power on.
    pub fn ensure_safe_idle(&self) -> Result<ShutdownReport, PlatingError> {
        let mut station = lock(&self.station);
        let phase = station.phase();
        if phase.is_active() {
            return Err(PlatingError::SessionConflict(phase));
        }
        info!("Bringing station to a safe idle state");
        Ok(station.shutdown())
    }

    /// Handle a finished print
    ///
    /// Settings are validated now, not when they were saved.
    pub fn on_print_finished(&mut self, event: PrintFinished) -> Result<PlatingOutcome, PlatingError> {
        if !event.plate {
            info!("Plating not requested for this print");
            return Ok(PlatingOutcome::Skipped);
        }

        let parameters = PlatingParameters::from_settings(&event.settings).map_err(|e| {
            warn!(error = %e, "Plating settings rejected");
            PlatingError::Configuration(e)
        })?;
        self.start(parameters)?;
        Ok(PlatingOutcome::Plating)
    }

    /// Start a plating session
    ///
    /// Blocks through positioning and priming. Returns once plating is
    /// under way, or with the reason the session ended early. The hardware
    /// has been shut down whenever this returns an error other than
    /// `Configuration` or `SessionConflict`.
    pub fn start(&mut self, parameters: PlatingParameters) -> Result<(), PlatingError> {
        self.config
            .check_cup_height(parameters.cup_height_mm())
            .map_err(|e| {
                warn!(error = %e, "Plating parameters rejected");
                PlatingError::Configuration(e)
            })?;

        {
            let mut station = lock(&self.station);
            let phase = station.phase();
            if phase.is_active() {
                warn!(%phase, "Plating session already active, start rejected");
                return Err(PlatingError::SessionConflict(phase));
            }
            self.cancel.store(false, Ordering::SeqCst);
            station.session = Some(PlatingSession::new(parameters));
        }

        info!(
            volts = parameters.voltage(),
            max_amps = parameters.current_limit(),
            hours = parameters.duration().as_secs() / 3600,
            bed_c = parameters.bed_temperature_c(),
            cup_mm = parameters.cup_height_mm(),
            "Plating session starting"
        );

        match self.run_sequence(&parameters) {
            Ok(()) => Ok(()),
            Err(interrupt) => Err(self.abandon(interrupt)),
        }
    }

    fn run_sequence(&mut self, parameters: &PlatingParameters) -> Result<(), Interrupt> {
        self.position(parameters)?;
        self.advance(Event::Settled)?;
        self.prime(parameters)?;
        self.begin_plating(parameters)
    }

    /// Heat the bed, write setpoints and bring the anode over the cup
    fn position(&mut self, parameters: &PlatingParameters) -> Result<(), Interrupt> {
        let bed_c = f32::from(parameters.bed_temperature_c());
        self.command(|hw| hw.motion.set_bed_temperature(bed_c))?;

        let identity = self.command(|hw| hw.psu.identify())?;
        info!(%identity, "Power supply connected");

        let volts = parameters.voltage();
        self.command(|hw| hw.psu.set_voltage(volts))?;
        self.pause(self.config.setpoint_delay())?;
        let amps = parameters.current_limit();
        self.command(|hw| hw.psu.set_current_limit(amps))?;

        let tool = self.config.anode_tool;
        self.command(|hw| hw.motion.select_tool(tool))?;
        for target in self.config.deploy_moves(parameters.cup_height_mm()) {
            self.command(|hw| hw.motion.move_absolute(target))?;
        }

        info!(
            settle_s = self.config.settle_delay().as_secs(),
            "Waiting for the tool head to settle"
        );
        self.pause(self.config.settle_delay())
    }

    /// Pump electrolyte until the plating circuit conducts
    fn prime(&mut self, parameters: &PlatingParameters) -> Result<(), Interrupt> {
        let max_bursts = self
            .config
            .priming_burst_limit(parameters.solution_volume_ml());
        let speed = self.config.pump_speed_percent;

        self.command(|hw| hw.psu.set_output(true))?;
        info!(max_bursts, "Plating power on, priming");

        let mut bursts = 0;
        loop {
            let (volts, amps) = self.command(read_output)?;
            self.with_session(|session| session.record_current(amps));

            if amps > 0.0 {
                info!(volts, amps, bursts, "Current detected, stopping pump");
                return self.command(|hw| {
                    hw.pump.stop()?;
                    hw.pump.release_resources()
                });
            }
            if bursts >= max_bursts {
                return Err(Interrupt::PrimingExhausted(bursts));
            }

            debug!(volts, burst = bursts + 1, "No current yet, pumping");
            self.command(|hw| hw.pump.start(speed))?;
            bursts += 1;
            self.with_session(PlatingSession::record_burst);
            self.pause(self.config.pump_burst())?;
        }
    }

    /// Immerse the anode and hand the session to the plating monitor
    fn begin_plating(&mut self, parameters: &PlatingParameters) -> Result<(), Interrupt> {
        let immersion_z = self.config.immersion_z(parameters.cup_height_mm());
        let interval = self.config.monitor_interval();

        let mut station = self.lock_unless_cancelled()?;
        if let Some(session) = station.session.as_mut() {
            session.advance(Event::CurrentDetected);
        }
        station
            .hardware
            .motion
            .move_absolute(MoveTo::z(immersion_z))
            .map_err(Interrupt::Hardware)?;

        let started_at = self.clock.now();
        if let Some(session) = station.session.as_mut() {
            session.begin_plating(started_at);
        }

        if let Some(previous) = station.monitor.take() {
            previous.stop();
        }
        let monitor = self.plating_monitor(started_at, parameters.duration(), interval);
        station.monitor = Some(monitor.handle());
        self.runner.launch(monitor).map_err(Interrupt::Monitor)?;

        info!(
            immersion_z,
            interval_s = interval.as_secs(),
            "Plating started"
        );
        Ok(())
    }

    fn plating_monitor(&self, started_at: Instant, duration: Duration, interval: Duration) -> PeriodicMonitor {
        let clock = self.clock.clone();
        let predicate = move || plating_window_open(started_at, duration, clock.now());

        let station = Arc::clone(&self.station);
        let clock = self.clock.clone();
        let on_tick = move || lock(&station).report_progress(clock.now());

        let station = Arc::clone(&self.station);
        let on_elapsed = move || {
            info!(hours = duration.as_secs() / 3600, "Plating duration elapsed");
            lock(&station).finish(SessionEnd::DurationElapsed);
        };

        PeriodicMonitor::new(interval, predicate, on_tick, on_elapsed)
    }

    /// End the session after the sequence gave up
    fn abandon(&self, interrupt: Interrupt) -> PlatingError {
        let mut station = lock(&self.station);
        let phase = station.phase();
        self.cancel.store(false, Ordering::SeqCst);

        match interrupt {
            Interrupt::Stopped => {
                station.finish(SessionEnd::Stopped);
                PlatingError::Stopped(phase)
            }
            Interrupt::Hardware(source) => {
                station.fault(phase, FaultKind::Hardware(source));
                PlatingError::Hardware { phase, source }
            }
            Interrupt::PrimingExhausted(bursts) => {
                station.fault(phase, FaultKind::PrimingExhausted { bursts });
                PlatingError::PrimingExhausted { bursts }
            }
            Interrupt::Monitor(e) => {
                station.fault(phase, FaultKind::MonitorUnavailable);
                PlatingError::Monitor(e)
            }
        }
    }

    fn lock_unless_cancelled(&self) -> Result<MutexGuard<'_, Station>, Interrupt> {
        let station = lock(&self.station);
        if self.cancel.load(Ordering::SeqCst) {
            return Err(Interrupt::Stopped);
        }
        Ok(station)
    }

    /// Run one hardware command under the station lock
    fn command<T>(
        &self,
        f: impl FnOnce(&mut Hardware) -> Result<T, HardwareError>,
    ) -> Result<T, Interrupt> {
        let mut station = self.lock_unless_cancelled()?;
        f(&mut station.hardware).map_err(Interrupt::Hardware)
    }

    fn advance(&self, event: Event) -> Result<Phase, Interrupt> {
        let mut station = self.lock_unless_cancelled()?;
        Ok(station
            .session
            .as_mut()
            .map_or(Phase::Idle, |session| session.advance(event)))
    }

    fn with_session(&self, f: impl FnOnce(&mut PlatingSession)) {
        if let Some(session) = lock(&self.station).session.as_mut() {
            f(session);
        }
    }

    /// Wait without holding the station lock
    fn pause(&mut self, duration: Duration) -> Result<(), Interrupt> {
        let mut remaining = duration;
        while !remaining.is_zero() {
            if self.cancel.load(Ordering::SeqCst) {
                return Err(Interrupt::Stopped);
            }
            let slice = remaining.min(PAUSE_SLICE);
            self.delay.delay_ms(slice.as_millis() as u32);
            remaining -= slice;
        }
        if self.cancel.load(Ordering::SeqCst) {
            return Err(Interrupt::Stopped);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::Fired;
    use crate::sim::{Call, FailingRunner, ManualRunner, Rig, SimClock, SimDelay};

    type TestController = PlatingController<SimClock, SimDelay, ManualRunner>;

    struct Fixture {
        rig: Rig,
        clock: SimClock,
        runner: ManualRunner,
        controller: TestController,
    }

    fn fixture(rig: Rig, config: StationConfig) -> Fixture {
        let clock = SimClock::new();
        let runner = ManualRunner::new();
        let controller = PlatingController::new(
            rig.hardware(),
            config,
            clock.clone(),
            SimDelay::new(clock.clone()),
            runner.clone(),
        );
        Fixture {
            rig,
            clock,
            runner,
            controller,
        }
    }

    /// Fixture whose delay calls `SessionHandle::stop` after `after` of waiting
    fn fixture_stopping_after(rig: Rig, after: Duration) -> Fixture {
        let clock = SimClock::new();
        let runner = ManualRunner::new();
        let slot: Arc<Mutex<Option<SessionHandle>>> = Arc::new(Mutex::new(None));
        let delay = SimDelay::new(clock.clone()).trigger_after(after, {
            let slot = slot.clone();
            move || {
                if let Some(handle) = slot.lock().unwrap().as_ref() {
                    handle.stop();
                }
            }
        });
        let controller = PlatingController::new(
            rig.hardware(),
            StationConfig::default(),
            clock.clone(),
            delay,
            runner.clone(),
        );
        *slot.lock().unwrap() = Some(controller.session_handle());
        Fixture {
            rig,
            clock,
            runner,
            controller,
        }
    }

    fn params() -> PlatingParameters {
        PlatingParameters::new(1.0, 0.1, 6, 60, 25, 100).unwrap()
    }

    fn shutdown_sequence() -> Vec<Call> {
        vec![
            Call::SetOutput(false),
            Call::BedTemperature(0.0),
            Call::SelectTool(1),
            Call::Move(MoveTo::z(50.0)),
            Call::Move(MoveTo::x(362.0)),
            Call::PumpRelease,
        ]
    }

    #[test]
    fn test_end_to_end_six_hours() {
        let rig = Rig::new().with_currents(&[0.0, 0.0, 0.0, 0.0, 0.05]);
        let mut f = fixture(rig, StationConfig::default());

        f.controller.start(params()).unwrap();
        assert_eq!(f.controller.phase(), Phase::Plating);

        // Positioning in order
        let calls = f.rig.calls();
        assert_eq!(calls[0], Call::BedTemperature(60.0));
        assert_eq!(calls[1], Call::Identify);
        assert_eq!(calls[2], Call::SetVoltage(1.0));
        assert_eq!(calls[3], Call::SetCurrentLimit(0.1));
        assert_eq!(calls[4], Call::SelectTool(1));
        assert_eq!(
            calls[5..10],
            [
                Call::Move(MoveTo::x(340.0)),
                Call::Move(MoveTo::z(329.0)),
                Call::Move(MoveTo::z(300.0)),
                Call::Move(MoveTo::xy(197.0, 172.0)),
                Call::Move(MoveTo::z(20.0)),
            ]
        );

        // Four dry readings, four bursts, one stop/release pair
        assert_eq!(f.rig.count(|c| *c == Call::PumpStart(-100)), 4);
        assert_eq!(f.rig.count(|c| *c == Call::PumpStop), 1);
        assert_eq!(f.rig.count(|c| *c == Call::PumpRelease), 1);
        let release = f.rig.position_of(|c| *c == Call::PumpRelease).unwrap();
        assert_eq!(calls[release - 1], Call::PumpStop);
        assert_eq!(calls[release + 1], Call::Move(MoveTo::z(15.0)));
        assert_eq!(calls.len(), release + 2);
        assert!(!f.rig.pump_acquired());
        assert!(!f.rig.pump_running());

        let session = f.controller.status().unwrap();
        assert_eq!(session.priming_bursts(), 4);
        assert_eq!(session.last_observed_current(), 0.05);
        let started_at = session.started_at().unwrap();
        // 3 s setpoint delay, 180 s settle, 4 x 2 s bursts
        assert_eq!(f.clock.elapsed(), Duration::from_secs(191));

        assert_eq!(f.runner.launched(), 1);
        f.clock.advance(Duration::from_secs(60));
        assert_eq!(f.runner.fire_latest(), Some(Fired::Ticked));
        assert_eq!(f.controller.phase(), Phase::Plating);

        let six_hours = Duration::from_secs(6 * 3600);
        f.clock
            .advance(started_at + six_hours - Duration::from_millis(1) - f.clock.now());
        assert_eq!(f.runner.fire_latest(), Some(Fired::Ticked));
        assert_eq!(f.controller.phase(), Phase::Plating);

        f.rig.clear_calls();
        f.clock.advance(Duration::from_millis(1));
        assert_eq!(f.runner.fire_latest(), Some(Fired::Completed));
        assert_eq!(f.rig.calls(), shutdown_sequence());

        assert_eq!(f.runner.fire_latest(), Some(Fired::Idle));
        assert_eq!(f.rig.calls(), shutdown_sequence());

        let session = f.controller.status().unwrap();
        assert_eq!(session.phase(), Phase::Completed);
        assert_eq!(session.end(), Some(SessionEnd::DurationElapsed));
        assert!(!f.rig.output_on());
        assert_eq!(f.rig.bed_temperature(), 0.0);
    }

    #[test]
    fn test_power_on_once_after_setpoints() {
        let rig = Rig::new().with_currents(&[0.0, 0.2]);
        let mut f = fixture(rig, StationConfig::default());

        f.controller.start(params()).unwrap();

        assert_eq!(f.rig.count(|c| *c == Call::SetOutput(true)), 1);
        assert_eq!(f.rig.count(|c| *c == Call::SetOutput(false)), 0);
        let on = f.rig.position_of(|c| *c == Call::SetOutput(true)).unwrap();
        let voltage = f.rig.position_of(|c| matches!(c, Call::SetVoltage(_))).unwrap();
        let limit = f
            .rig
            .position_of(|c| matches!(c, Call::SetCurrentLimit(_)))
            .unwrap();
        assert!(voltage < on);
        assert!(limit < on);
        assert!(f.rig.output_on());
    }

    #[test]
    fn test_current_on_first_reading_skips_pump() {
        let rig = Rig::new().with_currents(&[0.08]);
        let mut f = fixture(rig, StationConfig::default());

        f.controller.start(params()).unwrap();

        assert_eq!(f.rig.count(|c| matches!(c, Call::PumpStart(_))), 0);
        assert_eq!(f.rig.count(|c| *c == Call::PumpStop), 1);
        assert_eq!(f.rig.count(|c| *c == Call::PumpRelease), 1);
    }

    #[test]
    fn test_start_rejected_while_active() {
        let rig = Rig::new().with_currents(&[0.1]);
        let mut f = fixture(rig, StationConfig::default());
        f.controller.start(params()).unwrap();
        let calls_before = f.rig.calls().len();

        let err = f.controller.start(params()).unwrap_err();

        assert!(matches!(err, PlatingError::SessionConflict(Phase::Plating)));
        assert_eq!(f.controller.phase(), Phase::Plating);
        assert_eq!(f.rig.calls().len(), calls_before);
        assert_eq!(f.runner.launched(), 1);
    }

    #[test]
    fn test_shallow_cup_keeps_idle() {
        let mut f = fixture(Rig::new(), StationConfig::default());
        let shallow = PlatingParameters::new(1.0, 0.1, 6, 60, 10, 100).unwrap();

        let err = f.controller.start(shallow).unwrap_err();

        assert!(matches!(
            err,
            PlatingError::Configuration(ConfigError::CupTooShallow { .. })
        ));
        assert_eq!(f.controller.phase(), Phase::Idle);
        assert!(f.rig.calls().is_empty());
    }

    #[test]
    fn test_print_finished_without_plating_is_skipped() {
        let mut f = fixture(Rig::new(), StationConfig::default());

        let outcome = f
            .controller
            .on_print_finished(PrintFinished {
                plate: false,
                settings: PlatingSettings::default(),
            })
            .unwrap();

        assert_eq!(outcome, PlatingOutcome::Skipped);
        assert_eq!(f.controller.phase(), Phase::Idle);
        assert!(f.rig.calls().is_empty());
    }

    #[test]
    fn test_print_finished_with_invalid_settings() {
        let mut f = fixture(Rig::new(), StationConfig::default());
        let settings = PlatingSettings {
            plate_after_print: true,
            plating_voltage: 0.0,
            ..PlatingSettings::default()
        };

        let err = f
            .controller
            .on_print_finished(PrintFinished {
                plate: true,
                settings,
            })
            .unwrap_err();

        assert!(matches!(
            err,
            PlatingError::Configuration(ConfigError::NotPositive {
                field: "plating_voltage",
                ..
            })
        ));
        assert_eq!(f.controller.phase(), Phase::Idle);
        assert!(f.rig.calls().is_empty());
    }

    #[test]
    fn test_print_finished_starts_plating() {
        let rig = Rig::new().with_currents(&[0.1]);
        let mut f = fixture(rig, StationConfig::default());
        let settings = PlatingSettings {
            plate_after_print: true,
            ..PlatingSettings::default()
        };

        let outcome = f
            .controller
            .on_print_finished(PrintFinished {
                plate: true,
                settings,
            })
            .unwrap();

        assert_eq!(outcome, PlatingOutcome::Plating);
        assert_eq!(f.controller.phase(), Phase::Plating);
    }

    #[test]
    fn test_positioning_failure_faults_and_shuts_down() {
        let rig = Rig::new().fail_when(
            |c| matches!(c, Call::SetVoltage(_)),
            HardwareError::Disconnected,
        );
        let mut f = fixture(rig, StationConfig::default());

        let err = f.controller.start(params()).unwrap_err();

        assert!(matches!(
            err,
            PlatingError::Hardware {
                phase: Phase::Positioning,
                source: HardwareError::Disconnected
            }
        ));
        let session = f.controller.status().unwrap();
        assert_eq!(session.phase(), Phase::Faulted);
        assert!(matches!(
            session.end(),
            Some(SessionEnd::Faulted(reason))
                if reason.phase == Phase::Positioning
                    && reason.kind == FaultKind::Hardware(HardwareError::Disconnected)
        ));
        assert_eq!(f.rig.count(|c| *c == Call::SetOutput(true)), 0);
        assert_eq!(f.rig.count(|c| *c == Call::SetOutput(false)), 1);
        assert_eq!(f.rig.count(|c| *c == Call::PumpRelease), 1);
        assert_eq!(f.runner.launched(), 0);
    }

    #[test]
    fn test_priming_exhausted() {
        let rig = Rig::new().with_currents(&[0.0]);
        let config = StationConfig {
            max_priming_bursts: Some(3),
            ..StationConfig::default()
        };
        let mut f = fixture(rig, config);

        let err = f.controller.start(params()).unwrap_err();

        assert!(matches!(err, PlatingError::PrimingExhausted { bursts: 3 }));
        assert_eq!(f.rig.count(|c| matches!(c, Call::PumpStart(_))), 3);
        assert_eq!(f.controller.phase(), Phase::Faulted);
        assert!(!f.rig.output_on());
        assert!(!f.rig.pump_acquired());
        assert_eq!(f.runner.launched(), 0);
    }

    #[test]
    fn test_stop_during_positioning() {
        let f = fixture_stopping_after(Rig::new(), Duration::from_secs(10));
        let Fixture {
            rig,
            clock,
            mut controller,
            ..
        } = f;

        let err = controller.start(params()).unwrap_err();

        assert!(matches!(err, PlatingError::Stopped(Phase::Positioning)));
        let session = controller.status().unwrap();
        assert_eq!(session.phase(), Phase::Completed);
        assert_eq!(session.end(), Some(SessionEnd::Stopped));
        assert_eq!(rig.count(|c| *c == Call::SetOutput(true)), 0);
        assert_eq!(rig.count(|c| *c == Call::SetOutput(false)), 1);
        // Noticed within one wait slice
        assert!(clock.elapsed() <= Duration::from_secs(11));
    }

    #[test]
    fn test_stop_during_priming() {
        // Positioning waits 183 s; the first burst wait crosses 184 s
        let rig = Rig::new().with_currents(&[0.0]);
        let f = fixture_stopping_after(rig, Duration::from_secs(184));
        let Fixture {
            rig,
            mut controller,
            ..
        } = f;

        let err = controller.start(params()).unwrap_err();

        assert!(matches!(err, PlatingError::Stopped(Phase::Priming)));
        assert_eq!(controller.phase(), Phase::Completed);
        assert_eq!(rig.count(|c| matches!(c, Call::PumpStart(_))), 1);
        assert!(!rig.output_on());
        assert!(!rig.pump_acquired());
    }

    #[test]
    fn test_stop_during_plating() {
        let rig = Rig::new().with_currents(&[0.1]);
        let mut f = fixture(rig, StationConfig::default());
        f.controller.start(params()).unwrap();
        let handle = f.controller.session_handle();

        assert!(handle.stop());

        assert_eq!(handle.phase(), Phase::Completed);
        assert_eq!(handle.status().unwrap().end(), Some(SessionEnd::Stopped));
        assert!(!f.rig.output_on());

        f.rig.clear_calls();
        f.clock.advance(Duration::from_secs(7 * 3600));
        assert_eq!(f.runner.fire_latest(), Some(Fired::Idle));
        assert!(f.rig.calls().is_empty());
        assert!(!handle.stop());
    }

    #[test]
    fn test_failed_tick_read_faults_session() {
        let broken = Arc::new(AtomicBool::new(false));
        let rig = Rig::new().with_currents(&[0.1]).fail_when(
            {
                let broken = broken.clone();
                move |c| *c == Call::ReadCurrent && broken.load(Ordering::SeqCst)
            },
            HardwareError::Checksum,
        );
        let mut f = fixture(rig, StationConfig::default());
        f.controller.start(params()).unwrap();

        broken.store(true, Ordering::SeqCst);
        f.clock.advance(Duration::from_secs(60));
        assert_eq!(f.runner.fire_latest(), Some(Fired::Ticked));

        let session = f.controller.status().unwrap();
        assert_eq!(session.phase(), Phase::Faulted);
        assert!(matches!(
            session.end(),
            Some(SessionEnd::Faulted(reason))
                if reason.phase == Phase::Plating
                    && reason.kind == FaultKind::Hardware(HardwareError::Checksum)
        ));
        assert!(!f.rig.output_on());
        assert_eq!(f.runner.fire_latest(), Some(Fired::Idle));
    }

    #[test]
    fn test_monitor_unavailable_faults_session() {
        let rig = Rig::new().with_currents(&[0.1]);
        let clock = SimClock::new();
        let mut controller = PlatingController::new(
            rig.hardware(),
            StationConfig::default(),
            clock.clone(),
            SimDelay::new(clock),
            FailingRunner,
        );

        let err = controller.start(params()).unwrap_err();

        assert!(matches!(err, PlatingError::Monitor(_)));
        let session = controller.status().unwrap();
        assert_eq!(session.phase(), Phase::Faulted);
        assert!(matches!(
            session.end(),
            Some(SessionEnd::Faulted(reason)) if reason.kind == FaultKind::MonitorUnavailable
        ));
        assert!(!rig.output_on());
    }

    #[test]
    fn test_acknowledge_then_new_session() {
        let rig = Rig::new().with_currents(&[0.1]);
        let mut f = fixture(rig, StationConfig::default());

        assert!(!f.controller.acknowledge());
        f.controller.start(params()).unwrap();
        assert!(!f.controller.acknowledge());
        f.controller.session_handle().stop();

        assert!(f.controller.acknowledge());
        assert_eq!(f.controller.phase(), Phase::Idle);
        assert!(f.controller.status().is_none());

        f.controller.start(params()).unwrap();
        assert_eq!(f.controller.phase(), Phase::Plating);
        assert_eq!(f.runner.launched(), 2);
    }

    #[test]
    fn test_new_start_replaces_terminal_session() {
        let rig = Rig::new().with_currents(&[0.1]);
        let mut f = fixture(rig, StationConfig::default());
        f.controller.start(params()).unwrap();
        f.controller.session_handle().stop();
        assert_eq!(f.controller.phase(), Phase::Completed);

        f.controller.start(params()).unwrap();

        let session = f.controller.status().unwrap();
        assert_eq!(session.phase(), Phase::Plating);
        assert_eq!(session.end(), None);
    }

    #[test]
    fn test_ensure_safe_idle() {
        let rig = Rig::new().with_currents(&[0.1]);
        let mut f = fixture(rig, StationConfig::default());

        let report = f.controller.ensure_safe_idle().unwrap();
        assert!(report.is_clean());
        assert_eq!(f.rig.calls(), shutdown_sequence());

        f.controller.start(params()).unwrap();
        assert!(matches!(
            f.controller.ensure_safe_idle(),
            Err(PlatingError::SessionConflict(Phase::Plating))
        ));
    }
}

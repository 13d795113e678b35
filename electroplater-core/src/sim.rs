//! Simulated time and recording hardware for controller tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;

use crate::monitor::{Fired, MonitorError, MonitorRunner, PeriodicMonitor};
use crate::time::Clock;
use crate::traits::{
    Hardware, HardwareError, Motion, MoveTo, PowerSupply, PsuIdentity, Pump,
};

/// Clock that only moves when told to
#[derive(Clone)]
pub struct SimClock {
    origin: Instant,
    offset_ns: Arc<AtomicU64>,
}

impl SimClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset_ns: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset_ns
            .fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Time since the clock was created
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.offset_ns.load(Ordering::SeqCst))
    }
}

impl Clock for SimClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }
}

type Trigger = Box<dyn FnOnce() + Send>;

/// Delay that advances a [`SimClock`] instead of sleeping
pub struct SimDelay {
    clock: SimClock,
    slept: Duration,
    trigger: Option<(Duration, Trigger)>,
}

impl SimDelay {
    pub fn new(clock: SimClock) -> Self {
        Self {
            clock,
            slept: Duration::ZERO,
            trigger: None,
        }
    }

    /// Run `action` once the total delayed time reaches `after`
    pub fn trigger_after(mut self, after: Duration, action: impl FnOnce() + Send + 'static) -> Self {
        self.trigger = Some((after, Box::new(action)));
        self
    }

    fn sleep(&mut self, by: Duration) {
        self.clock.advance(by);
        self.slept += by;
        if matches!(&self.trigger, Some((after, _)) if self.slept >= *after) {
            if let Some((_, action)) = self.trigger.take() {
                action();
            }
        }
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.sleep(Duration::from_nanos(u64::from(ns)));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.sleep(Duration::from_millis(u64::from(ms)));
    }
}

/// Runner that keeps monitors until a test fires them by hand
#[derive(Clone, Default)]
pub struct ManualRunner {
    monitors: Arc<Mutex<Vec<PeriodicMonitor>>>,
}

impl ManualRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of monitors launched so far
    pub fn launched(&self) -> usize {
        self.monitors.lock().unwrap().len()
    }

    /// Fire the most recently launched monitor
    ///
    /// The monitor is fired outside the runner lock so its callbacks can
    /// take the station lock freely.
    pub fn fire_latest(&self) -> Option<Fired> {
        let mut monitor = self.monitors.lock().unwrap().pop()?;
        let fired = monitor.fire();
        self.monitors.lock().unwrap().push(monitor);
        Some(fired)
    }
}

impl MonitorRunner for ManualRunner {
    fn launch(&self, monitor: PeriodicMonitor) -> Result<(), MonitorError> {
        self.monitors.lock().unwrap().push(monitor);
        Ok(())
    }
}

/// Runner that can never start a monitor
pub struct FailingRunner;

impl MonitorRunner for FailingRunner {
    fn launch(&self, _monitor: PeriodicMonitor) -> Result<(), MonitorError> {
        Err(MonitorError::Spawn(std::io::Error::other("no threads left")))
    }
}

/// A single hardware command seen by the rig
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Call {
    SetVoltage(f32),
    SetCurrentLimit(f32),
    SetOutput(bool),
    ReadVoltage,
    ReadCurrent,
    Identify,
    PumpStart(i8),
    PumpStop,
    PumpRelease,
    BedTemperature(f32),
    SelectTool(u8),
    Move(MoveTo),
}

type FailRule = (Box<dyn Fn(&Call) -> bool + Send>, HardwareError);

struct RigState {
    calls: Vec<Call>,
    currents: VecDeque<f32>,
    last_current: f32,
    voltage: f32,
    rules: Vec<FailRule>,
    output_on: bool,
    bed_c: f32,
    tool: Option<u8>,
    pump_running: bool,
    pump_acquired: bool,
    position: MoveTo,
}

/// Recording fake of the whole station hardware
#[derive(Clone)]
pub struct Rig {
    state: Arc<Mutex<RigState>>,
}

impl Rig {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RigState {
                calls: Vec::new(),
                currents: VecDeque::new(),
                last_current: 0.0,
                voltage: 1.0,
                rules: Vec::new(),
                output_on: false,
                bed_c: 0.0,
                tool: None,
                pump_running: false,
                pump_acquired: false,
                position: MoveTo::default(),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, RigState> {
        self.state.lock().unwrap()
    }

    /// Script successive current readings; the last one repeats
    pub fn with_currents(self, currents: &[f32]) -> Self {
        self.state().currents = currents.iter().copied().collect();
        self
    }

    /// Make every matching call fail with `error`
    pub fn fail_when(
        self,
        matches: impl Fn(&Call) -> bool + Send + 'static,
        error: HardwareError,
    ) -> Self {
        self.state().rules.push((Box::new(matches), error));
        self
    }

    /// Boxed proxies sharing this rig
    pub fn hardware(&self) -> Hardware {
        Hardware::new(RigPsu(self.clone()), RigPump(self.clone()), RigMotion(self.clone()))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.state().calls.iter().filter(|call| matches(call)).count()
    }

    /// Index of the first matching call
    pub fn position_of(&self, matches: impl Fn(&Call) -> bool) -> Option<usize> {
        self.state().calls.iter().position(matches)
    }

    pub fn output_on(&self) -> bool {
        self.state().output_on
    }

    pub fn bed_temperature(&self) -> f32 {
        self.state().bed_c
    }

    pub fn tool(&self) -> Option<u8> {
        self.state().tool
    }

    pub fn pump_running(&self) -> bool {
        self.state().pump_running
    }

    pub fn pump_acquired(&self) -> bool {
        self.state().pump_acquired
    }

    /// Last commanded head position
    pub fn head(&self) -> MoveTo {
        self.state().position
    }

    fn record(&self, call: Call) -> Result<(), HardwareError> {
        let mut state = self.state();
        state.calls.push(call);
        match state.rules.iter().find(|(matches, _)| matches(&call)) {
            Some((_, error)) => Err(*error),
            None => Ok(()),
        }
    }
}

struct RigPsu(Rig);

impl PowerSupply for RigPsu {
    fn set_voltage(&mut self, volts: f32) -> Result<(), HardwareError> {
        self.0.record(Call::SetVoltage(volts))
    }

    fn set_current_limit(&mut self, amps: f32) -> Result<(), HardwareError> {
        self.0.record(Call::SetCurrentLimit(amps))
    }

    fn set_output(&mut self, on: bool) -> Result<(), HardwareError> {
        self.0.record(Call::SetOutput(on))?;
        self.0.state().output_on = on;
        Ok(())
    }

    fn read_voltage(&mut self) -> Result<f32, HardwareError> {
        self.0.record(Call::ReadVoltage)?;
        Ok(self.0.state().voltage)
    }

    fn read_current(&mut self) -> Result<f32, HardwareError> {
        self.0.record(Call::ReadCurrent)?;
        let mut state = self.0.state();
        if let Some(current) = state.currents.pop_front() {
            state.last_current = current;
        }
        Ok(state.last_current)
    }

    fn identify(&mut self) -> Result<PsuIdentity, HardwareError> {
        self.0.record(Call::Identify)?;
        Ok(PsuIdentity {
            model: 5005,
            firmware: 14,
        })
    }
}

struct RigPump(Rig);

impl Pump for RigPump {
    fn start(&mut self, speed_percent: i8) -> Result<(), HardwareError> {
        self.0.record(Call::PumpStart(speed_percent))?;
        let mut state = self.0.state();
        state.pump_acquired = true;
        state.pump_running = speed_percent != 0;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), HardwareError> {
        self.0.record(Call::PumpStop)?;
        self.0.state().pump_running = false;
        Ok(())
    }

    fn release_resources(&mut self) -> Result<(), HardwareError> {
        self.0.record(Call::PumpRelease)?;
        let mut state = self.0.state();
        state.pump_running = false;
        state.pump_acquired = false;
        Ok(())
    }
}

struct RigMotion(Rig);

impl Motion for RigMotion {
    fn set_bed_temperature(&mut self, celsius: f32) -> Result<(), HardwareError> {
        self.0.record(Call::BedTemperature(celsius))?;
        self.0.state().bed_c = celsius;
        Ok(())
    }

    fn select_tool(&mut self, tool: u8) -> Result<(), HardwareError> {
        self.0.record(Call::SelectTool(tool))?;
        self.0.state().tool = Some(tool);
        Ok(())
    }

    fn move_absolute(&mut self, target: MoveTo) -> Result<(), HardwareError> {
        self.0.record(Call::Move(target))?;
        let mut state = self.0.state();
        let position = &mut state.position;
        position.x = target.x.or(position.x);
        position.y = target.y.or(position.y);
        position.z = target.z.or(position.z);
        Ok(())
    }
}

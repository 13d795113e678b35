//! Periodic monitor and its cancellation handle

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::runner::{MonitorError, MonitorRunner};

/// Result of a single monitor firing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fired {
    /// Predicate held; the tick action ran
    Ticked,
    /// Predicate failed; the completion action ran and the monitor stopped
    Completed,
    /// Monitor was already stopped; nothing ran
    Idle,
}

struct Shared {
    running: Mutex<bool>,
    wake: Condvar,
}

/// Cancellation handle for a [`PeriodicMonitor`]
///
/// Cheap to clone. All clones refer to the same monitor.
#[derive(Clone)]
pub struct MonitorHandle {
    shared: Arc<Shared>,
    interval: Duration,
}

impl core::fmt::Debug for MonitorHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MonitorHandle")
            .field("interval", &self.interval)
            .field("running", &self.is_running())
            .finish()
    }
}

impl MonitorHandle {
    fn new(interval: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                running: Mutex::new(true),
                wake: Condvar::new(),
            }),
            interval,
        }
    }

    fn running(&self) -> MutexGuard<'_, bool> {
        self.shared
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Tick interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Check if the monitor will fire again
    pub fn is_running(&self) -> bool {
        *self.running()
    }

    /// Cancel the monitor
    ///
    /// Neither callback runs after this returns. Wakes a sleeping runner
    /// immediately. Returns false if the monitor had already stopped.
    pub fn stop(&self) -> bool {
        let was_running = self.finish();
        self.shared.wake.notify_all();
        was_running
    }

    /// Mark the monitor stopped, returning the previous state
    fn finish(&self) -> bool {
        core::mem::replace(&mut *self.running(), false)
    }

    /// Sleep for one interval or until stopped
    ///
    /// Returns true if the monitor is still running afterwards.
    pub fn wait_interval(&self) -> bool {
        let guard = self.running();
        let (guard, _) = self
            .shared
            .wake
            .wait_timeout_while(guard, self.interval, |running| *running)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

type Predicate = Box<dyn FnMut() -> bool + Send>;
type Action = Box<dyn FnMut() + Send>;
type Completion = Box<dyn FnOnce() + Send>;

/// Interval timer that runs while a predicate holds
///
/// On every tick the predicate is evaluated first. While it holds, `on_tick`
/// runs. The first time it fails, `on_predicate_false` runs once and the
/// monitor stops for good. A monitor is single-use; build a fresh one for
/// each session.
pub struct PeriodicMonitor {
    handle: MonitorHandle,
    predicate: Predicate,
    on_tick: Action,
    on_predicate_false: Option<Completion>,
}

impl PeriodicMonitor {
    /// Build a monitor
    ///
    /// # Arguments
    /// - `interval`: time between ticks
    /// - `predicate`: condition that keeps the monitor running
    /// - `on_tick`: action run on every tick while the predicate holds
    /// - `on_predicate_false`: action run once when the predicate fails
    pub fn new(
        interval: Duration,
        predicate: impl FnMut() -> bool + Send + 'static,
        on_tick: impl FnMut() + Send + 'static,
        on_predicate_false: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            handle: MonitorHandle::new(interval),
            predicate: Box::new(predicate),
            on_tick: Box::new(on_tick),
            on_predicate_false: Some(Box::new(on_predicate_false)),
        }
    }

    /// Build a monitor and hand it to `runner`
    pub fn start<R: MonitorRunner + ?Sized>(
        interval: Duration,
        predicate: impl FnMut() -> bool + Send + 'static,
        on_tick: impl FnMut() + Send + 'static,
        on_predicate_false: impl FnOnce() + Send + 'static,
        runner: &R,
    ) -> Result<MonitorHandle, MonitorError> {
        let monitor = Self::new(interval, predicate, on_tick, on_predicate_false);
        let handle = monitor.handle();
        runner.launch(monitor)?;
        Ok(handle)
    }

    /// Handle that cancels this monitor
    pub fn handle(&self) -> MonitorHandle {
        self.handle.clone()
    }

    /// Run one tick now
    pub fn fire(&mut self) -> Fired {
        if !self.handle.is_running() {
            return Fired::Idle;
        }

        if (self.predicate)() {
            if !self.handle.is_running() {
                return Fired::Idle;
            }
            (self.on_tick)();
            return Fired::Ticked;
        }

        // A concurrent stop() wins over completion
        if !self.handle.finish() {
            return Fired::Idle;
        }
        if let Some(on_predicate_false) = self.on_predicate_false.take() {
            on_predicate_false();
        }
        Fired::Completed
    }

    /// Tick on the interval until completed or stopped
    ///
    /// Blocks the calling thread.
    pub fn run(mut self) {
        while self.handle.wait_interval() {
            if self.fire() != Fired::Ticked {
                break;
            }
        }
    }
}

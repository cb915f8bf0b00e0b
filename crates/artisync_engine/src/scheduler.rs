//! Periodic scheduler.
//!
//! Each scheduled family gets its own worker thread that triggers a pass at
//! the family interval. Workers share one stop signal and are joined on
//! [`PeriodicScheduler::shutdown`] or drop.

use crate::config::SchedulerConfig;
use crate::driver::ReconciliationDriver;
use crate::error::{EngineError, EngineResult};
use crate::result::PassResult;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    condvar: Condvar,
}

impl StopSignal {
    /// Waits up to `timeout`. Returns true if stop was requested.
    fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut stopped = self.stopped.lock();
        while !*stopped {
            if self.condvar.wait_until(&mut stopped, deadline).timed_out() {
                break;
            }
        }
        *stopped
    }

    fn stop(&self) {
        *self.stopped.lock() = true;
        self.condvar.notify_all();
    }
}

/// Runs reconciliation drivers periodically on worker threads.
pub struct PeriodicScheduler {
    config: SchedulerConfig,
    signal: Arc<StopSignal>,
    workers: Vec<(String, JoinHandle<()>)>,
}

impl PeriodicScheduler {
    /// Creates a scheduler with no workers.
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            signal: Arc::new(StopSignal::default()),
            workers: Vec::new(),
        }
    }

    /// Starts a worker for `driver` at its configured interval.
    ///
    /// # Errors
    ///
    /// Returns an error if the family has no interval, if the scheduler was
    /// shut down, or if the worker thread cannot be spawned.
    pub fn schedule(&mut self, driver: Arc<ReconciliationDriver>) -> EngineResult<()> {
        let interval = driver.config().interval.ok_or_else(|| {
            EngineError::Scheduler(format!("family {} has no trigger interval", driver.name()))
        })?;
        if *self.signal.stopped.lock() {
            return Err(EngineError::Scheduler("scheduler is shut down".into()));
        }

        let name = driver.name().to_string();
        let signal = Arc::clone(&self.signal);
        let initial_delay = self.config.initial_delay;
        let run_immediately = self.config.run_immediately;

        let handle = thread::Builder::new()
            .name(format!("artisync-{name}"))
            .spawn(move || {
                if signal.wait(initial_delay) {
                    return;
                }
                if run_immediately {
                    driver.synchronize();
                }
                while !signal.wait(interval) {
                    let result = driver.synchronize();
                    debug!(family = %result.family, status = %result.status, "scheduled pass finished");
                }
            })
            .map_err(|e| EngineError::Scheduler(format!("cannot spawn worker for {name}: {e}")))?;

        info!(family = %name, ?interval, "family scheduled");
        self.workers.push((name, handle));
        Ok(())
    }

    /// Names of the scheduled families.
    pub fn families(&self) -> Vec<&str> {
        self.workers.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Stops every worker and waits for running passes to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if a worker panicked.
    pub fn shutdown(&mut self) -> EngineResult<()> {
        self.signal.stop();
        let mut panicked = Vec::new();
        for (name, handle) in self.workers.drain(..) {
            if handle.join().is_err() {
                panicked.push(name);
            }
        }
        if panicked.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Scheduler(format!(
                "worker(s) panicked: {}",
                panicked.join(", ")
            )))
        }
    }
}

impl Drop for PeriodicScheduler {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

/// Runs one pass of every driver concurrently and returns the results in
/// input order.
pub fn run_all(drivers: &[Arc<ReconciliationDriver>]) -> Vec<PassResult> {
    thread::scope(|scope| {
        let handles: Vec<_> = drivers
            .iter()
            .map(|driver| scope.spawn(move || driver.synchronize()))
            .collect();
        handles
            .into_iter()
            .zip(drivers)
            .map(|(handle, driver)| {
                handle.join().unwrap_or_else(|_| {
                    let mut result = PassResult::new(driver.name(), false);
                    result.abort(artisync_core::ErrorKind::Pass, "pass panicked");
                    result.finish(Duration::ZERO);
                    result
                })
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_signal_wakes_waiters() {
        let signal = Arc::new(StopSignal::default());
        assert!(!signal.wait(Duration::from_millis(1)));

        let waiter = {
            let signal = Arc::clone(&signal);
            thread::spawn(move || signal.wait(Duration::from_secs(30)))
        };
        signal.stop();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn empty_scheduler_shuts_down() {
        let mut scheduler = PeriodicScheduler::new(SchedulerConfig::default());
        assert!(scheduler.families().is_empty());
        scheduler.shutdown().unwrap();
    }
}

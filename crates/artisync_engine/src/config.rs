//! Configuration for reconciliation families and the scheduler.

use std::time::Duration;

/// Default retention of the per-family state log.
pub const DEFAULT_STATE_LOG_RETENTION: Duration = Duration::from_secs(60 * 60);

/// Default cap on state log entries.
pub const DEFAULT_MAX_STATE_LOG_ENTRIES: usize = 1024;

/// Configuration of one reconciliation family.
#[derive(Debug, Clone)]
pub struct FamilyConfig {
    /// Family name, used in logs and diagnostics.
    pub name: String,
    /// Whether unforced passes run.
    pub enabled: bool,
    /// Trigger interval for the periodic scheduler.
    pub interval: Option<Duration>,
    /// How long state log entries are kept.
    pub state_log_retention: Duration,
    /// Maximum number of state log entries kept.
    pub max_state_log_entries: usize,
}

impl FamilyConfig {
    /// Creates an enabled family configuration without a trigger interval.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            interval: None,
            state_log_retention: DEFAULT_STATE_LOG_RETENTION,
            max_state_log_entries: DEFAULT_MAX_STATE_LOG_ENTRIES,
        }
    }

    /// Sets whether unforced passes run.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the trigger interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Sets the state log retention.
    pub fn with_state_log_retention(mut self, retention: Duration) -> Self {
        self.state_log_retention = retention;
        self
    }

    /// Sets the maximum number of state log entries.
    pub fn with_max_state_log_entries(mut self, max: usize) -> Self {
        self.max_state_log_entries = max;
        self
    }
}

impl Default for FamilyConfig {
    fn default() -> Self {
        Self::new("default")
    }
}

/// Configuration of the periodic scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Delay before the first trigger.
    pub initial_delay: Duration,
    /// Whether each family runs once as soon as it is scheduled.
    pub run_immediately: bool,
}

impl SchedulerConfig {
    /// Creates the default scheduler configuration.
    pub fn new() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            run_immediately: false,
        }
    }

    /// Sets the delay before the first trigger.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets whether families run once as soon as they are scheduled.
    pub fn with_run_immediately(mut self, run: bool) -> Self {
        self.run_immediately = run;
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new()
    }
}

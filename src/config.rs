//! # Global runtime configuration.
//!
//! [`Config`] defines the scheduler's behavior: pacing (how many task steps a
//! single `run()` call may execute), admission control (how many tasks enter
//! the running set per tick), memory watchdog limits, and logging.
//!
//! # Example
//! ```
//! use strand::Config;
//!
//! let mut cfg = Config::default();
//! cfg.max_steps_per_run = 10;
//! cfg.pacing_enabled = true;
//! cfg.max_concurrent = 4;
//!
//! assert_eq!(cfg.max_concurrent, 4);
//! ```

/// Global configuration for the scheduler.
///
/// Controls pacing, admission, the memory watchdog, and logging.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum number of task steps a single `run()` call may execute before
    /// returning control to the caller. Only honored when
    /// [`pacing_enabled`](Config::pacing_enabled) is true.
    pub max_steps_per_run: usize,
    /// Whether the per-run step cap is enforced.
    pub pacing_enabled: bool,
    /// Maximum number of tasks pulled into the running set per tick.
    pub max_concurrent: usize,
    /// Memory watchdog soft limit in megabytes.
    pub soft_limit_mb: u64,
    /// Sample the resident set once per this many watchdog calls.
    pub mem_check_interval: u32,
    /// Run an advisory collect pass once per this many `collect_garbage` calls.
    pub gc_interval: u32,
    /// Whether the built-in log observer is attached.
    pub logging: bool,
}

impl Default for Config {
    /// Provides a default configuration:
    /// - `max_steps_per_run = 50` (inert until pacing is enabled)
    /// - `pacing_enabled = false`
    /// - `max_concurrent = 100`
    /// - `soft_limit_mb = 512`
    /// - `mem_check_interval = 100`
    /// - `gc_interval = 1000`
    /// - `logging = false`
    fn default() -> Self {
        Self {
            max_steps_per_run: 50,
            pacing_enabled: false,
            max_concurrent: 100,
            soft_limit_mb: 512,
            mem_check_interval: 100,
            gc_interval: 1000,
            logging: false,
        }
    }
}

//! Process-wide wait defaults.
//!
//! Every locator that does not carry its own timeout or poll interval falls back to
//! these values at wait time. Install them once at startup, before any page is used:
//!
//! ```no_run
//! # use thirtyfour_pages::config::{self, WaitDefaults};
//! # fn main() -> thirtyfour_pages::error::PageResult<()> {
//! config::install(WaitDefaults::from_env()?)?;
//! # Ok(())
//! # }
//! ```
use std::env;
use std::sync::OnceLock;
use std::time::Duration;

use log::debug;

use crate::error::{configuration, PageResult};
use crate::query::ElementPoller;

/// Default wait timeout, long enough for a typical UI to settle.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default delay between two polls of the same condition.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Environment variable holding the default timeout, in seconds.
pub const TIMEOUT_ENV: &str = "THIRTYFOUR_PAGES_TIMEOUT";

/// Environment variable holding the default poll interval, in seconds.
pub const POLL_INTERVAL_ENV: &str = "THIRTYFOUR_PAGES_POLL_INTERVAL";

static DEFAULTS: OnceLock<WaitDefaults> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitDefaults {
    timeout: Duration,
    poll_interval: Duration,
}

impl Default for WaitDefaults {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl WaitDefaults {
    /// Create a new set of defaults. Both durations must be non-zero.
    pub fn new(timeout: Duration, poll_interval: Duration) -> PageResult<Self> {
        if timeout.is_zero() {
            return Err(configuration("default timeout must be greater than zero"));
        }
        if poll_interval.is_zero() {
            return Err(configuration("default poll interval must be greater than zero"));
        }
        Ok(Self {
            timeout,
            poll_interval,
        })
    }

    /// Read the defaults from `THIRTYFOUR_PAGES_TIMEOUT` and `THIRTYFOUR_PAGES_POLL_INTERVAL`.
    /// Unset variables keep the built-in values.
    pub fn from_env() -> PageResult<Self> {
        let builtin = Self::default();
        let timeout = seconds_from_env(TIMEOUT_ENV)?.unwrap_or(builtin.timeout);
        let poll_interval = seconds_from_env(POLL_INTERVAL_ENV)?.unwrap_or(builtin.poll_interval);
        Self::new(timeout, poll_interval)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn poller(&self) -> ElementPoller {
        ElementPoller::TimeoutWithInterval(self.timeout, self.poll_interval)
    }
}

fn seconds_from_env(name: &str) -> PageResult<Option<Duration>> {
    match env::var(name) {
        Ok(raw) => parse_seconds(name, &raw).map(Some),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(configuration(format!("{}: {}", name, e))),
    }
}

pub(crate) fn parse_seconds(name: &str, raw: &str) -> PageResult<Duration> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| configuration(format!("{} must be a number of seconds, got {:?}", name, raw)))?;
    positive_seconds(name, secs)
}

pub(crate) fn positive_seconds(name: &str, secs: f64) -> PageResult<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(configuration(format!("{} must be greater than zero, got {}", name, secs)));
    }
    Ok(Duration::from_secs_f64(secs))
}

/// Install the process-wide defaults. This can only be done once.
pub fn install(defaults: WaitDefaults) -> PageResult<()> {
    DEFAULTS
        .set(defaults)
        .map_err(|_| configuration("wait defaults have already been installed"))?;
    debug!(
        "installed wait defaults: timeout={:?} poll_interval={:?}",
        defaults.timeout, defaults.poll_interval
    );
    Ok(())
}

/// The installed defaults, or the built-in ones if nothing was installed.
pub fn defaults() -> WaitDefaults {
    DEFAULTS.get().copied().unwrap_or_default()
}

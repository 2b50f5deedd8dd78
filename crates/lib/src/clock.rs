//! Time provider abstraction
//!
//! This module provides a [`Clock`] trait that abstracts over time sources,
//! allowing production code to use real system time while tests can use
//! controllable mock time. Commit log timestamps and remote archive file
//! names are both taken from the clock.
//!
//! # Example
//!
//! ```
//! use cfgmgmt::{Clock, SystemClock};
//!
//! let clock = SystemClock;
//! let secs = clock.now_secs();
//! let stamp = clock.format_local("%Y%m%d_%H%M%S");
//! assert_eq!(stamp.len(), 15);
//! ```

use std::fmt::Debug;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{Local, TimeZone};

#[cfg(any(test, feature = "testing"))]
use std::sync::Mutex;

/// A time provider for getting current timestamps.
pub trait Clock: Send + Sync + Debug {
    /// Returns the current time as milliseconds since Unix epoch.
    fn now_millis(&self) -> u64;

    /// Get current time as seconds since Unix epoch.
    fn now_secs(&self) -> i64 {
        (self.now_millis() / 1000) as i64
    }

    /// Formats the current local time with a `strftime` pattern.
    fn format_local(&self, pattern: &str) -> String {
        format_timestamp(self.now_secs(), pattern)
    }
}

/// Formats Unix seconds as local time with a `strftime` pattern.
///
/// Out-of-range timestamps render as the epoch.
pub fn format_timestamp(secs: i64, pattern: &str) -> String {
    match Local.timestamp_opt(secs, 0).single() {
        Some(dt) => dt.format(pattern).to_string(),
        None => Local
            .timestamp_opt(0, 0)
            .single()
            .map(|dt| dt.format(pattern).to_string())
            .unwrap_or_default(),
    }
}

/// Production clock using real system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Test clock with manually controlled time.
///
/// Unlike a wall clock, a `FixedClock` only moves when told to, so commit
/// log timestamps written during a test are predictable.
///
/// ```ignore
/// use cfgmgmt::{Clock, FixedClock};
///
/// let clock = FixedClock::new(1_700_000_000_000);
/// assert_eq!(clock.now_secs(), 1_700_000_000);
/// clock.advance_secs(60);
/// assert_eq!(clock.now_secs(), 1_700_000_060);
/// ```
#[cfg(any(test, feature = "testing"))]
pub struct FixedClock {
    millis: Mutex<u64>,
}

#[cfg(any(test, feature = "testing"))]
impl FixedClock {
    /// Create a new fixed clock with the given initial time in milliseconds.
    pub fn new(millis: u64) -> Self {
        Self {
            millis: Mutex::new(millis),
        }
    }

    /// Advance the clock by the given number of milliseconds.
    pub fn advance(&self, ms: u64) {
        *self.millis.lock().unwrap() += ms;
    }

    /// Advance the clock by whole seconds.
    pub fn advance_secs(&self, secs: u64) {
        self.advance(secs * 1000);
    }

    /// Set the clock to a specific time in milliseconds.
    pub fn set(&self, ms: u64) {
        *self.millis.lock().unwrap() = ms;
    }
}

#[cfg(any(test, feature = "testing"))]
impl Clock for FixedClock {
    fn now_millis(&self) -> u64 {
        *self.millis.lock().unwrap()
    }
}

#[cfg(any(test, feature = "testing"))]
impl Default for FixedClock {
    fn default() -> Self {
        // 2024-01-01 00:00:00 UTC
        Self::new(1704067200000)
    }
}

#[cfg(any(test, feature = "testing"))]
impl Clone for FixedClock {
    fn clone(&self) -> Self {
        Self::new(self.now_millis())
    }
}

#[cfg(any(test, feature = "testing"))]
impl Debug for FixedClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedClock")
            .field("millis", &*self.millis.lock().unwrap())
            .finish()
    }
}

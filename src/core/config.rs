//! # Provider configuration.
//!
//! [`ProviderConfig`] holds the knobs of one [`DataProvider`](crate::DataProvider).
//!
//! ## Sentinel values
//! - `timeout = 0s` → no timeout (a hung read blocks only its own job)
//! - `bus_capacity = 0` → clamped to 1
//! - `max_write_back_depth = 0` → clamped to 1

use std::time::Duration;

/// Configuration for one data provider.
///
/// ## Field semantics
/// - `name`: provider name attached to every event and log line
/// - `timeout`: per-fetch timeout for reads and write-backs (`0s` = none)
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `max_write_back_depth`: longest allowed write-back chain (min 1)
///
/// ## Notes
/// All fields are public. Prefer the helper accessors to avoid sprinkling sentinel
/// checks across the codebase.
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    /// Name used in events and logs.
    pub name: String,

    /// Per-fetch timeout.
    ///
    /// - `Duration::ZERO` = no timeout
    /// - `> 0` = a fetch still running after this long fails with `FetchError::Timeout`
    pub timeout: Duration,

    /// Capacity of the event bus broadcast channel.
    ///
    /// Receivers lagging behind by more than `bus_capacity` events skip the oldest ones.
    pub bus_capacity: usize,

    /// Maximum write-back chain depth.
    ///
    /// A write-back fired from an invalidation raised inside another write-back runs one
    /// level deeper. A fire that would exceed this depth is suppressed and reported
    /// as `WriteBackSuppressed`.
    pub max_write_back_depth: u32,
}

impl ProviderConfig {
    /// Default configuration with a custom name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns the per-fetch timeout as an `Option`.
    ///
    /// - `None` → no timeout
    /// - `Some(d)` → timeout applied to every fetch
    #[inline]
    pub fn fetch_timeout(&self) -> Option<Duration> {
        if self.timeout == Duration::ZERO {
            None
        } else {
            Some(self.timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the write-back depth limit clamped to a minimum of 1.
    #[inline]
    pub fn write_back_depth_limit(&self) -> u32 {
        self.max_write_back_depth.max(1)
    }
}

impl Default for ProviderConfig {
    /// Default configuration:
    ///
    /// - `name = "provider"`
    /// - `timeout = 0s` (no timeout)
    /// - `bus_capacity = 1024`
    /// - `max_write_back_depth = 8`
    fn default() -> Self {
        Self {
            name: "provider".to_string(),
            timeout: Duration::from_secs(0),
            bus_capacity: 1024,
            max_write_back_depth: 8,
        }
    }
}

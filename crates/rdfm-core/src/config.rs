//! Configuration for the update poller

use std::time::Duration;

use crate::error::CoreError;

/// Poller timing configuration
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Wait between update-check cycles
    pub poll_interval: Duration,
    /// Deadline for a single check or authentication attempt
    pub call_timeout: Duration,
    /// Capacity of the poller event broadcast channel
    pub event_channel_capacity: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(300),
            call_timeout: Duration::from_secs(60),
            event_channel_capacity: 64,
        }
    }
}

impl PollerConfig {
    /// Config with the given poll interval and default deadlines
    #[must_use]
    pub fn with_interval(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            ..Self::default()
        }
    }

    /// Check that every duration and capacity is usable
    ///
    /// # Errors
    /// Returns `ConfigError` for a zero interval, zero deadline or zero capacity.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.poll_interval.is_zero() {
            return Err(CoreError::ConfigError(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if self.call_timeout.is_zero() {
            return Err(CoreError::ConfigError(
                "call timeout must be greater than zero".to_string(),
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(CoreError::ConfigError(
                "event channel capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

//! # Controller Configuration
//!
//! Timing parameters for the playback controller and buffering parameters for
//! stream bridges.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Playback controller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Requested tick interval in milliseconds.
    ///
    /// Values `<= 0` select [`min_tick_interval_ms`](Self::min_tick_interval_ms).
    ///
    /// Default: 0.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: i32,

    /// Effective interval used when the requested interval is `<= 0`.
    ///
    /// Default: 50 ms.
    #[serde(default = "default_min_tick_interval_ms")]
    pub min_tick_interval_ms: u32,

    /// Time before the end at which `PrefinishMarkReached` fires.
    ///
    /// Default: 0 (disabled).
    #[serde(default = "default_prefinish_mark_ms")]
    pub prefinish_mark_ms: i64,

    /// Crossfade/gap between sources, reported back to the host unchanged.
    ///
    /// Default: 0.
    #[serde(default = "default_transition_time_ms")]
    pub transition_time_ms: i32,

    /// Upper bound for the about-to-finish handshake.
    ///
    /// Default: 2000 ms.
    #[serde(default = "default_about_to_finish_timeout_ms")]
    pub about_to_finish_timeout_ms: u64,

    /// Capacity of the event bus created by [`Self::event_bus`].
    ///
    /// Default: 100.
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            min_tick_interval_ms: default_min_tick_interval_ms(),
            prefinish_mark_ms: default_prefinish_mark_ms(),
            transition_time_ms: default_transition_time_ms(),
            about_to_finish_timeout_ms: default_about_to_finish_timeout_ms(),
            event_buffer_size: default_event_buffer_size(),
        }
    }
}

impl ControllerConfig {
    /// Configuration for queue-driven gapless playback.
    ///
    /// Prefinish notifications two seconds before the end, no transition gap.
    pub fn gapless() -> Self {
        Self {
            prefinish_mark_ms: 2000,
            transition_time_ms: 0,
            ..Default::default()
        }
    }

    /// Configuration for UIs that animate a position slider.
    pub fn low_latency_ticks() -> Self {
        Self {
            tick_interval_ms: 16,
            min_tick_interval_ms: 16,
            event_buffer_size: 512,
            ..Default::default()
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_tick_interval_ms == 0 {
            return Err("min_tick_interval_ms must be > 0".to_string());
        }

        if self.prefinish_mark_ms < 0 {
            return Err("prefinish_mark_ms cannot be negative".to_string());
        }

        if self.about_to_finish_timeout_ms == 0 {
            return Err("about_to_finish_timeout_ms must be > 0".to_string());
        }

        if self.event_buffer_size == 0 {
            return Err("event_buffer_size must be > 0".to_string());
        }

        Ok(())
    }

    /// Tick period actually used for a requested interval.
    pub fn effective_tick_interval(&self, requested_ms: i32) -> Duration {
        if requested_ms <= 0 {
            Duration::from_millis(self.min_tick_interval_ms as u64)
        } else {
            Duration::from_millis(requested_ms as u64)
        }
    }

    pub fn about_to_finish_timeout(&self) -> Duration {
        Duration::from_millis(self.about_to_finish_timeout_ms)
    }

    /// Creates an event bus sized for this configuration.
    pub fn event_bus(&self) -> core_runtime::EventBus {
        core_runtime::EventBus::new(self.event_buffer_size)
    }
}

/// Stream bridge configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamBridgeConfig {
    /// Buffered bytes at which the producer is told it may pause.
    ///
    /// Default: 0 (any buffered data counts as enough).
    #[serde(default)]
    pub enough_data_bytes: usize,

    /// Bound for one wait cycle inside `read`.
    ///
    /// Default: `None` (wait until woken by a write, seek or end of data).
    #[serde(default)]
    pub read_wait_timeout_ms: Option<u64>,
}

impl StreamBridgeConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.read_wait_timeout_ms == Some(0) {
            return Err("read_wait_timeout_ms must be > 0 when set".to_string());
        }
        Ok(())
    }

    pub fn read_wait_timeout(&self) -> Option<Duration> {
        self.read_wait_timeout_ms.map(Duration::from_millis)
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_tick_interval_ms() -> i32 {
    0
}

fn default_min_tick_interval_ms() -> u32 {
    50
}

fn default_prefinish_mark_ms() -> i64 {
    0
}

fn default_transition_time_ms() -> i32 {
    0
}

fn default_about_to_finish_timeout_ms() -> u64 {
    2000
}

fn default_event_buffer_size() -> usize {
    core_runtime::events::DEFAULT_EVENT_BUFFER_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ControllerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.prefinish_mark_ms, 0);
        assert_eq!(config.about_to_finish_timeout(), Duration::from_secs(2));
        assert_eq!(config.effective_tick_interval(0), Duration::from_millis(50));
    }

    #[test]
    fn test_effective_tick_interval() {
        let config = ControllerConfig::default();
        assert_eq!(config.effective_tick_interval(-5), Duration::from_millis(50));
        assert_eq!(config.effective_tick_interval(250), Duration::from_millis(250));
    }

    #[test]
    fn test_presets() {
        let gapless = ControllerConfig::gapless();
        assert!(gapless.validate().is_ok());
        assert_eq!(gapless.prefinish_mark_ms, 2000);

        let ticks = ControllerConfig::low_latency_ticks();
        assert!(ticks.validate().is_ok());
        assert!(
            ticks.effective_tick_interval(ticks.tick_interval_ms)
                < ControllerConfig::default().effective_tick_interval(0)
        );
    }

    #[test]
    fn test_config_validation() {
        let mut config = ControllerConfig::default();

        config.min_tick_interval_ms = 0;
        assert!(config.validate().is_err());
        config.min_tick_interval_ms = 50;

        config.prefinish_mark_ms = -1;
        assert!(config.validate().is_err());
        config.prefinish_mark_ms = 0;

        config.about_to_finish_timeout_ms = 0;
        assert!(config.validate().is_err());
        config.about_to_finish_timeout_ms = 2000;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_serde_defaults_fill_missing_fields() {
        let config: ControllerConfig =
            serde_json::from_str(r#"{ "prefinish_mark_ms": 1500 }"#).unwrap();
        assert_eq!(config.prefinish_mark_ms, 1500);
        assert_eq!(config.min_tick_interval_ms, 50);
        assert_eq!(config.event_buffer_size, 100);

        let bridge: StreamBridgeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(bridge, StreamBridgeConfig::default());
    }

    #[test]
    fn test_bridge_config_validation() {
        let mut config = StreamBridgeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.read_wait_timeout(), None);

        config.read_wait_timeout_ms = Some(0);
        assert!(config.validate().is_err());

        config.read_wait_timeout_ms = Some(25);
        assert_eq!(config.read_wait_timeout(), Some(Duration::from_millis(25)));
    }
}

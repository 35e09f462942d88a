//! Monitor configuration.

use std::time::Duration;

/// Configuration applied to every monitor a manager creates.
///
/// # Example
///
/// ```rust
/// use imagewatch_sdk::MonitorConfig;
/// use std::time::Duration;
///
/// let config = MonitorConfig::default()
///     .with_debug(true)
///     .with_retention(Duration::from_secs(60));
///
/// assert!(config.enabled);
/// assert!(config.collect_vitals);
/// ```
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Master switch. When false, marks, measures, and custom metrics are
    /// all no-ops.
    pub enabled: bool,

    /// Whether to accept passively observed vitals.
    pub collect_vitals: bool,

    /// Emit diagnostic logging for every recorded mark and measure.
    pub debug: bool,

    /// How long an ended monitor is retained before the manager's cleanup
    /// path may evict it.
    pub retention: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            collect_vitals: true,
            debug: false,
            retention: Duration::from_secs(300),
        }
    }
}

impl MonitorConfig {
    /// Enable or disable all recording.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Enable or disable passive vitals collection.
    pub fn with_collect_vitals(mut self, collect: bool) -> Self {
        self.collect_vitals = collect;
        self
    }

    /// Enable or disable diagnostic logging.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set the retention window for ended monitors.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }
}

//! Runtime configuration.
//!
//! Injected at construction; the library installs no globals and reads no
//! environment.

use std::time::Duration;

use meridian_journal::RecordOptions;
use meridian_wire::Encoding;

/// Configuration for one room executor
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Interval between ticks, the only time-driven mutation path
    pub tick_interval: Duration,
    /// Destroy the room after this long with no viewers, `None` never
    pub idle_timeout: Option<Duration>,
    /// Narrow sync cycles to dirty fields; off means full scans
    pub dirty_tracking: bool,
    /// Encoding for sessions that do not negotiate one
    pub default_encoding: Encoding,
    /// Frame recording, `None` disables the journal
    pub record: Option<RecordOptions>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            idle_timeout: None,
            dirty_tracking: true,
            default_encoding: Encoding::Packed,
            record: None,
        }
    }
}

impl RuntimeConfig {
    /// Set the tick interval
    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the idle timeout
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Enable or disable dirty tracking
    #[must_use]
    pub fn with_dirty_tracking(mut self, enabled: bool) -> Self {
        self.dirty_tracking = enabled;
        self
    }

    /// Set the default encoding
    #[must_use]
    pub fn with_default_encoding(mut self, encoding: Encoding) -> Self {
        self.default_encoding = encoding;
        self
    }

    /// Enable frame recording
    #[must_use]
    pub fn with_recording(mut self, options: RecordOptions) -> Self {
        self.record = Some(options);
        self
    }
}

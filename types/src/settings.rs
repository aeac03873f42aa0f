//! Recognized runtime configuration constants.
//!
//! Every service takes its timing constants from here instead of hardcoding
//! them, so tests and embedding applications can tighten or loosen the
//! windows without touching service code.

use std::time::Duration;

/// Timing and layout constants shared by the runtime services.
///
/// `Default` yields the recognized defaults; construct-and-override for
/// anything else. There is no global instance - whoever owns the session
/// builds one and hands it to each service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    /// How long a succeeded task stays visible before auto-removal.
    pub success_grace: Duration,
    /// How long a failed task stays visible. Longer than success so the
    /// user has time to read the error.
    pub failure_grace: Duration,
    /// How long a cancelled task stays visible.
    pub cancel_grace: Duration,
    /// Validity window for memoized lookups.
    pub cache_ttl: Duration,
    /// Assumed width of the synthetic row-action column, used only for
    /// fixed-column left-offset math.
    pub action_column_width: u32,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            success_grace: Duration::from_secs(5),
            failure_grace: Duration::from_secs(10),
            cancel_grace: Duration::from_secs(2),
            cache_ttl: Duration::from_secs(300),
            action_column_width: 150,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_recognized_constants() {
        let settings = RuntimeSettings::default();
        assert_eq!(settings.success_grace, Duration::from_millis(5_000));
        assert_eq!(settings.failure_grace, Duration::from_millis(10_000));
        assert_eq!(settings.cancel_grace, Duration::from_millis(2_000));
        assert_eq!(settings.cache_ttl, Duration::from_millis(300_000));
        assert_eq!(settings.action_column_width, 150);
    }
}

//! Editor configuration.
//!
//! The default session length used by the day editor is a fixed domain
//! constant. It is surfaced as configuration so that clubs with a different
//! canonical session can override it, but it is never negotiated with the
//! server.

use crate::models::Period;

/// Settings consumed by the day editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorConfig {
    /// Period given to newly added entries, and the value the add-time
    /// restore heuristic matches against.
    pub default_period: Period,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_period: Period::DEFAULT,
        }
    }
}

impl EditorConfig {
    /// Config with a custom default period
    #[must_use]
    pub const fn with_default_period(mut self, period: Period) -> Self {
        self.default_period = period;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_period_is_one_session() {
        assert_eq!(EditorConfig::default().default_period.hours(), 1.5);
    }

    #[test]
    fn test_with_default_period_overrides_only_the_period() {
        let period = Period::from_hours(2.0).unwrap();
        let config = EditorConfig::default().with_default_period(period);
        assert_eq!(config.default_period, period);
    }
}

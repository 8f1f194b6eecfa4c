//! Scheduler configuration, typically parsed from TOML.
//!
//! Values are bounded so every derived `Duration` can be added to a current
//! timestamp. Accessors clamp to the bound; [`SchedulerConfig::validate`]
//! reports a value past it.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One day.
pub const MAX_EXECUTION_LIMIT_SECS: u64 = 86_400;
/// One year.
pub const MAX_DELAY_MINS: u32 = 525_600;
/// One year.
pub const MAX_DELAY_HOURS: u32 = 8_760;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Wall-clock budget of one `process()` pass, in seconds.
    #[serde(default = "default_execution_limit")]
    pub execution_limit_secs: u64,
    /// Delay before re-checking a subscriber whose segment membership is inactive.
    #[serde(default = "default_reschedule_backoff")]
    pub reschedule_backoff_mins: u32,
    /// Bounce tasks due later than this are pulled in after a standard send.
    #[serde(default = "default_bounce_max_delay")]
    pub bounce_max_delay_hours: u32,
    #[serde(default = "default_bounce_target_delay")]
    pub bounce_target_delay_hours: u32,
    /// Random spread applied around the target delay, both directions.
    #[serde(default = "default_bounce_jitter")]
    pub bounce_jitter_hours: u32,
}

fn default_execution_limit() -> u64 {
    20
}

fn default_reschedule_backoff() -> u32 {
    5
}

fn default_bounce_max_delay() -> u32 {
    42
}

fn default_bounce_target_delay() -> u32 {
    36
}

fn default_bounce_jitter() -> u32 {
    6
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            execution_limit_secs: default_execution_limit(),
            reschedule_backoff_mins: default_reschedule_backoff(),
            bounce_max_delay_hours: default_bounce_max_delay(),
            bounce_target_delay_hours: default_bounce_target_delay(),
            bounce_jitter_hours: default_bounce_jitter(),
        }
    }
}

pub(crate) fn check_range(field: &'static str, value: u64, max: u64) -> Result<(), ConfigError> {
    if value > max {
        return Err(ConfigError::OutOfRange { field, value, max });
    }
    Ok(())
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "execution_limit_secs",
            self.execution_limit_secs,
            MAX_EXECUTION_LIMIT_SECS,
        )?;
        check_range(
            "reschedule_backoff_mins",
            self.reschedule_backoff_mins.into(),
            MAX_DELAY_MINS.into(),
        )?;
        for (field, value) in [
            ("bounce_max_delay_hours", self.bounce_max_delay_hours),
            ("bounce_target_delay_hours", self.bounce_target_delay_hours),
            ("bounce_jitter_hours", self.bounce_jitter_hours),
        ] {
            check_range(field, value.into(), MAX_DELAY_HOURS.into())?;
        }
        Ok(())
    }

    pub fn execution_limit(&self) -> Duration {
        let secs = self.execution_limit_secs.min(MAX_EXECUTION_LIMIT_SECS);
        Duration::seconds(secs as i64)
    }

    pub fn reschedule_backoff(&self) -> Duration {
        Duration::minutes(self.reschedule_backoff_mins.min(MAX_DELAY_MINS).into())
    }

    pub fn bounce_max_delay(&self) -> Duration {
        Duration::hours(self.bounce_max_delay_hours.min(MAX_DELAY_HOURS).into())
    }

    pub fn bounce_target_delay(&self) -> Duration {
        Duration::hours(self.bounce_target_delay_hours.min(MAX_DELAY_HOURS).into())
    }

    pub fn bounce_jitter(&self) -> Duration {
        Duration::hours(self.bounce_jitter_hours.min(MAX_DELAY_HOURS).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SchedulerConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.execution_limit(), Duration::seconds(20));
        assert_eq!(config.bounce_max_delay(), Duration::hours(42));
    }

    #[test]
    fn oversized_values_are_rejected_and_clamped() {
        let config = SchedulerConfig {
            execution_limit_secs: u64::MAX,
            bounce_jitter_hours: u32::MAX,
            ..SchedulerConfig::default()
        };

        assert_eq!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "execution_limit_secs",
                value: u64::MAX,
                max: MAX_EXECUTION_LIMIT_SECS,
            })
        );
        assert_eq!(config.execution_limit(), Duration::days(1));
        assert_eq!(config.bounce_jitter(), Duration::hours(8_760));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: SchedulerConfig =
            serde_json::from_str(r#"{"bounce_jitter_hours": 9000}"#).unwrap();
        assert_eq!(config.execution_limit_secs, 20);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { field: "bounce_jitter_hours", .. })
        ));
    }
}

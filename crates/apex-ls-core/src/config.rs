//! Settings decoded from the client's initialization options.
//!
//! Every field has a default, so `{}` is a valid configuration.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::Priority;
use crate::queue::RetryPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("settings json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("reading settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Per-lane numbers. The Immediate lane never queues, so it has no entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaneValues {
    pub high: usize,
    pub normal: usize,
    pub low: usize,
}

impl LaneValues {
    /// Value for `priority`; `None` for Immediate.
    pub fn get(&self, priority: Priority) -> Option<usize> {
        match priority {
            Priority::Immediate => None,
            Priority::High => Some(self.high),
            Priority::Normal => Some(self.normal),
            Priority::Low => Some(self.low),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrySettings {
    pub base_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            base_delay_ms: 100,
            multiplier: 2.0,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_millis(self.base_delay_ms),
            multiplier: self.multiplier,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerSettings {
    pub queue_capacity: LaneValues,
    pub max_concurrency: LaneValues,
    /// A lane worker pauses `yield_delay_ms` after every `yield_interval`-th
    /// claimed task. 0 disables yielding.
    pub yield_interval: u64,
    pub yield_delay_ms: u64,
    pub background_ready: bool,
    pub retry: RetrySettings,
    /// 0 disables `apex/queueStateChanged` pushes.
    pub queue_state_notification_interval_ms: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            queue_capacity: LaneValues {
                high: 200,
                normal: 500,
                low: 200,
            },
            max_concurrency: LaneValues {
                high: 4,
                normal: 8,
                low: 2,
            },
            yield_interval: 50,
            yield_delay_ms: 1,
            background_ready: true,
            retry: RetrySettings::default(),
            queue_state_notification_interval_ms: 1000,
        }
    }
}

impl SchedulerSettings {
    pub fn yield_delay(&self) -> Duration {
        Duration::from_millis(self.yield_delay_ms)
    }

    pub fn notification_interval(&self) -> Option<Duration> {
        (self.queue_state_notification_interval_ms > 0)
            .then(|| Duration::from_millis(self.queue_state_notification_interval_ms))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for lane in Priority::QUEUED {
            if self.queue_capacity.get(lane) == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "queueCapacity.{lane} must be greater than 0"
                )));
            }
            if self.max_concurrency.get(lane) == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "maxConcurrency.{lane} must be greater than 0"
                )));
            }
        }
        // NaN fails every comparison, so test for the accepted range.
        let multiplier = self.retry.multiplier;
        if !(multiplier.is_finite() && multiplier >= 1.0) {
            return Err(ConfigError::Invalid(
                "retry.multiplier must be a finite number of at least 1.0".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FindMissingArtifactSettings {
    pub enabled: bool,
    pub blocking_timeout_ms: u64,
    pub background_timeout_ms: u64,
    pub max_retries: u32,
}

impl Default for FindMissingArtifactSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            blocking_timeout_ms: 2000,
            background_timeout_ms: 10_000,
            max_retries: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationSettings {
    pub max_parameters: usize,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self { max_parameters: 32 }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub scheduler: SchedulerSettings,
    pub find_missing_artifact: FindMissingArtifactSettings,
    pub validation: ValidationSettings,
}

impl Settings {
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_value(value)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_value(serde_json::from_str(&raw)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scheduler.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_object_gives_defaults() {
        let s = Settings::from_value(json!({})).unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.scheduler.queue_capacity.get(Priority::High), Some(200));
        assert_eq!(s.scheduler.queue_capacity.get(Priority::Normal), Some(500));
        assert_eq!(s.scheduler.queue_capacity.get(Priority::Low), Some(200));
        assert_eq!(s.scheduler.queue_capacity.get(Priority::Immediate), None);
        assert!(s.find_missing_artifact.enabled);
    }

    #[test]
    fn partial_override() {
        let s = Settings::from_value(json!({
            "scheduler": { "maxConcurrency": { "high": 1, "normal": 1, "low": 1 }, "yieldInterval": 0 },
            "findMissingArtifact": { "enabled": false }
        }))
        .unwrap();
        assert_eq!(s.scheduler.max_concurrency.get(Priority::Low), Some(1));
        assert_eq!(s.scheduler.yield_interval, 0);
        assert_eq!(s.scheduler.queue_capacity.normal, 500);
        assert!(!s.find_missing_artifact.enabled);
        assert_eq!(s.find_missing_artifact.blocking_timeout_ms, 2000);
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let err = Settings::from_value(json!({
            "scheduler": { "maxConcurrency": { "high": 0, "normal": 1, "low": 1 } }
        }))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("maxConcurrency.high")));
    }

    #[rstest::rstest]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    #[case(0.5)]
    fn out_of_range_multiplier_is_rejected(#[case] multiplier: f64) {
        let mut s = SchedulerSettings::default();
        s.retry.multiplier = multiplier;
        assert!(matches!(s.validate(), Err(ConfigError::Invalid(msg)) if msg.contains("retry.multiplier")));
    }

    #[test]
    fn notification_interval_zero_disables() {
        let mut s = SchedulerSettings::default();
        assert_eq!(s.notification_interval(), Some(Duration::from_secs(1)));
        s.queue_state_notification_interval_ms = 0;
        assert_eq!(s.notification_interval(), None);
    }
}

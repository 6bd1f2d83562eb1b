//! Process-wide configuration for the rule
//!
//! Built once at startup and injected into the dispatcher. The evaluation
//! pipeline never reads the environment itself.

use crate::contracts::{RuleParameters, MINIMUM_RETENTION_PARAMETER, MONITORED_RESOURCE_TYPE};
use crate::engine::RetentionThreshold;
use crate::error::{MonitorError, Result};

/// Largest number of evaluations `PutEvaluations` accepts per call
pub const MAX_BATCH_SIZE: usize = 100;

/// Configuration for the Log Retention Monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Minimum retention in days when the rule sets no `MinimumRetentionDays`
    pub default_retention_days: u32,
    /// Resource type the rule evaluates
    pub resource_type: String,
    /// Evaluations per `PutEvaluations` call
    pub batch_size: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            default_retention_days: 1,
            resource_type: MONITORED_RESOURCE_TYPE.to_string(),
            batch_size: MAX_BATCH_SIZE,
        }
    }
}

impl MonitorConfig {
    pub fn with_default_retention_days(mut self, days: u32) -> Self {
        self.default_retention_days = days;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Check the values a misconfigured deployment could get wrong
    pub fn validate(&self) -> Result<()> {
        if self.default_retention_days == 0 {
            return Err(MonitorError::configuration(
                "default retention days must be positive",
            ));
        }
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(MonitorError::configuration(format!(
                "batch size must be between 1 and {}, got {}",
                MAX_BATCH_SIZE, self.batch_size
            )));
        }
        Ok(())
    }

    /// Threshold for one invocation.
    ///
    /// `MinimumRetentionDays` on the rule always takes priority over the
    /// process default. A parameter that is not a positive integer is an
    /// error rather than a silent fallback.
    pub fn resolve_threshold(&self, parameters: &RuleParameters) -> Result<RetentionThreshold> {
        let Some(value) = &parameters.minimum_retention_days else {
            return RetentionThreshold::new(self.default_retention_days).ok_or_else(|| {
                MonitorError::configuration("default retention days must be positive")
            });
        };

        value
            .as_i64()
            .and_then(|days| u32::try_from(days).ok())
            .and_then(RetentionThreshold::new)
            .ok_or_else(|| {
                MonitorError::invalid_parameter(
                    MINIMUM_RETENTION_PARAMETER,
                    format!("expected a positive number of days, got {:?}", value.to_string()),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::ParameterValue;

    #[test]
    fn test_default_config() {
        let config = MonitorConfig::default();
        assert_eq!(config.default_retention_days, 1);
        assert_eq!(config.resource_type, "AWS::Logs::LogGroup");
        assert_eq!(config.batch_size, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(MonitorConfig::default()
            .with_default_retention_days(0)
            .validate()
            .is_err());
        assert!(MonitorConfig::default().with_batch_size(0).validate().is_err());
        assert!(MonitorConfig::default().with_batch_size(101).validate().is_err());
        assert!(MonitorConfig::default().with_batch_size(25).validate().is_ok());
    }

    #[test]
    fn test_rule_parameter_takes_priority() {
        let config = MonitorConfig::default().with_default_retention_days(14);

        let threshold = config
            .resolve_threshold(&RuleParameters::with_minimum_retention_days("30"))
            .unwrap();
        assert_eq!(threshold.days(), 30);

        let threshold = config
            .resolve_threshold(&RuleParameters {
                minimum_retention_days: Some(ParameterValue::Number(7)),
            })
            .unwrap();
        assert_eq!(threshold.days(), 7);
    }

    #[test]
    fn test_default_applies_without_parameter() {
        let config = MonitorConfig::default().with_default_retention_days(14);
        let threshold = config.resolve_threshold(&RuleParameters::default()).unwrap();
        assert_eq!(threshold.days(), 14);
    }

    #[test]
    fn test_invalid_parameter_values() {
        let config = MonitorConfig::default();
        for raw in ["0", "-5", "thirty", ""] {
            let err = config
                .resolve_threshold(&RuleParameters::with_minimum_retention_days(raw))
                .unwrap_err();
            assert!(
                matches!(err, MonitorError::InvalidParameter { .. }),
                "{:?} should be rejected",
                raw
            );
        }
    }
}

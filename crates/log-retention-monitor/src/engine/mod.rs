//! Retention compliance engine
//!
//! Deterministic evaluation of log group retention against a minimum
//! number of days. Nothing in this module performs I/O except the
//! inventory sweep, which reads through the collaborator traits.

mod sweep;

pub use sweep::*;

use std::fmt;

use crate::contracts::{ComplianceType, ConfigurationItem, EvaluationRecord, OrderingTimestamp};
use crate::error::{MonitorError, Result};

/// Minimum number of days a log group must retain its events
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RetentionThreshold(u32);

impl RetentionThreshold {
    /// Returns None for zero, which would make every log group compliant
    pub fn new(days: u32) -> Option<Self> {
        (days > 0).then_some(Self(days))
    }

    pub fn days(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for RetentionThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} days", self.0)
    }
}

/// Outcome of comparing a log group's retention with the threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionFinding {
    /// No retention set: events are kept forever
    Unlimited,
    /// Retention shorter than the threshold
    BelowMinimum { retention_days: u32 },
    /// Retention equal to or longer than the threshold
    MeetsMinimum { retention_days: u32 },
}

impl RetentionFinding {
    /// Compare a retention value with the threshold
    pub fn assess(retention_days: Option<u32>, threshold: RetentionThreshold) -> Self {
        match retention_days {
            None => RetentionFinding::Unlimited,
            Some(days) if days < threshold.days() => RetentionFinding::BelowMinimum {
                retention_days: days,
            },
            Some(days) => RetentionFinding::MeetsMinimum {
                retention_days: days,
            },
        }
    }

    pub fn compliance_type(&self) -> ComplianceType {
        match self {
            RetentionFinding::Unlimited | RetentionFinding::BelowMinimum { .. } => {
                ComplianceType::NonCompliant
            }
            RetentionFinding::MeetsMinimum { .. } => ComplianceType::Compliant,
        }
    }

    /// Human-readable reason reported alongside the verdict
    pub fn annotation(&self, log_group_name: &str, threshold: RetentionThreshold) -> String {
        let required = threshold.days();
        match self {
            RetentionFinding::Unlimited => format!(
                "Log group '{}' has infinite retention (null). Minimum required: {} days.",
                log_group_name, required
            ),
            RetentionFinding::BelowMinimum { retention_days } => format!(
                "Log group '{}' has {} days retention. Minimum required: {} days.",
                log_group_name, retention_days, required
            ),
            RetentionFinding::MeetsMinimum { retention_days } => format!(
                "Log group '{}' has {} days retention, meets minimum requirement of {} days.",
                log_group_name, retention_days, required
            ),
        }
    }
}

/// Verdict for a retention value
pub fn determine_compliance(
    retention_days: Option<u32>,
    threshold: RetentionThreshold,
) -> ComplianceType {
    RetentionFinding::assess(retention_days, threshold).compliance_type()
}

/// Evaluate one log group's retention into a record
pub fn evaluate_retention(
    resource_type: &str,
    log_group_name: &str,
    retention_days: Option<u32>,
    threshold: RetentionThreshold,
    ordering_timestamp: OrderingTimestamp,
) -> EvaluationRecord {
    let finding = RetentionFinding::assess(retention_days, threshold);
    EvaluationRecord::new(
        resource_type,
        log_group_name,
        finding.compliance_type(),
        finding.annotation(log_group_name, threshold),
        ordering_timestamp,
    )
}

/// Recording status of a configuration item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStatus {
    Normal,
    Deleted,
    DeletedNotRecorded,
}

impl ResourceStatus {
    pub fn from_configuration_item_status(status: Option<&str>) -> Self {
        match status {
            Some("ResourceDeleted") => ResourceStatus::Deleted,
            Some("ResourceDeletedNotRecorded") => ResourceStatus::DeletedNotRecorded,
            _ => ResourceStatus::Normal,
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(
            self,
            ResourceStatus::Deleted | ResourceStatus::DeletedNotRecorded
        )
    }
}

/// Point-in-time view of one log group, taken from a configuration item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSnapshot {
    pub resource_id: String,
    pub resource_type: String,
    pub retention_in_days: Option<u32>,
    pub capture_time: OrderingTimestamp,
    pub status: ResourceStatus,
    pub left_scope: bool,
}

impl ResourceSnapshot {
    /// Build a snapshot from a configuration item.
    ///
    /// The capture time becomes the ordering timestamp of the evaluation, so
    /// an item without one is rejected rather than stamped with the clock.
    /// Retention of a deleted resource is never read.
    pub fn from_configuration_item(item: ConfigurationItem, event_left_scope: bool) -> Result<Self> {
        let capture_time = item
            .configuration_item_capture_time
            .ok_or_else(|| {
                MonitorError::missing_field(&item.resource_id, "configurationItemCaptureTime")
            })?;
        let status =
            ResourceStatus::from_configuration_item_status(item.configuration_item_status.as_deref());

        let retention_in_days = match item.configuration {
            Some(configuration) if !status.is_deleted() => configuration
                .retention_in_days
                .map(|days| {
                    u32::try_from(days).map_err(|_| {
                        MonitorError::invalid_field(
                            &item.resource_id,
                            "retentionInDays",
                            format!("{} is not a number of days", days),
                        )
                    })
                })
                .transpose()?,
            _ => None,
        };

        Ok(Self {
            status,
            left_scope: event_left_scope || item.event_left_scope.unwrap_or(false),
            resource_id: item.resource_id,
            resource_type: item.resource_type,
            retention_in_days,
            capture_time,
        })
    }
}

/// Evaluate a single configuration snapshot.
///
/// Deleted and out-of-scope resources are NOT_APPLICABLE whatever their
/// retention; everything else is judged on retention.
pub fn evaluate_snapshot(snapshot: &ResourceSnapshot, threshold: RetentionThreshold) -> EvaluationRecord {
    if snapshot.status.is_deleted() {
        return EvaluationRecord::not_applicable(
            &snapshot.resource_type,
            &snapshot.resource_id,
            format!("Log group '{}' has been deleted.", snapshot.resource_id),
            snapshot.capture_time.clone(),
        );
    }

    if snapshot.left_scope {
        return EvaluationRecord::not_applicable(
            &snapshot.resource_type,
            &snapshot.resource_id,
            format!(
                "Log group '{}' is out of scope of this rule.",
                snapshot.resource_id
            ),
            snapshot.capture_time.clone(),
        );
    }

    evaluate_retention(
        &snapshot.resource_type,
        &snapshot.resource_id,
        snapshot.retention_in_days,
        threshold,
        snapshot.capture_time.clone(),
    )
}

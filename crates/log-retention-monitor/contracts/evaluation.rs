//! Evaluation records reported to the compliance registry

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Compliance verdict for a single resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceType {
    Compliant,
    NonCompliant,
    NotApplicable,
}

impl ComplianceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceType::Compliant => "COMPLIANT",
            ComplianceType::NonCompliant => "NON_COMPLIANT",
            ComplianceType::NotApplicable => "NOT_APPLICABLE",
        }
    }
}

impl fmt::Display for ComplianceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timestamp the registry uses to discard out-of-order evaluations.
///
/// AWS Config hands timestamps to the rule as ISO-8601 text, while
/// timestamps read back from the Config API or taken from the clock are
/// structured values. Both forms are kept as received; the text form is
/// produced only when the record is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderingTimestamp {
    /// ISO-8601 text exactly as AWS Config supplied it
    Text(String),
    /// Structured UTC date-time
    Structured(DateTime<Utc>),
}

impl OrderingTimestamp {
    /// Current time, used when no capture time applies
    pub fn now() -> Self {
        OrderingTimestamp::Structured(Utc::now())
    }

    /// ISO-8601 form sent to the registry
    pub fn to_iso8601(&self) -> String {
        match self {
            OrderingTimestamp::Text(text) => text.clone(),
            OrderingTimestamp::Structured(at) => at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        }
    }
}

impl From<DateTime<Utc>> for OrderingTimestamp {
    fn from(at: DateTime<Utc>) -> Self {
        OrderingTimestamp::Structured(at)
    }
}

impl From<String> for OrderingTimestamp {
    fn from(text: String) -> Self {
        OrderingTimestamp::Text(text)
    }
}

impl From<&str> for OrderingTimestamp {
    fn from(text: &str) -> Self {
        OrderingTimestamp::Text(text.to_string())
    }
}

impl fmt::Display for OrderingTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

/// One compliance evaluation produced by this rule.
///
/// Records are built once per resource per invocation and never modified
/// afterwards, so the fields are only readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRecord {
    resource_type: String,
    resource_id: String,
    compliance_type: ComplianceType,
    annotation: String,
    ordering_timestamp: OrderingTimestamp,
}

impl EvaluationRecord {
    pub fn new(
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        compliance_type: ComplianceType,
        annotation: impl Into<String>,
        ordering_timestamp: OrderingTimestamp,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            compliance_type,
            annotation: annotation.into(),
            ordering_timestamp,
        }
    }

    /// Create a NOT_APPLICABLE record
    pub fn not_applicable(
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        annotation: impl Into<String>,
        ordering_timestamp: OrderingTimestamp,
    ) -> Self {
        Self::new(
            resource_type,
            resource_id,
            ComplianceType::NotApplicable,
            annotation,
            ordering_timestamp,
        )
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn compliance_type(&self) -> ComplianceType {
        self.compliance_type
    }

    pub fn annotation(&self) -> &str {
        &self.annotation
    }

    pub fn ordering_timestamp(&self) -> &OrderingTimestamp {
        &self.ordering_timestamp
    }
}

/// Evaluation in the form submitted to `PutEvaluations`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubmittedEvaluation {
    pub compliance_resource_type: String,
    pub compliance_resource_id: String,
    pub compliance_type: ComplianceType,
    pub annotation: String,
    /// Always ISO-8601 text
    pub ordering_timestamp: String,
}

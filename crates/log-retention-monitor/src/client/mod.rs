//! Collaborator clients
//!
//! The rule talks to two services: the log group inventory (CloudWatch
//! Logs) and the compliance registry (AWS Config). Both sit behind traits so
//! the evaluation pipeline can run against the AWS SDK in Lambda and against
//! mocks in tests.

pub mod aws;

pub use aws::{AwsComplianceRegistry, CloudWatchLogsInventory};

use async_trait::async_trait;
use std::fmt;

use crate::contracts::{ConfigurationItem, ConfigurationItemSummary, SubmittedEvaluation};

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The service call itself failed
    #[error("{operation} failed: {message}")]
    Service {
        operation: &'static str,
        message: String,
    },

    /// The service answered with data the rule cannot interpret
    #[error("Malformed {operation} response: {message}")]
    Malformed {
        operation: &'static str,
        message: String,
    },
}

impl ClientError {
    pub fn service(operation: &'static str, message: impl fmt::Display) -> Self {
        ClientError::Service {
            operation,
            message: message.to_string(),
        }
    }

    pub fn malformed(operation: &'static str, message: impl fmt::Display) -> Self {
        ClientError::Malformed {
            operation,
            message: message.to_string(),
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// A log group as listed by the inventory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogGroupEntry {
    pub name: String,
    /// None when the log group never expires
    pub retention_in_days: Option<u32>,
}

impl LogGroupEntry {
    pub fn new(name: impl Into<String>, retention_in_days: Option<u32>) -> Self {
        Self {
            name: name.into(),
            retention_in_days,
        }
    }
}

/// One page of the log group listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogGroupPage {
    pub log_groups: Vec<LogGroupEntry>,
    pub next_token: Option<String>,
}

/// Identity of an evaluation previously reported for the rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorEvaluation {
    pub resource_type: String,
    pub resource_id: String,
}

impl PriorEvaluation {
    pub fn new(resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
        }
    }
}

/// One page of previously reported evaluations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorEvaluationPage {
    pub evaluations: Vec<PriorEvaluation>,
    pub next_token: Option<String>,
}

/// Result of a single `PutEvaluations` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionOutcome {
    /// Resource ids the registry refused to record
    pub failed_resource_ids: Vec<String>,
}

/// Paginated source of the current log groups
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// Fetch one page of log groups, starting after `next_token`
    async fn list_log_groups(&self, next_token: Option<String>) -> ClientResult<LogGroupPage>;
}

/// Store of evaluation results, and sink for new ones
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait ComplianceRegistry: Send + Sync {
    /// Fetch one page of the evaluations previously reported by `rule_name`
    async fn list_prior_evaluations(
        &self,
        rule_name: &str,
        next_token: Option<String>,
    ) -> ClientResult<PriorEvaluationPage>;

    /// Most recent recorded configuration item no later than the summary's
    /// capture time, or None when the history is empty
    async fn get_configuration_item(
        &self,
        summary: &ConfigurationItemSummary,
    ) -> ClientResult<Option<ConfigurationItem>>;

    /// Submit one batch of evaluations under the invocation's result token
    async fn put_evaluations(
        &self,
        evaluations: Vec<SubmittedEvaluation>,
        result_token: &str,
    ) -> ClientResult<SubmissionOutcome>;
}

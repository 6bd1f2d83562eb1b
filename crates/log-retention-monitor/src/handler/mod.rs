//! Lambda handler for the Log Retention Monitor
//!
//! Decodes the AWS Config invocation, runs either the inventory sweep or the
//! single-resource evaluation, and submits the resulting records. Evaluation
//! failures are reported as one account-scoped NOT_APPLICABLE evaluation so
//! the rule never stays silent; only a failed submission fails the
//! invocation.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::client::{AwsComplianceRegistry, CloudWatchLogsInventory, ComplianceRegistry, InventorySource};
use crate::config::MonitorConfig;
use crate::contracts::*;
use crate::engine::{evaluate_snapshot, InventoryReconciler, ResourceSnapshot};
use crate::error::{MonitorError, Result};
use crate::submission::EvaluationSubmitter;

/// Message reported in every successful response body
pub const COMPLETION_MESSAGE: &str = "Config rule evaluation completed";

/// Response returned to the Lambda runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerResponse {
    pub status_code: u16,
    /// JSON-encoded [`CompletionBody`]
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionBody {
    pub message: String,
    pub evaluations_count: usize,
}

impl HandlerResponse {
    pub fn completed(evaluations_count: usize) -> Result<Self> {
        let body = CompletionBody {
            message: COMPLETION_MESSAGE.to_string(),
            evaluations_count,
        };
        Ok(Self {
            status_code: 200,
            body: serde_json::to_string(&body)?,
        })
    }
}

/// The Config rule: collaborators plus process configuration
pub struct RetentionMonitor {
    inventory: Arc<dyn InventorySource>,
    registry: Arc<dyn ComplianceRegistry>,
    config: MonitorConfig,
}

impl RetentionMonitor {
    pub fn new(
        inventory: Arc<dyn InventorySource>,
        registry: Arc<dyn ComplianceRegistry>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            inventory,
            registry,
            config,
        }
    }

    /// Build the monitor against AWS using the default credential chain
    pub async fn from_aws(config: MonitorConfig) -> Self {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(
            Arc::new(CloudWatchLogsInventory::from_conf(&sdk_config)),
            Arc::new(AwsComplianceRegistry::from_conf(&sdk_config)),
            config,
        )
    }

    /// Evaluate, submit, and report how many evaluations were sent
    pub async fn handle(&self, invocation: ConfigRuleInvocation) -> Result<HandlerResponse> {
        let records = match self.evaluate(&invocation).await {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "Evaluation failed, reporting account-level NOT_APPLICABLE");
                vec![fallback_record(&invocation, &e)]
            }
        };

        EvaluationSubmitter::new(self.registry.as_ref())
            .with_batch_size(self.config.batch_size)
            .submit(&records, &invocation.result_token)
            .await?;

        HandlerResponse::completed(records.len())
    }

    /// Produce the evaluations for one invocation without submitting them
    pub async fn evaluate(&self, invocation: &ConfigRuleInvocation) -> Result<Vec<EvaluationRecord>> {
        let event = invocation.parse_invoking_event()?;
        info!(
            message_type = event.message_type(),
            rule = invocation.config_rule_name.as_deref().unwrap_or("-"),
            "Received Config rule invocation"
        );

        match event {
            InvokingEvent::Scheduled(notification) => {
                let threshold = self
                    .config
                    .resolve_threshold(&invocation.parse_rule_parameters()?)?;
                InventoryReconciler::new(
                    self.inventory.as_ref(),
                    self.registry.as_ref(),
                    &self.config.resource_type,
                )
                .sweep(
                    threshold,
                    invocation.config_rule_name.as_deref(),
                    &notification.notification_creation_time,
                )
                .await
            }
            InvokingEvent::ConfigurationChange(notification) => {
                match notification.configuration_item {
                    Some(item) => self.evaluate_item(item, invocation),
                    None => {
                        warn!("Change notification carries no configuration item");
                        Ok(Vec::new())
                    }
                }
            }
            InvokingEvent::OversizedConfigurationChange(notification) => {
                let summary = notification.configuration_item_summary;
                if summary.resource_type != self.config.resource_type {
                    info!(resource_type = %summary.resource_type, "Ignoring unmonitored resource type");
                    return Ok(Vec::new());
                }

                match self.registry.get_configuration_item(&summary).await? {
                    Some(item) => self.evaluate_item(item, invocation),
                    None => {
                        warn!(resource_id = %summary.resource_id, "No configuration history for oversized item");
                        Ok(Vec::new())
                    }
                }
            }
            InvokingEvent::Other { message_type } => {
                info!(message_type = %message_type, "Unsupported message type, nothing to evaluate");
                Ok(Vec::new())
            }
        }
    }

    fn evaluate_item(
        &self,
        item: ConfigurationItem,
        invocation: &ConfigRuleInvocation,
    ) -> Result<Vec<EvaluationRecord>> {
        if item.resource_type != self.config.resource_type {
            info!(resource_type = %item.resource_type, "Ignoring unmonitored resource type");
            return Ok(Vec::new());
        }

        let threshold = self
            .config
            .resolve_threshold(&invocation.parse_rule_parameters()?)?;
        let snapshot = ResourceSnapshot::from_configuration_item(item, invocation.event_left_scope)?;
        let record = evaluate_snapshot(&snapshot, threshold);
        info!(
            resource_id = %record.resource_id(),
            compliance = %record.compliance_type(),
            "Evaluated log group"
        );

        Ok(vec![record])
    }
}

/// Account-scoped NOT_APPLICABLE record reported in place of a failed evaluation
pub fn fallback_record(invocation: &ConfigRuleInvocation, error: &MonitorError) -> EvaluationRecord {
    EvaluationRecord::not_applicable(
        ACCOUNT_RESOURCE_TYPE,
        invocation.account_id.as_deref().unwrap_or("unknown"),
        format!("Error during evaluation: {}", error),
        OrderingTimestamp::now(),
    )
}

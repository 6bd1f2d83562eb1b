//! AWS SDK implementations of the collaborator traits

use async_trait::async_trait;
use aws_sdk_config::error::DisplayErrorContext;
use aws_sdk_config::primitives::{DateTime, DateTimeFormat};
use aws_sdk_config::types::{
    ComplianceType as AwsComplianceType, ConfigurationItem as HistoryItem, Evaluation,
    EvaluationResultQualifier, ResourceType,
};

use super::{
    ClientError, ClientResult, ComplianceRegistry, InventorySource, LogGroupEntry, LogGroupPage,
    PriorEvaluation, PriorEvaluationPage, SubmissionOutcome,
};
use crate::contracts::{
    ComplianceType, ConfigurationItem, ConfigurationItemSummary, LogGroupConfiguration,
    OrderingTimestamp, SubmittedEvaluation,
};

const DESCRIBE_LOG_GROUPS: &str = "DescribeLogGroups";
const GET_COMPLIANCE_DETAILS: &str = "GetComplianceDetailsByConfigRule";
const GET_RESOURCE_CONFIG_HISTORY: &str = "GetResourceConfigHistory";
const PUT_EVALUATIONS: &str = "PutEvaluations";

/// Largest page `GetComplianceDetailsByConfigRule` accepts
const COMPLIANCE_DETAILS_PAGE_SIZE: i32 = 100;

/// Log group inventory backed by CloudWatch Logs
#[derive(Debug, Clone)]
pub struct CloudWatchLogsInventory {
    client: aws_sdk_cloudwatchlogs::Client,
}

impl CloudWatchLogsInventory {
    pub fn new(client: aws_sdk_cloudwatchlogs::Client) -> Self {
        Self { client }
    }

    pub fn from_conf(sdk_config: &aws_config::SdkConfig) -> Self {
        Self::new(aws_sdk_cloudwatchlogs::Client::new(sdk_config))
    }
}

#[async_trait]
impl InventorySource for CloudWatchLogsInventory {
    async fn list_log_groups(&self, next_token: Option<String>) -> ClientResult<LogGroupPage> {
        let output = self
            .client
            .describe_log_groups()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| ClientError::service(DESCRIBE_LOG_GROUPS, DisplayErrorContext(&e)))?;

        let log_groups = output
            .log_groups()
            .iter()
            .map(|group| {
                let name = group.log_group_name().ok_or_else(|| {
                    ClientError::malformed(DESCRIBE_LOG_GROUPS, "log group without a name")
                })?;
                let retention_in_days = group
                    .retention_in_days()
                    .map(|days| {
                        u32::try_from(days).map_err(|_| {
                            ClientError::malformed(
                                DESCRIBE_LOG_GROUPS,
                                format!("log group {} has retention of {} days", name, days),
                            )
                        })
                    })
                    .transpose()?;
                Ok(LogGroupEntry::new(name, retention_in_days))
            })
            .collect::<ClientResult<Vec<_>>>()?;

        Ok(LogGroupPage {
            log_groups,
            next_token: output.next_token().map(str::to_string),
        })
    }
}

/// Compliance registry backed by AWS Config
#[derive(Debug, Clone)]
pub struct AwsComplianceRegistry {
    client: aws_sdk_config::Client,
}

impl AwsComplianceRegistry {
    pub fn new(client: aws_sdk_config::Client) -> Self {
        Self { client }
    }

    pub fn from_conf(sdk_config: &aws_config::SdkConfig) -> Self {
        Self::new(aws_sdk_config::Client::new(sdk_config))
    }
}

#[async_trait]
impl ComplianceRegistry for AwsComplianceRegistry {
    async fn list_prior_evaluations(
        &self,
        rule_name: &str,
        next_token: Option<String>,
    ) -> ClientResult<PriorEvaluationPage> {
        let output = self
            .client
            .get_compliance_details_by_config_rule()
            .config_rule_name(rule_name)
            .limit(COMPLIANCE_DETAILS_PAGE_SIZE)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| ClientError::service(GET_COMPLIANCE_DETAILS, DisplayErrorContext(&e)))?;

        let evaluations = output
            .evaluation_results()
            .iter()
            .filter_map(|result| result.evaluation_result_identifier())
            .filter_map(|identifier| identifier.evaluation_result_qualifier())
            .filter_map(prior_evaluation_from_qualifier)
            .collect();

        Ok(PriorEvaluationPage {
            evaluations,
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn get_configuration_item(
        &self,
        summary: &ConfigurationItemSummary,
    ) -> ClientResult<Option<ConfigurationItem>> {
        let later_time = to_smithy_datetime(&summary.configuration_item_capture_time)
            .map_err(|e| ClientError::malformed(GET_RESOURCE_CONFIG_HISTORY, e))?;

        let output = self
            .client
            .get_resource_config_history()
            .resource_type(ResourceType::from(summary.resource_type.as_str()))
            .resource_id(&summary.resource_id)
            .later_time(later_time)
            .limit(1)
            .send()
            .await
            .map_err(|e| ClientError::service(GET_RESOURCE_CONFIG_HISTORY, DisplayErrorContext(&e)))?;

        output
            .configuration_items()
            .first()
            .map(|item| configuration_item_from_history(item, summary))
            .transpose()
    }

    async fn put_evaluations(
        &self,
        evaluations: Vec<SubmittedEvaluation>,
        result_token: &str,
    ) -> ClientResult<SubmissionOutcome> {
        let evaluations = evaluations
            .into_iter()
            .map(to_sdk_evaluation)
            .collect::<ClientResult<Vec<_>>>()?;

        let output = self
            .client
            .put_evaluations()
            .set_evaluations(Some(evaluations))
            .result_token(result_token)
            .send()
            .await
            .map_err(|e| ClientError::service(PUT_EVALUATIONS, DisplayErrorContext(&e)))?;

        Ok(SubmissionOutcome {
            failed_resource_ids: output
                .failed_evaluations()
                .iter()
                .map(|failed| failed.compliance_resource_id().to_string())
                .collect(),
        })
    }
}

/// Identity of a previously reported evaluation; results without a resource
/// id cannot be retired and are dropped
fn prior_evaluation_from_qualifier(qualifier: &EvaluationResultQualifier) -> Option<PriorEvaluation> {
    Some(PriorEvaluation::new(
        qualifier.resource_type().unwrap_or_default(),
        qualifier.resource_id()?,
    ))
}

/// Convert a history item, falling back to the summary for identity fields
fn configuration_item_from_history(
    item: &HistoryItem,
    summary: &ConfigurationItemSummary,
) -> ClientResult<ConfigurationItem> {
    // The history API returns the configuration as a JSON document in a string
    let configuration = item
        .configuration()
        .filter(|raw| !raw.trim().is_empty() && raw.trim() != "null")
        .map(serde_json::from_str::<LogGroupConfiguration>)
        .transpose()
        .map_err(|e| ClientError::malformed(GET_RESOURCE_CONFIG_HISTORY, e))?;

    Ok(ConfigurationItem {
        resource_id: item
            .resource_id()
            .unwrap_or(summary.resource_id.as_str())
            .to_string(),
        resource_type: item
            .resource_type()
            .map(|t| t.as_str().to_string())
            .unwrap_or_else(|| summary.resource_type.clone()),
        configuration_item_capture_time: item
            .configuration_item_capture_time()
            .and_then(from_smithy_datetime),
        configuration_item_status: item
            .configuration_item_status()
            .map(|status| status.as_str().to_string()),
        configuration,
        event_left_scope: None,
    })
}

fn to_sdk_evaluation(evaluation: SubmittedEvaluation) -> ClientResult<Evaluation> {
    let ordering_timestamp =
        DateTime::from_str(&evaluation.ordering_timestamp, DateTimeFormat::DateTime).map_err(
            |e| {
                ClientError::malformed(
                    PUT_EVALUATIONS,
                    format!(
                        "ordering timestamp {:?} is not ISO-8601: {}",
                        evaluation.ordering_timestamp, e
                    ),
                )
            },
        )?;

    Evaluation::builder()
        .compliance_resource_type(evaluation.compliance_resource_type)
        .compliance_resource_id(evaluation.compliance_resource_id)
        .compliance_type(to_sdk_compliance_type(evaluation.compliance_type))
        .annotation(evaluation.annotation)
        .ordering_timestamp(ordering_timestamp)
        .build()
        .map_err(|e| ClientError::malformed(PUT_EVALUATIONS, e))
}

fn to_sdk_compliance_type(compliance_type: ComplianceType) -> AwsComplianceType {
    match compliance_type {
        ComplianceType::Compliant => AwsComplianceType::Compliant,
        ComplianceType::NonCompliant => AwsComplianceType::NonCompliant,
        ComplianceType::NotApplicable => AwsComplianceType::NotApplicable,
    }
}

fn to_smithy_datetime(timestamp: &OrderingTimestamp) -> Result<DateTime, String> {
    match timestamp {
        OrderingTimestamp::Text(text) => DateTime::from_str(text, DateTimeFormat::DateTime)
            .map_err(|e| format!("capture time {:?} is not ISO-8601: {}", text, e)),
        OrderingTimestamp::Structured(at) => Ok(DateTime::from_millis(at.timestamp_millis())),
    }
}

fn from_smithy_datetime(at: &DateTime) -> Option<OrderingTimestamp> {
    chrono::DateTime::from_timestamp(at.secs(), at.subsec_nanos()).map(OrderingTimestamp::from)
}

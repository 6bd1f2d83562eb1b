//! Invocation envelope sent by AWS Config to a custom rule

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::OrderingTimestamp;

/// Errors raised while decoding the invocation envelope
#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("invokingEvent is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("invokingEvent has no messageType")]
    MissingMessageType,

    #[error("Malformed {message_type}: {source}")]
    InvalidPayload {
        message_type: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("ruleParameters is not valid JSON: {0}")]
    InvalidRuleParameters(#[source] serde_json::Error),
}

/// Lambda payload for an AWS Config custom rule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigRuleInvocation {
    /// JSON-encoded [`InvokingEvent`]
    pub invoking_event: String,

    /// JSON-encoded rule parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_parameters: Option<String>,

    /// Token that must accompany every `PutEvaluations` call
    pub result_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_rule_name: Option<String>,

    /// Set when the resource has been removed from the rule's scope
    #[serde(default)]
    pub event_left_scope: bool,
}

impl ConfigRuleInvocation {
    /// Decode the embedded invoking event
    pub fn parse_invoking_event(&self) -> Result<InvokingEvent, EnvelopeError> {
        InvokingEvent::parse(&self.invoking_event)
    }

    /// Decode the embedded rule parameters; absent or blank means none set
    pub fn parse_rule_parameters(&self) -> Result<RuleParameters, EnvelopeError> {
        match self.rule_parameters.as_deref().map(str::trim) {
            None | Some("") => Ok(RuleParameters::default()),
            Some(raw) => serde_json::from_str(raw).map_err(EnvelopeError::InvalidRuleParameters),
        }
    }
}

/// Rule parameters configured on the Config rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleParameters {
    #[serde(
        rename = "MinimumRetentionDays",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub minimum_retention_days: Option<ParameterValue>,
}

impl RuleParameters {
    pub fn with_minimum_retention_days(days: impl Into<String>) -> Self {
        Self {
            minimum_retention_days: Some(ParameterValue::Text(days.into())),
        }
    }
}

/// Config sends parameters as strings, hand-written events often use numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Number(i64),
    Text(String),
}

impl ParameterValue {
    /// Integer value, if the parameter holds one
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParameterValue::Number(n) => Some(*n),
            ParameterValue::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl std::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterValue::Number(n) => write!(f, "{}", n),
            ParameterValue::Text(text) => f.write_str(text),
        }
    }
}

/// Message types sent by AWS Config
pub mod message_type {
    pub const SCHEDULED: &str = "ScheduledNotification";
    pub const CONFIGURATION_ITEM_CHANGE: &str = "ConfigurationItemChangeNotification";
    pub const OVERSIZED_CONFIGURATION_ITEM_CHANGE: &str =
        "OversizedConfigurationItemChangeNotification";
}

/// Decoded invoking event, discriminated by `messageType`
#[derive(Debug, Clone, PartialEq)]
pub enum InvokingEvent {
    /// Periodic trigger: evaluate every log group
    Scheduled(ScheduledNotification),
    /// A single configuration item changed
    ConfigurationChange(ConfigurationChangeNotification),
    /// A configuration item changed but was too large to embed
    OversizedConfigurationChange(OversizedChangeNotification),
    /// Any message type this rule does not handle
    Other { message_type: String },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Discriminator {
    message_type: Option<String>,
}

impl InvokingEvent {
    /// Parse the JSON-encoded invoking event
    pub fn parse(raw: &str) -> Result<Self, EnvelopeError> {
        let discriminator: Discriminator =
            serde_json::from_str(raw).map_err(EnvelopeError::InvalidJson)?;
        let kind = discriminator
            .message_type
            .ok_or(EnvelopeError::MissingMessageType)?;

        match kind.as_str() {
            message_type::SCHEDULED => decode(&kind, raw).map(InvokingEvent::Scheduled),
            message_type::CONFIGURATION_ITEM_CHANGE => {
                decode(&kind, raw).map(InvokingEvent::ConfigurationChange)
            }
            message_type::OVERSIZED_CONFIGURATION_ITEM_CHANGE => {
                decode(&kind, raw).map(InvokingEvent::OversizedConfigurationChange)
            }
            _ => Ok(InvokingEvent::Other { message_type: kind }),
        }
    }

    pub fn message_type(&self) -> &str {
        match self {
            InvokingEvent::Scheduled(_) => message_type::SCHEDULED,
            InvokingEvent::ConfigurationChange(_) => message_type::CONFIGURATION_ITEM_CHANGE,
            InvokingEvent::OversizedConfigurationChange(_) => {
                message_type::OVERSIZED_CONFIGURATION_ITEM_CHANGE
            }
            InvokingEvent::Other { message_type } => message_type,
        }
    }
}

fn decode<T: DeserializeOwned>(message_type: &str, raw: &str) -> Result<T, EnvelopeError> {
    serde_json::from_str(raw).map_err(|source| EnvelopeError::InvalidPayload {
        message_type: message_type.to_string(),
        source,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledNotification {
    /// Shared ordering timestamp for every record of the sweep
    pub notification_creation_time: OrderingTimestamp,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_account_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationChangeNotification {
    #[serde(default)]
    pub configuration_item: Option<ConfigurationItem>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_creation_time: Option<OrderingTimestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OversizedChangeNotification {
    pub configuration_item_summary: ConfigurationItemSummary,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_creation_time: Option<OrderingTimestamp>,
}

/// Identity of an oversized configuration item, used for the history lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationItemSummary {
    pub resource_type: String,
    pub resource_id: String,
    pub configuration_item_capture_time: OrderingTimestamp,
}

/// Configuration item as recorded by AWS Config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationItem {
    pub resource_id: String,
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration_item_capture_time: Option<OrderingTimestamp>,

    /// `OK`, `ResourceDiscovered`, `ResourceDeleted`, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration_item_status: Option<String>,

    /// Null for deleted resources
    #[serde(default)]
    pub configuration: Option<LogGroupConfiguration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_left_scope: Option<bool>,
}

/// The part of a log group's configuration this rule reads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogGroupConfiguration {
    /// Absent when the log group never expires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_in_days: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn invocation(invoking_event: serde_json::Value) -> ConfigRuleInvocation {
        ConfigRuleInvocation {
            invoking_event: invoking_event.to_string(),
            rule_parameters: None,
            result_token: "test-token".to_string(),
            account_id: None,
            config_rule_name: None,
            event_left_scope: false,
        }
    }

    #[test]
    fn test_parse_scheduled_notification() {
        let event = InvokingEvent::parse(
            &json!({
                "messageType": "ScheduledNotification",
                "notificationCreationTime": "2024-01-01T00:00:00Z"
            })
            .to_string(),
        )
        .unwrap();

        match event {
            InvokingEvent::Scheduled(notification) => assert_eq!(
                notification.notification_creation_time,
                OrderingTimestamp::from("2024-01-01T00:00:00Z")
            ),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_configuration_change() {
        let event = InvokingEvent::parse(
            &json!({
                "messageType": "ConfigurationItemChangeNotification",
                "configurationItem": {
                    "resourceId": "/test/log",
                    "resourceType": "AWS::Logs::LogGroup",
                    "configurationItemCaptureTime": "2024-01-01T00:00:00Z",
                    "configuration": {"retentionInDays": 7, "logGroupName": "/test/log"}
                }
            })
            .to_string(),
        )
        .unwrap();

        let InvokingEvent::ConfigurationChange(notification) = event else {
            panic!("expected a configuration change");
        };
        let item = notification.configuration_item.unwrap();
        assert_eq!(item.resource_id, "/test/log");
        assert_eq!(item.configuration.unwrap().retention_in_days, Some(7));
    }

    #[test]
    fn test_parse_configuration_change_with_null_item() {
        let event = InvokingEvent::parse(
            &json!({
                "messageType": "ConfigurationItemChangeNotification",
                "configurationItem": null
            })
            .to_string(),
        )
        .unwrap();

        assert_eq!(
            event,
            InvokingEvent::ConfigurationChange(ConfigurationChangeNotification {
                configuration_item: None,
                notification_creation_time: None,
            })
        );
    }

    #[test]
    fn test_parse_oversized_notification() {
        let event = InvokingEvent::parse(
            &json!({
                "messageType": "OversizedConfigurationItemChangeNotification",
                "configurationItemSummary": {
                    "resourceType": "AWS::Logs::LogGroup",
                    "resourceId": "/test/log",
                    "configurationItemCaptureTime": "2024-01-01T00:00:00Z"
                }
            })
            .to_string(),
        )
        .unwrap();

        let InvokingEvent::OversizedConfigurationChange(notification) = event else {
            panic!("expected an oversized change");
        };
        assert_eq!(notification.configuration_item_summary.resource_id, "/test/log");
    }

    #[test]
    fn test_parse_unknown_message_type() {
        let event =
            InvokingEvent::parse(&json!({"messageType": "SomethingElse"}).to_string()).unwrap();
        assert_eq!(
            event,
            InvokingEvent::Other {
                message_type: "SomethingElse".to_string()
            }
        );
        assert_eq!(event.message_type(), "SomethingElse");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            InvokingEvent::parse("not json"),
            Err(EnvelopeError::InvalidJson(_))
        ));
        assert!(matches!(
            InvokingEvent::parse("{}"),
            Err(EnvelopeError::MissingMessageType)
        ));
        assert!(matches!(
            InvokingEvent::parse(r#"{"messageType": "ScheduledNotification"}"#),
            Err(EnvelopeError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn test_rule_parameters_string_and_number() {
        let mut inv = invocation(json!({"messageType": "ScheduledNotification"}));

        inv.rule_parameters = Some(r#"{"MinimumRetentionDays": "30"}"#.to_string());
        let params = inv.parse_rule_parameters().unwrap();
        assert_eq!(params.minimum_retention_days.unwrap().as_i64(), Some(30));

        inv.rule_parameters = Some(r#"{"MinimumRetentionDays": 14}"#.to_string());
        let params = inv.parse_rule_parameters().unwrap();
        assert_eq!(params.minimum_retention_days.unwrap().as_i64(), Some(14));
    }

    #[test]
    fn test_rule_parameters_absent_or_blank() {
        let mut inv = invocation(json!({"messageType": "ScheduledNotification"}));
        assert_eq!(inv.parse_rule_parameters().unwrap(), RuleParameters::default());

        inv.rule_parameters = Some("{}".to_string());
        assert_eq!(inv.parse_rule_parameters().unwrap(), RuleParameters::default());

        inv.rule_parameters = Some("  ".to_string());
        assert_eq!(inv.parse_rule_parameters().unwrap(), RuleParameters::default());

        inv.rule_parameters = Some("{broken".to_string());
        assert!(inv.parse_rule_parameters().is_err());
    }

    #[test]
    fn test_invocation_deserializes_lambda_payload() {
        let inv: ConfigRuleInvocation = serde_json::from_value(json!({
            "invokingEvent": "{\"messageType\":\"ScheduledNotification\"}",
            "ruleParameters": "{\"MinimumRetentionDays\":\"30\"}",
            "resultToken": "test-token",
            "accountId": "123456789012",
            "configRuleName": "test-rule",
            "eventLeftScope": false,
            "executionRoleArn": "arn:aws:iam::123456789012:role/config"
        }))
        .unwrap();

        assert_eq!(inv.result_token, "test-token");
        assert_eq!(inv.account_id.as_deref(), Some("123456789012"));
        assert_eq!(inv.config_rule_name.as_deref(), Some("test-rule"));
    }
}

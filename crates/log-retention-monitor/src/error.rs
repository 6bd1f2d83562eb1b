//! Error types for the Log Retention Monitor
//!
//! Every failure of the evaluation pipeline is a [`MonitorError`]. The
//! dispatcher turns evaluation errors into a reported NOT_APPLICABLE
//! evaluation; only submission errors leave the handler.

use thiserror::Error;

use crate::client::ClientError;
use crate::contracts::EnvelopeError;

/// Main error type for evaluation and submission
#[derive(Error, Debug)]
pub enum MonitorError {
    /// The invocation envelope could not be decoded
    #[error("Invalid invocation: {0}")]
    Envelope(#[from] EnvelopeError),

    /// A rule parameter holds an unusable value
    #[error("Invalid rule parameter {name}: {message}")]
    InvalidParameter { name: String, message: String },

    /// Process-level configuration is unusable
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A configuration item lacks a field the evaluation depends on
    #[error("Configuration item for {resource_id} is missing {field}")]
    MissingField {
        resource_id: String,
        field: &'static str,
    },

    /// A configuration item carries a field the evaluation cannot use
    #[error("Configuration item for {resource_id} has invalid {field}: {message}")]
    InvalidField {
        resource_id: String,
        field: &'static str,
        message: String,
    },

    /// An AWS collaborator failed
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MonitorError {
    /// Create an invalid parameter error
    pub fn invalid_parameter(name: impl Into<String>, message: impl Into<String>) -> Self {
        MonitorError::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        MonitorError::Configuration(msg.into())
    }

    /// Create a missing field error
    pub fn missing_field(resource_id: impl Into<String>, field: &'static str) -> Self {
        MonitorError::MissingField {
            resource_id: resource_id.into(),
            field,
        }
    }

    /// Create an invalid field error
    pub fn invalid_field(
        resource_id: impl Into<String>,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        MonitorError::InvalidField {
            resource_id: resource_id.into(),
            field,
            message: message.into(),
        }
    }
}

/// Result type alias for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;

//! Log Retention Monitor
//!
//! AWS Config custom rule that reports CloudWatch log groups whose retention
//! is shorter than a minimum number of days.
//!
//! # Invocation modes
//! - Scheduled: sweep every log group and retire evaluations of log groups
//!   that no longer exist
//! - Configuration change: evaluate the single changed log group, fetching
//!   oversized items from the configuration history
//!
//! # Design Principles
//! - Stateless: previous results are read back from AWS Config
//! - Read-only: log groups are never modified
//! - Always reports: evaluation failures become an account-level
//!   NOT_APPLICABLE evaluation

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod handler;
pub mod submission;

// Re-export contracts
#[path = "../contracts/mod.rs"]
pub mod contracts;

pub use config::MonitorConfig;
pub use contracts::*;
pub use error::{MonitorError, Result};
pub use handler::{HandlerResponse, RetentionMonitor};

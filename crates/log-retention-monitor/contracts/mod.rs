//! Log Retention Monitor Contracts
//!
//! Wire shapes exchanged with AWS Config: the Lambda invocation envelope
//! received from the rule, and the evaluation records reported back.

mod evaluation;
mod invocation;

pub use evaluation::*;
pub use invocation::*;

/// Resource type evaluated by this rule
pub const MONITORED_RESOURCE_TYPE: &str = "AWS::Logs::LogGroup";

/// Resource type used for account-scoped evaluations
pub const ACCOUNT_RESOURCE_TYPE: &str = "AWS::::Account";

/// Rule parameter carrying the minimum retention in days
pub const MINIMUM_RETENTION_PARAMETER: &str = "MinimumRetentionDays";

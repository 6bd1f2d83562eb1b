//! Log Retention Monitor entry point
//!
//! Runs as the Lambda function behind the Config rule, or evaluates a single
//! event file locally.
//!
//! ```bash
//! # Lambda runtime (the default when no subcommand is given)
//! log-retention-monitor run
//!
//! # Evaluate an event once and print the response
//! log-retention-monitor invoke --event scheduled.json
//! ```

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use lambda_runtime::{service_fn, LambdaEvent};
use log_retention_monitor::config::MAX_BATCH_SIZE;
use log_retention_monitor::{ConfigRuleInvocation, HandlerResponse, MonitorConfig, RetentionMonitor};
use std::path::PathBuf;
use tracing::Instrument;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "log-retention-monitor")]
#[command(about = "Log Retention Monitor - AWS Config rule for CloudWatch log group retention")]
#[command(version)]
struct Cli {
    /// Minimum retention in days when the rule sets no MinimumRetentionDays
    #[arg(
        long,
        global = true,
        env = "REQUIRED_RETENTION_DAYS",
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    default_retention_days: u32,

    /// Evaluations per PutEvaluations call
    #[arg(long, global = true, env = "EVALUATION_BATCH_SIZE", default_value_t = MAX_BATCH_SIZE)]
    batch_size: usize,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve invocations from the Lambda runtime
    Run,

    /// Evaluate one invocation event and print the response
    Invoke {
        /// Path to the event file (JSON/YAML)
        #[arg(short, long)]
        event: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let cli = Cli::parse();

    let config = MonitorConfig::default()
        .with_default_retention_days(cli.default_retention_days)
        .with_batch_size(cli.batch_size);
    config.validate()?;

    tracing::info!(
        default_retention_days = config.default_retention_days,
        resource_type = %config.resource_type,
        "Starting Log Retention Monitor"
    );

    let monitor = RetentionMonitor::from_aws(config).await;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let monitor = &monitor;
            lambda_runtime::run(service_fn(move |event| async move {
                handle_event(monitor, event).await
            }))
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        }

        Commands::Invoke { event } => {
            let content = std::fs::read_to_string(&event)
                .with_context(|| format!("failed to read {}", event.display()))?;
            let invocation: ConfigRuleInvocation = match event.extension().and_then(|e| e.to_str()) {
                Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
                _ => serde_json::from_str(&content)?,
            };

            let span = tracing::info_span!("config_rule", request_id = %Uuid::new_v4());
            let response = monitor.handle(invocation).instrument(span).await?;

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}

async fn handle_event(
    monitor: &RetentionMonitor,
    event: LambdaEvent<ConfigRuleInvocation>,
) -> Result<HandlerResponse, lambda_runtime::Error> {
    let (invocation, context) = event.into_parts();
    let span = tracing::info_span!("config_rule", request_id = %context.request_id);

    Ok(monitor.handle(invocation).instrument(span).await?)
}

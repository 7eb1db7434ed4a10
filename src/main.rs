mod cloud_watch_monitoring_client;
mod config;
mod config_evaluation_client;
mod ec2_instance_client;
mod error;
mod event;
mod handler;
mod metric;
mod policy;
mod profile;
mod rds_instance_client;
mod remediator;
mod subnet;
#[cfg(test)]
mod test_support;

use std::sync::Arc;

use anyhow::Context as _;
use lambda_runtime::{handler_fn, Context};
use serde_json::Value;
use tracing::Instrument;
use tracing_subscriber::EnvFilter;

use crate::cloud_watch_monitoring_client::CloudWatchMonitoringClient;
use crate::config::Config;
use crate::config_evaluation_client::ConfigEvaluationClient;
use crate::ec2_instance_client::Ec2InstanceClient;
use crate::error::ComplianceError;
use crate::handler::RuleHandler;
use crate::rds_instance_client::RdsInstanceClient;

type LogComplianceHandler = RuleHandler<
    RdsInstanceClient,
    CloudWatchMonitoringClient,
    ConfigEvaluationClient,
    Ec2InstanceClient,
>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        // CloudWatch adds the ingestion time and the function name already.
        .with_target(false)
        .without_time()
        .init();

    let config = Config::from_env().context("loading configuration")?;
    let region = config.region();
    tracing::info!(region = region.name(), "starting rds log compliance handler");

    let handler: Arc<LogComplianceHandler> = Arc::new(RuleHandler::new(
        RdsInstanceClient::new(region.clone()),
        CloudWatchMonitoringClient::new(region.clone()),
        ConfigEvaluationClient::new(region.clone()),
        Ec2InstanceClient::new(region),
        config,
    ));

    lambda_runtime::run(handler_fn(move |event: Value, context: Context| {
        let handler = Arc::clone(&handler);
        async move { evaluation_handler(&handler, event, context).await }
    }))
    .await
    .map_err(|error| anyhow::anyhow!(error))?;
    Ok(())
}

fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

async fn evaluation_handler(
    handler: &LogComplianceHandler,
    event: Value,
    context: Context,
) -> Result<Value, ComplianceError> {
    let span = tracing::info_span!("invocation", request_id = %context.request_id);
    let output = handler.handle(event).instrument(span).await?;
    Ok(serde_json::to_value(output)?)
}

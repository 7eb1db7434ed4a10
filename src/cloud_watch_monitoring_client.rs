use async_trait::async_trait;
use rusoto_cloudwatch::{CloudWatch, CloudWatchClient, PutMetricAlarmInput};
use rusoto_core::{Region, RusotoError};
use rusoto_logs::{
    CloudWatchLogs, CloudWatchLogsClient, CreateLogGroupError, CreateLogGroupRequest,
    MetricTransformation, PutMetricFilterError, PutMetricFilterRequest,
};
use rusoto_sns::{CreateTopicInput, Sns, SnsClient};

use crate::metric::{AlarmSpec, MetricFilterSpec};

pub struct CloudWatchMonitoringClient {
    logs: CloudWatchLogsClient,
    cloud_watch: CloudWatchClient,
    sns: SnsClient,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SetupError {
    AlreadyExists,
    LogGroupMissing,
    Failed(String),
}

#[async_trait]
pub trait MonitoringSetup {
    async fn put_metric_filter(&self, filter: &MetricFilterSpec) -> Result<(), SetupError>;
    async fn create_log_group(&self, log_group_name: &str) -> Result<(), SetupError>;
    /// Returns the topic ARN; creating an existing topic hands back the same ARN.
    async fn ensure_alert_topic(&self, name: &str) -> Result<String, SetupError>;
    async fn put_alarm(&self, alarm: &AlarmSpec) -> Result<(), SetupError>;
}

#[async_trait]
impl MonitoringSetup for CloudWatchMonitoringClient {
    async fn put_metric_filter(&self, filter: &MetricFilterSpec) -> Result<(), SetupError> {
        self.logs
            .put_metric_filter(PutMetricFilterRequest {
                log_group_name: filter.log_group_name.clone(),
                filter_name: filter.filter_name.clone(),
                filter_pattern: filter.filter_pattern.clone(),
                metric_transformations: vec![MetricTransformation {
                    metric_name: filter.metric_name.clone(),
                    metric_namespace: filter.metric_namespace.clone(),
                    metric_value: filter.metric_value.clone(),
                    default_value: Some(filter.default_value),
                    ..MetricTransformation::default()
                }],
                ..PutMetricFilterRequest::default()
            })
            .await
            .map_err(|error| match error {
                RusotoError::Service(PutMetricFilterError::ResourceNotFound(_)) => {
                    SetupError::LogGroupMissing
                }
                error => SetupError::Failed(error.to_string()),
            })
    }

    async fn create_log_group(&self, log_group_name: &str) -> Result<(), SetupError> {
        self.logs
            .create_log_group(CreateLogGroupRequest {
                log_group_name: log_group_name.to_string(),
                ..CreateLogGroupRequest::default()
            })
            .await
            .map_err(|error| match error {
                RusotoError::Service(CreateLogGroupError::ResourceAlreadyExists(_)) => {
                    SetupError::AlreadyExists
                }
                error => SetupError::Failed(error.to_string()),
            })
    }

    async fn ensure_alert_topic(&self, name: &str) -> Result<String, SetupError> {
        let response = self
            .sns
            .create_topic(CreateTopicInput {
                name: name.to_string(),
                ..CreateTopicInput::default()
            })
            .await
            .map_err(|error| SetupError::Failed(error.to_string()))?;
        response
            .topic_arn
            .ok_or_else(|| SetupError::Failed("TopicArn is None".to_string()))
    }

    async fn put_alarm(&self, alarm: &AlarmSpec) -> Result<(), SetupError> {
        self.cloud_watch
            .put_metric_alarm(PutMetricAlarmInput {
                alarm_name: alarm.alarm_name.clone(),
                alarm_description: Some(alarm.description.clone()),
                actions_enabled: Some(alarm.actions_enabled),
                namespace: Some(alarm.metric_namespace.clone()),
                metric_name: Some(alarm.metric_name.clone()),
                statistic: Some(alarm.statistic.clone()),
                period: Some(alarm.period_seconds),
                evaluation_periods: alarm.evaluation_periods,
                datapoints_to_alarm: Some(alarm.datapoints_to_alarm),
                threshold: Some(alarm.threshold),
                comparison_operator: alarm.comparison_operator.clone(),
                treat_missing_data: Some(alarm.treat_missing_data.clone()),
                alarm_actions: Some(alarm.alarm_actions.clone()),
                ..PutMetricAlarmInput::default()
            })
            .await
            .map_err(|error| SetupError::Failed(error.to_string()))
    }
}

impl CloudWatchMonitoringClient {
    pub fn new(region: Region) -> Self {
        Self::new_with_clients(
            CloudWatchLogsClient::new(region.clone()),
            CloudWatchClient::new(region.clone()),
            SnsClient::new(region),
        )
    }

    fn new_with_clients(
        logs: CloudWatchLogsClient,
        cloud_watch: CloudWatchClient,
        sns: SnsClient,
    ) -> Self {
        CloudWatchMonitoringClient {
            logs,
            cloud_watch,
            sns,
        }
    }
}

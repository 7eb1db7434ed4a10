use crate::policy::RemediationPolicy;
use crate::profile::ResourceKind;

pub const METRIC_NAME: &str = "AccessDeniedCount";
pub const METRIC_NAMESPACE: &str = "LogMetrics";
pub const ALARM_NAME: &str = "RDS-Frequent-Failed-Login-Attempts";
const ALARM_DESCRIPTION: &str = "Alarm for frequent failed login attempts, \
    which indicates that the databases are under attack potentially.";

#[derive(Debug, Clone, PartialEq)]
pub struct MetricFilterSpec {
    pub log_group_name: String,
    pub filter_name: String,
    pub filter_pattern: String,
    pub metric_name: String,
    pub metric_namespace: String,
    pub metric_value: String,
    pub default_value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlarmSpec {
    pub alarm_name: String,
    pub description: String,
    pub actions_enabled: bool,
    pub metric_name: String,
    pub metric_namespace: String,
    pub statistic: String,
    pub period_seconds: i64,
    pub evaluation_periods: i64,
    pub datapoints_to_alarm: i64,
    pub threshold: f64,
    pub comparison_operator: String,
    pub treat_missing_data: String,
    pub alarm_actions: Vec<String>,
}

pub fn log_group_name(identifier: &str, kind: ResourceKind, policy: &RemediationPolicy) -> String {
    format!(
        "{}{}{}",
        kind.log_group_prefix(),
        identifier,
        policy.log_group_suffix
    )
}

impl MetricFilterSpec {
    pub fn failed_logins(identifier: &str, kind: ResourceKind, policy: &RemediationPolicy) -> Self {
        MetricFilterSpec {
            log_group_name: log_group_name(identifier, kind, policy),
            filter_name: format!("Access-denied-{}", policy.engine_type),
            filter_pattern: policy.failure_keyword.to_string(),
            metric_name: METRIC_NAME.to_string(),
            metric_namespace: METRIC_NAMESPACE.to_string(),
            metric_value: "1".to_string(),
            default_value: 0.0,
        }
    }
}

impl AlarmSpec {
    /// Five or more failed logins summed over one 300 second period.
    pub fn frequent_failed_logins(topic_arn: &str, actions_enabled: bool) -> Self {
        AlarmSpec {
            alarm_name: ALARM_NAME.to_string(),
            description: ALARM_DESCRIPTION.to_string(),
            actions_enabled,
            metric_name: METRIC_NAME.to_string(),
            metric_namespace: METRIC_NAMESPACE.to_string(),
            statistic: "Sum".to_string(),
            period_seconds: 300,
            evaluation_periods: 1,
            datapoints_to_alarm: 1,
            threshold: 5.0,
            comparison_operator: "GreaterThanOrEqualToThreshold".to_string(),
            treat_missing_data: "missing".to_string(),
            alarm_actions: vec![topic_arn.to_string()],
        }
    }
}

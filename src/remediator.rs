//! Evaluate, remediate and monitor the log exports of one RDS resource.
//!
//! Evaluation is a pure check of the observed profile against the engine policy.
//! Only [`ComplianceRemediator::remediate`] mutates the resource, and it is bounded:
//! every attempt that fails for a reason other than "already modified" waits a
//! fixed delay and tries again until the attempt budget is spent.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::cloud_watch_monitoring_client::{MonitoringSetup, SetupError};
use crate::error::ComplianceError;
use crate::metric::{AlarmSpec, MetricFilterSpec};
use crate::policy::RemediationPolicy;
use crate::profile::{ResourceKind, ResourceProfile};
use crate::rds_instance_client::{ModifyFailure, ModifyLogExports};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: crate::config::DEFAULT_MAX_ATTEMPTS,
            delay: Duration::from_secs(crate::config::DEFAULT_RETRY_DELAY_SECS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Remediation {
    Applied { attempts: u32 },
    /// Another writer got there first; the service rejected the change as redundant.
    AlreadyInDesiredState { attempts: u32 },
}

/// Terminal state of the evaluate/remediate half of an invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Compliant,
    Remediated(Remediation),
    Exhausted { attempts: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitoringRule {
    pub filter: MetricFilterSpec,
    pub alarm: AlarmSpec,
}

pub struct ComplianceRemediator<'a, D, M> {
    database: &'a D,
    monitoring: &'a M,
    retry: RetryPolicy,
    alert_topic_name: &'a str,
    alarm_actions_enabled: bool,
}

/// True iff every stream the policy requires is already exported.
pub fn evaluate(profile: &ResourceProfile, policy: &RemediationPolicy) -> bool {
    policy
        .required_log_streams
        .is_subset(&profile.exported_log_streams)
}

impl<'a, D, M> ComplianceRemediator<'a, D, M>
where
    D: ModifyLogExports + Sync,
    M: MonitoringSetup + Sync,
{
    pub fn new(
        database: &'a D,
        monitoring: &'a M,
        retry: RetryPolicy,
        alert_topic_name: &'a str,
        alarm_actions_enabled: bool,
    ) -> Self {
        ComplianceRemediator {
            database,
            monitoring,
            retry,
            alert_topic_name,
            alarm_actions_enabled,
        }
    }

    /// Evaluate, remediate if needed, then register the monitoring rule.
    ///
    /// Exhaustion is not an error here: it is an outcome to be reported. A failure
    /// while registering the monitoring rule is, and aborts the invocation.
    pub async fn run(
        &self,
        profile: &ResourceProfile,
        policy: &RemediationPolicy,
    ) -> Result<(Outcome, MonitoringRule), ComplianceError> {
        let outcome = if evaluate(profile, policy) {
            info!(identifier = %profile.identifier, "log exports are compliant");
            Outcome::Compliant
        } else {
            info!(
                identifier = %profile.identifier,
                exported = ?profile.exported_log_streams,
                required = ?policy.required_log_streams,
                "log exports are not configured properly, modifying"
            );
            match self.remediate(&profile.identifier, profile.kind, policy).await {
                Ok(remediation) => Outcome::Remediated(remediation),
                Err(ComplianceError::RemediationExhausted { attempts, .. }) => {
                    warn!(
                        identifier = %profile.identifier,
                        attempts,
                        "remediation exhausted, resource stays non-compliant"
                    );
                    Outcome::Exhausted { attempts }
                }
                Err(error) => return Err(error),
            }
        };

        let rule = self
            .ensure_monitoring_rule(&profile.identifier, profile.kind, policy)
            .await?;
        Ok((outcome, rule))
    }

    pub async fn remediate(
        &self,
        identifier: &str,
        kind: ResourceKind,
        policy: &RemediationPolicy,
    ) -> Result<Remediation, ComplianceError> {
        let streams = policy.required_streams();
        for attempt in 1..=self.retry.max_attempts {
            match self
                .database
                .modify_log_exports(identifier, kind, &streams)
                .await
            {
                Ok(()) => {
                    info!(identifier, attempt, streams = ?streams, "log exports modified");
                    return Ok(Remediation::Applied { attempts: attempt });
                }
                Err(ModifyFailure::AlreadyInDesiredState) => {
                    info!(identifier, attempt, "already modified previously, skipping");
                    return Ok(Remediation::AlreadyInDesiredState { attempts: attempt });
                }
                Err(ModifyFailure::Transient(message)) => {
                    warn!(identifier, attempt, %message, "modify log exports failed");
                    if attempt < self.retry.max_attempts {
                        tokio::time::sleep(self.retry.delay).await;
                    }
                }
            }
        }
        Err(ComplianceError::RemediationExhausted {
            identifier: identifier.to_string(),
            attempts: self.retry.max_attempts,
        })
    }

    pub async fn ensure_monitoring_rule(
        &self,
        identifier: &str,
        kind: ResourceKind,
        policy: &RemediationPolicy,
    ) -> Result<MonitoringRule, ComplianceError> {
        let filter = MetricFilterSpec::failed_logins(identifier, kind, policy);
        info!(
            log_group = %filter.log_group_name,
            filter = %filter.filter_name,
            "setting up metric filter"
        );

        match self.monitoring.put_metric_filter(&filter).await {
            Ok(()) => {}
            Err(SetupError::LogGroupMissing) => {
                info!(log_group = %filter.log_group_name, "log group missing, creating it");
                let created = self.monitoring.create_log_group(&filter.log_group_name).await;
                tolerate_existing("create_log_group", created)?;
                let retried = self.monitoring.put_metric_filter(&filter).await;
                tolerate_existing("put_metric_filter", retried)?;
            }
            result => tolerate_existing("put_metric_filter", result)?,
        }

        let topic_arn = self
            .monitoring
            .ensure_alert_topic(self.alert_topic_name)
            .await
            .map_err(|error| setup_failed("create_topic", error))?;

        let alarm = AlarmSpec::frequent_failed_logins(&topic_arn, self.alarm_actions_enabled);
        info!(identifier, alarm = %alarm.alarm_name, "setting failed login alarm");
        tolerate_existing("put_metric_alarm", self.monitoring.put_alarm(&alarm).await)?;

        Ok(MonitoringRule { filter, alarm })
    }
}

fn tolerate_existing(
    step: &'static str,
    result: Result<(), SetupError>,
) -> Result<(), ComplianceError> {
    match result {
        Ok(()) | Err(SetupError::AlreadyExists) => Ok(()),
        Err(error) => Err(setup_failed(step, error)),
    }
}

fn setup_failed(step: &'static str, error: SetupError) -> ComplianceError {
    let message = match error {
        SetupError::Failed(message) => message,
        other => format!("{:?}", other),
    };
    error!(step, %message, "monitoring setup failed");
    ComplianceError::SetupFailed { step, message }
}

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cloud_watch_monitoring_client::MonitoringSetup;
use crate::config::Config;
use crate::config_evaluation_client::{ComplianceType, EvaluationReport, ReportEvaluation};
use crate::ec2_instance_client::DescribeNetwork;
use crate::error::ComplianceError;
use crate::event::{ConfigRuleEvent, InvokingEvent, MessageType, ResourceSubject, RuleParameters};
use crate::policy::RemediationPolicy;
use crate::profile::{ResourceKind, ResourceProfile};
use crate::rds_instance_client::{DescribeDatabase, ModifyLogExports};
use crate::remediator::{ComplianceRemediator, Outcome, Remediation, RetryPolicy};

const DELETED_STATUSES: [&str; 2] = ["ResourceDeleted", "ResourceNotRecorded"];

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationOutput {
    pub message: String,
    pub resource_id: Option<String>,
    pub compliance_type: Option<ComplianceType>,
}

/// Everything one invocation needs, wired once per container.
pub struct RuleHandler<D, M, R, N> {
    database: D,
    monitoring: M,
    reporter: R,
    network: N,
    config: Config,
}

enum Verdict {
    NotApplicable(String),
    Evaluated(Outcome),
}

impl<D, M, R, N> RuleHandler<D, M, R, N>
where
    D: DescribeDatabase + ModifyLogExports + Sync,
    M: MonitoringSetup + Sync,
    R: ReportEvaluation + Sync,
    N: DescribeNetwork + Sync,
{
    pub fn new(database: D, monitoring: M, reporter: R, network: N, config: Config) -> Self {
        RuleHandler {
            database,
            monitoring,
            reporter,
            network,
            config,
        }
    }

    pub async fn handle(&self, event: Value) -> Result<EvaluationOutput, ComplianceError> {
        let event = ConfigRuleEvent::from_value(event)?;
        let parameters = event.rule_parameters()?;
        let invoking_event = event.invoking_event()?;
        let rule = event.config_rule_name.as_deref().unwrap_or_default();
        if parameters.debug() {
            info!(rule, invoking_event = %event.invoking_event, "received event");
        } else {
            debug!(rule, invoking_event = %event.invoking_event, "received event");
        }

        if invoking_event.message_type()? == MessageType::Scheduled {
            info!("scheduled notification carries no configuration item, skipping");
            return Ok(EvaluationOutput {
                message: "Skipped scheduled notification".to_string(),
                resource_id: None,
                compliance_type: None,
            });
        }

        let subject = invoking_event.subject()?;
        let verdict = self
            .verdict(&event, &parameters, &invoking_event, &subject)
            .await?;
        let (compliance_type, annotation) = match verdict {
            Verdict::NotApplicable(reason) => (ComplianceType::NotApplicable, reason),
            Verdict::Evaluated(outcome) => annotate(&outcome, &subject.resource_id),
        };

        let report = EvaluationReport {
            resource_type: subject.resource_type.clone(),
            resource_id: subject.resource_id.clone(),
            compliance_type,
            annotation,
            ordering_timestamp: invoking_event.ordering_timestamp()?,
        };
        self.reporter
            .submit_evaluation(&report, &event.result_token)
            .await?;
        info!(
            resource_id = %report.resource_id,
            compliance_type = report.compliance_type.as_str(),
            "evaluation submitted"
        );

        Ok(EvaluationOutput {
            message: report.annotation,
            resource_id: Some(report.resource_id),
            compliance_type: Some(report.compliance_type),
        })
    }

    async fn verdict(
        &self,
        event: &ConfigRuleEvent,
        parameters: &RuleParameters,
        invoking_event: &InvokingEvent,
        subject: &ResourceSubject,
    ) -> Result<Verdict, ComplianceError> {
        let kind = match ResourceKind::from_resource_type(&subject.resource_type) {
            Some(kind) => kind,
            None => {
                return Ok(Verdict::NotApplicable(format!(
                    "The rule doesn't apply to resources of type {}.",
                    subject.resource_type
                )))
            }
        };
        if DELETED_STATUSES.contains(&subject.status.as_str()) {
            return Ok(Verdict::NotApplicable(
                "The configurationItem was deleted and therefore cannot be validated.".to_string(),
            ));
        }
        if event.event_left_scope {
            return Ok(Verdict::NotApplicable(
                "The resource has left the scope of this rule.".to_string(),
            ));
        }

        let profile = self.profile(invoking_event, subject, kind).await?;
        info!(identifier = %profile.identifier, engine = %profile.engine_type, "checking rds");

        if !self.in_production_scope(&profile).await? {
            return Ok(Verdict::NotApplicable(format!(
                "The RDS resource [{}] is not in production subnet.",
                profile.identifier
            )));
        }

        let policy = RemediationPolicy::resolve(&profile.engine_type);
        if !policy.is_known() {
            warn!(engine = %profile.engine_type, "no log export policy for engine");
        }
        let retry = RetryPolicy {
            max_attempts: parameters
                .max_attempts()
                .unwrap_or(self.config.max_attempts),
            delay: self.config.retry_delay,
        };
        let remediator = ComplianceRemediator::new(
            &self.database,
            &self.monitoring,
            retry,
            &self.config.alert_topic_name,
            self.config.alarm_actions_enabled,
        );
        let (outcome, rule) = remediator.run(&profile, &policy).await?;
        info!(
            log_group = %rule.filter.log_group_name,
            alarm = %rule.alarm.alarm_name,
            "failed login monitoring in place"
        );
        Ok(Verdict::Evaluated(outcome))
    }

    async fn profile(
        &self,
        invoking_event: &InvokingEvent,
        subject: &ResourceSubject,
        kind: ResourceKind,
    ) -> Result<ResourceProfile, ComplianceError> {
        match invoking_event.message_type()? {
            MessageType::OversizedConfigurationItemChange => {
                // resourceId is the DbiResourceId; the API wants the name
                let identifier = subject
                    .resource_name
                    .as_deref()
                    .unwrap_or(&subject.resource_id);
                info!(identifier, "configuration item is oversized, describing it");
                self.database.describe_instance(identifier, kind).await
            }
            _ => invoking_event.embedded_profile(),
        }
    }

    async fn in_production_scope(
        &self,
        profile: &ResourceProfile,
    ) -> Result<bool, ComplianceError> {
        let (range, vpc_id) = match (&self.config.production_range, &profile.vpc_id) {
            (Some(range), Some(vpc_id)) => (range, vpc_id),
            _ => return Ok(true),
        };
        let cidr_block = self.network.vpc_cidr_block(vpc_id).await?;
        let in_scope = range.contains_block(&cidr_block);
        debug!(%vpc_id, %cidr_block, in_scope, "checked production range");
        Ok(in_scope)
    }
}

fn annotate(outcome: &Outcome, resource_id: &str) -> (ComplianceType, String) {
    match outcome {
        Outcome::Compliant => (
            ComplianceType::Compliant,
            format!(
                "Required log exports and the failed login filter are set for {}.",
                resource_id
            ),
        ),
        Outcome::Remediated(Remediation::Applied { attempts }) => (
            ComplianceType::Compliant,
            format!(
                "Log exports were enabled for {} after {} attempt(s); \
                 the failed login filter is set.",
                resource_id, attempts
            ),
        ),
        Outcome::Remediated(Remediation::AlreadyInDesiredState { .. }) => (
            ComplianceType::Compliant,
            format!(
                "Log exports for {} had already been modified; the failed login filter is set.",
                resource_id
            ),
        ),
        Outcome::Exhausted { attempts } => (
            ComplianceType::NonCompliant,
            format!(
                "Enabling log exports for {} failed after {} attempts.",
                resource_id, attempts
            ),
        ),
    }
}

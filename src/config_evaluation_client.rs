use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusoto_config::{ConfigService, ConfigServiceClient, Evaluation, PutEvaluationsRequest};
use rusoto_core::Region;
use serde::Serialize;

use crate::error::ComplianceError;

const TEST_MODE_TOKEN: &str = "TESTMODE";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceType {
    Compliant,
    NonCompliant,
    NotApplicable,
}

impl ComplianceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ComplianceType::Compliant => "COMPLIANT",
            ComplianceType::NonCompliant => "NON_COMPLIANT",
            ComplianceType::NotApplicable => "NOT_APPLICABLE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub resource_type: String,
    pub resource_id: String,
    pub compliance_type: ComplianceType,
    pub annotation: String,
    pub ordering_timestamp: DateTime<Utc>,
}

pub struct ConfigEvaluationClient {
    client: ConfigServiceClient,
}

#[async_trait]
pub trait ReportEvaluation {
    async fn submit_evaluation(
        &self,
        report: &EvaluationReport,
        result_token: &str,
    ) -> Result<(), ComplianceError>;
}

#[async_trait]
impl ReportEvaluation for ConfigEvaluationClient {
    async fn submit_evaluation(
        &self,
        report: &EvaluationReport,
        result_token: &str,
    ) -> Result<(), ComplianceError> {
        let request = PutEvaluationsRequest {
            evaluations: Some(vec![Evaluation {
                compliance_resource_type: report.resource_type.clone(),
                compliance_resource_id: report.resource_id.clone(),
                compliance_type: report.compliance_type.as_str().to_string(),
                annotation: Some(report.annotation.clone()),
                ordering_timestamp: report.ordering_timestamp.timestamp_millis() as f64 / 1000.0,
                ..Evaluation::default()
            }]),
            result_token: result_token.to_string(),
            test_mode: Some(result_token == TEST_MODE_TOKEN),
        };

        let response = self
            .client
            .put_evaluations(request)
            .await
            .map_err(|error| ComplianceError::ReportFailed(error.to_string()))?;

        match response.failed_evaluations {
            Some(failed) if !failed.is_empty() => Err(ComplianceError::ReportFailed(format!(
                "{} evaluation(s) rejected",
                failed.len()
            ))),
            _ => Ok(()),
        }
    }
}

impl ConfigEvaluationClient {
    pub fn new(region: Region) -> Self {
        Self::new_with_client(ConfigServiceClient::new(region))
    }

    fn new_with_client(client: ConfigServiceClient) -> Self {
        ConfigEvaluationClient { client }
    }
}

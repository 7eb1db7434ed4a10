use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::cloud_watch_monitoring_client::{MonitoringSetup, SetupError};
use crate::config_evaluation_client::{EvaluationReport, ReportEvaluation};
use crate::ec2_instance_client::DescribeNetwork;
use crate::error::ComplianceError;
use crate::metric::{AlarmSpec, MetricFilterSpec};
use crate::profile::{ResourceKind, ResourceProfile};
use crate::rds_instance_client::{DescribeDatabase, ModifyFailure, ModifyLogExports};

pub type ModifyCall = (String, ResourceKind, Vec<String>);

/// Scripted RDS: modify results are consumed in order, then every call succeeds.
#[derive(Default)]
pub struct FakeDatabase {
    modify_results: Mutex<VecDeque<Result<(), ModifyFailure>>>,
    modify_calls: Mutex<Vec<ModifyCall>>,
    profiles: Mutex<HashMap<String, ResourceProfile>>,
    describe_calls: Mutex<Vec<String>>,
}

impl FakeDatabase {
    pub fn with_modify_results(results: Vec<Result<(), ModifyFailure>>) -> Self {
        FakeDatabase {
            modify_results: Mutex::new(results.into()),
            ..FakeDatabase::default()
        }
    }

    pub fn with_profile(profile: ResourceProfile) -> Self {
        let database = FakeDatabase::default();
        database
            .profiles
            .lock()
            .unwrap()
            .insert(profile.identifier.clone(), profile);
        database
    }

    pub fn modify_calls(&self) -> Vec<ModifyCall> {
        self.modify_calls.lock().unwrap().clone()
    }

    pub fn describe_calls(&self) -> Vec<String> {
        self.describe_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DescribeDatabase for FakeDatabase {
    async fn describe_instance(
        &self,
        identifier: &str,
        _kind: ResourceKind,
    ) -> Result<ResourceProfile, ComplianceError> {
        self.describe_calls.lock().unwrap().push(identifier.to_string());
        self.profiles
            .lock()
            .unwrap()
            .get(identifier)
            .cloned()
            .ok_or_else(|| ComplianceError::DescribeFailed {
                identifier: identifier.to_string(),
                message: "not found".to_string(),
            })
    }
}

#[async_trait]
impl ModifyLogExports for FakeDatabase {
    async fn modify_log_exports(
        &self,
        identifier: &str,
        kind: ResourceKind,
        streams: &[String],
    ) -> Result<(), ModifyFailure> {
        self.modify_calls
            .lock()
            .unwrap()
            .push((identifier.to_string(), kind, streams.to_vec()));
        self.modify_results.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

/// In-memory CloudWatch. With `reject_duplicates` it behaves like a strict
/// create API and answers `AlreadyExists` for anything it already holds.
#[derive(Default)]
pub struct FakeMonitoring {
    reject_duplicates: bool,
    log_group_missing: Mutex<bool>,
    alarm_failure: Option<SetupError>,
    topic_failure: Option<SetupError>,
    log_groups: Mutex<Vec<String>>,
    filters: Mutex<Vec<MetricFilterSpec>>,
    alarms: Mutex<Vec<AlarmSpec>>,
}

impl FakeMonitoring {
    pub fn rejecting_duplicates() -> Self {
        FakeMonitoring {
            reject_duplicates: true,
            ..FakeMonitoring::default()
        }
    }

    pub fn without_log_group() -> Self {
        FakeMonitoring {
            log_group_missing: Mutex::new(true),
            ..FakeMonitoring::default()
        }
    }

    pub fn failing_alarm(error: SetupError) -> Self {
        FakeMonitoring {
            alarm_failure: Some(error),
            ..FakeMonitoring::default()
        }
    }

    pub fn failing_topic(error: SetupError) -> Self {
        FakeMonitoring {
            topic_failure: Some(error),
            ..FakeMonitoring::default()
        }
    }

    pub fn topic_arn(name: &str) -> String {
        format!("arn:aws:sns:ap-southeast-1:123456789012:{}", name)
    }

    pub fn log_groups(&self) -> Vec<String> {
        self.log_groups.lock().unwrap().clone()
    }

    pub fn filters(&self) -> Vec<MetricFilterSpec> {
        self.filters.lock().unwrap().clone()
    }

    pub fn alarms(&self) -> Vec<AlarmSpec> {
        self.alarms.lock().unwrap().clone()
    }
}

#[async_trait]
impl MonitoringSetup for FakeMonitoring {
    async fn put_metric_filter(&self, filter: &MetricFilterSpec) -> Result<(), SetupError> {
        if *self.log_group_missing.lock().unwrap() {
            return Err(SetupError::LogGroupMissing);
        }
        let mut filters = self.filters.lock().unwrap();
        if filters.contains(filter) {
            if self.reject_duplicates {
                return Err(SetupError::AlreadyExists);
            }
            return Ok(());
        }
        filters.push(filter.clone());
        Ok(())
    }

    async fn create_log_group(&self, log_group_name: &str) -> Result<(), SetupError> {
        *self.log_group_missing.lock().unwrap() = false;
        let mut log_groups = self.log_groups.lock().unwrap();
        if log_groups.iter().any(|name| name == log_group_name) {
            return Err(SetupError::AlreadyExists);
        }
        log_groups.push(log_group_name.to_string());
        Ok(())
    }

    async fn ensure_alert_topic(&self, name: &str) -> Result<String, SetupError> {
        if let Some(error) = &self.topic_failure {
            return Err(error.clone());
        }
        Ok(FakeMonitoring::topic_arn(name))
    }

    async fn put_alarm(&self, alarm: &AlarmSpec) -> Result<(), SetupError> {
        if let Some(error) = &self.alarm_failure {
            return Err(error.clone());
        }
        let mut alarms = self.alarms.lock().unwrap();
        if alarms.contains(alarm) {
            if self.reject_duplicates {
                return Err(SetupError::AlreadyExists);
            }
            return Ok(());
        }
        alarms.push(alarm.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeReporter {
    reports: Mutex<Vec<(EvaluationReport, String)>>,
}

impl FakeReporter {
    pub fn reports(&self) -> Vec<(EvaluationReport, String)> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportEvaluation for FakeReporter {
    async fn submit_evaluation(
        &self,
        report: &EvaluationReport,
        result_token: &str,
    ) -> Result<(), ComplianceError> {
        self.reports
            .lock()
            .unwrap()
            .push((report.clone(), result_token.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeNetwork {
    cidr_blocks: HashMap<String, String>,
}

impl FakeNetwork {
    pub fn with_vpc(vpc_id: &str, cidr_block: &str) -> Self {
        let mut cidr_blocks = HashMap::new();
        cidr_blocks.insert(vpc_id.to_string(), cidr_block.to_string());
        FakeNetwork { cidr_blocks }
    }
}

#[async_trait]
impl DescribeNetwork for FakeNetwork {
    async fn vpc_cidr_block(&self, vpc_id: &str) -> Result<String, ComplianceError> {
        self.cidr_blocks
            .get(vpc_id)
            .cloned()
            .ok_or_else(|| ComplianceError::NetworkLookupFailed {
                vpc_id: vpc_id.to_string(),
                message: "not found".to_string(),
            })
    }
}

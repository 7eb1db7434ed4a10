use std::collections::{BTreeSet, HashMap};
use std::convert::TryFrom;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ComplianceError;
use crate::profile::{ResourceKind, ResourceProfile};

/// Payload AWS Config hands to a custom rule function.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigRuleEvent {
    pub invoking_event: String,
    #[serde(default)]
    pub rule_parameters: Option<String>,
    pub result_token: String,
    #[serde(default)]
    pub event_left_scope: bool,
    #[serde(default)]
    pub config_rule_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokingEvent {
    pub message_type: String,
    #[serde(default)]
    pub configuration_item: Option<ConfigurationItem>,
    #[serde(default)]
    pub configuration_item_summary: Option<ConfigurationItemSummary>,
    #[serde(default)]
    pub notification_creation_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationItem {
    pub resource_type: String,
    pub resource_id: String,
    pub configuration_item_capture_time: Option<String>,
    pub configuration_item_status: String,
    #[serde(default)]
    pub configuration: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationItemSummary {
    pub resource_type: String,
    pub resource_id: String,
    #[serde(default)]
    pub resource_name: Option<String>,
    pub configuration_item_capture_time: Option<String>,
    pub configuration_item_status: String,
}

#[derive(Debug, Deserialize)]
struct DatabaseConfiguration {
    #[serde(rename = "dBInstanceIdentifier", default)]
    db_instance_identifier: Option<String>,
    #[serde(rename = "dBClusterIdentifier", default)]
    db_cluster_identifier: Option<String>,
    engine: String,
    #[serde(rename = "enabledCloudwatchLogsExports", default)]
    enabled_cloudwatch_logs_exports: Option<Vec<String>>,
    #[serde(rename = "dBSubnetGroup", default)]
    db_subnet_group: Option<SubnetGroup>,
}

#[derive(Debug, Deserialize)]
struct SubnetGroup {
    #[serde(rename = "vpcId", default)]
    vpc_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageType {
    ConfigurationItemChange,
    OversizedConfigurationItemChange,
    Scheduled,
}

/// The resource a notification is about, whether or not its configuration came embedded.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSubject {
    pub resource_type: String,
    pub resource_id: String,
    pub resource_name: Option<String>,
    pub status: String,
    pub capture_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleValue {
    Flag(bool),
    Number(u64),
}

/// Rule parameters with lower-cased keys. `"true"`/`"false"` become flags, digit
/// strings become numbers and anything else counts as a set flag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleParameters(HashMap<String, RuleValue>);

impl RuleParameters {
    pub fn parse(raw: Option<&str>) -> Result<Self, ComplianceError> {
        let raw = match raw.map(str::trim) {
            None | Some("") => return Ok(RuleParameters::default()),
            Some(raw) => raw,
        };
        let values: HashMap<String, Value> = serde_json::from_str(raw)?;
        Ok(RuleParameters(
            values
                .into_iter()
                .map(|(key, value)| (key.to_lowercase(), normalize(&value)))
                .collect(),
        ))
    }

    pub fn get(&self, key: &str) -> Option<&RuleValue> {
        self.0.get(&key.to_lowercase())
    }

    pub fn debug(&self) -> bool {
        matches!(self.get("debug"), Some(RuleValue::Flag(true)))
    }

    pub fn number(&self, key: &str) -> Option<u64> {
        match self.get(key) {
            Some(RuleValue::Number(number)) => Some(*number),
            _ => None,
        }
    }

    /// Per-rule override of the remediation attempt budget. Zero is ignored.
    pub fn max_attempts(&self) -> Option<u32> {
        self.number("maxattempts")
            .filter(|attempts| *attempts > 0)
            .map(|attempts| u32::try_from(attempts).unwrap_or(u32::MAX))
    }
}

fn normalize(value: &Value) -> RuleValue {
    let text = match value {
        Value::String(text) => text.to_lowercase(),
        Value::Bool(flag) => return RuleValue::Flag(*flag),
        other => other.to_string(),
    };
    match text.as_str() {
        "true" => RuleValue::Flag(true),
        "false" => RuleValue::Flag(false),
        digits if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) => {
            digits.parse().map_or(RuleValue::Flag(true), RuleValue::Number)
        }
        _ => RuleValue::Flag(true),
    }
}

impl ConfigRuleEvent {
    pub fn from_value(event: Value) -> Result<Self, ComplianceError> {
        if event.is_null() {
            return Err(ComplianceError::InvalidEvent("event is empty".to_string()));
        }
        Ok(serde_json::from_value(event)?)
    }

    pub fn invoking_event(&self) -> Result<InvokingEvent, ComplianceError> {
        Ok(serde_json::from_str(&self.invoking_event)?)
    }

    pub fn rule_parameters(&self) -> Result<RuleParameters, ComplianceError> {
        RuleParameters::parse(self.rule_parameters.as_deref())
    }
}

impl InvokingEvent {
    pub fn message_type(&self) -> Result<MessageType, ComplianceError> {
        match self.message_type.as_str() {
            "ConfigurationItemChangeNotification" => Ok(MessageType::ConfigurationItemChange),
            "OversizedConfigurationItemChangeNotification" => {
                Ok(MessageType::OversizedConfigurationItemChange)
            }
            "ScheduledNotification" => Ok(MessageType::Scheduled),
            other => Err(ComplianceError::InvalidEvent(format!(
                "unexpected message type {}",
                other
            ))),
        }
    }

    pub fn subject(&self) -> Result<ResourceSubject, ComplianceError> {
        if let Some(item) = &self.configuration_item {
            return Ok(ResourceSubject {
                resource_type: item.resource_type.clone(),
                resource_id: item.resource_id.clone(),
                resource_name: None,
                status: item.configuration_item_status.clone(),
                capture_time: item.configuration_item_capture_time.clone(),
            });
        }
        self.configuration_item_summary
            .as_ref()
            .map(|summary| ResourceSubject {
                resource_type: summary.resource_type.clone(),
                resource_id: summary.resource_id.clone(),
                resource_name: summary.resource_name.clone(),
                status: summary.configuration_item_status.clone(),
                capture_time: summary.configuration_item_capture_time.clone(),
            })
            .ok_or_else(|| {
                ComplianceError::InvalidEvent("no configuration item in notification".to_string())
            })
    }

    /// When the item was captured, falling back to when the notification was created.
    pub fn ordering_timestamp(&self) -> Result<DateTime<Utc>, ComplianceError> {
        let subject_time = self.subject().ok().and_then(|subject| subject.capture_time);
        let raw = subject_time
            .or_else(|| self.notification_creation_time.clone())
            .ok_or(ComplianceError::MissingValue("configurationItemCaptureTime"))?;
        Ok(DateTime::parse_from_rfc3339(&raw)?.with_timezone(&Utc))
    }

    /// Profile from the embedded configuration item.
    pub fn embedded_profile(&self) -> Result<ResourceProfile, ComplianceError> {
        let configuration = self
            .configuration_item
            .as_ref()
            .and_then(|item| item.configuration.clone())
            .ok_or(ComplianceError::MissingValue("configuration"))?;
        profile_from_configuration(configuration)
    }
}

pub fn profile_from_configuration(
    configuration: Value,
) -> Result<ResourceProfile, ComplianceError> {
    let configuration: DatabaseConfiguration = serde_json::from_value(configuration)?;
    let instance = configuration
        .db_instance_identifier
        .filter(|identifier| !identifier.is_empty());
    let (identifier, kind) = match instance {
        Some(identifier) => (identifier, ResourceKind::SingleInstance),
        None => (
            configuration
                .db_cluster_identifier
                .filter(|identifier| !identifier.is_empty())
                .ok_or(ComplianceError::MissingValue("dBClusterIdentifier"))?,
            ResourceKind::Clustered,
        ),
    };

    Ok(ResourceProfile {
        identifier,
        kind,
        engine_type: configuration.engine,
        exported_log_streams: configuration
            .enabled_cloudwatch_logs_exports
            .unwrap_or_default()
            .into_iter()
            .collect::<BTreeSet<_>>(),
        vpc_id: configuration.db_subnet_group.and_then(|group| group.vpc_id),
    })
}

use std::str::FromStr;
use std::time::Duration;

use rusoto_core::Region;

use crate::error::ComplianceError;
use crate::subnet::ProductionRange;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 30;
pub const DEFAULT_ALERT_TOPIC: &str = "compliance-reporter-topic";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub region: Option<Region>,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub alert_topic_name: String,
    pub alarm_actions_enabled: bool,
    pub production_range: Option<ProductionRange>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
            alert_topic_name: DEFAULT_ALERT_TOPIC.to_string(),
            alarm_actions_enabled: false,
            production_range: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Reads:
    /// - `COMPLIANCE_REGION` - region for every client, rusoto default chain otherwise
    /// - `REMEDIATION_MAX_ATTEMPTS` - bounded remediation attempts
    /// - `REMEDIATION_RETRY_DELAY_SECS` - fixed delay between attempts
    /// - `ALERT_TOPIC_NAME` - SNS topic the alarm notifies
    /// - `ALARM_ACTIONS_ENABLED` - whether the alarm fires its actions
    /// - `PRODUCTION_CIDR` - resources outside this range are not applicable
    pub fn from_env() -> Result<Self, ComplianceError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ComplianceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let defaults = Config::default();

        let region = read("COMPLIANCE_REGION")
            .map(|value| parse::<Region>("COMPLIANCE_REGION", &value))
            .transpose()?;
        let max_attempts = match read("REMEDIATION_MAX_ATTEMPTS") {
            Some(value) => parse::<u32>("REMEDIATION_MAX_ATTEMPTS", &value)?,
            None => defaults.max_attempts,
        };
        if max_attempts == 0 {
            return Err(ComplianceError::Config {
                name: "REMEDIATION_MAX_ATTEMPTS",
                message: "must be at least 1".to_string(),
            });
        }
        let retry_delay = match read("REMEDIATION_RETRY_DELAY_SECS") {
            Some(value) => {
                Duration::from_secs(parse::<u64>("REMEDIATION_RETRY_DELAY_SECS", &value)?)
            }
            None => defaults.retry_delay,
        };
        let alarm_actions_enabled = match read("ALARM_ACTIONS_ENABLED") {
            Some(value) => parse::<bool>("ALARM_ACTIONS_ENABLED", &value.to_lowercase())?,
            None => defaults.alarm_actions_enabled,
        };
        let production_range = read("PRODUCTION_CIDR")
            .map(|value| parse::<ProductionRange>("PRODUCTION_CIDR", &value))
            .transpose()?;

        Ok(Config {
            region,
            max_attempts,
            retry_delay,
            alert_topic_name: read("ALERT_TOPIC_NAME").unwrap_or(defaults.alert_topic_name),
            alarm_actions_enabled,
            production_range,
        })
    }

    pub fn region(&self) -> Region {
        self.region.clone().unwrap_or_default()
    }
}

fn parse<T>(name: &'static str, value: &str) -> Result<T, ComplianceError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|error| ComplianceError::Config {
        name,
        message: format!("{:?}: {}", value, error),
    })
}

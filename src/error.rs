use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ComplianceError {
    #[error("Value is None: {0}")]
    MissingValue(&'static str),
    #[error("Invalid event: {0}")]
    InvalidEvent(String),
    #[error("Failed to parse json: {0}")]
    Json(String),
    #[error("Invalid configuration for {name}: {message}")]
    Config { name: &'static str, message: String },
    #[error("Failed to describe {identifier}: {message}")]
    DescribeFailed { identifier: String, message: String },
    #[error("Failed to look up network {vpc_id}: {message}")]
    NetworkLookupFailed { vpc_id: String, message: String },
    #[error("Remediation of {identifier} gave up after {attempts} attempts")]
    RemediationExhausted { identifier: String, attempts: u32 },
    #[error("Monitoring setup failed at {step}: {message}")]
    SetupFailed { step: &'static str, message: String },
    #[error("Failed to submit evaluation: {0}")]
    ReportFailed(String),
}

impl From<serde_json::Error> for ComplianceError {
    fn from(error: serde_json::Error) -> ComplianceError {
        ComplianceError::Json(error.to_string())
    }
}

impl From<chrono::ParseError> for ComplianceError {
    fn from(error: chrono::ParseError) -> ComplianceError {
        ComplianceError::InvalidEvent(format!("bad timestamp: {}", error))
    }
}

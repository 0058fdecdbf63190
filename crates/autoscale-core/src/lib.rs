pub mod group;
pub mod launch;
pub mod policy;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use group::{
    CreateGroupRequest, Group, GroupConfiguration, GroupInstance, GroupState, Link, LinkRelation,
};
pub use launch::{LaunchConfiguration, LaunchConfigurationType, LoadBalancer, Personality};
pub use policy::{
    CreateScalingPolicy, ScalingPolicy, ScalingPolicyTargetType, ScalingPolicyType, Schedule,
};

#[derive(Debug, Clone, Error)]
pub enum AutoscaleError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Unknown zone: {0}")]
    UnknownZone(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl AutoscaleError {
    /// Builds an API error from a non-2xx response, preferring the service's
    /// fault message when the body carries one.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = match serde_json::from_str::<ApiFault>(body) {
            Ok(fault) => fault.to_string(),
            Err(_) if body.trim().is_empty() => "empty response body".to_string(),
            Err(_) => body.trim().to_string(),
        };
        AutoscaleError::Api { status, message }
    }
}

impl From<serde_json::Error> for AutoscaleError {
    fn from(err: serde_json::Error) -> Self {
        AutoscaleError::SerializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AutoscaleError>;

/// Error body returned by the autoscale service on failed requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiFault {
    #[serde(rename = "type")]
    pub kind: String,
    pub code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiFault {
    pub fn new(kind: impl Into<String>, code: u16, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl std::fmt::Display for ApiFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(details) = &self.details {
            if !details.is_empty() {
                write!(f, " ({details})")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_uses_fault_message() {
        let body = r#"{"type":"ValidationError","code":400,"message":"minEntities must be less than maxEntities","details":""}"#;
        let err = AutoscaleError::from_response(400, body);
        match err {
            AutoscaleError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(
                    message,
                    "ValidationError: minEntities must be less than maxEntities"
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_api_error_falls_back_to_raw_body() {
        let err = AutoscaleError::from_response(503, "  Service Unavailable\n");
        assert_eq!(
            err.to_string(),
            "API error (status 503): Service Unavailable"
        );
    }

    #[test]
    fn test_api_error_empty_body() {
        let err = AutoscaleError::from_response(500, "");
        assert!(err.to_string().contains("empty response body"));
    }

    #[test]
    fn test_fault_with_details_display() {
        let fault = ApiFault::new("NoSuchScalingGroupError", 404, "group not found")
            .with_details("id=abc");
        assert_eq!(
            fault.to_string(),
            "NoSuchScalingGroupError: group not found (id=abc)"
        );
    }

    #[test]
    fn test_serde_error_conversion() {
        let err: AutoscaleError = serde_json::from_str::<GroupConfiguration>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, AutoscaleError::SerializationError(_)));
    }

    #[test]
    fn test_not_found_display() {
        let err = AutoscaleError::NotFound("group 42".to_string());
        assert_eq!(err.to_string(), "Not found: group 42");
    }
}

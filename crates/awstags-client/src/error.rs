//! Tagging API client error types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One entry of the service's `FailedResourcesMap`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedResource {
    #[serde(rename = "StatusCode", default)]
    pub status_code: Option<u16>,
    #[serde(rename = "ErrorCode", default)]
    pub error_code: Option<String>,
    #[serde(rename = "ErrorMessage", default)]
    pub error_message: Option<String>,
}

/// Errors from tagging API calls.
#[derive(Debug, thiserror::Error)]
pub enum TaggingApiError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The service returned a non-2xx status.
    #[error("tagging API {endpoint} returned {status}: {body}")]
    ApiError {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// The service accepted the call but failed it for some resources.
    #[error(
        "tagging API {endpoint} failed for {} resource(s): {}",
        .failures.len(),
        summarize(.failures)
    )]
    FailedResources {
        endpoint: String,
        failures: BTreeMap<String, FailedResource>,
    },
    /// Response body was not the expected JSON.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: serde_json::Error,
    },
    /// A backend refused the call without reaching the service.
    #[error("tagging API {endpoint} rejected the call: {reason}")]
    Rejected { endpoint: String, reason: String },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}

fn summarize(failures: &BTreeMap<String, FailedResource>) -> String {
    failures
        .iter()
        .map(|(arn, f)| {
            format!(
                "{arn} ({})",
                f.error_code.as_deref().unwrap_or("UnknownError")
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_resources_message_lists_each_arn() {
        let err = TaggingApiError::FailedResources {
            endpoint: "TagResources@us-east-1".into(),
            failures: BTreeMap::from([
                (
                    "arn:aws:sqs:us-east-1:1:a".to_string(),
                    FailedResource {
                        status_code: Some(400),
                        error_code: Some("InvalidParameterException".into()),
                        error_message: None,
                    },
                ),
                (
                    "arn:aws:sqs:us-east-1:1:b".to_string(),
                    FailedResource {
                        status_code: None,
                        error_code: None,
                        error_message: None,
                    },
                ),
            ]),
        };
        let msg = err.to_string();
        assert!(msg.contains("2 resource(s)"));
        assert!(msg.contains("arn:aws:sqs:us-east-1:1:a (InvalidParameterException)"));
        assert!(msg.contains("arn:aws:sqs:us-east-1:1:b (UnknownError)"));
    }
}

//! # DeveloperEnvironment Status
//!
//! Observed state. Only the controller writes these fields.

use serde::{Deserialize, Serialize};

/// Status of the DeveloperEnvironment resource
#[derive(Debug, Clone, Deserialize, Serialize, Default, schemars::JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeveloperEnvironmentStatus {
    /// Free-form phase; the controller writes "Ready" after a full provisioning chain
    #[serde(default)]
    pub phase: String,
    /// Conditions represent the latest available observations
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    /// HTTPS URL of the VS Code server
    #[serde(default, rename = "accessURL", skip_serializing_if = "Option::is_none")]
    pub access_url: Option<String>,
    /// Time of the last successful pass (RFC3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    /// Generation the last successful pass converged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

/// Condition contains details for the current condition of the environment
#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of condition (True, False, Unknown)
    pub status: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl DeveloperEnvironmentStatus {
    /// Parsed `last_updated`, if present and well-formed
    #[must_use]
    pub fn last_updated_time(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.last_updated
            .as_deref()
            .and_then(|ts| chrono::DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.with_timezone(&chrono::Utc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_access_url_key() {
        let status = DeveloperEnvironmentStatus {
            phase: "Ready".to_string(),
            access_url: Some("https://alice.example.com".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["accessURL"], "https://alice.example.com");
        assert!(value.get("conditions").is_none());
    }

    #[test]
    fn test_last_updated_time_parses_rfc3339() {
        let status = DeveloperEnvironmentStatus {
            last_updated: Some("2026-01-02T03:04:05Z".to_string()),
            ..Default::default()
        };
        let parsed = status.last_updated_time().unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-01-02T03:04:05+00:00");

        let garbage = DeveloperEnvironmentStatus {
            last_updated: Some("yesterday".to_string()),
            ..Default::default()
        };
        assert!(garbage.last_updated_time().is_none());
    }
}

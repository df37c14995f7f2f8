//! # Status
//!
//! Writes the observed state after a fully successful provisioning chain:
//! phase `Ready`, the access URL, the observed generation and a timestamp.
//! Conditions are not populated and partial progress is never reported.

use super::types::EnvironmentScope;
use crate::constants::PHASE_READY;
use crate::crd::DeveloperEnvironment;
use crate::store::{ClusterStore, StoreError};
use chrono::{DateTime, SecondsFormat, Utc};
use kube::discovery::ApiResource;
use serde_json::json;
use tracing::debug;

/// Timestamp for the next status write; never earlier than the previous one
#[must_use]
pub fn next_timestamp(previous: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    previous.map_or(now, |previous| previous.max(now))
}

/// Merge patch marking the environment ready
#[must_use]
pub fn ready_patch(
    env: &DeveloperEnvironment,
    scope: &EnvironmentScope,
    now: DateTime<Utc>,
) -> serde_json::Value {
    let previous = env.status.as_ref().and_then(|s| s.last_updated_time());
    json!({
        "phase": PHASE_READY,
        "accessURL": scope.access_url(),
        "lastUpdated": next_timestamp(previous, now).to_rfc3339_opts(SecondsFormat::Secs, true),
        "observedGeneration": env.metadata.generation,
    })
}

pub async fn mark_ready(
    store: &dyn ClusterStore,
    env: &DeveloperEnvironment,
    scope: &EnvironmentScope,
) -> Result<(), StoreError> {
    let patch = ready_patch(env, scope, Utc::now());
    debug!(environment = %scope.name, status = %patch, "writing status");
    store
        .patch_status(
            &ApiResource::erase::<DeveloperEnvironment>(&()),
            Some(&scope.namespace),
            &scope.name,
            &patch,
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{DeveloperEnvironmentSpec, DeveloperEnvironmentStatus};
    use chrono::TimeZone;

    fn scope() -> EnvironmentScope {
        EnvironmentScope {
            name: "alice".to_string(),
            namespace: "team".to_string(),
            uid: String::new(),
            domain_suffix: "example.test".to_string(),
        }
    }

    fn env(last_updated: Option<&str>) -> DeveloperEnvironment {
        let mut env = DeveloperEnvironment::new(
            "alice",
            DeveloperEnvironmentSpec {
                language: "rust".to_string(),
                version: String::new(),
                ide: Default::default(),
                database: Default::default(),
                dependencies: Vec::new(),
            },
        );
        env.metadata.generation = Some(3);
        env.status = Some(DeveloperEnvironmentStatus {
            last_updated: last_updated.map(str::to_string),
            ..Default::default()
        });
        env
    }

    #[test]
    fn test_ready_patch_fields() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let patch = ready_patch(&env(None), &scope(), now);
        assert_eq!(patch["phase"], "Ready");
        assert_eq!(patch["accessURL"], "https://alice.example.test");
        assert_eq!(patch["lastUpdated"], "2026-03-01T12:00:00Z");
        assert_eq!(patch["observedGeneration"], 3);
    }

    #[test]
    fn test_timestamp_never_moves_backwards() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let patch = ready_patch(&env(Some("2026-03-01T12:05:00Z")), &scope(), now);
        assert_eq!(patch["lastUpdated"], "2026-03-01T12:05:00Z");
    }
}

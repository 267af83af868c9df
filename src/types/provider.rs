// Copyright 2026, the confix authors
// SPDX-License-Identifier: Apache-2.0

//! The ConfigurationProvider custom resource.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{ContainerPort, EnvVar, Volume};
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::MOUNT_BASE_PATH;
use crate::hash::hash_values;

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[kube(group = "confix.dev", version = "v1alpha1", kind = "ConfigurationProvider")]
#[kube(namespaced, shortname = "cfgp")]
#[kube(status = "ConfigurationProviderStatus")]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationProviderSpec {
    /// Dot-delimited mount-path selector, e.g. `a.b.c` mounts at `/config/a/b/c`
    pub key: String,
    /// Arbitrary payload exposed to the target as a mounted file
    #[serde(default)]
    pub data: serde_json::Map<String, Value>,
    /// Optional overrides merged into one container of the target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerOverride>,
    /// Additional volumes added verbatim to the target pod template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volumes: Option<Vec<Volume>>,
    /// More verbatim volumes, kept separate for compatibility with the
    /// resource shape consumers already write
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_volumes: Option<Vec<Volume>>,
    /// Label selector deciding which targets this provider applies to.
    /// Absent or empty means every target (intentional wildcard).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applies_to: Option<BTreeMap<String, LabelMatch>>,
}

/// Acceptable values for one `appliesTo` label key: a single scalar that
/// must match exactly, or a set the target's value must be a member of.
#[derive(Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[serde(untagged)]
pub enum LabelMatch {
    Value(String),
    In(Vec<String>),
}

/// Container-level overrides. Scalar fields replace the target's value,
/// `env` merges by entry name with the override winning, and the remaining
/// list fields are unioned by full-value equality.
#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContainerOverride {
    /// Target container; the first container when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<Vec<EnvVar>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<ContainerPort>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_pull_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationProviderStatus {
    /// Per-target outcome of the most recent fan-out pass
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_to: Option<BTreeMap<String, TargetOutcome>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TargetOutcome {
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub timestamp: String,
}

impl ConfigurationProvider {
    /// Content hash covering everything whose change requires a re-apply:
    /// the payload, the container overrides and the verbatim volumes.
    pub fn content_hash(&self) -> String {
        let data = Value::Object(self.spec.data.clone());
        let container = to_value_or_null(&self.spec.container);
        let volumes = to_value_or_null(&self.spec.volumes);
        hash_values(&[&data, &container, &volumes])
    }

    /// Content-addressed name of the ConfigMap carrying this provider's
    /// payload. Same name and data produce the same artifact name, so
    /// creation is naturally idempotent; any data change rolls the name.
    pub fn artifact_name(&self) -> String {
        let name = Value::String(self.name_any());
        let data = Value::Object(self.spec.data.clone());
        format!("{}-{}", self.name_any(), hash_values(&[&name, &data]))
    }

    /// Where the payload is mounted inside the container. Derived from
    /// `spec.key` only, so it stays stable across content changes.
    pub fn mount_path(&self) -> String {
        format!("{}/{}", MOUNT_BASE_PATH, self.spec.key.split('.').collect::<Vec<_>>().join("/"))
    }
}

fn to_value_or_null<T: Serialize>(value: &Option<T>) -> Value {
    value
        .as_ref()
        .and_then(|v| serde_json::to_value(v).ok())
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::make_provider;

    #[test]
    fn test_mount_path_from_key() {
        let provider = make_provider("db", "app.backend.db", serde_json::json!({}));
        assert_eq!(provider.mount_path(), "/config/app/backend/db");
    }

    #[test]
    fn test_mount_path_single_segment() {
        let provider = make_provider("db", "db", serde_json::json!({}));
        assert_eq!(provider.mount_path(), "/config/db");
    }

    #[test]
    fn test_artifact_name_prefixed_with_provider_name() {
        let provider = make_provider("db", "db", serde_json::json!({"v": 1}));
        assert!(provider.artifact_name().starts_with("db-"));
    }

    #[test]
    fn test_artifact_name_stable_for_same_data() {
        let a = make_provider("db", "db", serde_json::json!({"v": 1}));
        let b = make_provider("db", "db", serde_json::json!({"v": 1}));
        assert_eq!(a.artifact_name(), b.artifact_name());
    }

    #[test]
    fn test_artifact_name_changes_with_data() {
        let a = make_provider("db", "db", serde_json::json!({"v": 1}));
        let b = make_provider("db", "db", serde_json::json!({"v": 2}));
        assert_ne!(a.artifact_name(), b.artifact_name());
    }

    #[test]
    fn test_content_hash_changes_with_container_override() {
        let plain = make_provider("db", "db", serde_json::json!({"v": 1}));
        let mut with_override = plain.clone();
        with_override.spec.container = Some(ContainerOverride {
            image: Some("nginx:1.27".to_string()),
            ..Default::default()
        });
        assert_ne!(plain.content_hash(), with_override.content_hash());
    }

    #[test]
    fn test_content_hash_changes_with_data() {
        let a = make_provider("db", "db", serde_json::json!({"v": 1}));
        let b = make_provider("db", "db", serde_json::json!({"v": 2}));
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_content_hash_ignores_key() {
        let a = make_provider("db", "one.path", serde_json::json!({"v": 1}));
        let b = make_provider("db", "another.path", serde_json::json!({"v": 1}));
        assert_eq!(a.content_hash(), b.content_hash());
    }
}

// Copyright 2026, the confix authors
// SPDX-License-Identifier: Apache-2.0

//! Pure pod-template patch computation.
//!
//! [`compute_patch`] turns a provider plus a snapshot of its target into a
//! JSON merge-patch body. It performs no I/O and is deterministic: the same
//! inputs always yield a structurally identical patch, so retries are safe.
//!
//! Override fields combine with the target by one of three strategies:
//! scalar fields replace the target's value, `env` merges by entry name
//! with the override winning, and the remaining list fields are unioned by
//! full-value equality (never removing or reordering what the target
//! declares). Merged `env` keeps the target's order, with overridden
//! entries replaced in place and override-only entries appended in
//! override order.

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, Container, EnvVar, PodTemplateSpec, Volume, VolumeMount,
};
use kube::ResourceExt;
use serde_json::{json, Value};

use crate::constants::annotations;
use crate::error::{ConfixError, Result};
use crate::ledger;
use crate::types::provider::{ConfigurationProvider, ContainerOverride};

/// Compute the merge patch applying `provider` to `target`, referencing the
/// already-upserted artifact by name.
///
/// The body bundles the pod-template changes and the updated ledger
/// annotation into one write, and carries the snapshot's resourceVersion so
/// a concurrent writer surfaces as a 409 instead of being clobbered.
pub fn compute_patch(
    provider: &ConfigurationProvider,
    target: &Deployment,
    artifact_name: &str,
) -> Result<Value> {
    let target_name = target.name_any();
    let provider_name = provider.name_any();

    let mut template: PodTemplateSpec = target
        .spec
        .as_ref()
        .map(|s| s.template.clone())
        .ok_or_else(|| ConfixError::MalformedTarget(target_name.clone()))?;
    let pod_spec = template
        .spec
        .as_mut()
        .ok_or_else(|| ConfixError::MalformedTarget(target_name.clone()))?;

    let container = select_container(
        &mut pod_spec.containers,
        provider.spec.container.as_ref().and_then(|c| c.name.as_deref()),
        &target_name,
    )?;

    ensure_volume_mount(container, &provider_name, &provider.mount_path());

    if let Some(overrides) = &provider.spec.container {
        merge_overrides(container, overrides);
    }

    let volumes = pod_spec.volumes.get_or_insert_with(Vec::new);
    ensure_artifact_volume(volumes, &provider_name, artifact_name);
    if let Some(extra) = &provider.spec.volumes {
        volumes.extend(extra.iter().cloned());
    }
    if let Some(extra) = &provider.spec.extra_volumes {
        volumes.extend(extra.iter().cloned());
    }

    let ledger_entry = ledger::record(target, &provider_name, &provider.content_hash());

    let mut annotations_map = serde_json::Map::new();
    annotations_map.insert(annotations::APPLIED.to_string(), Value::String(ledger_entry));

    let mut metadata = serde_json::Map::new();
    if let Some(rv) = target.resource_version() {
        metadata.insert("resourceVersion".to_string(), Value::String(rv));
    }
    metadata.insert("annotations".to_string(), Value::Object(annotations_map));

    Ok(json!({
        "metadata": Value::Object(metadata),
        "spec": {
            "template": serde_json::to_value(&template)?
        }
    }))
}

/// Pick the named container, or the first one when no name is configured.
fn select_container<'a>(
    containers: &'a mut [Container],
    name: Option<&str>,
    target_name: &str,
) -> Result<&'a mut Container> {
    match name {
        Some(n) => containers
            .iter_mut()
            .find(|c| c.name == n)
            .ok_or_else(|| ConfixError::ContainerNotFound(n.to_string())),
        None => containers
            .first_mut()
            .ok_or_else(|| ConfixError::MalformedTarget(target_name.to_string())),
    }
}

/// Ensure a mount named after the provider. An existing entry is left
/// untouched: the mount path derives from `spec.key` only and never moves
/// when content changes.
fn ensure_volume_mount(container: &mut Container, volume_name: &str, mount_path: &str) {
    let mounts = container.volume_mounts.get_or_insert_with(Vec::new);
    if mounts.iter().any(|m| m.name == volume_name) {
        return;
    }
    mounts.push(VolumeMount {
        name: volume_name.to_string(),
        mount_path: mount_path.to_string(),
        ..Default::default()
    });
}

/// Ensure a volume named after the provider pointing at the current
/// artifact. When the volume already exists, only the ConfigMap reference
/// is rewritten - that is the one field that moves when content changes.
fn ensure_artifact_volume(volumes: &mut Vec<Volume>, volume_name: &str, artifact_name: &str) {
    let source = ConfigMapVolumeSource {
        name: artifact_name.to_string(),
        ..Default::default()
    };
    if let Some(existing) = volumes.iter_mut().find(|v| v.name == volume_name) {
        existing.config_map = Some(source);
        return;
    }
    volumes.push(Volume {
        name: volume_name.to_string(),
        config_map: Some(source),
        ..Default::default()
    });
}

fn merge_overrides(container: &mut Container, overrides: &ContainerOverride) {
    if let Some(env) = &overrides.env {
        container.env = Some(merge_env(container.env.take(), env));
    }
    if let Some(args) = &overrides.args {
        container.args = Some(union_by_value(container.args.take(), args));
    }
    if let Some(command) = &overrides.command {
        container.command = Some(union_by_value(container.command.take(), command));
    }
    if let Some(ports) = &overrides.ports {
        container.ports = Some(union_by_value(container.ports.take(), ports));
    }
    if let Some(image) = &overrides.image {
        container.image = Some(image.clone());
    }
    if let Some(policy) = &overrides.image_pull_policy {
        container.image_pull_policy = Some(policy.clone());
    }
    if let Some(dir) = &overrides.working_dir {
        container.working_dir = Some(dir.clone());
    }
}

/// Union of target env and override env keyed by entry name; the override
/// wins on collision, unmatched target entries are preserved.
fn merge_env(existing: Option<Vec<EnvVar>>, overrides: &[EnvVar]) -> Vec<EnvVar> {
    let existing = existing.unwrap_or_default();
    let mut merged = Vec::with_capacity(existing.len() + overrides.len());

    for entry in existing {
        match overrides.iter().find(|o| o.name == entry.name) {
            Some(winner) => merged.push(winner.clone()),
            None => merged.push(entry),
        }
    }
    for entry in overrides {
        if !merged.iter().any(|m: &EnvVar| m.name == entry.name) {
            merged.push(entry.clone());
        }
    }

    merged
}

/// Append override elements not already present; existing elements are
/// never removed or reordered.
fn union_by_value<T: PartialEq + Clone>(existing: Option<Vec<T>>, additions: &[T]) -> Vec<T> {
    let mut merged = existing.unwrap_or_default();
    for addition in additions {
        if !merged.contains(addition) {
            merged.push(addition.clone());
        }
    }
    merged
}

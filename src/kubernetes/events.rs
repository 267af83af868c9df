// Copyright 2026, the confix authors
// SPDX-License-Identifier: Apache-2.0

//! Audit trail: core/v1 Events recording what was applied where.

use chrono::Utc;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Event, EventSource, ObjectReference};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::{
    api::{ObjectMeta, PostParams},
    Api, Client, ResourceExt,
};
use tracing::error;

use crate::config::Config;
use crate::constants::reasons;
use crate::types::provider::ConfigurationProvider;

/// How an apply attempt ended, as surfaced on the audit trail.
#[derive(Debug, Clone, Copy)]
pub enum AuditOutcome {
    Applied,
    Failed,
}

impl AuditOutcome {
    fn reason(self) -> &'static str {
        match self {
            AuditOutcome::Applied => reasons::APPLIED,
            AuditOutcome::Failed => reasons::FAILED,
        }
    }

    fn event_type(self) -> &'static str {
        match self {
            AuditOutcome::Applied => "Normal",
            AuditOutcome::Failed => "Warning",
        }
    }
}

/// Emit an audit Event for one (provider, target) apply attempt.
/// The audit trail is best-effort: emit failures are logged, never
/// propagated into the reconciliation outcome.
pub async fn emit_apply_event(
    client: &Client,
    config: &Config,
    provider: &ConfigurationProvider,
    target: &Deployment,
    outcome: AuditOutcome,
    message: &str,
) {
    let namespace = target.namespace().unwrap_or_default();
    let event = build_apply_event(config, provider, target, outcome, message);

    let events: Api<Event> = Api::namespaced(client.clone(), &namespace);
    if let Err(e) = events.create(&PostParams::default(), &event).await {
        error!(
            "Failed to emit {} event for {}/{}: {}",
            outcome.reason(),
            namespace,
            target.name_any(),
            e
        );
    }
}

fn build_apply_event(
    config: &Config,
    provider: &ConfigurationProvider,
    target: &Deployment,
    outcome: AuditOutcome,
    message: &str,
) -> Event {
    let now = Time(Utc::now());
    let suffix = Utc::now().timestamp_nanos_opt().unwrap_or_default();

    Event {
        metadata: ObjectMeta {
            name: Some(format!("{}.{:x}", provider.name_any(), suffix)),
            namespace: target.namespace(),
            ..Default::default()
        },
        involved_object: ObjectReference {
            api_version: Some("apps/v1".to_string()),
            kind: Some("Deployment".to_string()),
            name: target.metadata.name.clone(),
            namespace: target.namespace(),
            uid: target.metadata.uid.clone(),
            resource_version: target.resource_version(),
            ..Default::default()
        },
        action: Some("ApplyConfiguration".to_string()),
        reason: Some(outcome.reason().to_string()),
        type_: Some(outcome.event_type().to_string()),
        message: Some(message.to_string()),
        reporting_component: Some(config.reporting_component.clone()),
        reporting_instance: Some(crate::constants::OPERATOR_NAME.to_string()),
        source: Some(EventSource {
            component: Some(provider.name_any()),
            ..Default::default()
        }),
        first_timestamp: Some(now.clone()),
        last_timestamp: Some(now),
        count: Some(1),
        ..Default::default()
    }
}

// Copyright 2026, the confix authors
// SPDX-License-Identifier: Apache-2.0

//! The idempotent per-pair apply: one provider onto one target.

use chrono::Utc;
use k8s_openapi::api::apps::v1::Deployment;
use kube::{
    api::{Patch, PatchParams},
    Api, Client, ResourceExt,
};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use crate::artifact;
use crate::config::Config;
use crate::error::Result;
use crate::kubernetes::{emit_apply_event, AuditOutcome};
use crate::ledger;
use crate::patch;
use crate::types::provider::{ConfigurationProvider, TargetOutcome};

/// Outcome of applying one provider to one target.
#[derive(Debug, Clone)]
pub enum ApplyState {
    /// Ledger already records the current content hash; no API calls made
    Unchanged,
    /// Patched successfully, ledger updated in the same write
    Applied,
    /// Target deleted between list and patch; dropped silently
    Vanished,
    /// Apply failed after exhausting retries (or a non-retryable error)
    Failed(String),
}

impl ApplyState {
    /// Status-map entry for this state; vanished targets produce none.
    pub fn to_outcome(&self) -> Option<TargetOutcome> {
        let (applied, reason) = match self {
            ApplyState::Unchanged => (true, Some("unchanged".to_string())),
            ApplyState::Applied => (true, None),
            ApplyState::Vanished => return None,
            ApplyState::Failed(reason) => (false, Some(reason.clone())),
        };
        Some(TargetOutcome {
            applied,
            reason,
            timestamp: Utc::now().to_rfc3339(),
        })
    }
}

/// Apply one provider to one target.
///
/// Sequence per pair: ledger check, artifact upsert, patch compute, patch
/// apply (ledger update rides in the same write), audit emit. Transient API
/// failures are retried with linear backoff; a 409 conflict re-reads the
/// target before recomputing, since the patch pins the snapshot's
/// resourceVersion. Errors never escape to sibling pairs.
#[instrument(
    skip(client, config, provider, target),
    fields(
        provider = %provider.name_any(),
        target = %format!("{}/{}", target.namespace().unwrap_or_default(), target.name_any())
    )
)]
pub async fn apply_one(
    client: &Client,
    config: &Config,
    provider: &ConfigurationProvider,
    target: &Deployment,
) -> ApplyState {
    let provider_name = provider.name_any();
    let target_name = target.name_any();
    let hash = provider.content_hash();

    if ledger::is_applied(target, &provider_name, &hash) {
        debug!("Configuration {} unchanged on {}, skipping", provider_name, target_name);
        return ApplyState::Unchanged;
    }

    let namespace = target.namespace().unwrap_or_default();
    let deployments: Api<Deployment> = Api::namespaced(client.clone(), &namespace);

    let mut snapshot = target.clone();
    let mut attempt: u32 = 0;

    loop {
        match try_apply(client, provider, &snapshot, &deployments).await {
            Ok(()) => {
                info!("Applied configuration {} to {}/{}", provider_name, namespace, target_name);
                let message = format!(
                    "Applied configuration provider {} to deployment {}/{}",
                    provider_name, namespace, target_name
                );
                emit_apply_event(client, config, provider, &snapshot, AuditOutcome::Applied, &message).await;
                return ApplyState::Applied;
            }
            Err(e) if e.is_not_found() => {
                debug!("Target {}/{} vanished, skipping", namespace, target_name);
                return ApplyState::Vanished;
            }
            Err(e) if (e.is_conflict() || e.is_transient()) && attempt < config.retry_attempts => {
                attempt += 1;
                warn!(
                    "Apply of {} to {}/{} failed (attempt {}/{}): {}",
                    provider_name, namespace, target_name, attempt, config.retry_attempts, e
                );
                let backoff = config.retry_backoff_secs * u64::from(attempt);
                if backoff > 0 {
                    sleep(Duration::from_secs(backoff)).await;
                }
                if e.is_conflict() {
                    match deployments.get(&target_name).await {
                        Ok(fresh) => {
                            // the conflicting writer may have been another
                            // reconciler applying the same content
                            if ledger::is_applied(&fresh, &provider_name, &hash) {
                                return ApplyState::Unchanged;
                            }
                            snapshot = fresh;
                        }
                        Err(kube::Error::Api(err)) if err.code == 404 => {
                            return ApplyState::Vanished;
                        }
                        Err(err) => {
                            // without a fresh snapshot the next patch is a
                            // guaranteed conflict, so stop here
                            error!("Re-read of {}/{} after conflict failed: {}", namespace, target_name, err);
                            let reason = err.to_string();
                            emit_apply_event(client, config, provider, &snapshot, AuditOutcome::Failed, &reason)
                                .await;
                            return ApplyState::Failed(reason);
                        }
                    }
                }
            }
            Err(e) => {
                error!(
                    "Failed to apply configuration {} to {}/{}: {}",
                    provider_name, namespace, target_name, e
                );
                let reason = e.to_string();
                emit_apply_event(client, config, provider, &snapshot, AuditOutcome::Failed, &reason).await;
                return ApplyState::Failed(reason);
            }
        }
    }
}

async fn try_apply(
    client: &Client,
    provider: &ConfigurationProvider,
    target: &Deployment,
    deployments: &Api<Deployment>,
) -> Result<()> {
    let artifact_name = artifact::upsert(client, provider).await?;
    let body = patch::compute_patch(provider, target, &artifact_name)?;
    deployments
        .patch(&target.name_any(), &PatchParams::default(), &Patch::Merge(&body))
        .await?;
    Ok(())
}

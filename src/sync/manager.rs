// Copyright 2026, the confix authors
// SPDX-License-Identifier: Apache-2.0

//! Central coordinator driving both reconciliation directions.
//!
//! Reconcilers push change events here; the manager fans a changed provider
//! out to every matching target, and fans a changed target in against every
//! matching provider. Both directions converge on the same idempotent
//! [`apply_one`](crate::sync::apply::apply_one).

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::{stream, StreamExt};
use k8s_openapi::api::apps::v1::Deployment;
use kube::{
    api::{ListParams, Patch, PatchParams},
    Api, Client, ResourceExt,
};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};

use crate::config::Config;
use crate::error::Result;
use crate::selector;
use crate::sync::apply::{apply_one, ApplyState};
use crate::types::provider::{ConfigurationProvider, TargetOutcome};

/// Events that reconcilers send to the SyncManager
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A provider was created or its content changed
    ProviderChanged { provider: ConfigurationProvider },
    /// An eligible target was created or updated
    TargetChanged { target: Deployment },
}

/// Central coordinator for configuration injection.
/// Receives events from reconcilers and performs the actual apply work.
pub struct SyncManager {
    client: Client,
    config: Config,
    event_rx: mpsc::Receiver<SyncEvent>,
    initial_sync_done: Arc<AtomicBool>,
}

/// Handle to send events to the SyncManager
#[derive(Clone)]
pub struct SyncManagerHandle {
    event_tx: mpsc::Sender<SyncEvent>,
}

impl SyncManagerHandle {
    pub async fn send(&self, event: SyncEvent) {
        if let Err(e) = self.event_tx.send(event).await {
            error!("Failed to send event to SyncManager: {}", e);
        }
    }
}

/// Result of one fan-out pass.
pub struct FanOutPass {
    /// Per-target outcome; vanished targets are omitted
    pub outcomes: BTreeMap<String, TargetOutcome>,
    /// Whether any pair actually wrote (an apply or a failure)
    pub changed: bool,
}

/// A target is eligible when no other controller owns it; owned workloads
/// have their pod template managed by their owner and must not be patched.
pub fn is_eligible_target(target: &Deployment) -> bool {
    target
        .metadata
        .owner_references
        .as_ref()
        .map(|refs| refs.is_empty())
        .unwrap_or(true)
}

impl SyncManager {
    pub fn new(client: Client, config: Config) -> (Self, SyncManagerHandle) {
        let (event_tx, event_rx) = mpsc::channel(256);

        let manager = Self {
            client,
            config,
            event_rx,
            initial_sync_done: Arc::new(AtomicBool::new(false)),
        };

        let handle = SyncManagerHandle { event_tx };
        (manager, handle)
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        info!("SyncManager started, performing initial sync...");
        self.initial_sync().await;
        info!("Initial sync complete, listening for events...");

        while let Some(event) = self.event_rx.recv().await {
            self.handle_event(event).await;
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn initial_sync(&self) {
        let providers: Api<ConfigurationProvider> = Api::all(self.client.clone());
        match providers.list(&ListParams::default()).await {
            Ok(provider_list) => {
                info!("Found {} configuration providers", provider_list.items.len());
                for provider in &provider_list.items {
                    self.handle_provider_changed(provider).await;
                }
            }
            Err(e) => {
                // failed pass; the watchers deliver the missed pairs
                error!("Failed to list providers for initial sync: {}", e);
            }
        }

        self.initial_sync_done.store(true, Ordering::SeqCst);
    }

    async fn handle_event(&self, event: SyncEvent) {
        debug!("Handling event: {:?}", event);

        match event {
            SyncEvent::ProviderChanged { provider } => {
                self.handle_provider_changed(&provider).await;
            }
            SyncEvent::TargetChanged { target } => {
                self.handle_target_changed(&target).await;
            }
        }
    }

    #[instrument(skip(self, provider), fields(provider = %provider.name_any()))]
    async fn handle_provider_changed(&self, provider: &ConfigurationProvider) {
        match self.fan_out(provider).await {
            Ok(pass) => {
                // an all-unchanged pass writes nothing: a status patch would
                // bump the provider's resourceVersion and re-trigger its own
                // reconcile
                if pass.changed {
                    self.update_provider_status(provider, &pass.outcomes).await;
                }
            }
            Err(e) => {
                // whole pass failed; nothing recorded, retried on next trigger
                error!("Fan-out for provider {} failed: {}", provider.name_any(), e);
            }
        }
    }

    #[instrument(skip(self, target), fields(target = %format!("{}/{}", target.namespace().unwrap_or_default(), target.name_any())))]
    async fn handle_target_changed(&self, target: &Deployment) {
        // Initial sync already covers every existing pair
        if !self.initial_sync_done.load(Ordering::SeqCst) {
            debug!("Skipping target change, initial sync not complete");
            return;
        }

        if let Err(e) = self.fan_in(target).await {
            error!("Fan-in for target {} failed: {}", target.name_any(), e);
        }
    }

    /// Apply one provider to every matching target in its namespace.
    ///
    /// Pairs touch distinct targets, so they run through a bounded worker
    /// pool. Returns the per-target outcome map; vanished targets are
    /// omitted. A list failure aborts the whole pass with nothing recorded.
    pub async fn fan_out(&self, provider: &ConfigurationProvider) -> Result<FanOutPass> {
        let namespace = provider.namespace().unwrap_or_default();
        let deployments: Api<Deployment> = Api::namespaced(self.client.clone(), &namespace);

        let mut lp = ListParams::default();
        if let Some(base_selector) = &self.config.target_selector {
            lp = lp.labels(base_selector);
        }
        let targets = deployments.list(&lp).await?;

        let eligible: Vec<Deployment> = targets
            .items
            .into_iter()
            .filter(|t| {
                is_eligible_target(t)
                    && selector::matches(provider.spec.applies_to.as_ref(), t.metadata.labels.as_ref())
            })
            .collect();

        debug!(
            "Provider {} matches {} targets in {}",
            provider.name_any(),
            eligible.len(),
            namespace
        );

        let states: Vec<(String, ApplyState)> = stream::iter(eligible)
            .map(|target| async move {
                let state = apply_one(&self.client, &self.config, provider, &target).await;
                (target.name_any(), state)
            })
            .buffer_unordered(self.config.max_concurrent_applies)
            .collect()
            .await;

        let changed = states
            .iter()
            .any(|(_, state)| matches!(state, ApplyState::Applied | ApplyState::Failed(_)));
        let mut outcomes = BTreeMap::new();
        for (target_name, state) in states {
            if let Some(outcome) = state.to_outcome() {
                outcomes.insert(target_name, outcome);
            }
        }
        Ok(FanOutPass { outcomes, changed })
    }

    /// Apply every matching provider in the target's namespace to it.
    ///
    /// All pairs here share the one target object, so they run sequentially:
    /// concurrent patches would only conflict with each other. The target is
    /// re-read after each successful apply so the next patch sees a fresh
    /// resourceVersion.
    pub async fn fan_in(&self, target: &Deployment) -> Result<()> {
        if !is_eligible_target(target) {
            debug!("Target {} is owned, skipping", target.name_any());
            return Ok(());
        }

        let namespace = target.namespace().unwrap_or_default();
        let providers: Api<ConfigurationProvider> = Api::namespaced(self.client.clone(), &namespace);
        let deployments: Api<Deployment> = Api::namespaced(self.client.clone(), &namespace);

        let provider_list = providers.list(&ListParams::default()).await?;

        let mut snapshot = target.clone();
        for provider in provider_list
            .items
            .iter()
            .filter(|p| selector::matches(p.spec.applies_to.as_ref(), target.metadata.labels.as_ref()))
        {
            let state = apply_one(&self.client, &self.config, provider, &snapshot).await;

            // unchanged pairs write nothing, same as fan-out passes
            if !matches!(state, ApplyState::Unchanged) {
                if let Some(outcome) = state.to_outcome() {
                    self.update_status_entry(provider, &snapshot.name_any(), &outcome).await;
                }
            }

            match state {
                ApplyState::Applied => match deployments.get(&snapshot.name_any()).await {
                    Ok(fresh) => snapshot = fresh,
                    Err(e) => {
                        debug!("Target {} gone after apply: {}", snapshot.name_any(), e);
                        return Ok(());
                    }
                },
                ApplyState::Vanished => return Ok(()),
                _ => {}
            }
        }

        Ok(())
    }

    /// Replace the provider's status outcome map after a fan-out pass.
    async fn update_provider_status(
        &self,
        provider: &ConfigurationProvider,
        outcomes: &BTreeMap<String, TargetOutcome>,
    ) {
        let namespace = provider.namespace().unwrap_or_default();
        let providers: Api<ConfigurationProvider> = Api::namespaced(self.client.clone(), &namespace);

        let body = json!({ "status": { "appliedTo": outcomes } });
        if let Err(e) = providers
            .patch_status(&provider.name_any(), &PatchParams::default(), &Patch::Merge(&body))
            .await
        {
            error!("Failed to update status of provider {}: {}", provider.name_any(), e);
        }
    }

    /// Merge a single target's outcome into the provider's status map
    /// (fan-in touches one target of many, so no full replacement).
    async fn update_status_entry(
        &self,
        provider: &ConfigurationProvider,
        target_name: &str,
        outcome: &TargetOutcome,
    ) {
        let namespace = provider.namespace().unwrap_or_default();
        let providers: Api<ConfigurationProvider> = Api::namespaced(self.client.clone(), &namespace);

        let mut applied_to = serde_json::Map::new();
        applied_to.insert(
            target_name.to_string(),
            serde_json::to_value(outcome).unwrap_or(serde_json::Value::Null),
        );
        let body = json!({ "status": { "appliedTo": applied_to } });
        if let Err(e) = providers
            .patch_status(&provider.name_any(), &PatchParams::default(), &Patch::Merge(&body))
            .await
        {
            error!("Failed to update status of provider {}: {}", provider.name_any(), e);
        }
    }
}

// Copyright 2026, the confix authors
// SPDX-License-Identifier: Apache-2.0

//! Target reconciler - watches Deployments and notifies the sync manager
//! so new or relabeled targets pick up every matching provider.

use crate::config::Config;
use crate::error::{ConfixError, Result};
use crate::sync::{is_eligible_target, SyncEvent, SyncManagerHandle};
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use kube::{
    runtime::{controller::Action, Controller},
    Api, Client, ResourceExt,
};
use kube_runtime::watcher::Config as WatcherConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

pub struct TargetReconciler {
    client: Client,
    config: Config,
    sync_handle: SyncManagerHandle,
}

impl TargetReconciler {
    pub fn new(client: Client, config: Config, sync_handle: SyncManagerHandle) -> Self {
        Self {
            client,
            config,
            sync_handle,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let deployments: Api<Deployment> = Api::all(self.client.clone());

        let mut watcher_config = WatcherConfig::default();
        if let Some(base_selector) = &self.config.target_selector {
            watcher_config = watcher_config.labels(base_selector);
        }

        let context = Arc::new(self);

        Controller::new(deployments, watcher_config)
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled target: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }
}

async fn reconcile(target: Arc<Deployment>, ctx: Arc<TargetReconciler>) -> Result<Action> {
    let name = target.name_any();
    let namespace = target.namespace().unwrap_or_default();

    if !is_eligible_target(&target) {
        debug!("Deployment {}/{} is owned, skipping", namespace, name);
        return Ok(Action::await_change());
    }

    debug!("Reconciling target: {}/{}", namespace, name);

    ctx.sync_handle
        .send(SyncEvent::TargetChanged {
            target: (*target).clone(),
        })
        .await;

    Ok(Action::await_change())
}

fn error_policy(
    _target: Arc<Deployment>,
    error: &ConfixError,
    _ctx: Arc<TargetReconciler>,
) -> Action {
    error!("Reconciliation error: {}", error);
    Action::requeue(Duration::from_secs(60))
}

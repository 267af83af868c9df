// Copyright 2026, the confix authors
// SPDX-License-Identifier: Apache-2.0

//! Provider reconciler - watches ConfigurationProviders and notifies the
//! sync manager so changes fan out to matching targets.

use crate::error::{ConfixError, Result};
use crate::sync::{SyncEvent, SyncManagerHandle};
use crate::types::provider::ConfigurationProvider;
use futures::StreamExt;
use kube::{
    runtime::{controller::Action, watcher, Controller},
    Api, Client, ResourceExt,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

pub struct ProviderReconciler {
    client: Client,
    sync_handle: SyncManagerHandle,
}

impl ProviderReconciler {
    pub fn new(client: Client, sync_handle: SyncManagerHandle) -> Self {
        Self { client, sync_handle }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let providers: Api<ConfigurationProvider> = Api::all(self.client.clone());
        let context = Arc::new(self);

        Controller::new(providers, watcher::Config::default())
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled provider: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }
}

async fn reconcile(
    provider: Arc<ConfigurationProvider>,
    ctx: Arc<ProviderReconciler>,
) -> Result<Action> {
    debug!(
        "Reconciling provider: {}/{}",
        provider.namespace().unwrap_or_default(),
        provider.name_any()
    );

    ctx.sync_handle
        .send(SyncEvent::ProviderChanged {
            provider: (*provider).clone(),
        })
        .await;

    Ok(Action::await_change())
}

fn error_policy(
    _provider: Arc<ConfigurationProvider>,
    error: &ConfixError,
    _ctx: Arc<ProviderReconciler>,
) -> Action {
    error!("Reconciliation error: {}", error);
    Action::requeue(Duration::from_secs(60))
}

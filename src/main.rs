// Copyright 2026, the confix authors
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use tracing::{info, warn};

use confix::config::Config;
use confix::kubernetes::wait_for_provider_crd;
use confix::reconcilers::{ProviderReconciler, TargetReconciler};
use confix::sync::SyncManager;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting confix operator");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: target_selector={:?}, max_concurrent_applies={}",
        config.target_selector, config.max_concurrent_applies
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    // Wait for the ConfigurationProvider CRD before starting reconcilers
    info!("Waiting for ConfigurationProvider CRD to become available...");
    wait_for_provider_crd(&client).await?;

    // Create the sync manager and get a handle for reconcilers
    let (sync_manager, sync_handle) = SyncManager::new(client.clone(), config.clone());

    // Create reconcilers with the sync handle
    let provider_reconciler = ProviderReconciler::new(client.clone(), sync_handle.clone());
    let target_reconciler = TargetReconciler::new(client.clone(), config, sync_handle);

    info!("Starting reconcilers...");

    // Run sync manager and both reconcilers concurrently
    tokio::try_join!(
        sync_manager.run(),
        provider_reconciler.run(),
        target_reconciler.run()
    )?;

    // This should never be reached as reconcilers run forever
    warn!("All reconcilers stopped unexpectedly");
    Ok(())
}

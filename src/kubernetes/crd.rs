// Copyright 2026, the confix authors
// SPDX-License-Identifier: Apache-2.0

//! Startup gate waiting for the ConfigurationProvider CRD.

use kube::{discovery::Discovery, Client};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::constants::crd::{POLL_INTERVAL_SECS, POLL_MAX_INTERVAL_SECS};
use crate::error::Result;

const GROUP: &str = "confix.dev";
const VERSION: &str = "v1alpha1";
const KIND: &str = "ConfigurationProvider";

/// Wait for the ConfigurationProvider CRD to become available.
/// Uses exponential backoff starting at POLL_INTERVAL_SECS seconds.
pub async fn wait_for_provider_crd(client: &Client) -> Result<()> {
    let mut interval = POLL_INTERVAL_SECS;

    loop {
        match check_provider_crd_exists(client).await {
            Ok(true) => {
                info!("ConfigurationProvider CRD ({}/{}) is available", GROUP, VERSION);
                return Ok(());
            }
            Ok(false) => {
                info!(
                    "ConfigurationProvider CRD ({}/{}) not yet available, waiting {} seconds...",
                    GROUP, VERSION, interval
                );
            }
            Err(e) => {
                warn!(
                    "Error checking for ConfigurationProvider CRD: {}, retrying in {} seconds...",
                    e, interval
                );
            }
        }

        sleep(Duration::from_secs(interval)).await;

        // Exponential backoff with max cap
        interval = (interval * 2).min(POLL_MAX_INTERVAL_SECS);
    }
}

/// Check if the CRD exists by attempting to discover it.
async fn check_provider_crd_exists(client: &Client) -> Result<bool> {
    let discovery = Discovery::new(client.clone()).filter(&[GROUP]).run().await?;

    for group in discovery.groups() {
        if group.name() == GROUP {
            for (ar, _) in group.recommended_resources() {
                if ar.kind == KIND && ar.version == VERSION {
                    return Ok(true);
                }
            }
        }
    }

    Ok(false)
}

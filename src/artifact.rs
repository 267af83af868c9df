// Copyright 2026, the confix authors
// SPDX-License-Identifier: Apache-2.0

//! Content-addressed ConfigMap synthesis for provider payloads.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ConfigMap;
use kube::{api::ObjectMeta, api::PostParams, Api, Client, ResourceExt};
use tracing::{debug, info, instrument};

use crate::constants::labels;
use crate::error::Result;
use crate::types::provider::ConfigurationProvider;

/// Key of the single data entry inside the artifact, derived from the
/// artifact name so mounted files get a readable, stable-format name.
pub fn data_key(artifact_name: &str) -> String {
    format!("{}.yaml", artifact_name.replace('-', "_"))
}

/// Build the ConfigMap carrying the provider's payload, serialized as one
/// YAML entry and labeled with the owning provider for traceability.
pub fn build_config_map(provider: &ConfigurationProvider) -> Result<ConfigMap> {
    let name = provider.artifact_name();
    let payload = serde_yaml::to_string(&provider.spec.data)?;

    Ok(ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            namespace: provider.namespace(),
            labels: Some(BTreeMap::from([(
                labels::PROVIDER.to_string(),
                provider.name_any(),
            )])),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(data_key(&name), payload)])),
        ..Default::default()
    })
}

/// Ensure the provider's artifact exists, returning its name.
///
/// The name is content-addressed, so an existing ConfigMap with that name
/// already holds the right payload and no update path is needed. Superseded
/// artifacts from earlier content are left behind on purpose; sweeping them
/// is an external concern.
#[instrument(skip(client, provider), fields(provider = %provider.name_any()))]
pub async fn upsert(client: &Client, provider: &ConfigurationProvider) -> Result<String> {
    let name = provider.artifact_name();
    let namespace = provider.namespace().unwrap_or_default();
    let config_maps: Api<ConfigMap> = Api::namespaced(client.clone(), &namespace);

    match config_maps.get(&name).await {
        Ok(_) => {
            debug!("Artifact {} already exists", name);
            Ok(name)
        }
        Err(kube::Error::Api(err)) if err.code == 404 => {
            info!("Creating artifact {} for provider {}", name, provider.name_any());
            let cm = build_config_map(provider)?;
            config_maps.create(&PostParams::default(), &cm).await?;
            Ok(name)
        }
        Err(e) => Err(e.into()),
    }
}

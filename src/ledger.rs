// Copyright 2026, the confix authors
// SPDX-License-Identifier: Apache-2.0

//! The per-target ledger of applied configuration hashes.
//!
//! The ledger lives in a single annotation on the target as a JSON object
//! mapping provider name to content hash. A ledger entry equals the
//! provider's current hash exactly when the patch reflecting that content
//! has been applied, which is what makes reconciliation re-runnable without
//! re-patching. The ledger is only ever written as part of the same patch
//! that applies the configuration, never as a second call.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::Deployment;

use crate::constants::annotations;

/// Parse the ledger annotation. Absent, empty or malformed content all
/// degrade to an empty map so that a corrupted annotation heals itself on
/// the next apply instead of wedging the target.
pub fn applied_map(target: &Deployment) -> BTreeMap<String, String> {
    target
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(annotations::APPLIED))
        .and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or_default()
}

/// True iff the ledger records exactly this hash for this provider.
pub fn is_applied(target: &Deployment, provider_name: &str, hash: &str) -> bool {
    applied_map(target).get(provider_name).is_some_and(|h| h == hash)
}

/// Serialized ledger with `{provider_name: hash}` merged in, ready to be
/// embedded in the annotation section of the apply patch.
pub fn record(target: &Deployment, provider_name: &str, hash: &str) -> String {
    let mut map = applied_map(target);
    map.insert(provider_name.to_string(), hash.to_string());
    serde_json::to_string(&map).unwrap_or_else(|_| "{}".to_string())
}

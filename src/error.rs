// Copyright 2026, the confix authors
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfixError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("container '{0}' not found in target pod template")]
    ContainerNotFound(String),

    #[error("target '{0}' has no usable pod template")]
    MalformedTarget(String),

    #[error("failed to serialize configuration payload: {0}")]
    PayloadSerialization(#[from] serde_yaml::Error),

    #[error("failed to build patch body: {0}")]
    PatchSerialization(#[from] serde_json::Error),
}

impl ConfixError {
    /// True for optimistic-concurrency rejections. The target must be
    /// re-read before the patch is recomputed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ConfixError::KubeError(kube::Error::Api(e)) if e.code == 409)
    }

    /// True when the API reports the object gone (deleted between list and
    /// patch).
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConfixError::KubeError(kube::Error::Api(e)) if e.code == 404)
    }

    /// True for errors worth retrying: server-side 5xx, throttling, or
    /// transport failures. Conflicts are retryable too but need a fresh read
    /// first, so they are classified separately.
    pub fn is_transient(&self) -> bool {
        match self {
            ConfixError::KubeError(kube::Error::Api(e)) => e.code == 429 || e.code >= 500,
            ConfixError::KubeError(kube::Error::Service(_)) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfixError>;

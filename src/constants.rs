// Copyright 2026, the confix authors
// SPDX-License-Identifier: Apache-2.0

/// Kubernetes annotation keys used by confix
pub mod annotations {
    /// Per-target ledger of applied configuration hashes, stored as a JSON
    /// object mapping provider name to content hash
    pub const APPLIED: &str = "config.confix.dev/applied";
}

/// Kubernetes label keys used by confix
pub mod labels {
    /// Set on generated ConfigMaps, pointing back at the owning provider
    pub const PROVIDER: &str = "config.confix.dev/provider";
}

/// The operator name used for patching and event reporting
pub const OPERATOR_NAME: &str = "confix";

/// Base directory under which configuration payloads are mounted
pub const MOUNT_BASE_PATH: &str = "/config";

/// Number of hex characters kept from the content digest. Ledger entries and
/// ConfigMap names embed hashes of this length, so it must never change.
pub const HASH_LEN: usize = 10;

/// Event reasons emitted on the audit trail
pub mod reasons {
    pub const APPLIED: &str = "AppliedConfigurationProvider";
    pub const FAILED: &str = "FailedToApplyConfigurationProvider";
}

/// CRD polling configuration
pub mod crd {
    /// Initial polling interval in seconds when waiting for the CRD
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}

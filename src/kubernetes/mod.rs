// Copyright 2026, the confix authors
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for CRD discovery and audit event emission.

pub mod crd;
pub mod events;

pub use crd::wait_for_provider_crd;
pub use events::{emit_apply_event, AuditOutcome};

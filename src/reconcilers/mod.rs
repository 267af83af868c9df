// Copyright 2026, the confix authors
// SPDX-License-Identifier: Apache-2.0

//! Watch-driven reconcilers feeding the sync manager.

pub mod provider;
pub mod target;

pub use provider::ProviderReconciler;
pub use target::TargetReconciler;

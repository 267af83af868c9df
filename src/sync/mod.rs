// Copyright 2026, the confix authors
// SPDX-License-Identifier: Apache-2.0

//! Fan-out/fan-in orchestration of configuration applies.

pub mod apply;
pub mod manager;

pub use apply::{apply_one, ApplyState};
pub use manager::{is_eligible_target, FanOutPass, SyncEvent, SyncManager, SyncManagerHandle};

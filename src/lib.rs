// Copyright 2026, the confix authors
// SPDX-License-Identifier: Apache-2.0
pub mod artifact;
pub mod config;
pub mod constants;
pub mod error;
pub mod hash;
pub mod kubernetes;
pub mod ledger;
pub mod patch;
pub mod reconcilers;
pub mod selector;
pub mod sync;
pub mod types;

#[cfg(test)]
pub mod test_utils;

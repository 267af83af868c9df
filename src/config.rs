// Copyright 2026, the confix authors
// SPDX-License-Identifier: Apache-2.0
use std::env;

use anyhow::Result;

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Optional label selector restricting which Deployments are eligible
    /// targets (applied on top of the unowned-Deployments filter)
    pub target_selector: Option<String>,
    /// Maximum number of targets patched concurrently in a fan-out pass
    pub max_concurrent_applies: usize,
    /// Retry attempts for transient API failures and write conflicts
    pub retry_attempts: u32,
    /// Base backoff between retries, in seconds (grows linearly per attempt)
    pub retry_backoff_secs: u64,
    /// Value reported as `reportingComponent` on audit events
    pub reporting_component: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let target_selector = env::var("CONFIX_TARGET_SELECTOR").ok().filter(|s| !s.is_empty());
        let max_concurrent_applies = env::var("CONFIX_MAX_CONCURRENT_APPLIES")
            .unwrap_or_default()
            .parse()
            .unwrap_or(4)
            .max(1);
        let retry_attempts = env::var("CONFIX_RETRY_ATTEMPTS")
            .unwrap_or_default()
            .parse()
            .unwrap_or(2);
        let retry_backoff_secs = env::var("CONFIX_RETRY_BACKOFF_SECS")
            .unwrap_or_default()
            .parse()
            .unwrap_or(1);
        let reporting_component =
            env::var("CONFIX_REPORTING_COMPONENT").unwrap_or_else(|_| crate::constants::OPERATOR_NAME.to_string());

        Ok(Config {
            target_selector,
            max_concurrent_applies,
            retry_attempts,
            retry_backoff_secs,
            reporting_component,
        })
    }
}

#[cfg(test)]
impl Default for Config {
    fn default() -> Self {
        Config {
            target_selector: None,
            max_concurrent_applies: 4,
            retry_attempts: 0,
            retry_backoff_secs: 0,
            reporting_component: crate::constants::OPERATOR_NAME.to_string(),
        }
    }
}

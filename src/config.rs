// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

use crate::constants::DEFAULT_RETRY_SECS;

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Namespace the operator runs in
    pub operator_namespace: String,
    /// Report addon status to OCM
    pub enable_status_reporting: bool,
    pub enable_metrics: bool,
    pub enable_monitoring_stack: bool,
    pub enable_package_operator: bool,
    /// Interval used when upstream state is not ready yet
    pub retry_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let operator_namespace = env::var("ADDON_OPERATOR_NAMESPACE")
            .context("ADDON_OPERATOR_NAMESPACE environment variable not set")?;
        let retry_secs = match env::var("RECONCILE_RETRY_SECONDS") {
            Ok(v) => v
                .parse()
                .context("RECONCILE_RETRY_SECONDS must be a number of seconds")?,
            Err(_) => DEFAULT_RETRY_SECS,
        };

        Ok(Config {
            operator_namespace,
            enable_status_reporting: env_flag("ENABLE_STATUS_REPORTING", false),
            enable_metrics: env_flag("ENABLE_METRICS", true),
            enable_monitoring_stack: env_flag("ENABLE_MONITORING_STACK", false),
            enable_package_operator: env_flag("ENABLE_PACKAGE_OPERATOR", false),
            retry_interval: Duration::from_secs(retry_secs),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            operator_namespace: "addon-operator".to_string(),
            enable_status_reporting: false,
            enable_metrics: true,
            enable_monitoring_stack: false,
            enable_package_operator: false,
            retry_interval: Duration::from_secs(DEFAULT_RETRY_SECS),
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

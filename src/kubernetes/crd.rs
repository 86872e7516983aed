// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! API group availability checking utilities

use crate::constants::crd::{POLL_INTERVAL_SECS, POLL_MAX_INTERVAL_SECS, REQUIRED_GROUPS};
use crate::error::Result;
use kube::{discovery::Discovery, Client};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Wait for every required API group (OLM) to be served by the cluster.
/// This uses exponential backoff starting at POLL_INTERVAL_SECS seconds.
pub async fn wait_for_required_crds(client: &Client) -> Result<()> {
    let mut interval = POLL_INTERVAL_SECS;

    loop {
        match missing_groups(client).await {
            Ok(missing) if missing.is_empty() => {
                info!("Required API groups are available: {}", REQUIRED_GROUPS.join(", "));
                return Ok(());
            }
            Ok(missing) => {
                info!(
                    "API groups {} not yet available, waiting {} seconds...",
                    missing.join(", "),
                    interval
                );
            }
            Err(e) => {
                warn!(
                    "Error discovering API groups: {}, retrying in {} seconds...",
                    e, interval
                );
            }
        }

        sleep(Duration::from_secs(interval)).await;

        // Exponential backoff with max cap
        interval = (interval * 2).min(POLL_MAX_INTERVAL_SECS);
    }
}

async fn missing_groups(client: &Client) -> Result<Vec<&'static str>> {
    let discovery = Discovery::new(client.clone())
        .filter(REQUIRED_GROUPS)
        .run()
        .await?;

    Ok(REQUIRED_GROUPS
        .iter()
        .copied()
        .filter(|group| !discovery.has_group(group))
        .collect())
}

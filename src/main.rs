// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::sync::Arc;

use anyhow::Result;
use kube::Client;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use addon_operator::config::Config;
use addon_operator::controllers::{
    AddonInstanceReconciler, AddonOperatorReconciler, AddonReconciler, SharedState,
};
use addon_operator::coordination::{GlobalPause, ReconcileTrigger};
use addon_operator::kubernetes::wait_for_required_crds;
use addon_operator::metrics::Metrics;
use addon_operator::ocm::OcmHandle;
use addon_operator::reconcilers::OlmIndexes;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting addon operator");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: namespace={}, status_reporting={}, metrics={}",
        config.operator_namespace, config.enable_status_reporting, config.enable_metrics
    );

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    info!("Waiting for OLM API groups to become available...");
    wait_for_required_crds(&client).await?;

    let metrics = if config.enable_metrics {
        Some(Arc::new(Metrics::new()?))
    } else {
        None
    };
    let (trigger, requeue_all) = ReconcileTrigger::new();
    let shared = SharedState {
        pause: Arc::new(GlobalPause::new(trigger.clone())),
        ocm: Arc::new(OcmHandle::new(trigger)),
        metrics,
        indexes: OlmIndexes::default(),
    };

    let addon_reconciler = AddonReconciler::new(client.clone(), config.clone(), shared.clone());
    let instance_reconciler = AddonInstanceReconciler::new(client.clone(), shared.metrics.clone());
    let operator_reconciler = AddonOperatorReconciler::new(client, config, shared);

    info!("Starting controllers...");

    tokio::try_join!(
        addon_reconciler.run(requeue_all),
        instance_reconciler.run(),
        operator_reconciler.run()
    )?;

    warn!("All controllers stopped");
    Ok(())
}

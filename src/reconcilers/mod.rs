// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Sub-reconcilers, each owning one slice of an Addon's desired state, and
//! the pipeline running them in order.

pub mod addon_instance;
pub mod monitoring_federation;
pub mod monitoring_stack;
pub mod namespace;
pub mod olm;
pub mod package_operator;
pub mod secret_propagation;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kube::{Client, ResourceExt};
use tracing::debug;

use crate::config::Config;
use crate::coordination::ResourceIndex;
use crate::error::{AddonError, Result};
use crate::types::Addon;

pub use addon_instance::AddonInstanceReconciler;
pub use monitoring_federation::MonitoringFederationReconciler;
pub use monitoring_stack::MonitoringStackReconciler;
pub use namespace::NamespaceReconciler;
pub use olm::OlmReconciler;
pub use package_operator::PackageOperatorReconciler;
pub use secret_propagation::SecretPropagationReconciler;

/// What the pipeline should do after a sub-reconciler returned successfully.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Run the next sub-reconciler
    Continue,
    /// Upstream state is not ready; stop here and retry later
    RequeueAfter(Duration),
    /// Nothing more can be done until something changes
    Stop,
}

#[async_trait]
pub trait SubReconciler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Converge one slice of the addon's children. Status changes are made on
    /// `addon` and persisted by the caller.
    async fn reconcile(&self, addon: &mut Addon) -> Result<Outcome>;
}

/// Run `reconcilers` in order, stopping at the first error or non-`Continue` outcome.
pub async fn run_pipeline(
    reconcilers: &[Box<dyn SubReconciler>],
    addon: &mut Addon,
) -> Result<Outcome> {
    for reconciler in reconcilers {
        debug!("Running {} for addon {}", reconciler.name(), addon.name_any());
        match reconciler.reconcile(addon).await {
            Ok(Outcome::Continue) => continue,
            Ok(outcome) => {
                debug!("{} stopped the pipeline with {:?}", reconciler.name(), outcome);
                return Ok(outcome);
            }
            Err(source) => {
                return Err(AddonError::SubReconciler {
                    name: reconciler.name(),
                    source: Box::new(source),
                })
            }
        }
    }
    Ok(Outcome::Continue)
}

/// Indexes routing OLM-created objects back to their Addon
#[derive(Clone, Default)]
pub struct OlmIndexes {
    pub csvs: Arc<ResourceIndex>,
    pub operators: Arc<ResourceIndex>,
}

impl OlmIndexes {
    pub fn free(&self, addon: &str) {
        self.csvs.free(addon);
        self.operators.free(addon);
    }
}

/// The sub-reconcilers in registration order
pub fn default_pipeline(
    client: &Client,
    config: &Config,
    indexes: &OlmIndexes,
) -> Vec<Box<dyn SubReconciler>> {
    let retry = config.retry_interval;
    let mut pipeline: Vec<Box<dyn SubReconciler>> = vec![
        Box::new(NamespaceReconciler::new(client.clone(), retry)),
        Box::new(SecretPropagationReconciler::new(
            client.clone(),
            config.operator_namespace.clone(),
            retry,
        )),
        Box::new(AddonInstanceReconciler::new(client.clone())),
        Box::new(OlmReconciler::new(client.clone(), indexes.clone(), retry)),
        Box::new(MonitoringFederationReconciler::new(client.clone())),
    ];
    if config.enable_monitoring_stack {
        pipeline.push(Box::new(MonitoringStackReconciler::new(client.clone(), retry)));
    }
    if config.enable_package_operator {
        pipeline.push(Box::new(PackageOperatorReconciler::new(client.clone(), retry)));
    }
    pipeline
}

// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::{Api, Client, ResourceExt};
use tracing::instrument;

use super::{Outcome, SubReconciler};
use crate::desired::monitoring::{
    build_federation_namespace, build_service_monitor, federation_namespace_name,
};
use crate::error::Result;
use crate::kubernetes::{delete_if_controlled, reconcile_object};
use crate::types::monitoring::ServiceMonitor;
use crate::types::Addon;

/// Federates the addon's own Prometheus into cluster monitoring.
pub struct MonitoringFederationReconciler {
    client: Client,
}

impl MonitoringFederationReconciler {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SubReconciler for MonitoringFederationReconciler {
    fn name(&self) -> &'static str {
        "monitoring-federation"
    }

    #[instrument(skip_all, fields(addon = %addon.name_any()))]
    async fn reconcile(&self, addon: &mut Addon) -> Result<Outcome> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let federation = addon.spec.monitoring.as_ref().and_then(|m| m.federation.as_ref());

        let Some(federation) = federation else {
            // The ServiceMonitor goes with its namespace
            delete_if_controlled(&namespaces, &federation_namespace_name(addon), addon).await?;
            return Ok(Outcome::Continue);
        };

        let strategy = addon.spec.resource_adoption_strategy;
        reconcile_object(&namespaces, build_federation_namespace(addon), strategy).await?;

        let monitors: Api<ServiceMonitor> =
            Api::namespaced(self.client.clone(), &federation_namespace_name(addon));
        let monitor = build_service_monitor(addon, federation);
        reconcile_object(&monitors, monitor, strategy).await?;
        Ok(Outcome::Continue)
    }
}

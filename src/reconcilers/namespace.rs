// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::{Api, Client, ResourceExt};
use tracing::{info, instrument, warn};

use super::{Outcome, SubReconciler};
use crate::constants::conditions::reasons;
use crate::desired::namespace::{build_namespaces, is_active};
use crate::error::{AddonError, ErrorList, Result};
use crate::kubernetes::reconcile_object;
use crate::status::reporters::{report_collided_namespaces, report_pending};
use crate::types::Addon;

/// Ensures every namespace listed in `spec.namespaces` exists and is Active.
pub struct NamespaceReconciler {
    client: Client,
    retry: Duration,
}

impl NamespaceReconciler {
    pub fn new(client: Client, retry: Duration) -> Self {
        Self { client, retry }
    }
}

#[async_trait]
impl SubReconciler for NamespaceReconciler {
    fn name(&self) -> &'static str {
        "namespace"
    }

    #[instrument(skip_all, fields(addon = %addon.name_any()))]
    async fn reconcile(&self, addon: &mut Addon) -> Result<Outcome> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let strategy = addon.spec.resource_adoption_strategy;

        let mut collided = Vec::new();
        let mut conflicts = ErrorList::new();
        let mut unready = Vec::new();
        for desired in build_namespaces(addon) {
            let name = desired.name_any();
            match reconcile_object(&api, desired, strategy).await {
                Ok(namespace) if !is_active(&namespace) => unready.push(name),
                Ok(_) => {}
                Err(e @ AddonError::NotOwnedByUs { .. }) => {
                    warn!("Namespace {} collides with an existing namespace", name);
                    collided.push(name);
                    conflicts.push(e);
                }
                Err(e) => return Err(e),
            }
        }

        if !collided.is_empty() {
            report_collided_namespaces(addon, &collided);
            conflicts.into_result()?;
        }

        if !unready.is_empty() {
            info!("Waiting for namespaces to become active: {}", unready.join(", "));
            report_pending(
                addon,
                reasons::UNREADY_NAMESPACES,
                format!("Namespaces not yet in Active phase: {}", unready.join(", ")),
            );
            return Ok(Outcome::RequeueAfter(self.retry));
        }

        Ok(Outcome::Continue)
    }
}

// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::time::Duration;

use async_trait::async_trait;
use kube::{Api, Client, ResourceExt};
use tracing::{debug, instrument};

use super::{Outcome, SubReconciler};
use crate::constants::conditions::reasons;
use crate::desired::package::build_cluster_object_template;
use crate::error::Result;
use crate::kubernetes::{delete_if_controlled, reconcile_object};
use crate::status::reporters::report_pending;
use crate::types::package::ClusterObjectTemplate;
use crate::types::Addon;

/// Deploys the addon's package-operator package through a ClusterObjectTemplate.
pub struct PackageOperatorReconciler {
    client: Client,
    retry: Duration,
}

impl PackageOperatorReconciler {
    pub fn new(client: Client, retry: Duration) -> Self {
        Self { client, retry }
    }
}

#[async_trait]
impl SubReconciler for PackageOperatorReconciler {
    fn name(&self) -> &'static str {
        "package-operator"
    }

    #[instrument(skip_all, fields(addon = %addon.name_any()))]
    async fn reconcile(&self, addon: &mut Addon) -> Result<Outcome> {
        let api: Api<ClusterObjectTemplate> = Api::all(self.client.clone());
        let image = addon
            .spec
            .package_operator
            .as_ref()
            .map(|p| p.image.clone())
            .filter(|image| !image.is_empty());

        let Some(image) = image else {
            delete_if_controlled(&api, &addon.name_any(), addon).await?;
            return Ok(Outcome::Continue);
        };
        let Some(namespace) = addon.target_namespace().map(str::to_string) else {
            return Ok(Outcome::Continue);
        };

        let desired = build_cluster_object_template(addon, &image, &namespace)?;
        let strategy = addon.spec.resource_adoption_strategy;
        let template = reconcile_object(&api, desired, strategy).await?;
        if !template.is_available() {
            debug!("ClusterObjectTemplate {} is not available yet", template.name_any());
            report_pending(
                addon,
                reasons::UNREADY_PACKAGE,
                format!("ClusterObjectTemplate {} is not available yet", template.name_any()),
            );
            return Ok(Outcome::RequeueAfter(self.retry));
        }
        Ok(Outcome::Continue)
    }
}

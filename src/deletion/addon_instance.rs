// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use kube::{
    api::{Patch, PatchParams},
    Api, Client, ResourceExt,
};
use serde_json::json;
use tracing::{debug, info, instrument};

use super::DeletionStrategy;
use crate::constants::{conditions::READY_TO_BE_DELETED, ADDON_INSTANCE_NAME};
use crate::error::Result;
use crate::status::ConditionsExt;
use crate::types::{Addon, AddonInstance};

/// Deletion signalled through `AddonInstance.spec.markedForDeletion`; the
/// workload acknowledges with a ReadyToBeDeleted condition on the instance.
pub struct AddonInstanceStrategy {
    client: Client,
}

impl AddonInstanceStrategy {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, addon: &Addon) -> Option<Api<AddonInstance>> {
        addon
            .target_namespace()
            .map(|namespace| Api::namespaced(self.client.clone(), namespace))
    }
}

#[async_trait]
impl DeletionStrategy for AddonInstanceStrategy {
    fn name(&self) -> &'static str {
        "addon-instance"
    }

    #[instrument(skip_all, fields(addon = %addon.name_any()))]
    async fn notify_addon(&self, addon: &Addon) -> Result<()> {
        let Some(api) = self.api(addon) else {
            return Ok(());
        };
        match api.get_opt(ADDON_INSTANCE_NAME).await? {
            Some(instance) if !instance.spec.marked_for_deletion => {
                info!("Marking AddonInstance of addon {} for deletion", addon.name_any());
                let patch = json!({ "spec": { "markedForDeletion": true } });
                api.patch(ADDON_INSTANCE_NAME, &PatchParams::default(), &Patch::Merge(&patch))
                    .await?;
            }
            Some(_) => debug!("AddonInstance already marked for deletion"),
            None => debug!("No AddonInstance to notify"),
        }
        Ok(())
    }

    async fn ack_received_from_addon(&self, addon: &Addon) -> Result<bool> {
        let Some(api) = self.api(addon) else {
            return Ok(false);
        };
        Ok(api
            .get_opt(ADDON_INSTANCE_NAME)
            .await?
            .is_some_and(|instance| instance.conditions().is_condition_true(READY_TO_BE_DELETED)))
    }
}

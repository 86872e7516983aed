// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Deletion signalled through a labelled ConfigMap named after the addon.
//! The workload acknowledges by removing its own CSV.

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::{
    api::{Patch, PatchParams, PostParams},
    Api, Client, ResourceExt,
};
use serde_json::json;
use tracing::{debug, info, instrument};

use super::DeletionStrategy;
use crate::constants::legacy::delete_config_map_label;
use crate::desired::child_meta_with_labels;
use crate::error::Result;
use crate::types::olm::Operator;
use crate::types::Addon;

/// Whether the delete ConfigMap for `addon_name` exists in `namespace`
pub async fn delete_signal_present(
    client: &Client,
    addon_name: &str,
    namespace: &str,
) -> Result<bool> {
    let api: Api<ConfigMap> = Api::namespaced(client.clone(), namespace);
    let label = delete_config_map_label(addon_name);
    Ok(api
        .get_opt(addon_name)
        .await?
        .is_some_and(|cm| cm.labels().contains_key(&label)))
}

pub fn build_delete_config_map(addon: &Addon, namespace: &str) -> ConfigMap {
    let labels = BTreeMap::from([(delete_config_map_label(&addon.name_any()), String::new())]);
    ConfigMap {
        metadata: child_meta_with_labels(addon, &addon.name_any(), Some(namespace), labels),
        ..Default::default()
    }
}

pub struct LegacyConfigMapStrategy {
    client: Client,
}

impl LegacyConfigMapStrategy {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DeletionStrategy for LegacyConfigMapStrategy {
    fn name(&self) -> &'static str {
        "legacy-configmap"
    }

    #[instrument(skip_all, fields(addon = %addon.name_any()))]
    async fn notify_addon(&self, addon: &Addon) -> Result<()> {
        let Some(namespace) = addon.target_namespace() else {
            return Ok(());
        };
        let name = addon.name_any();
        let label = delete_config_map_label(&name);
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);

        match api.get_opt(&name).await? {
            None => {
                info!("Creating delete ConfigMap {}/{}", namespace, name);
                api.create(&PostParams::default(), &build_delete_config_map(addon, namespace))
                    .await?;
            }
            Some(cm) if !cm.labels().contains_key(&label) => {
                info!("Labelling ConfigMap {}/{} for deletion", namespace, name);
                let labels = BTreeMap::from([(label, String::new())]);
                let patch = json!({ "metadata": { "labels": labels } });
                api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
                    .await?;
            }
            Some(_) => debug!("Delete ConfigMap {}/{} already present", namespace, name),
        }
        Ok(())
    }

    async fn ack_received_from_addon(&self, addon: &Addon) -> Result<bool> {
        let Ok(install) = addon.spec.install.resolve() else {
            return Ok(true);
        };
        let Some(csv_key) = addon
            .status
            .as_ref()
            .and_then(|s| s.last_observed_available_csv.as_deref())
            .filter(|k| !k.is_empty())
        else {
            return Ok(true);
        };
        let (namespace, csv_name) = csv_key.split_once('/').unwrap_or(("", csv_key));

        let common = install.common();
        let operators: Api<Operator> = Api::all(self.client.clone());
        let Some(operator) = operators
            .get_opt(&Operator::name_for(&common.package_name, &common.namespace))
            .await?
        else {
            return Ok(true);
        };
        Ok(operator.csv_ref(namespace, csv_name).is_none())
    }
}

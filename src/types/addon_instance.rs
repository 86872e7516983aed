// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};
use kube::CustomResource;
use serde::{Deserialize, Serialize};

use crate::constants::heartbeat::DEFAULT_UPDATE_PERIOD;

/// Heartbeat object living next to the addon workload in its install namespace.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, PartialEq, schemars::JsonSchema)]
#[kube(group = "addons.managed.openshift.io", version = "v1alpha1", kind = "AddonInstance")]
#[kube(namespaced)]
#[kube(status = "AddonInstanceStatus")]
#[serde(rename_all = "camelCase")]
pub struct AddonInstanceSpec {
    /// How often the workload promises to report a heartbeat
    #[serde(default = "default_heartbeat_update_period")]
    pub heartbeat_update_period: String,
    /// Set by the operator to ask the workload to clean up
    #[serde(default)]
    pub marked_for_deletion: bool,
}

fn default_heartbeat_update_period() -> String {
    DEFAULT_UPDATE_PERIOD.to_string()
}

impl Default for AddonInstanceSpec {
    fn default() -> Self {
        Self {
            heartbeat_update_period: default_heartbeat_update_period(),
            marked_for_deletion: false,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddonInstanceStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_heartbeat_time: Option<Time>,
}

impl AddonInstance {
    pub fn generation(&self) -> i64 {
        self.metadata.generation.unwrap_or_default()
    }

    pub fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default()
    }

    pub fn status_mut(&mut self) -> &mut AddonInstanceStatus {
        self.status.get_or_insert_with(AddonInstanceStatus::default)
    }
}

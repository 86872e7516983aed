// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use kube::CustomResource;
use serde::{Deserialize, Serialize};

use super::StatusCondition;

/// package-operator object rendering a templated package manifest.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[kube(group = "package-operator.run", version = "v1alpha1", kind = "ClusterObjectTemplate")]
#[kube(status = "ClusterObjectTemplateStatus")]
#[serde(rename_all = "camelCase")]
pub struct ClusterObjectTemplateSpec {
    /// Go template of the object to create
    pub template: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<ObjectTemplateSource>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectTemplateSource {
    pub api_version: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub name: String,
    pub items: Vec<ObjectTemplateSourceItem>,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
pub struct ObjectTemplateSourceItem {
    pub key: String,
    pub destination: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
pub struct ClusterObjectTemplateStatus {
    #[serde(default)]
    pub conditions: Vec<StatusCondition>,
}

impl ClusterObjectTemplate {
    pub fn is_available(&self) -> bool {
        self.status.as_ref().is_some_and(|s| {
            s.conditions
                .iter()
                .any(|c| c.condition_type == "Available" && c.status == "True")
        })
    }
}

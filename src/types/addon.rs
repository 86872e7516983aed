// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::collections::BTreeMap;
use std::time::Duration;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};

use crate::constants::{annotations, deletion, labels};
use crate::duration::parse_duration;
use crate::error::{AddonError, Result};

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[kube(group = "addons.managed.openshift.io", version = "v1alpha1", kind = "Addon")]
#[kube(status = "AddonStatus")]
#[serde(rename_all = "camelCase")]
pub struct AddonSpec {
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Namespaces that must exist for the addon
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<AddonNamespace>,
    /// Forwarded to OCM with every status report
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    pub install: AddonInstallSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitoring: Option<MonitoringSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_propagation: Option<SecretPropagation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_operator: Option<PackageOperatorSpec>,
    #[serde(default)]
    pub resource_adoption_strategy: ResourceAdoptionStrategy,
    #[serde(default)]
    pub paused: bool,
    /// Wait for the workload to acknowledge deletion before reporting ReadyToBeDeleted
    #[serde(default)]
    pub delete_ack_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgrade_policy: Option<UpgradePolicyRef>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddonNamespace {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, schemars::JsonSchema)]
pub enum AddonInstallType {
    #[default]
    OLMOwnNamespace,
    OLMAllNamespaces,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddonInstallSpec {
    #[serde(rename = "type")]
    pub install_type: AddonInstallType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub olm_own_namespace: Option<AddonInstallOlmCommon>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub olm_all_namespaces: Option<AddonInstallOlmCommon>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddonInstallOlmCommon {
    /// Namespace the operator is installed into
    pub namespace: String,
    pub catalog_source_image: String,
    pub channel: String,
    pub package_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_secret_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<SubscriptionConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_catalog_sources: Vec<AdditionalCatalogSource>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
pub struct SubscriptionConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvObject>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
pub struct EnvObject {
    pub name: String,
    pub value: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
pub struct AdditionalCatalogSource {
    pub name: String,
    pub image: String,
}

/// The install configuration after the `type` discriminator is resolved.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OlmInstall<'a> {
    OwnNamespace(&'a AddonInstallOlmCommon),
    AllNamespaces(&'a AddonInstallOlmCommon),
}

impl<'a> OlmInstall<'a> {
    pub fn common(&self) -> &'a AddonInstallOlmCommon {
        match self {
            OlmInstall::OwnNamespace(c) | OlmInstall::AllNamespaces(c) => c,
        }
    }

    /// OperatorGroup target namespaces; empty selects all namespaces.
    pub fn target_namespaces(&self) -> Vec<String> {
        match self {
            OlmInstall::OwnNamespace(c) => vec![c.namespace.clone()],
            OlmInstall::AllNamespaces(_) => Vec::new(),
        }
    }
}

impl AddonInstallSpec {
    /// Resolve the discriminated union and validate the fields every OLM install needs.
    pub fn resolve(&self) -> Result<OlmInstall<'_>> {
        let (install, field) = match self.install_type {
            AddonInstallType::OLMOwnNamespace => (
                self.olm_own_namespace.as_ref().map(OlmInstall::OwnNamespace),
                "olmOwnNamespace",
            ),
            AddonInstallType::OLMAllNamespaces => (
                self.olm_all_namespaces.as_ref().map(OlmInstall::AllNamespaces),
                "olmAllNamespaces",
            ),
        };
        let install = install.ok_or_else(|| {
            AddonError::Configuration(format!(
                "install.{} is required for install type {:?}",
                field, self.install_type
            ))
        })?;

        let common = install.common();
        for (name, value) in [
            ("namespace", &common.namespace),
            ("catalogSourceImage", &common.catalog_source_image),
            ("channel", &common.channel),
            ("packageName", &common.package_name),
        ] {
            if value.is_empty() {
                return Err(AddonError::Configuration(format!(
                    "install.{}.{} is required",
                    field, name
                )));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for source in &common.additional_catalog_sources {
            if source.name.is_empty() || source.image.is_empty() {
                return Err(AddonError::Configuration(
                    "additional catalog sources need a name and an image".to_string(),
                ));
            }
            if !seen.insert(source.name.as_str()) {
                return Err(AddonError::Configuration(format!(
                    "additional catalog source name {} is used more than once",
                    source.name
                )));
            }
        }

        Ok(install)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub federation: Option<MonitoringFederationSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitoring_stack: Option<MonitoringStackSpec>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringFederationSpec {
    /// Namespace the addon's own Prometheus runs in
    pub namespace: String,
    /// Metric names to federate
    pub match_names: Vec<String>,
    /// Labels selecting the addon's Prometheus service
    pub match_labels: BTreeMap<String, String>,
    pub port_name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringStackSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rhobs_remote_write_config: Option<RemoteWriteConfig>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoteWriteConfig {
    pub url: String,
    /// Metric names allowed to be written; empty allows all
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowlist: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretPropagation {
    pub secrets: Vec<SecretPropagationReference>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretPropagationReference {
    pub source_secret: SourceSecretReference,
    pub destination_secret: DestinationSecretReference,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
pub struct SourceSecretReference {
    pub name: String,
    /// Defaults to the operator namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
pub struct DestinationSecretReference {
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
pub struct PackageOperatorSpec {
    pub image: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
pub struct UpgradePolicyRef {
    pub id: String,
}

/// Whether pre-existing objects not owned by the addon may be taken over.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, schemars::JsonSchema)]
pub enum ResourceAdoptionStrategy {
    #[default]
    #[serde(rename = "")]
    Unset,
    Prevent,
    AdoptAll,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddonStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<AddonPhase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_version: Option<String>,
    /// Namespace/name of the last CSV observed as succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_observed_available_csv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocm_reported_status_hash: Option<OcmReportedStatusHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgrade_policy: Option<AddonUpgradePolicyStatus>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, schemars::JsonSchema)]
pub enum AddonPhase {
    Pending,
    Ready,
    Terminating,
    Error,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OcmReportedStatusHash {
    pub hash: String,
    pub observed_generation: i64,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum UpgradePolicyValue {
    Started,
    Completed,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddonUpgradePolicyStatus {
    pub id: String,
    pub value: UpgradePolicyValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub observed_generation: i64,
}

impl Addon {
    pub fn generation(&self) -> i64 {
        self.metadata.generation.unwrap_or_default()
    }

    pub fn status_mut(&mut self) -> &mut AddonStatus {
        self.status.get_or_insert_with(AddonStatus::default)
    }

    pub fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default()
    }

    pub fn is_being_deleted(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Check if the addon carries the delete label set to "true"
    pub fn is_marked_for_deletion(&self) -> bool {
        self.labels().get(labels::DELETE).is_some_and(|v| v == "true")
    }

    pub fn has_finalizer(&self, finalizer: &str) -> bool {
        self.finalizers().iter().any(|f| f == finalizer)
    }

    /// Install namespace, if the install configuration names one
    pub fn target_namespace(&self) -> Option<&str> {
        self.spec
            .install
            .resolve()
            .ok()
            .map(|install| install.common().namespace.as_str())
    }

    /// Labels put on every child resource
    pub fn common_labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (labels::ADDON.to_string(), self.name_any()),
            (labels::CACHE.to_string(), "true".to_string()),
        ])
    }

    /// Deletion acknowledgement window, overridable by annotation
    pub fn delete_timeout(&self) -> Result<Duration> {
        match self.annotations().get(annotations::DELETE_TIMEOUT) {
            Some(value) => parse_duration(value),
            None => Ok(Duration::from_secs(deletion::DEFAULT_TIMEOUT_SECS)),
        }
    }

    pub fn spec_version(&self) -> Option<&str> {
        self.spec.version.as_deref().filter(|v| !v.is_empty())
    }

    pub fn observed_version(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.observed_version.as_deref())
            .filter(|v| !v.is_empty())
    }
}

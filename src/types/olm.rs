// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The subset of the OLM (operators.coreos.com) API the operator reads and writes.

use k8s_openapi::api::core::v1::EnvVar;
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};

use super::StatusCondition;
use crate::constants::olm::CATALOG_SOURCE_READY_STATE;

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[kube(group = "operators.coreos.com", version = "v1alpha1", kind = "CatalogSource")]
#[kube(namespaced)]
#[kube(status = "CatalogSourceStatus")]
#[serde(rename_all = "camelCase")]
pub struct CatalogSourceSpec {
    pub source_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    /// Pull secrets for the index image
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSourceStatus {
    #[serde(rename = "connectionState", default, skip_serializing_if = "Option::is_none")]
    pub grpc_connection_state: Option<GrpcConnectionState>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GrpcConnectionState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub last_observed_state: String,
}

impl CatalogSource {
    /// True once OLM reports a READY gRPC connection to the registry
    pub fn is_ready(&self) -> bool {
        self.status
            .as_ref()
            .and_then(|s| s.grpc_connection_state.as_ref())
            .is_some_and(|c| c.last_observed_state == CATALOG_SOURCE_READY_STATE)
    }

    /// Last observed connection state, for status messages
    pub fn connection_state(&self) -> &str {
        self.status
            .as_ref()
            .and_then(|s| s.grpc_connection_state.as_ref())
            .map(|c| c.last_observed_state.as_str())
            .unwrap_or("unknown")
    }
}

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[kube(group = "operators.coreos.com", version = "v1alpha1", kind = "Subscription")]
#[kube(namespaced)]
#[kube(status = "SubscriptionStatus")]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSpec {
    #[serde(rename = "source")]
    pub catalog_source: String,
    #[serde(rename = "sourceNamespace")]
    pub catalog_source_namespace: String,
    #[serde(rename = "name")]
    pub package: String,
    pub channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_plan_approval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<SubscriptionConfig>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
pub struct SubscriptionConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
pub struct SubscriptionStatus {
    #[serde(rename = "installedCSV", default, skip_serializing_if = "Option::is_none")]
    pub installed_csv: Option<String>,
    #[serde(rename = "currentCSV", default, skip_serializing_if = "Option::is_none")]
    pub current_csv: Option<String>,
}

impl Subscription {
    /// Names of the installed and current CSV, once OLM linked both
    pub fn linked_csvs(&self) -> Option<(&str, &str)> {
        let status = self.status.as_ref()?;
        let installed = status.installed_csv.as_deref().filter(|s| !s.is_empty())?;
        let current = status.current_csv.as_deref().filter(|s| !s.is_empty())?;
        Some((installed, current))
    }
}

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[kube(group = "operators.coreos.com", version = "v1", kind = "OperatorGroup")]
#[kube(namespaced)]
#[serde(rename_all = "camelCase")]
pub struct OperatorGroupSpec {
    /// Empty selects all namespaces
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_namespaces: Vec<String>,
}

/// Cluster-scoped umbrella object OLM maintains per installed package.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[kube(group = "operators.coreos.com", version = "v1", kind = "Operator")]
#[kube(status = "OperatorStatus")]
pub struct OperatorSpec {}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
pub struct OperatorStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
pub struct Components {
    #[serde(default)]
    pub refs: Vec<RichReference>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RichReference {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default)]
    pub conditions: Vec<StatusCondition>,
}

/// Lifecycle of a CSV as seen through the Operator's component refs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CsvState {
    Missing,
    Pending,
    Succeeded,
    Failed,
}

impl Operator {
    /// Name OLM uses for the Operator of a package installed into a namespace
    pub fn name_for(package: &str, namespace: &str) -> String {
        format!("{}.{}", package, namespace)
    }

    /// Find the CSV reference with the given namespace/name
    pub fn csv_ref(&self, namespace: &str, name: &str) -> Option<&RichReference> {
        self.status
            .as_ref()?
            .components
            .as_ref()?
            .refs
            .iter()
            .find(|r| {
                r.kind == "ClusterServiceVersion"
                    && r.name == name
                    && r.namespace.as_deref() == Some(namespace)
            })
    }

    pub fn csv_state(&self, namespace: &str, name: &str) -> CsvState {
        let Some(csv) = self.csv_ref(namespace, name) else {
            return CsvState::Missing;
        };
        let is_true = |t: &str| {
            csv.conditions
                .iter()
                .any(|c| c.condition_type == t && c.status == "True")
        };
        if is_true("Succeeded") {
            CsvState::Succeeded
        } else if is_true("Failed") {
            CsvState::Failed
        } else {
            CsvState::Pending
        }
    }
}

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[kube(group = "operators.coreos.com", version = "v1alpha1", kind = "ClusterServiceVersion")]
#[kube(namespaced)]
#[kube(status = "ClusterServiceVersionStatus")]
#[serde(rename_all = "camelCase")]
pub struct ClusterServiceVersionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
pub struct ClusterServiceVersionStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

impl ClusterServiceVersion {
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace().unwrap_or_default(), self.name_any())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::api::ObjectMeta;

    fn make_operator(conditions: Vec<StatusCondition>) -> Operator {
        Operator {
            metadata: ObjectMeta {
                name: Some("foo-operator.addon-foo".to_string()),
                ..Default::default()
            },
            spec: OperatorSpec {},
            status: Some(OperatorStatus {
                components: Some(Components {
                    refs: vec![RichReference {
                        kind: "ClusterServiceVersion".to_string(),
                        name: "foo-operator.v1.0.0".to_string(),
                        namespace: Some("addon-foo".to_string()),
                        api_version: Some("operators.coreos.com/v1alpha1".to_string()),
                        conditions,
                    }],
                }),
            }),
        }
    }

    fn condition(condition_type: &str) -> StatusCondition {
        StatusCondition {
            condition_type: condition_type.to_string(),
            status: "True".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_csv_state_succeeded() {
        let operator = make_operator(vec![condition("Succeeded")]);
        assert_eq!(
            operator.csv_state("addon-foo", "foo-operator.v1.0.0"),
            CsvState::Succeeded
        );
    }

    #[test]
    fn test_csv_state_failed() {
        let operator = make_operator(vec![condition("Failed")]);
        assert_eq!(
            operator.csv_state("addon-foo", "foo-operator.v1.0.0"),
            CsvState::Failed
        );
    }

    #[test]
    fn test_csv_state_pending_without_terminal_condition() {
        let operator = make_operator(vec![condition("Installing")]);
        assert_eq!(
            operator.csv_state("addon-foo", "foo-operator.v1.0.0"),
            CsvState::Pending
        );
    }

    #[test]
    fn test_csv_state_missing_for_other_namespace() {
        let operator = make_operator(vec![condition("Succeeded")]);
        assert_eq!(
            operator.csv_state("other", "foo-operator.v1.0.0"),
            CsvState::Missing
        );
    }

    #[test]
    fn test_catalog_source_readiness() {
        let mut catalog = CatalogSource::new("addon-foo-catalog", CatalogSourceSpec::default());
        assert!(!catalog.is_ready());
        assert_eq!(catalog.connection_state(), "unknown");

        catalog.status = Some(CatalogSourceStatus {
            grpc_connection_state: Some(GrpcConnectionState {
                address: None,
                last_observed_state: "READY".to_string(),
            }),
        });
        assert!(catalog.is_ready());
    }

    #[test]
    fn test_subscription_status_field_names() {
        let subscription: Subscription = serde_json::from_value(serde_json::json!({
            "apiVersion": "operators.coreos.com/v1alpha1",
            "kind": "Subscription",
            "metadata": {"name": "addon-foo", "namespace": "addon-foo"},
            "spec": {
                "source": "addon-foo-catalog",
                "sourceNamespace": "addon-foo",
                "name": "foo-operator",
                "channel": "stable",
                "installPlanApproval": "Manual"
            },
            "status": {"installedCSV": "foo.v1", "currentCSV": "foo.v2"}
        }))
        .unwrap();

        assert_eq!(subscription.linked_csvs(), Some(("foo.v1", "foo.v2")));
        assert_eq!(subscription.spec.install_plan_approval.as_deref(), Some("Manual"));
    }
}

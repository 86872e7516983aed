// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Desired OLM objects for an addon install: OperatorGroup, CatalogSources,
//! the NetworkPolicy opening the registry port and the Subscription.

use k8s_openapi::api::core::v1::EnvVar;
use k8s_openapi::api::networking::v1::{
    NetworkPolicy, NetworkPolicyIngressRule, NetworkPolicyPort, NetworkPolicySpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, LabelSelectorRequirement};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;

use super::child_meta;
use crate::constants::{labels, olm::CATALOG_SOURCE_GRPC_PORT, olm::INSTALL_PLAN_APPROVAL_AUTOMATIC};
use crate::types::addon::{AdditionalCatalogSource, OlmInstall};
use crate::types::olm::{
    CatalogSource, CatalogSourceSpec, OperatorGroup, OperatorGroupSpec, Subscription,
    SubscriptionConfig, SubscriptionSpec,
};
use crate::types::Addon;

const OPERATOR_GROUP_NAME: &str = "redhat-layered-product-og";
const CATALOG_PUBLISHER: &str = "OSD Red Hat Addons";

pub fn catalog_source_name(addon: &Addon) -> String {
    format!("addon-{}-catalog", addon.name_any())
}

pub fn subscription_name(addon: &Addon) -> String {
    format!("addon-{}", addon.name_any())
}

pub fn network_policy_name(addon: &Addon) -> String {
    format!("addon-{}-catalogs", addon.name_any())
}

pub fn build_operator_group(addon: &Addon, install: &OlmInstall<'_>) -> OperatorGroup {
    let namespace = install.common().namespace.as_str();
    OperatorGroup {
        metadata: child_meta(addon, OPERATOR_GROUP_NAME, Some(namespace)),
        spec: OperatorGroupSpec {
            target_namespaces: install.target_namespaces(),
        },
    }
}

/// The primary CatalogSource serving the addon's index image
pub fn build_catalog_source(addon: &Addon, install: &OlmInstall<'_>) -> CatalogSource {
    let common = install.common();
    catalog_source(
        addon,
        &catalog_source_name(addon),
        &common.namespace,
        &common.catalog_source_image,
        common.pull_secret_name.as_deref(),
    )
}

pub fn build_additional_catalog_sources(
    addon: &Addon,
    install: &OlmInstall<'_>,
) -> Vec<CatalogSource> {
    let common = install.common();
    common
        .additional_catalog_sources
        .iter()
        .map(|AdditionalCatalogSource { name, image }| {
            catalog_source(
                addon,
                name,
                &common.namespace,
                image,
                common.pull_secret_name.as_deref(),
            )
        })
        .collect()
}

fn catalog_source(
    addon: &Addon,
    name: &str,
    namespace: &str,
    image: &str,
    pull_secret: Option<&str>,
) -> CatalogSource {
    CatalogSource {
        metadata: child_meta(addon, name, Some(namespace)),
        spec: CatalogSourceSpec {
            source_type: "grpc".to_string(),
            image: Some(image.to_string()),
            display_name: Some(addon.spec.display_name.clone()),
            publisher: Some(CATALOG_PUBLISHER.to_string()),
            secrets: pull_secret
                .filter(|s| !s.is_empty())
                .map(|s| vec![s.to_string()])
                .unwrap_or_default(),
        },
        status: None,
    }
}

/// Allow ingress to the gRPC port of every catalog pod of the addon
pub fn build_catalog_network_policy(addon: &Addon, install: &OlmInstall<'_>) -> NetworkPolicy {
    let common = install.common();
    let mut catalogs = vec![catalog_source_name(addon)];
    catalogs.extend(common.additional_catalog_sources.iter().map(|s| s.name.clone()));

    NetworkPolicy {
        metadata: child_meta(addon, &network_policy_name(addon), Some(&common.namespace)),
        spec: Some(NetworkPolicySpec {
            pod_selector: LabelSelector {
                match_expressions: Some(vec![LabelSelectorRequirement {
                    key: labels::OLM_CATALOG_SOURCE.to_string(),
                    operator: "In".to_string(),
                    values: Some(catalogs),
                }]),
                match_labels: None,
            },
            ingress: Some(vec![NetworkPolicyIngressRule {
                ports: Some(vec![NetworkPolicyPort {
                    port: Some(IntOrString::Int(CATALOG_SOURCE_GRPC_PORT)),
                    protocol: Some("TCP".to_string()),
                    ..Default::default()
                }]),
                ..Default::default()
            }]),
            // the API server defaults this, leaving it out would never compare equal
            policy_types: Some(vec!["Ingress".to_string()]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn build_subscription(addon: &Addon, install: &OlmInstall<'_>) -> Subscription {
    let common = install.common();
    let config = common.config.as_ref().map(|config| SubscriptionConfig {
        env: config
            .env
            .iter()
            .map(|e| EnvVar {
                name: e.name.clone(),
                value: Some(e.value.clone()),
                value_from: None,
            })
            .collect(),
    });

    Subscription {
        metadata: child_meta(addon, &subscription_name(addon), Some(&common.namespace)),
        spec: SubscriptionSpec {
            catalog_source: catalog_source_name(addon),
            catalog_source_namespace: common.namespace.clone(),
            package: common.package_name.clone(),
            channel: common.channel.clone(),
            install_plan_approval: Some(INSTALL_PLAN_APPROVAL_AUTOMATIC.to_string()),
            config,
        },
        status: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::make_addon;
    use crate::types::addon::{AddonInstallType, EnvObject};

    #[test]
    fn test_subscription_points_at_primary_catalog() {
        let mut addon = make_addon("foo");
        addon.spec.install.olm_own_namespace.as_mut().unwrap().config =
            Some(crate::types::addon::SubscriptionConfig {
                env: vec![EnvObject {
                    name: "LOG_LEVEL".to_string(),
                    value: "debug".to_string(),
                }],
            });
        let install = addon.spec.install.resolve().unwrap();

        let subscription = build_subscription(&addon, &install);

        assert_eq!(subscription.name_any(), "addon-foo");
        assert_eq!(subscription.spec.catalog_source, "addon-foo-catalog");
        assert_eq!(subscription.spec.catalog_source_namespace, "addon-foo");
        assert_eq!(subscription.spec.package, "foo-operator");
        assert_eq!(subscription.spec.install_plan_approval.as_deref(), Some("Automatic"));
        let env = &subscription.spec.config.unwrap().env;
        assert_eq!(env[0].name, "LOG_LEVEL");
        assert_eq!(env[0].value.as_deref(), Some("debug"));
    }

    #[test]
    fn test_operator_group_targets() {
        let mut addon = make_addon("foo");
        let own = build_operator_group(&addon, &addon.spec.install.resolve().unwrap());
        assert_eq!(own.spec.target_namespaces, vec!["addon-foo".to_string()]);

        addon.spec.install.install_type = AddonInstallType::OLMAllNamespaces;
        addon.spec.install.olm_all_namespaces = addon.spec.install.olm_own_namespace.take();
        let all = build_operator_group(&addon, &addon.spec.install.resolve().unwrap());
        assert!(all.spec.target_namespaces.is_empty());
    }

    #[test]
    fn test_network_policy_selects_every_catalog() {
        let mut addon = make_addon("foo");
        addon
            .spec
            .install
            .olm_own_namespace
            .as_mut()
            .unwrap()
            .additional_catalog_sources = vec![AdditionalCatalogSource {
            name: "extra".to_string(),
            image: "quay.io/osd/extra:latest".to_string(),
        }];
        let install = addon.spec.install.resolve().unwrap();

        let policy = build_catalog_network_policy(&addon, &install);
        let spec = policy.spec.unwrap();
        let expression = &spec.pod_selector.match_expressions.unwrap()[0];
        assert_eq!(expression.key, "olm.catalogSource");
        assert_eq!(
            expression.values.as_ref().unwrap(),
            &vec!["addon-foo-catalog".to_string(), "extra".to_string()]
        );
        let ingress = spec.ingress.unwrap();
        let port = &ingress[0].ports.as_ref().unwrap()[0];
        assert_eq!(port.port, Some(IntOrString::Int(50051)));

        let extra = build_additional_catalog_sources(&addon, &install);
        assert_eq!(extra.len(), 1);
        assert_eq!(extra[0].name_any(), "extra");
        assert_eq!(extra[0].namespace().as_deref(), Some("addon-foo"));
    }

    #[test]
    fn test_catalog_source_carries_pull_secret() {
        let mut addon = make_addon("foo");
        addon.spec.install.olm_own_namespace.as_mut().unwrap().pull_secret_name =
            Some("pull".to_string());
        let install = addon.spec.install.resolve().unwrap();

        let catalog = build_catalog_source(&addon, &install);
        assert_eq!(catalog.spec.source_type, "grpc");
        assert_eq!(catalog.spec.secrets, vec!["pull".to_string()]);
        assert_eq!(catalog.spec.image.as_deref(), Some("quay.io/osd/index:latest"));
    }
}

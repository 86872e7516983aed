// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::ResourceExt;

use super::{child_meta, child_meta_with_labels};
use crate::constants::labels;
use crate::types::addon::{MonitoringFederationSpec, RemoteWriteConfig};
use crate::types::monitoring::{
    Endpoint, MonitoringStack, MonitoringStackSpec, NamespaceSelector, PrometheusConfig,
    RelabelConfig, RemoteWriteSpec, ServiceMonitor, ServiceMonitorSpec, TlsConfig,
};
use crate::types::Addon;

const CLUSTER_MONITORING_LABEL: &str = "openshift.io/cluster-monitoring";
const SERVICE_ACCOUNT_TOKEN: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
const SERVICE_CA_BUNDLE: &str = "/etc/prometheus/configmaps/serving-certs-ca-bundle/service-ca.crt";
const FEDERATION_INTERVAL: &str = "30s";

pub fn federation_namespace_name(addon: &Addon) -> String {
    format!("redhat-monitoring-{}", addon.name_any())
}

pub fn service_monitor_name(addon: &Addon) -> String {
    format!("federated-sm-{}", addon.name_any())
}

pub fn monitoring_stack_name(addon: &Addon) -> String {
    format!("{}-monitoring-stack", addon.name_any())
}

/// Namespace scraped by cluster monitoring, holding the federation ServiceMonitor
pub fn build_federation_namespace(addon: &Addon) -> Namespace {
    let extra = BTreeMap::from([(CLUSTER_MONITORING_LABEL.to_string(), "true".to_string())]);
    Namespace {
        metadata: child_meta_with_labels(addon, &federation_namespace_name(addon), None, extra),
        ..Default::default()
    }
}

/// ServiceMonitor federating `match_names` from the addon's own Prometheus
pub fn build_service_monitor(
    addon: &Addon,
    federation: &MonitoringFederationSpec,
) -> ServiceMonitor {
    let matchers = federation
        .match_names
        .iter()
        .map(|name| format!("{{__name__=\"{}\"}}", name))
        .collect();

    ServiceMonitor {
        metadata: child_meta(
            addon,
            &service_monitor_name(addon),
            Some(&federation_namespace_name(addon)),
        ),
        spec: ServiceMonitorSpec {
            endpoints: vec![Endpoint {
                port: federation.port_name.clone(),
                path: Some("/federate".to_string()),
                scheme: Some("https".to_string()),
                interval: Some(FEDERATION_INTERVAL.to_string()),
                honor_labels: Some(true),
                params: BTreeMap::from([("match[]".to_string(), matchers)]),
                bearer_token_file: Some(SERVICE_ACCOUNT_TOKEN.to_string()),
                tls_config: Some(TlsConfig {
                    ca_file: Some(SERVICE_CA_BUNDLE.to_string()),
                    server_name: Some(format!("prometheus.{}.svc", federation.namespace)),
                }),
            }],
            namespace_selector: Some(NamespaceSelector {
                match_names: vec![federation.namespace.clone()],
            }),
            selector: LabelSelector {
                match_labels: Some(federation.match_labels.clone()),
                match_expressions: None,
            },
        },
    }
}

/// MonitoringStack in the install namespace, remote-writing the allowlisted metrics
pub fn build_monitoring_stack(
    addon: &Addon,
    namespace: &str,
    remote_write: Option<&RemoteWriteConfig>,
) -> MonitoringStack {
    let prometheus_config = remote_write.map(|config| {
        let write_relabel_configs = if config.allowlist.is_empty() {
            Vec::new()
        } else {
            vec![RelabelConfig {
                source_labels: vec!["__name__".to_string()],
                regex: Some(format!("({})", config.allowlist.join("|"))),
                action: Some("keep".to_string()),
            }]
        };
        PrometheusConfig {
            remote_write: vec![RemoteWriteSpec {
                url: config.url.clone(),
                write_relabel_configs,
            }],
        }
    });

    MonitoringStack {
        metadata: child_meta(addon, &monitoring_stack_name(addon), Some(namespace)),
        spec: MonitoringStackSpec {
            log_level: Some("debug".to_string()),
            retention: Some("30d".to_string()),
            resource_selector: Some(LabelSelector {
                match_labels: Some(BTreeMap::from([(
                    labels::ADDON.to_string(),
                    addon.name_any(),
                )])),
                match_expressions: None,
            }),
            prometheus_config,
        },
        status: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::make_addon;

    #[test]
    fn test_service_monitor_federates_match_names() {
        let addon = make_addon("foo");
        let federation = MonitoringFederationSpec {
            namespace: "foo-monitoring".to_string(),
            match_names: vec!["up".to_string(), "foo_total".to_string()],
            match_labels: BTreeMap::from([("app".to_string(), "prometheus".to_string())]),
            port_name: "https".to_string(),
        };

        let monitor = build_service_monitor(&addon, &federation);

        assert_eq!(monitor.namespace().as_deref(), Some("redhat-monitoring-foo"));
        let endpoint = &monitor.spec.endpoints[0];
        assert_eq!(endpoint.port, "https");
        assert_eq!(endpoint.path.as_deref(), Some("/federate"));
        assert_eq!(
            endpoint.params.get("match[]").unwrap(),
            &vec![
                "{__name__=\"up\"}".to_string(),
                "{__name__=\"foo_total\"}".to_string()
            ]
        );
        assert_eq!(
            monitor.spec.namespace_selector.unwrap().match_names,
            vec!["foo-monitoring".to_string()]
        );
    }

    #[test]
    fn test_monitoring_stack_keeps_allowlist_only() {
        let addon = make_addon("foo");
        let remote_write = RemoteWriteConfig {
            url: "https://rhobs.example.com/write".to_string(),
            allowlist: vec!["a".to_string(), "b".to_string()],
        };

        let stack = build_monitoring_stack(&addon, "addon-foo", Some(&remote_write));

        assert_eq!(stack.name_any(), "foo-monitoring-stack");
        let write = &stack.spec.prometheus_config.unwrap().remote_write[0];
        assert_eq!(write.url, "https://rhobs.example.com/write");
        assert_eq!(write.write_relabel_configs[0].regex.as_deref(), Some("(a|b)"));
        assert_eq!(write.write_relabel_configs[0].action.as_deref(), Some("keep"));
    }

    #[test]
    fn test_federation_namespace_is_cluster_monitored() {
        let namespace = build_federation_namespace(&make_addon("foo"));
        assert_eq!(namespace.name_any(), "redhat-monitoring-foo");
        assert_eq!(namespace.labels().get(CLUSTER_MONITORING_LABEL).unwrap(), "true");
    }
}

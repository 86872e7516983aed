// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Copies secrets from the operator namespace (or a named source namespace)
//! into every namespace of the addon, and removes copies that are no longer
//! declared.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{
    api::{DeleteParams, ListParams},
    Api, Client, ResourceExt,
};
use tracing::{info, instrument, warn};

use super::{Outcome, SubReconciler};
use crate::constants::{conditions::reasons, labels};
use crate::coordination::index::object_key;
use crate::desired::secret::build_propagated_secret;
use crate::error::Result;
use crate::kubernetes::{is_controlled_by, reconcile_object};
use crate::status::reporters::report_pending;
use crate::types::Addon;

pub struct SecretPropagationReconciler {
    client: Client,
    operator_namespace: String,
    retry: Duration,
}

impl SecretPropagationReconciler {
    pub fn new(client: Client, operator_namespace: String, retry: Duration) -> Self {
        Self {
            client,
            operator_namespace,
            retry,
        }
    }

    /// Delete propagated secrets of this addon whose `namespace/name` is not in `keep`
    async fn cleanup(&self, addon: &Addon, keep: &HashSet<String>) -> Result<()> {
        let all: Api<Secret> = Api::all(self.client.clone());
        let selector = format!("{}={}", labels::SECRET_PROPAGATION, addon.name_any());
        let propagated = all.list(&ListParams::default().labels(&selector)).await?;

        for secret in propagated {
            if keep.contains(&object_key(&secret)) || !is_controlled_by(&secret, addon) {
                continue;
            }
            let namespace = secret.namespace().unwrap_or_default();
            info!("Deleting stale propagated secret {}/{}", namespace, secret.name_any());
            let api: Api<Secret> = Api::namespaced(self.client.clone(), &namespace);
            api.delete(&secret.name_any(), &DeleteParams::default()).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl SubReconciler for SecretPropagationReconciler {
    fn name(&self) -> &'static str {
        "secret-propagation"
    }

    #[instrument(skip_all, fields(addon = %addon.name_any()))]
    async fn reconcile(&self, addon: &mut Addon) -> Result<Outcome> {
        let references = addon
            .spec
            .secret_propagation
            .as_ref()
            .map(|p| p.secrets.clone())
            .unwrap_or_default();
        let namespaces: Vec<String> =
            addon.spec.namespaces.iter().map(|n| n.name.clone()).collect();
        let strategy = addon.spec.resource_adoption_strategy;

        let mut keep = HashSet::new();
        let mut missing = Vec::new();
        for reference in &references {
            let source_namespace = reference
                .source_secret
                .namespace
                .as_deref()
                .unwrap_or(&self.operator_namespace);
            let sources: Api<Secret> = Api::namespaced(self.client.clone(), source_namespace);
            let Some(source) = sources.get_opt(&reference.source_secret.name).await? else {
                warn!(
                    "Source secret {}/{} not found",
                    source_namespace, reference.source_secret.name
                );
                missing.push(format!("{}/{}", source_namespace, reference.source_secret.name));
                continue;
            };

            for namespace in &namespaces {
                let destination_name = &reference.destination_secret.name;
                keep.insert(format!("{}/{}", namespace, destination_name));
                let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
                let desired = build_propagated_secret(addon, &source, destination_name, namespace);
                reconcile_object(&api, desired, strategy).await?;
            }
        }

        if !missing.is_empty() {
            report_pending(
                addon,
                reasons::UNREADY_SECRET_PROPAGATION,
                format!("Source secrets not found: {}", missing.join(", ")),
            );
            return Ok(Outcome::RequeueAfter(self.retry));
        }

        self.cleanup(addon, &keep).await?;
        Ok(Outcome::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::conditions::AVAILABLE;
    use crate::status::ConditionsExt;
    use crate::test_utils::{addon_owner_ref, make_addon, to_json, MockService};
    use crate::types::addon::{
        DestinationSecretReference, SecretPropagation, SecretPropagationReference,
        SourceSecretReference,
    };
    use kube::api::ObjectMeta;
    use std::collections::BTreeMap;

    const LIST_PATH: &str = "/api/v1/secrets";

    fn reconciler(mock: &MockService) -> SecretPropagationReconciler {
        let client = mock.clone().into_client();
        let retry = Duration::from_secs(10);
        SecretPropagationReconciler::new(client, "addon-operator".to_string(), retry)
    }

    fn addon_with_propagation() -> Addon {
        let mut addon = make_addon("foo");
        addon.spec.secret_propagation = Some(SecretPropagation {
            secrets: vec![SecretPropagationReference {
                source_secret: SourceSecretReference {
                    name: "pull".to_string(),
                    namespace: None,
                },
                destination_secret: DestinationSecretReference {
                    name: "addon-pull".to_string(),
                },
            }],
        });
        addon
    }

    fn secret(namespace: &str, name: &str) -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            type_: Some("Opaque".to_string()),
            ..Default::default()
        }
    }

    fn list(items: Vec<Secret>) -> String {
        to_json(&serde_json::json!({
            "apiVersion": "v1",
            "kind": "SecretList",
            "metadata": {},
            "items": items,
        }))
    }

    #[tokio::test]
    async fn test_copies_source_from_operator_namespace() {
        let mock = MockService::new()
            .on_get(
                "/api/v1/namespaces/addon-operator/secrets/pull",
                200,
                &to_json(&secret("addon-operator", "pull")),
            )
            .on_get(LIST_PATH, 200, &list(Vec::new()));
        let reconciler = reconciler(&mock);
        let mut addon = addon_with_propagation();

        assert_eq!(reconciler.reconcile(&mut addon).await.unwrap(), Outcome::Continue);

        let created = mock.requests_to("POST", "/api/v1/namespaces/addon-foo/secrets");
        assert_eq!(created.len(), 1);
        let body = created[0].json();
        assert_eq!(body["metadata"]["name"], "addon-pull");
        assert_eq!(body["metadata"]["labels"][labels::SECRET_PROPAGATION], "foo");
    }

    #[tokio::test]
    async fn test_missing_source_reports_pending() {
        let mock = MockService::new();
        let reconciler = reconciler(&mock);
        let mut addon = addon_with_propagation();

        let outcome = reconciler.reconcile(&mut addon).await.unwrap();

        assert_eq!(outcome, Outcome::RequeueAfter(Duration::from_secs(10)));
        let available = addon.conditions().find_condition(AVAILABLE).unwrap();
        assert_eq!(available.reason, reasons::UNREADY_SECRET_PROPAGATION);
        assert!(mock.writes().is_empty());
    }

    #[tokio::test]
    async fn test_removes_secrets_no_longer_declared() {
        let mut stale = secret("addon-foo", "old-pull");
        stale.metadata.owner_references = Some(vec![addon_owner_ref("foo", "uid-foo")]);
        stale.metadata.labels = Some(BTreeMap::from([(
            labels::SECRET_PROPAGATION.to_string(),
            "foo".to_string(),
        )]));
        let mock = MockService::new().on_get(LIST_PATH, 200, &list(vec![stale]));
        let reconciler = reconciler(&mock);
        let mut addon = make_addon("foo");

        assert_eq!(reconciler.reconcile(&mut addon).await.unwrap(), Outcome::Continue);

        assert_eq!(
            mock.requests_to("DELETE", "/api/v1/namespaces/addon-foo/secrets/old-pull").len(),
            1
        );
    }
}

// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use kube::{Api, Client, ResourceExt};
use tracing::{debug, instrument};

use super::{Outcome, SubReconciler};
use crate::desired::addon_instance::build_addon_instance;
use crate::error::Result;
use crate::kubernetes::reconcile_object;
use crate::types::{Addon, AddonInstance};

/// Ensures the AddonInstance heartbeat object exists in the install namespace.
pub struct AddonInstanceReconciler {
    client: Client,
}

impl AddonInstanceReconciler {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SubReconciler for AddonInstanceReconciler {
    fn name(&self) -> &'static str {
        "addon-instance"
    }

    #[instrument(skip_all, fields(addon = %addon.name_any()))]
    async fn reconcile(&self, addon: &mut Addon) -> Result<Outcome> {
        // An invalid install config is reported by the OLM step
        let Some(namespace) = addon.target_namespace() else {
            debug!("No install namespace, skipping AddonInstance");
            return Ok(Outcome::Continue);
        };

        let api: Api<AddonInstance> = Api::namespaced(self.client.clone(), namespace);
        let desired = build_addon_instance(addon, namespace);
        reconcile_object(&api, desired, addon.spec.resource_adoption_strategy).await?;
        Ok(Outcome::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{make_addon, served, MockService};
    use chrono::Utc;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

    const INSTANCE_PATH: &str =
        "/apis/addons.managed.openshift.io/v1alpha1/namespaces/addon-foo/addoninstances/addon-instance";

    #[tokio::test]
    async fn test_creates_addon_instance_in_install_namespace() {
        let mock = MockService::new();
        let reconciler = AddonInstanceReconciler::new(mock.clone().into_client());
        let mut addon = make_addon("foo");

        assert_eq!(reconciler.reconcile(&mut addon).await.unwrap(), Outcome::Continue);

        let created = mock.requests_to(
            "POST",
            "/apis/addons.managed.openshift.io/v1alpha1/namespaces/addon-foo/addoninstances",
        );
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].json()["metadata"]["name"], "addon-instance");
        assert_eq!(created[0].json()["spec"]["heartbeatUpdatePeriod"], "10s");
    }

    #[tokio::test]
    async fn test_heartbeating_addon_instance_is_left_untouched() {
        let addon = make_addon("foo");
        let mut live = build_addon_instance(&addon, "addon-foo");
        live.status_mut().last_heartbeat_time = Some(Time(Utc::now()));
        let mock = MockService::new().on_get(INSTANCE_PATH, 200, &served(&live));
        let reconciler = AddonInstanceReconciler::new(mock.clone().into_client());
        let mut addon = addon;

        assert_eq!(reconciler.reconcile(&mut addon).await.unwrap(), Outcome::Continue);
        assert!(mock.writes().is_empty(), "unexpected writes: {:?}", mock.writes());
    }
}

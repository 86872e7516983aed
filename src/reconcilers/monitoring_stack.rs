// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::time::Duration;

use async_trait::async_trait;
use kube::{Api, Client, ResourceExt};
use tracing::{debug, instrument};

use super::{Outcome, SubReconciler};
use crate::constants::conditions::reasons;
use crate::desired::monitoring::{build_monitoring_stack, monitoring_stack_name};
use crate::error::Result;
use crate::kubernetes::{delete_if_controlled, reconcile_object};
use crate::status::reporters::report_pending;
use crate::types::monitoring::MonitoringStack;
use crate::types::Addon;

/// Runs a MonitoringStack in the install namespace when the addon asks for one.
pub struct MonitoringStackReconciler {
    client: Client,
    retry: Duration,
}

impl MonitoringStackReconciler {
    pub fn new(client: Client, retry: Duration) -> Self {
        Self { client, retry }
    }
}

#[async_trait]
impl SubReconciler for MonitoringStackReconciler {
    fn name(&self) -> &'static str {
        "monitoring-stack"
    }

    #[instrument(skip_all, fields(addon = %addon.name_any()))]
    async fn reconcile(&self, addon: &mut Addon) -> Result<Outcome> {
        let Some(namespace) = addon.target_namespace().map(str::to_string) else {
            return Ok(Outcome::Continue);
        };
        let api: Api<MonitoringStack> = Api::namespaced(self.client.clone(), &namespace);
        let stack_spec = addon
            .spec
            .monitoring
            .as_ref()
            .and_then(|m| m.monitoring_stack.clone());

        let Some(stack_spec) = stack_spec else {
            delete_if_controlled(&api, &monitoring_stack_name(addon), addon).await?;
            return Ok(Outcome::Continue);
        };

        let remote_write = stack_spec.rhobs_remote_write_config.as_ref();
        let desired = build_monitoring_stack(addon, &namespace, remote_write);
        let stack = reconcile_object(&api, desired, addon.spec.resource_adoption_strategy).await?;
        if !stack.is_available() {
            debug!("MonitoringStack {} is not available yet", stack.name_any());
            report_pending(
                addon,
                reasons::UNREADY_MONITORING_STACK,
                format!("MonitoringStack {} is not available yet", stack.name_any()),
            );
            return Ok(Outcome::RequeueAfter(self.retry));
        }
        Ok(Outcome::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::conditions::AVAILABLE;
    use crate::status::ConditionsExt;
    use crate::test_utils::{make_addon, MockService};
    use crate::types::addon::{MonitoringSpec, MonitoringStackSpec, RemoteWriteConfig};

    fn reconciler(mock: &MockService) -> MonitoringStackReconciler {
        MonitoringStackReconciler::new(mock.clone().into_client(), Duration::from_secs(10))
    }

    #[tokio::test]
    async fn test_unavailable_stack_reports_pending() {
        let mock = MockService::new();
        let mut addon = make_addon("foo");
        addon.spec.monitoring = Some(MonitoringSpec {
            federation: None,
            monitoring_stack: Some(MonitoringStackSpec {
                rhobs_remote_write_config: Some(RemoteWriteConfig {
                    url: "https://rhobs.example.com/write".to_string(),
                    allowlist: vec!["up".to_string()],
                }),
            }),
        });

        let outcome = reconciler(&mock).reconcile(&mut addon).await.unwrap();

        assert_eq!(outcome, Outcome::RequeueAfter(Duration::from_secs(10)));
        assert_eq!(
            mock.requests_to(
                "POST",
                "/apis/monitoring.rhobs/v1alpha1/namespaces/addon-foo/monitoringstacks"
            )
            .len(),
            1
        );
        let available = addon.conditions().find_condition(AVAILABLE).unwrap();
        assert_eq!(available.reason, reasons::UNREADY_MONITORING_STACK);
    }

    #[tokio::test]
    async fn test_without_stack_nothing_is_created() {
        let mock = MockService::new();
        let mut addon = make_addon("foo");

        let outcome = reconciler(&mock).reconcile(&mut addon).await.unwrap();

        assert_eq!(outcome, Outcome::Continue);
        assert!(mock.writes().is_empty());
    }
}

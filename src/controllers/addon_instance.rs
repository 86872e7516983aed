// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! AddonInstance controller - flags workloads that stopped heartbeating.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::StreamExt;
use kube::{
    api::{Patch, PatchParams},
    runtime::{controller::Action, Controller},
    Api, Client, ResourceExt,
};
use kube_runtime::watcher::Config as WatcherConfig;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::constants::conditions::{reasons, AVAILABLE};
use crate::constants::heartbeat::THRESHOLD_MULTIPLIER;
use crate::duration::{bounded_requeue, parse_duration};
use crate::error::{AddonError, Result};
use crate::metrics::Metrics;
use crate::status::{new_condition, ConditionStatus, ConditionsExt, ConditionsMutExt};
use crate::types::AddonInstance;

const CONTROLLER_NAME: &str = "addon-instance";

/// Heartbeat state of an AddonInstance at a point in time
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Heartbeat {
    /// The workload never reported
    Missing,
    /// The last heartbeat is older than the allowed threshold
    TimedOut,
    /// A heartbeat arrived within the threshold; `remaining` until it times out
    Received { remaining: Duration },
}

/// Classify the heartbeat of `instance` at `now`.
pub fn evaluate_heartbeat(instance: &AddonInstance, now: DateTime<Utc>) -> Result<Heartbeat> {
    let period = parse_duration(&instance.spec.heartbeat_update_period)?;
    let threshold = period * THRESHOLD_MULTIPLIER;

    let Some(last) = instance.status.as_ref().and_then(|s| s.last_heartbeat_time.as_ref()) else {
        return Ok(Heartbeat::Missing);
    };
    let age = (now - last.0).to_std().unwrap_or_default();
    if age > threshold {
        return Ok(Heartbeat::TimedOut);
    }
    Ok(Heartbeat::Received {
        remaining: threshold - age,
    })
}

pub struct AddonInstanceReconciler {
    client: Client,
    metrics: Option<Arc<Metrics>>,
}

impl AddonInstanceReconciler {
    pub fn new(client: Client, metrics: Option<Arc<Metrics>>) -> Self {
        Self { client, metrics }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let instances: Api<AddonInstance> = Api::all(self.client.clone());
        let context = Arc::new(self);

        Controller::new(instances, WatcherConfig::default())
            .shutdown_on_signal()
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled addon instance: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }

    async fn reconcile_instance(
        &self,
        instance: &AddonInstance,
        now: DateTime<Utc>,
    ) -> Result<Action> {
        let namespace = instance.namespace().unwrap_or_default();
        let name = instance.name_any();

        let (reason, message, recheck) = match evaluate_heartbeat(instance, now)? {
            Heartbeat::Received { remaining } => {
                debug!("AddonInstance {}/{} is heartbeating", namespace, name);
                return Ok(Action::requeue(bounded_requeue(remaining)));
            }
            Heartbeat::Missing => (
                reasons::NO_HEARTBEAT,
                "Addon has not reported a heartbeat yet.",
                parse_duration(&instance.spec.heartbeat_update_period)?,
            ),
            Heartbeat::TimedOut => (
                reasons::HEARTBEAT_TIMEOUT,
                "Addon failed to send a heartbeat in time.",
                parse_duration(&instance.spec.heartbeat_update_period)?,
            ),
        };

        let already_reported = instance
            .conditions()
            .find_condition(AVAILABLE)
            .is_some_and(|c| c.status == ConditionStatus::Unknown.as_str() && c.reason == reason);
        if !already_reported {
            info!("AddonInstance {}/{}: {}", namespace, name, message);
            let mut conditions = instance.conditions().to_vec();
            conditions.set_condition(new_condition(
                AVAILABLE,
                ConditionStatus::Unknown,
                reason,
                message,
                instance.generation(),
            ));
            let patch = json!({ "status": { "conditions": conditions } });
            let api: Api<AddonInstance> = Api::namespaced(self.client.clone(), &namespace);
            api.patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
                .await?;
        }
        Ok(Action::requeue(bounded_requeue(recheck)))
    }
}

async fn reconcile(
    instance: Arc<AddonInstance>,
    ctx: Arc<AddonInstanceReconciler>,
) -> Result<Action> {
    let started = Instant::now();
    let result = ctx.reconcile_instance(&instance, Utc::now()).await;
    if let Some(metrics) = &ctx.metrics {
        metrics.observe_reconcile(CONTROLLER_NAME, started.elapsed());
    }
    result
}

fn error_policy(
    instance: Arc<AddonInstance>,
    error: &AddonError,
    _ctx: Arc<AddonInstanceReconciler>,
) -> Action {
    error!(
        "Reconciliation of addon instance {} failed: {}",
        instance.name_any(),
        error
    );
    Action::requeue(Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{to_json, MockService};
    use crate::types::AddonInstanceSpec;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

    const INSTANCE_PATH: &str =
        "/apis/addons.managed.openshift.io/v1alpha1/namespaces/addon-foo/addoninstances/addon-instance";

    fn instance(last_heartbeat_secs_ago: Option<i64>) -> AddonInstance {
        let mut instance = AddonInstance::new("addon-instance", AddonInstanceSpec::default());
        instance.metadata.namespace = Some("addon-foo".to_string());
        instance.metadata.generation = Some(1);
        if let Some(secs) = last_heartbeat_secs_ago {
            instance.status_mut().last_heartbeat_time =
                Some(Time(Utc::now() - chrono::Duration::seconds(secs)));
        }
        instance
    }

    #[test]
    fn test_missing_heartbeat() {
        assert_eq!(evaluate_heartbeat(&instance(None), Utc::now()).unwrap(), Heartbeat::Missing);
    }

    #[test]
    fn test_heartbeat_times_out_after_three_periods() {
        let now = Utc::now();
        assert!(matches!(
            evaluate_heartbeat(&instance(Some(25)), now).unwrap(),
            Heartbeat::Received { .. }
        ));
        assert_eq!(evaluate_heartbeat(&instance(Some(31)), now).unwrap(), Heartbeat::TimedOut);
    }

    #[test]
    fn test_invalid_period_is_an_error() {
        let mut instance = instance(Some(1));
        instance.spec.heartbeat_update_period = "soon".to_string();
        assert!(matches!(
            evaluate_heartbeat(&instance, Utc::now()),
            Err(AddonError::InvalidDuration(_))
        ));
    }

    #[tokio::test]
    async fn test_timed_out_instance_is_marked_unknown_once() {
        let stale = instance(Some(120));
        let mock = MockService::new().on_get(INSTANCE_PATH, 200, &to_json(&stale));
        let reconciler = AddonInstanceReconciler::new(mock.clone().into_client(), None);

        let action = reconciler.reconcile_instance(&stale, Utc::now()).await.unwrap();
        assert_eq!(action, Action::requeue(Duration::from_secs(10)));

        let patches = mock.requests_to("PATCH", &format!("{}/status", INSTANCE_PATH));
        assert_eq!(patches.len(), 1);
        let condition = &patches[0].json()["status"]["conditions"][0];
        assert_eq!(condition["type"], AVAILABLE);
        assert_eq!(condition["status"], "Unknown");
        assert_eq!(condition["reason"], reasons::HEARTBEAT_TIMEOUT);

        let mut reported = stale.clone();
        reported.status_mut().conditions.set_condition(new_condition(
            AVAILABLE,
            ConditionStatus::Unknown,
            reasons::HEARTBEAT_TIMEOUT,
            "",
            1,
        ));
        reconciler.reconcile_instance(&reported, Utc::now()).await.unwrap();
        assert_eq!(mock.writes().len(), 1);
    }

    #[tokio::test]
    async fn test_healthy_instance_is_left_alone() {
        let healthy = instance(Some(2));
        let mock = MockService::new();
        let reconciler = AddonInstanceReconciler::new(mock.clone().into_client(), None);

        let action = reconciler.reconcile_instance(&healthy, Utc::now()).await.unwrap();

        assert!(mock.requests().is_empty());
        assert_ne!(action, Action::await_change());
    }

    #[tokio::test]
    async fn test_zero_period_does_not_requeue_immediately() {
        let mut stale = instance(Some(5));
        stale.spec.heartbeat_update_period = "0".to_string();
        let mock = MockService::new().on_get(INSTANCE_PATH, 200, &to_json(&stale));
        let reconciler = AddonInstanceReconciler::new(mock.clone().into_client(), None);

        let action = reconciler.reconcile_instance(&stale, Utc::now()).await.unwrap();

        assert_eq!(
            action,
            Action::requeue(Duration::from_secs(crate::constants::DEFAULT_RETRY_SECS))
        );
    }

    #[tokio::test]
    async fn test_long_period_requeues_within_a_day() {
        let mut healthy = instance(Some(1));
        healthy.spec.heartbeat_update_period = "8760h".to_string();
        let reconciler = AddonInstanceReconciler::new(MockService::new().into_client(), None);

        let action = reconciler.reconcile_instance(&healthy, Utc::now()).await.unwrap();

        assert_eq!(
            action,
            Action::requeue(Duration::from_secs(crate::constants::MAX_REQUEUE_SECS))
        );
    }
}

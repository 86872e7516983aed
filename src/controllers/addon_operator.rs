// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! AddonOperator controller - applies operator-wide settings from the
//! `addon-operator` singleton: global pause and the OCM connection.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::StreamExt;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::{
    api::{Patch, PatchParams},
    runtime::{controller::Action, Controller},
    Api, Client, ResourceExt,
};
use kube_runtime::watcher::Config as WatcherConfig;
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

use super::SharedState;
use crate::config::Config;
use crate::constants::conditions::{reasons, AVAILABLE, PAUSED};
use crate::constants::ADDON_OPERATOR_OBJECT_NAME;
use crate::error::{AddonError, Result};
use crate::ocm::client::connect_from_cluster;
use crate::status::{new_condition, ConditionStatus, ConditionsMutExt};
use crate::types::AddonOperator;

const CONTROLLER_NAME: &str = "addon-operator";
const HEARTBEAT_INTERVAL_SECS: u64 = 60;

/// Only the `addon-operator` singleton is watched
fn singleton_watch_config() -> WatcherConfig {
    WatcherConfig::default().fields(&format!("metadata.name={}", ADDON_OPERATOR_OBJECT_NAME))
}

pub struct AddonOperatorReconciler {
    client: Client,
    config: Config,
    shared: SharedState,
}

impl AddonOperatorReconciler {
    pub fn new(client: Client, config: Config, shared: SharedState) -> Self {
        Self { client, config, shared }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let operators: Api<AddonOperator> = Api::all(self.client.clone());
        let context = Arc::new(self);

        Controller::new(operators, singleton_watch_config())
            .shutdown_on_signal()
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled addon operator: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }

    #[instrument(skip_all, fields(name = %operator.name_any()))]
    async fn reconcile_operator(&self, operator: &AddonOperator) -> Result<Action> {
        if operator.name_any() != ADDON_OPERATOR_OBJECT_NAME {
            debug!("Ignoring AddonOperator {}", operator.name_any());
            return Ok(Action::await_change());
        }

        if operator.spec.paused {
            self.shared.pause.enable().await;
        } else {
            self.shared.pause.disable().await;
        }

        let mut ocm_error = None;
        if self.config.enable_status_reporting && !self.shared.ocm.is_initialized().await {
            if let Some(ocm) = &operator.spec.ocm {
                match connect_from_cluster(&self.client, ocm, self.shared.metrics.clone()).await {
                    Ok(client) => {
                        self.shared.ocm.init(Arc::new(client)).await;
                    }
                    Err(e) => {
                        warn!("Could not connect to OCM: {}", e);
                        ocm_error = Some(e);
                    }
                }
            }
        }

        self.update_status(operator).await?;
        match ocm_error {
            Some(e) => Err(e),
            None => Ok(Action::requeue(Duration::from_secs(HEARTBEAT_INTERVAL_SECS))),
        }
    }

    async fn update_status(&self, operator: &AddonOperator) -> Result<()> {
        let generation = operator.metadata.generation.unwrap_or_default();
        let mut conditions = operator
            .status
            .as_ref()
            .map(|s| s.conditions.clone())
            .unwrap_or_default();
        conditions.set_condition(new_condition(
            AVAILABLE,
            ConditionStatus::True,
            reasons::READY,
            "Addon operator is ready.",
            generation,
        ));
        if operator.spec.paused {
            conditions.set_condition(new_condition(
                PAUSED,
                ConditionStatus::True,
                reasons::ADDON_OPERATOR_PAUSED,
                "Addon operator is paused.",
                generation,
            ));
        } else if conditions.remove_condition(PAUSED) {
            info!("Addon operator resumed");
        }

        let patch = json!({
            "status": {
                "observedGeneration": generation,
                "conditions": conditions,
                "lastHeartbeatTime": Time(Utc::now()),
            }
        });
        let api: Api<AddonOperator> = Api::all(self.client.clone());
        api.patch_status(&operator.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }
}

async fn reconcile(
    operator: Arc<AddonOperator>,
    ctx: Arc<AddonOperatorReconciler>,
) -> Result<Action> {
    let started = Instant::now();
    let result = ctx.reconcile_operator(&operator).await;
    if let Some(metrics) = &ctx.shared.metrics {
        metrics.observe_reconcile(CONTROLLER_NAME, started.elapsed());
    }
    result
}

fn error_policy(
    _operator: Arc<AddonOperator>,
    error: &AddonError,
    ctx: Arc<AddonOperatorReconciler>,
) -> Action {
    error!("Reconciliation of addon operator failed: {}", error);
    Action::requeue(ctx.config.retry_interval)
}

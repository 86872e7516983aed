// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Addon controller - drives every Addon through the sub-reconciler pipeline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{Stream, StreamExt};
use k8s_openapi::api::core::v1::{Namespace, Secret};
use k8s_openapi::api::networking::v1::NetworkPolicy;
use kube::{
    api::{Patch, PatchParams},
    runtime::{controller::Action, Controller},
    Api, Client, ResourceExt,
};
use kube_runtime::watcher::Config as WatcherConfig;
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

use super::{controlling_addon, SharedState};
use crate::config::Config;
use crate::constants::{conditions::INSTALLED, labels, CACHE_FINALIZER};
use crate::deletion::DeletionCoordinator;
use crate::error::{AddonError, ErrorList, Result};
use crate::ocm::{sync_status, sync_upgrade_policy};
use crate::reconcilers::{default_pipeline, run_pipeline, Outcome, SubReconciler};
use crate::status::reporters::{
    remove_paused, report_addon_paused, report_not_installed_yet, report_operator_paused,
    report_terminating, report_upgrade_started,
};
use crate::status::ConditionsExt;
use crate::types::monitoring::{MonitoringStack, ServiceMonitor};
use crate::types::olm::{
    CatalogSource, ClusterServiceVersion, Operator, OperatorGroup, Subscription,
};
use crate::types::package::ClusterObjectTemplate;
use crate::types::{Addon, AddonInstance};

const CONTROLLER_NAME: &str = "addon";
const ERROR_REQUEUE_SECS: u64 = 30;

pub struct AddonReconciler {
    client: Client,
    config: Config,
    shared: SharedState,
    pipeline: Vec<Box<dyn SubReconciler>>,
    deletion: DeletionCoordinator,
}

impl AddonReconciler {
    pub fn new(client: Client, config: Config, shared: SharedState) -> Self {
        let pipeline = default_pipeline(&client, &config, &shared.indexes);
        let deletion = DeletionCoordinator::new(client.clone());
        Self {
            client,
            config,
            shared,
            pipeline,
            deletion,
        }
    }

    /// Run the controller until shutdown. Every item of `requeue_all`
    /// schedules a reconcile of every known Addon.
    pub async fn run(
        self,
        requeue_all: impl Stream<Item = ()> + Send + Sync + 'static,
    ) -> anyhow::Result<()> {
        let client = self.client.clone();
        let addons: Api<Addon> = Api::all(client.clone());
        let wc = WatcherConfig::default();
        let indexes = self.shared.indexes.clone();
        let csv_index = indexes.csvs.clone();
        let operator_index = indexes.operators.clone();
        let enable_monitoring_stack = self.config.enable_monitoring_stack;
        let enable_package_operator = self.config.enable_package_operator;

        let mut controller = Controller::new(addons, wc.clone())
            .watches(Api::<Namespace>::all(client.clone()), wc.clone(), |o| controlling_addon(&o))
            .watches(
                Api::<Secret>::all(client.clone()),
                WatcherConfig::default().labels(labels::SECRET_PROPAGATION),
                |o| controlling_addon(&o),
            )
            .watches(Api::<AddonInstance>::all(client.clone()), wc.clone(), |o| {
                controlling_addon(&o)
            })
            .watches(Api::<OperatorGroup>::all(client.clone()), wc.clone(), |o| {
                controlling_addon(&o)
            })
            .watches(Api::<CatalogSource>::all(client.clone()), wc.clone(), |o| {
                controlling_addon(&o)
            })
            .watches(Api::<Subscription>::all(client.clone()), wc.clone(), |o| {
                controlling_addon(&o)
            })
            .watches(Api::<NetworkPolicy>::all(client.clone()), wc.clone(), |o| {
                controlling_addon(&o)
            })
            .watches(Api::<ServiceMonitor>::all(client.clone()), wc.clone(), |o| {
                controlling_addon(&o)
            })
            .watches(Api::<Operator>::all(client.clone()), wc.clone(), move |o| {
                operator_index.map_object(&o)
            })
            .watches(Api::<ClusterServiceVersion>::all(client.clone()), wc.clone(), move |o| {
                csv_index.map_object(&o)
            });
        if enable_monitoring_stack {
            let stacks = Api::<MonitoringStack>::all(client.clone());
            controller = controller.watches(stacks, wc.clone(), |o| controlling_addon(&o));
        }
        if enable_package_operator {
            let templates = Api::<ClusterObjectTemplate>::all(client);
            controller = controller.watches(templates, wc, |o| controlling_addon(&o));
        }

        let context = Arc::new(self);
        controller
            .reconcile_all_on(requeue_all)
            .shutdown_on_signal()
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled addon: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }

    fn api(&self) -> Api<Addon> {
        Api::all(self.client.clone())
    }

    #[instrument(skip_all, fields(addon = %name))]
    async fn reconcile_by_name(&self, name: &str) -> Result<Action> {
        let Some(addon) = self.api().get_opt(name).await? else {
            debug!("Addon {} is gone", name);
            self.forget(name);
            return Ok(Action::await_change());
        };
        self.reconcile_addon(addon).await
    }

    async fn reconcile_addon(&self, mut addon: Addon) -> Result<Action> {
        if addon.is_being_deleted() || addon.is_marked_for_deletion() {
            return self.handle_deletion(addon).await;
        }

        if self.shared.pause.is_paused().await {
            info!("Addon operator is paused, skipping addon {}", addon.name_any());
            report_operator_paused(&mut addon);
            self.persist_status(&addon).await?;
            return Ok(Action::await_change());
        }
        if addon.spec.paused {
            info!("Addon {} is paused", addon.name_any());
            report_addon_paused(&mut addon);
            self.persist_status(&addon).await?;
            return Ok(Action::await_change());
        }
        remove_paused(&mut addon);

        if let (Some(desired), Some(observed)) = (addon.spec_version(), addon.observed_version()) {
            if desired != observed {
                info!("Addon {} upgrades from {} to {}", addon.name_any(), observed, desired);
                report_upgrade_started(&mut addon);
                return self
                    .finish(&mut addon, Ok(Outcome::RequeueAfter(self.config.retry_interval)))
                    .await;
            }
        }

        if !addon.conditions().has_condition(INSTALLED) {
            report_not_installed_yet(&mut addon);
        }
        self.ensure_finalizer(&addon).await?;

        let outcome = run_pipeline(&self.pipeline, &mut addon).await;
        self.finish(&mut addon, outcome).await
    }

    /// Record metrics, report to OCM and persist the status, keeping every error.
    async fn finish(&self, addon: &mut Addon, outcome: Result<Outcome>) -> Result<Action> {
        let mut errors = ErrorList::new();
        let outcome = outcome.unwrap_or_else(|e| {
            errors.push(e);
            Outcome::Continue
        });

        if let Some(metrics) = &self.shared.metrics {
            metrics.record_addon(addon);
        }
        if self.config.enable_status_reporting {
            match self.shared.ocm.get().await {
                Some(ocm) => {
                    if let Err(e) = sync_upgrade_policy(ocm.as_ref(), addon).await {
                        errors.push(e);
                    }
                    if let Err(e) = sync_status(ocm.as_ref(), addon).await {
                        errors.push(e);
                    }
                }
                None => debug!("OCM client not initialized yet, skipping status report"),
            }
        }

        let version = addon.spec.version.clone();
        let generation = addon.generation();
        let status = addon.status_mut();
        status.observed_version = version;
        status.observed_generation = Some(generation);

        if let Err(e) = self.persist_status(addon).await {
            errors.push(e);
        }
        errors.into_result()?;

        Ok(match outcome {
            Outcome::RequeueAfter(after) => Action::requeue(after),
            Outcome::Continue | Outcome::Stop => Action::await_change(),
        })
    }

    /// Advance deletion, persisting whatever progress was made even when a step fails.
    async fn handle_deletion(&self, mut addon: Addon) -> Result<Action> {
        let name = addon.name_any();
        let mut errors = ErrorList::new();
        let requeue = self.deletion.handle(&mut addon).await.unwrap_or_else(|e| {
            errors.push(e);
            None
        });

        if !addon.is_being_deleted() {
            if let Err(e) = self.persist_status(&addon).await {
                errors.push(e);
            }
            errors.into_result()?;
            return Ok(requeue.map(Action::requeue).unwrap_or_else(Action::await_change));
        }

        report_terminating(&mut addon);
        if let Err(e) = self.persist_status(&addon).await {
            errors.push(e);
        }
        if addon.has_finalizer(CACHE_FINALIZER) {
            let finalizers: Vec<String> = addon
                .finalizers()
                .iter()
                .filter(|f| *f != CACHE_FINALIZER)
                .cloned()
                .collect();
            match self.patch_finalizers(&name, finalizers).await {
                Ok(()) => info!("Removed finalizer from addon {}", name),
                Err(e) => errors.push(e),
            }
        }
        errors.into_result()?;
        self.forget(&name);
        Ok(Action::await_change())
    }

    async fn ensure_finalizer(&self, addon: &Addon) -> Result<()> {
        if addon.has_finalizer(CACHE_FINALIZER) {
            return Ok(());
        }
        let mut finalizers = addon.finalizers().to_vec();
        finalizers.push(CACHE_FINALIZER.to_string());
        self.patch_finalizers(&addon.name_any(), finalizers).await
    }

    async fn patch_finalizers(&self, name: &str, finalizers: Vec<String>) -> Result<()> {
        let patch = json!({ "metadata": { "finalizers": finalizers } });
        self.api()
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn persist_status(&self, addon: &Addon) -> Result<()> {
        let patch = json!({ "status": addon.status });
        self.api()
            .patch_status(&addon.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    fn forget(&self, name: &str) {
        self.shared.indexes.free(name);
        if let Some(metrics) = &self.shared.metrics {
            metrics.forget_addon(name);
        }
    }
}

async fn reconcile(addon: Arc<Addon>, ctx: Arc<AddonReconciler>) -> Result<Action> {
    let started = Instant::now();
    let result = ctx.reconcile_by_name(&addon.name_any()).await;
    if let Some(metrics) = &ctx.shared.metrics {
        metrics.observe_reconcile(CONTROLLER_NAME, started.elapsed());
    }
    result
}

fn error_policy(addon: Arc<Addon>, error: &AddonError, _ctx: Arc<AddonReconciler>) -> Action {
    error!("Reconciliation of addon {} failed: {}", addon.name_any(), error);
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_SECS))
}

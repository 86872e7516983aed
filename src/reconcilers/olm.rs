// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Installs the addon's operator through OLM.
//!
//! Phases run in order and each can hold the rest back:
//! OperatorGroup, catalog NetworkPolicy, primary CatalogSource (gated on
//! READY), additional CatalogSources (same gate), Subscription (gated on a
//! linked CSV), then the CSV state read from the Operator object.

use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::networking::v1::NetworkPolicy;
use kube::{Api, Client, ResourceExt};
use tracing::{debug, info, instrument};

use super::{OlmIndexes, Outcome, SubReconciler};
use crate::constants::conditions::{reasons, UPGRADE_STARTED};
use crate::deletion::legacy::delete_signal_present;
use crate::desired::olm::{
    build_additional_catalog_sources, build_catalog_network_policy, build_catalog_source,
    build_operator_group, build_subscription, catalog_source_name,
};
use crate::error::{AddonError, Result};
use crate::kubernetes::reconcile_object;
use crate::status::reporters::{
    report_configuration_error, report_installed, report_pending, report_ready,
    report_upgrade_succeeded,
};
use crate::status::ConditionsExt;
use crate::types::addon::{AddonInstallOlmCommon, ResourceAdoptionStrategy};
use crate::types::olm::{CatalogSource, CsvState, Operator, OperatorGroup, Subscription};
use crate::types::Addon;

pub struct OlmReconciler {
    client: Client,
    indexes: OlmIndexes,
    retry: Duration,
}

impl OlmReconciler {
    pub fn new(client: Client, indexes: OlmIndexes, retry: Duration) -> Self {
        Self {
            client,
            indexes,
            retry,
        }
    }

    /// Reconcile a CatalogSource and report whether its registry is serving
    async fn ensure_catalog_source(
        &self,
        addon: &mut Addon,
        desired: CatalogSource,
        strategy: ResourceAdoptionStrategy,
    ) -> Result<bool> {
        let namespace = desired.namespace().unwrap_or_default();
        let api: Api<CatalogSource> = Api::namespaced(self.client.clone(), &namespace);
        let catalog = reconcile_object(&api, desired, strategy).await?;
        if catalog.is_ready() {
            return Ok(true);
        }

        debug!("CatalogSource {} is {}", catalog.name_any(), catalog.connection_state());
        report_pending(
            addon,
            reasons::UNREADY_CATALOG_SOURCE,
            format!(
                "CatalogSource {} connection state is {}",
                catalog.name_any(),
                catalog.connection_state()
            ),
        );
        Ok(false)
    }

    /// Classify the tracked CSV and report it on the addon
    async fn observe_csv(
        &self,
        addon: &mut Addon,
        common: &AddonInstallOlmCommon,
        csv_name: &str,
    ) -> Result<Outcome> {
        let addon_name = addon.name_any();
        let namespace = common.namespace.as_str();
        let csv_key = format!("{}/{}", namespace, csv_name);

        let operator_name = Operator::name_for(&common.package_name, namespace);
        if self.indexes.operators.update_map(&addon_name, [operator_name.clone()]) {
            debug!("Tracked Operator changed, retrying once");
            return Ok(Outcome::RequeueAfter(self.retry));
        }
        let operators: Api<Operator> = Api::all(self.client.clone());
        let state = match operators.get_opt(&operator_name).await? {
            Some(operator) => operator.csv_state(namespace, csv_name),
            None => CsvState::Missing,
        };

        match state {
            CsvState::Missing => {
                report_pending(
                    addon,
                    reasons::MISSING_CSV,
                    format!("ClusterServiceVersion {} is missing", csv_key),
                );
                // ConfigMaps are not watched, so keep polling for the delete signal
                if delete_signal_present(&self.client, &addon_name, namespace).await? {
                    info!(
                        "Addon {} acknowledged uninstall through the delete ConfigMap",
                        addon_name
                    );
                    return Ok(Outcome::Stop);
                }
                Ok(Outcome::RequeueAfter(self.retry))
            }
            CsvState::Succeeded => {
                let first_install = addon
                    .status
                    .as_ref()
                    .and_then(|s| s.last_observed_available_csv.as_deref())
                    .filter(|csv| !csv.is_empty())
                    .is_none();
                if first_install {
                    report_installed(addon);
                }
                if addon.conditions().is_condition_true(UPGRADE_STARTED) {
                    report_upgrade_succeeded(addon);
                }
                report_ready(addon);
                addon.status_mut().last_observed_available_csv = Some(csv_key);
                Ok(Outcome::Continue)
            }
            CsvState::Failed => {
                report_pending(
                    addon,
                    reasons::UNREADY_CSV,
                    format!("ClusterServiceVersion {} is not ready: failed", csv_key),
                );
                Ok(Outcome::Continue)
            }
            CsvState::Pending => {
                report_pending(
                    addon,
                    reasons::UNREADY_CSV,
                    format!("ClusterServiceVersion {} is not ready: unknown/pending", csv_key),
                );
                Ok(Outcome::RequeueAfter(self.retry))
            }
        }
    }
}

#[async_trait]
impl SubReconciler for OlmReconciler {
    fn name(&self) -> &'static str {
        "olm"
    }

    #[instrument(skip_all, fields(addon = %addon.name_any()))]
    async fn reconcile(&self, addon: &mut Addon) -> Result<Outcome> {
        let install_spec = addon.spec.install.clone();
        let install = match install_spec.resolve() {
            Ok(install) => install,
            Err(AddonError::Configuration(message)) => {
                report_configuration_error(addon, message);
                return Ok(Outcome::Stop);
            }
            Err(e) => return Err(e),
        };
        let common = install.common();
        let primary_name = catalog_source_name(addon);
        if common.additional_catalog_sources.iter().any(|s| s.name == primary_name) {
            report_configuration_error(
                addon,
                format!(
                    "additional catalog source name {} is reserved for the primary catalog",
                    primary_name
                ),
            );
            return Ok(Outcome::Stop);
        }
        let strategy = addon.spec.resource_adoption_strategy;

        let operator_groups: Api<OperatorGroup> =
            Api::namespaced(self.client.clone(), &common.namespace);
        let operator_group = build_operator_group(addon, &install);
        reconcile_object(&operator_groups, operator_group, strategy).await?;

        // OLM cannot reach the registry pods until the policy admits the gRPC port
        let policies: Api<NetworkPolicy> = Api::namespaced(self.client.clone(), &common.namespace);
        let policy = build_catalog_network_policy(addon, &install);
        reconcile_object(&policies, policy, strategy).await?;

        let primary = build_catalog_source(addon, &install);
        if !self.ensure_catalog_source(addon, primary, strategy).await? {
            return Ok(Outcome::RequeueAfter(self.retry));
        }
        for additional in build_additional_catalog_sources(addon, &install) {
            if !self.ensure_catalog_source(addon, additional, strategy).await? {
                return Ok(Outcome::RequeueAfter(self.retry));
            }
        }

        let subscriptions: Api<Subscription> =
            Api::namespaced(self.client.clone(), &common.namespace);
        let desired_subscription = build_subscription(addon, &install);
        let subscription = reconcile_object(&subscriptions, desired_subscription, strategy).await?;
        let Some((installed_csv, current_csv)) = subscription.linked_csvs() else {
            debug!("Subscription {} has no linked CSV yet", subscription.name_any());
            report_pending(
                addon,
                reasons::UNREADY_CSV,
                "Waiting for OLM to link a ClusterServiceVersion to the Subscription.",
            );
            return Ok(Outcome::RequeueAfter(self.retry));
        };

        let changed = self.indexes.csvs.update_map(
            &addon.name_any(),
            [
                format!("{}/{}", common.namespace, installed_csv),
                format!("{}/{}", common.namespace, current_csv),
            ],
        );
        if changed {
            debug!("Tracked CSVs changed, retrying once");
            return Ok(Outcome::RequeueAfter(self.retry));
        }

        self.observe_csv(addon, common, current_csv).await
    }
}

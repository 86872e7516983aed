// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Coordinates addon deletion with the workload running it.
//!
//! The coordinator only advances the `ReadyToBeDeleted` condition; whoever
//! deletes the Addon watches that condition. Finalizer removal is handled by
//! the Addon controller independently.

pub mod addon_instance;
pub mod legacy;

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use kube::{Client, ResourceExt};
use tracing::{debug, info, instrument, warn};

use crate::constants::{conditions::READY_TO_BE_DELETED, deletion::DEFAULT_TIMEOUT_SECS};
use crate::duration::bounded_requeue;
use crate::error::Result;
use crate::status::reporters::{
    clear_delete_timeout, report_delete_timeout, report_ready_to_be_deleted,
};
use crate::status::ConditionsExt;
use crate::types::Addon;

pub use addon_instance::AddonInstanceStrategy;
pub use legacy::LegacyConfigMapStrategy;

/// A way of telling the workload it is about to be removed.
#[async_trait]
pub trait DeletionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn notify_addon(&self, addon: &Addon) -> Result<()>;

    async fn ack_received_from_addon(&self, addon: &Addon) -> Result<bool>;
}

pub struct DeletionCoordinator {
    strategies: Vec<Box<dyn DeletionStrategy>>,
}

impl DeletionCoordinator {
    /// AddonInstance first, then the legacy ConfigMap signal
    pub fn new(client: Client) -> Self {
        Self::with_strategies(vec![
            Box::new(AddonInstanceStrategy::new(client.clone())),
            Box::new(LegacyConfigMapStrategy::new(client)),
        ])
    }

    pub fn with_strategies(strategies: Vec<Box<dyn DeletionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Advance the ReadyToBeDeleted condition. Returns when to check again, if at all.
    #[instrument(skip_all, fields(addon = %addon.name_any()))]
    pub async fn handle(&self, addon: &mut Addon) -> Result<Option<Duration>> {
        if !addon.is_being_deleted() && !addon.is_marked_for_deletion() {
            return Ok(None);
        }
        if addon.conditions().is_condition_true(READY_TO_BE_DELETED) {
            debug!("Addon {} is already ready to be deleted", addon.name_any());
            return Ok(None);
        }
        if !addon.spec.delete_ack_required {
            report_ready_to_be_deleted(addon, true);
            return Ok(None);
        }

        report_ready_to_be_deleted(addon, false);
        for strategy in &self.strategies {
            strategy.notify_addon(addon).await?;
            if strategy.ack_received_from_addon(addon).await? {
                info!(
                    "Addon {} acknowledged deletion via {}",
                    addon.name_any(),
                    strategy.name()
                );
                report_ready_to_be_deleted(addon, true);
                clear_delete_timeout(addon);
                return Ok(None);
            }
        }

        let timeout = addon.delete_timeout().unwrap_or_else(|e| {
            warn!("Ignoring delete timeout of addon {}: {}", addon.name_any(), e);
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        });
        let elapsed = addon
            .conditions()
            .find_condition(READY_TO_BE_DELETED)
            .and_then(|c| (Utc::now() - c.last_transition_time.0).to_std().ok())
            .unwrap_or_default();

        if elapsed >= timeout {
            warn!("Addon {} did not acknowledge deletion within {:?}", addon.name_any(), timeout);
            report_delete_timeout(addon);
            return Ok(None);
        }
        Ok(Some(bounded_requeue(timeout - elapsed)))
    }
}

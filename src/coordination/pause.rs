// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use tokio::sync::RwLock;
use tracing::info;

use super::ReconcileTrigger;

/// Operator-wide pause flag consulted by every Addon reconcile.
///
/// Toggling takes the write lock and requeues all Addons before releasing it,
/// so a reconcile never sees the flag change without also being scheduled.
pub struct GlobalPause {
    paused: RwLock<bool>,
    trigger: ReconcileTrigger,
}

impl GlobalPause {
    pub fn new(trigger: ReconcileTrigger) -> Self {
        Self {
            paused: RwLock::new(false),
            trigger,
        }
    }

    pub async fn enable(&self) {
        self.set(true).await;
    }

    pub async fn disable(&self) {
        self.set(false).await;
    }

    pub async fn is_paused(&self) -> bool {
        *self.paused.read().await
    }

    async fn set(&self, paused: bool) {
        let mut current = self.paused.write().await;
        if *current == paused {
            return;
        }
        *current = paused;
        info!("Global pause {}", if paused { "enabled" } else { "disabled" });
        self.trigger.requeue_all("global pause changed");
    }
}

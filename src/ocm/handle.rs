// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use super::client::OcmClient;
use crate::coordination::ReconcileTrigger;

/// Shared, lazily initialised OCM client.
///
/// The AddonOperator controller installs the client once OCM settings are
/// known; Addon reconciles skip status reporting until then.
pub struct OcmHandle {
    client: RwLock<Option<Arc<dyn OcmClient>>>,
    trigger: ReconcileTrigger,
}

impl OcmHandle {
    pub fn new(trigger: ReconcileTrigger) -> Self {
        Self {
            client: RwLock::new(None),
            trigger,
        }
    }

    pub async fn get(&self) -> Option<Arc<dyn OcmClient>> {
        self.client.read().await.clone()
    }

    pub async fn is_initialized(&self) -> bool {
        self.client.read().await.is_some()
    }

    /// Install `client` unless one is already set. The first install requeues
    /// every Addon so skipped status reports are retried.
    pub async fn init(&self, client: Arc<dyn OcmClient>) -> bool {
        let mut current = self.client.write().await;
        if current.is_some() {
            return false;
        }
        *current = Some(client);
        info!("OCM client initialized");
        self.trigger.requeue_all("OCM client initialized");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeOcmClient;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_first_init_wins_and_requeues_once() {
        let (trigger, mut stream) = ReconcileTrigger::new();
        let handle = OcmHandle::new(trigger);
        assert!(handle.get().await.is_none());

        assert!(handle.init(Arc::new(FakeOcmClient::default())).await);
        assert!(!handle.init(Arc::new(FakeOcmClient::default())).await);

        assert!(handle.is_initialized().await);
        assert_eq!(stream.next().await, Some(()));
        drop(handle);
        assert_eq!(stream.next().await, None);
    }
}

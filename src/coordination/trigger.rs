// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use futures::channel::mpsc;
use futures::Stream;
use tracing::{debug, error};

/// Handle asking the Addon controller to re-evaluate every Addon it knows.
///
/// The receiving half is handed to `Controller::reconcile_all_on`, so sending
/// never blocks and the controller deduplicates queued work per object.
#[derive(Clone)]
pub struct ReconcileTrigger {
    tx: mpsc::UnboundedSender<()>,
}

impl ReconcileTrigger {
    pub fn new() -> (Self, impl Stream<Item = ()> + Send + Sync + Unpin + 'static) {
        let (tx, rx) = mpsc::unbounded();
        (Self { tx }, rx)
    }

    pub fn requeue_all(&self, reason: &str) {
        debug!("Requeueing all addons: {}", reason);
        if let Err(e) = self.tx.unbounded_send(()) {
            error!("Failed to trigger addon requeue: {}", e);
        }
    }
}

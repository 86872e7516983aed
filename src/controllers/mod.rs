// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Controllers registered with the kube runtime.

pub mod addon;
pub mod addon_instance;
pub mod addon_operator;

use std::sync::Arc;

use kube::runtime::reflector::ObjectRef;
use kube::Resource;

use crate::coordination::GlobalPause;
use crate::metrics::Metrics;
use crate::ocm::OcmHandle;
use crate::reconcilers::OlmIndexes;
use crate::types::Addon;

pub use addon::AddonReconciler;
pub use addon_instance::AddonInstanceReconciler;
pub use addon_operator::AddonOperatorReconciler;

/// State shared between the controllers
#[derive(Clone)]
pub struct SharedState {
    pub pause: Arc<GlobalPause>,
    pub ocm: Arc<OcmHandle>,
    pub metrics: Option<Arc<Metrics>>,
    pub indexes: OlmIndexes,
}

/// Map a child object to the Addon controlling it.
///
/// Addons are cluster scoped while most children are namespaced, so the
/// owner reference is resolved without the child's namespace.
pub fn controlling_addon<K: Resource>(obj: &K) -> Option<ObjectRef<Addon>> {
    obj.meta()
        .owner_references
        .as_ref()?
        .iter()
        .find(|o| {
            o.controller == Some(true)
                && o.kind == "Addon"
                && o.api_version == Addon::api_version(&())
        })
        .map(|o| ObjectRef::new(&o.name))
}

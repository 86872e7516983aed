// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Routes watch events of objects the Addon does not own back to the Addon
//! that tracks them.
//!
//! OLM creates the Operator and ClusterServiceVersion objects, so they carry
//! no owner reference pointing at an Addon. The OLM sub-reconciler records
//! what it observed here, and the Addon controller's `watches` mappers look
//! events up. An event for an unknown key is dropped; the owning Addon's own
//! reconcile repairs the mapping.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use kube::runtime::reflector::ObjectRef;
use kube::{Resource, ResourceExt};
use tracing::debug;

use crate::types::Addon;

/// `namespace/name` for namespaced objects, `name` otherwise
pub fn object_key<K: Resource>(obj: &K) -> String {
    match obj.namespace() {
        Some(namespace) => format!("{}/{}", namespace, obj.name_any()),
        None => obj.name_any(),
    }
}

#[derive(Default)]
struct Maps {
    by_addon: HashMap<String, HashSet<String>>,
    by_child: HashMap<String, String>,
}

/// Bidirectional Addon name <-> child key map behind a single lock.
#[derive(Default)]
pub struct ResourceIndex {
    maps: RwLock<Maps>,
}

impl ResourceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the set of child keys tracked for `addon`. Returns whether it changed.
    pub fn update_map<I, S>(&self, addon: &str, children: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let children: HashSet<String> = children.into_iter().map(Into::into).collect();
        let mut maps = self.maps.write().unwrap_or_else(PoisonError::into_inner);

        let reverse_consistent = children
            .iter()
            .all(|child| maps.by_child.get(child).map(String::as_str) == Some(addon));
        if maps.by_addon.get(addon) == Some(&children) && reverse_consistent {
            return false;
        }

        debug!("Tracking {:?} for addon {}", children, addon);
        if let Some(previous) = maps.by_addon.remove(addon) {
            for child in previous {
                if maps.by_child.get(&child).map(String::as_str) == Some(addon) {
                    maps.by_child.remove(&child);
                }
            }
        }
        for child in &children {
            if let Some(other) = maps.by_child.insert(child.clone(), addon.to_string()) {
                if other != addon {
                    if let Some(set) = maps.by_addon.get_mut(&other) {
                        set.remove(child);
                    }
                }
            }
        }
        maps.by_addon.insert(addon.to_string(), children);
        true
    }

    /// Forget everything tracked for `addon`
    pub fn free(&self, addon: &str) {
        let mut maps = self.maps.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(children) = maps.by_addon.remove(addon) {
            debug!("Releasing {} tracked objects of addon {}", children.len(), addon);
            for child in children {
                maps.by_child.remove(&child);
            }
        }
    }

    pub fn lookup(&self, child: &str) -> Option<ObjectRef<Addon>> {
        let maps = self.maps.read().unwrap_or_else(PoisonError::into_inner);
        maps.by_child.get(child).map(|addon| ObjectRef::new(addon))
    }

    /// Map a watch event of `obj` to the Addon tracking it
    pub fn map_object<K: Resource>(&self, obj: &K) -> Option<ObjectRef<Addon>> {
        let addon = self.lookup(&object_key(obj));
        if addon.is_none() {
            debug!("Dropping event for untracked {}", object_key(obj));
        }
        addon
    }
}

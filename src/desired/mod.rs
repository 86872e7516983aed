// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Pure builders computing the desired shape of every child resource.

pub mod addon_instance;
pub mod monitoring;
pub mod namespace;
pub mod olm;
pub mod package;
pub mod secret;

use std::collections::BTreeMap;

use kube::api::ObjectMeta;

use crate::kubernetes::controller_ref;
use crate::types::Addon;

/// Metadata shared by all children: name, common labels and the controller reference
pub(crate) fn child_meta(addon: &Addon, name: &str, namespace: Option<&str>) -> ObjectMeta {
    child_meta_with_labels(addon, name, namespace, BTreeMap::new())
}

pub(crate) fn child_meta_with_labels(
    addon: &Addon,
    name: &str,
    namespace: Option<&str>,
    extra_labels: BTreeMap<String, String>,
) -> ObjectMeta {
    let mut labels = addon.common_labels();
    labels.extend(extra_labels);
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: namespace.map(str::to_string),
        labels: Some(labels),
        owner_references: Some(controller_ref(addon)),
        ..Default::default()
    }
}

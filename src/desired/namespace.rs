// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use k8s_openapi::api::core::v1::Namespace;

use super::child_meta_with_labels;
use crate::types::Addon;

/// One Namespace per entry in `spec.namespaces`
pub fn build_namespaces(addon: &Addon) -> Vec<Namespace> {
    addon
        .spec
        .namespaces
        .iter()
        .map(|ns| {
            let mut metadata = child_meta_with_labels(addon, &ns.name, None, ns.labels.clone());
            if !ns.annotations.is_empty() {
                metadata.annotations = Some(ns.annotations.clone());
            }
            Namespace {
                metadata,
                ..Default::default()
            }
        })
        .collect()
}

pub fn is_active(namespace: &Namespace) -> bool {
    namespace
        .status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .is_some_and(|phase| phase == "Active")
}

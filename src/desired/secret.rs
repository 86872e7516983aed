// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;

use super::child_meta_with_labels;
use crate::constants::labels;
use crate::types::Addon;

/// Copy of `source` named `destination_name` in `namespace`
pub fn build_propagated_secret(
    addon: &Addon,
    source: &Secret,
    destination_name: &str,
    namespace: &str,
) -> Secret {
    let extra = BTreeMap::from([(labels::SECRET_PROPAGATION.to_string(), addon.name_any())]);
    Secret {
        metadata: child_meta_with_labels(addon, destination_name, Some(namespace), extra),
        data: source.data.clone(),
        type_: source.type_.clone(),
        ..Default::default()
    }
}

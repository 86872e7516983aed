// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use super::child_meta;
use crate::constants::ADDON_INSTANCE_NAME;
use crate::types::{Addon, AddonInstance, AddonInstanceSpec};

pub fn build_addon_instance(addon: &Addon, namespace: &str) -> AddonInstance {
    AddonInstance {
        metadata: child_meta(addon, ADDON_INSTANCE_NAME, Some(namespace)),
        spec: AddonInstanceSpec::default(),
        status: None,
    }
}

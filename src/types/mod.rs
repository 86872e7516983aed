// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Custom resource types owned, written or read by the operator.

pub mod addon;
pub mod addon_instance;
pub mod addon_operator;
pub mod monitoring;
pub mod olm;
pub mod openshift;
pub mod package;

use serde::{Deserialize, Serialize};

pub use addon::{Addon, AddonSpec, AddonStatus};
pub use addon_instance::{AddonInstance, AddonInstanceSpec, AddonInstanceStatus};
pub use addon_operator::{AddonOperator, AddonOperatorSpec, AddonOperatorStatus};

/// Loosely typed condition as reported by foreign controllers.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusCondition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

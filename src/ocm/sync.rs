// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Pushes Addon status to OCM, skipping payloads that were already reported.

use kube::ResourceExt;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use super::client::OcmClient;
use super::types::{AddOnStatus, AddOnStatusCondition, UpgradePolicyState};
use crate::constants::conditions::{UPGRADE_STARTED, UPGRADE_SUCCEEDED};
use crate::error::Result;
use crate::status::ConditionsExt;
use crate::types::addon::{AddonUpgradePolicyStatus, OcmReportedStatusHash, UpgradePolicyValue};
use crate::types::Addon;

/// The payload OCM receives for `addon`, conditions sorted by type
pub fn build_status(addon: &Addon) -> AddOnStatus {
    let mut status_conditions: Vec<AddOnStatusCondition> = addon
        .conditions()
        .iter()
        .map(|c| AddOnStatusCondition {
            status_type: c.type_.clone(),
            status_value: c.status.clone(),
            reason: c.reason.clone(),
            message: c.message.clone(),
        })
        .collect();
    status_conditions.sort_by(|a, b| a.status_type.cmp(&b.status_type));

    AddOnStatus {
        addon_id: addon.name_any(),
        correlation_id: addon.spec.correlation_id.clone().unwrap_or_default(),
        addon_version: addon.spec_version().map(str::to_string),
        status_conditions,
    }
}

/// Hex sha256 over the identity and conditions of `status`.
///
/// `serde_json::Value` objects keep their keys sorted, so the hash does not
/// depend on field order.
pub fn status_hash(status: &AddOnStatus) -> Result<String> {
    let mut conditions = status.status_conditions.clone();
    conditions.sort_by(|a, b| a.status_type.cmp(&b.status_type));
    let canonical = json!({
        "addon_id": status.addon_id,
        "correlation_id": status.correlation_id,
        "status_conditions": conditions,
    });

    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(&canonical)?);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Report the status of `addon` unless the same content was reported before.
/// The stored hash only moves after OCM accepted the payload.
#[instrument(skip_all, fields(addon = %addon.name_any()))]
pub async fn sync_status(client: &dyn OcmClient, addon: &mut Addon) -> Result<()> {
    let status = build_status(addon);
    let hash = status_hash(&status)?;
    let reported = addon
        .status
        .as_ref()
        .and_then(|s| s.ocm_reported_status_hash.as_ref())
        .is_some_and(|r| r.hash == hash);
    if reported {
        debug!("Status of addon {} already reported", addon.name_any());
        return Ok(());
    }

    match client.get_addon_status(&status.addon_id).await? {
        Some(_) => client.patch_addon_status(&status).await?,
        None => client.post_addon_status(&status).await?,
    }
    info!("Reported status of addon {} to OCM", addon.name_any());

    let observed_generation = addon.generation();
    addon.status_mut().ocm_reported_status_hash = Some(OcmReportedStatusHash {
        hash,
        observed_generation,
    });
    Ok(())
}

/// Move the OCM upgrade policy along with the Upgrade* conditions.
#[instrument(skip_all, fields(addon = %addon.name_any()))]
pub async fn sync_upgrade_policy(client: &dyn OcmClient, addon: &mut Addon) -> Result<()> {
    let Some(policy) = addon.spec.upgrade_policy.as_ref() else {
        return Ok(());
    };
    let conditions = addon.conditions();
    let value = if conditions.is_condition_true(UPGRADE_SUCCEEDED) {
        UpgradePolicyValue::Completed
    } else if conditions.is_condition_true(UPGRADE_STARTED) {
        UpgradePolicyValue::Started
    } else {
        return Ok(());
    };

    let version = addon.spec_version().map(str::to_string);
    let current = AddonUpgradePolicyStatus {
        id: policy.id.clone(),
        value,
        version,
        observed_generation: addon.generation(),
    };
    let already_reported = addon
        .status
        .as_ref()
        .and_then(|s| s.upgrade_policy.as_ref())
        .is_some_and(|p| {
            p.id == current.id && p.value == current.value && p.version == current.version
        });
    if already_reported {
        return Ok(());
    }

    let version = current.version.as_deref().unwrap_or("");
    let state = match value {
        UpgradePolicyValue::Started => UpgradePolicyState {
            value: "started".to_string(),
            description: format!("Upgrading addon to version {}.", version),
        },
        UpgradePolicyValue::Completed => UpgradePolicyState {
            value: "completed".to_string(),
            description: format!("Addon was upgraded to version {}.", version),
        },
    };
    // a previous run may have patched OCM but failed to persist the status
    let remote = client.get_upgrade_policy(&current.id).await?;
    if remote.value == state.value {
        debug!("Upgrade policy {} is already {}", current.id, state.value);
    } else {
        client.patch_upgrade_policy(&current.id, &state).await?;
        info!("Upgrade policy {} of addon {} is {}", current.id, addon.name_any(), state.value);
    }

    addon.status_mut().upgrade_policy = Some(current);
    Ok(())
}

// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Pure status mutators. They only touch the in-memory Addon; the main
//! reconciler persists the status once per reconcile.

use super::conditions::{new_condition, ConditionStatus, ConditionsMutExt};
use crate::constants::conditions::{reasons, *};
use crate::types::addon::{Addon, AddonPhase};

fn set(
    addon: &mut Addon,
    condition_type: &str,
    status: ConditionStatus,
    reason: &str,
    message: impl Into<String>,
) {
    let generation = addon.generation();
    addon
        .status_mut()
        .conditions
        .set_condition(new_condition(condition_type, status, reason, message, generation));
}

fn set_available(
    addon: &mut Addon,
    status: ConditionStatus,
    reason: &str,
    message: impl Into<String>,
    phase: AddonPhase,
) {
    set(addon, AVAILABLE, status, reason, message);
    addon.status_mut().phase = Some(phase);
}

pub fn report_ready(addon: &mut Addon) {
    set_available(
        addon,
        ConditionStatus::True,
        reasons::FULLY_RECONCILED,
        "All components are ready.",
        AddonPhase::Ready,
    );
}

/// Something upstream is not ready yet; reconciliation retries.
pub fn report_pending(addon: &mut Addon, reason: &str, message: impl Into<String>) {
    set_available(addon, ConditionStatus::False, reason, message, AddonPhase::Pending);
}

/// The spec cannot be acted on until it is edited.
pub fn report_configuration_error(addon: &mut Addon, message: impl Into<String>) {
    set_available(
        addon,
        ConditionStatus::False,
        reasons::CONFIGURATION_ERROR,
        message,
        AddonPhase::Error,
    );
}

pub fn report_collided_namespaces(addon: &mut Addon, namespaces: &[String]) {
    set_available(
        addon,
        ConditionStatus::False,
        reasons::COLLIDED_NAMESPACES,
        format!("Namespaces with collisions: {}", namespaces.join(", ")),
        AddonPhase::Error,
    );
}

pub fn report_terminating(addon: &mut Addon) {
    set_available(
        addon,
        ConditionStatus::False,
        reasons::TERMINATING,
        "Addon is being deleted.",
        AddonPhase::Terminating,
    );
}

pub fn report_operator_paused(addon: &mut Addon) {
    set(
        addon,
        PAUSED,
        ConditionStatus::True,
        reasons::ADDON_OPERATOR_PAUSED,
        "Addon operator is paused.",
    );
}

pub fn report_addon_paused(addon: &mut Addon) {
    set(addon, PAUSED, ConditionStatus::True, reasons::ADDON_PAUSED, "Addon is paused.");
}

pub fn remove_paused(addon: &mut Addon) -> bool {
    addon.status_mut().conditions.remove_condition(PAUSED)
}

pub fn report_installed(addon: &mut Addon) {
    set(
        addon,
        INSTALLED,
        ConditionStatus::True,
        reasons::ADDON_INSTALLED,
        "Addon has been successfully installed.",
    );
}

pub fn report_not_installed_yet(addon: &mut Addon) {
    set(
        addon,
        INSTALLED,
        ConditionStatus::False,
        reasons::ADDON_NOT_INSTALLED_YET,
        "Addon has not been installed yet.",
    );
}

pub fn report_upgrade_started(addon: &mut Addon) {
    addon.status_mut().conditions.remove_condition(UPGRADE_SUCCEEDED);
    set(
        addon,
        UPGRADE_STARTED,
        ConditionStatus::True,
        reasons::UPGRADE_STARTED,
        "Addon upgrade has started.",
    );
}

pub fn report_upgrade_succeeded(addon: &mut Addon) {
    addon.status_mut().conditions.remove_condition(UPGRADE_STARTED);
    set(
        addon,
        UPGRADE_SUCCEEDED,
        ConditionStatus::True,
        reasons::UPGRADE_SUCCEEDED,
        "Addon upgrade has succeeded.",
    );
}

pub fn report_ready_to_be_deleted(addon: &mut Addon, ready: bool) {
    let (reason, message) = if ready {
        (reasons::READY_TO_BE_DELETED, "Addon is ready to be deleted.")
    } else {
        (
            reasons::NOT_READY_TO_BE_DELETED,
            "Waiting for the addon to acknowledge deletion.",
        )
    };
    set(addon, READY_TO_BE_DELETED, ready.into(), reason, message);
}

pub fn report_delete_timeout(addon: &mut Addon) {
    set(
        addon,
        DELETE_TIMEOUT,
        ConditionStatus::True,
        reasons::DELETION_TIMED_OUT,
        "Timed out waiting for the addon to acknowledge deletion.",
    );
}

pub fn clear_delete_timeout(addon: &mut Addon) {
    addon.status_mut().conditions.remove_condition(DELETE_TIMEOUT);
}

// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for API discovery and child resource ownership.

pub mod crd;
pub mod ownership;

pub use crd::wait_for_required_crds;
pub use ownership::{
    controller_ref, delete_if_controlled, is_controlled_by, reconcile_object, Reconcilable,
};

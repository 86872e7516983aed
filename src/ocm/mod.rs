// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! OpenShift Cluster Manager status reporting.

pub mod client;
pub mod handle;
pub mod sync;
pub mod types;

pub use client::{HttpOcmClient, OcmClient};
pub use handle::OcmHandle;
pub use sync::{sync_status, sync_upgrade_policy};

// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Status conditions and the reporters that set them.

pub mod conditions;
pub mod reporters;

pub use conditions::{new_condition, ConditionStatus, ConditionsExt, ConditionsMutExt};

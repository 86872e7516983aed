// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Process-wide state shared between the controllers.

pub mod index;
pub mod pause;
pub mod trigger;

pub use index::ResourceIndex;
pub use pause::GlobalPause;
pub use trigger::ReconcileTrigger;

// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Condition list helpers shared by every status the operator writes.

use chrono::Utc;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl ConditionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        }
    }
}

impl From<bool> for ConditionStatus {
    fn from(value: bool) -> Self {
        if value {
            ConditionStatus::True
        } else {
            ConditionStatus::False
        }
    }
}

/// Build a condition stamped with the current time
pub fn new_condition(
    condition_type: &str,
    status: ConditionStatus,
    reason: &str,
    message: impl Into<String>,
    observed_generation: i64,
) -> Condition {
    Condition {
        type_: condition_type.to_string(),
        status: status.as_str().to_string(),
        reason: reason.to_string(),
        message: message.into(),
        observed_generation: Some(observed_generation),
        last_transition_time: Time(Utc::now()),
    }
}

/// Lookup by type over a list of conditions.
pub trait ConditionsExt {
    fn find_condition(&self, condition_type: &str) -> Option<&Condition>;

    fn has_condition(&self, condition_type: &str) -> bool {
        self.find_condition(condition_type).is_some()
    }

    fn is_condition_true(&self, condition_type: &str) -> bool {
        self.find_condition(condition_type)
            .is_some_and(|c| c.status == ConditionStatus::True.as_str())
    }

    fn is_condition_false(&self, condition_type: &str) -> bool {
        self.find_condition(condition_type)
            .is_some_and(|c| c.status == ConditionStatus::False.as_str())
    }
}

impl ConditionsExt for [Condition] {
    fn find_condition(&self, condition_type: &str) -> Option<&Condition> {
        self.iter().find(|c| c.type_ == condition_type)
    }
}

/// Set/remove by type.
pub trait ConditionsMutExt {
    /// Insert or replace the condition of the same type. The transition time
    /// only moves when the status changes and observedGeneration never decreases.
    fn set_condition(&mut self, condition: Condition);

    /// Returns true when a condition was removed
    fn remove_condition(&mut self, condition_type: &str) -> bool;
}

impl ConditionsMutExt for Vec<Condition> {
    fn set_condition(&mut self, mut condition: Condition) {
        match self.iter_mut().find(|c| c.type_ == condition.type_) {
            Some(existing) => {
                if existing.status == condition.status {
                    condition.last_transition_time = existing.last_transition_time.clone();
                }
                condition.observed_generation =
                    match (existing.observed_generation, condition.observed_generation) {
                        (Some(old), Some(new)) => Some(old.max(new)),
                        (old, new) => new.or(old),
                    };
                *existing = condition;
            }
            None => self.push(condition),
        }
    }

    fn remove_condition(&mut self, condition_type: &str) -> bool {
        let before = self.len();
        self.retain(|c| c.type_ != condition_type);
        before != self.len()
    }
}

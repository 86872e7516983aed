// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Prometheus metrics.
//!
//! - `addon_operator_addons_count{state}` - Addons known to the operator, by state
//! - `addon_operator_reconcile_duration_seconds{controller}` - Reconcile duration
//! - `addon_operator_ocm_api_requests_duration_seconds{method}` - OCM request duration

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use kube::ResourceExt;
use prometheus::{HistogramOpts, HistogramVec, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::constants::conditions::{AVAILABLE, PAUSED};
use crate::status::ConditionsExt;
use crate::types::Addon;

const STATES: [&str; 4] = ["total", "available", "unavailable", "paused"];

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct AddonState {
    available: bool,
    paused: bool,
}

pub struct Metrics {
    registry: Registry,
    addons_count: IntGaugeVec,
    reconcile_duration: HistogramVec,
    ocm_request_duration: HistogramVec,
    addons: Mutex<HashMap<String, AddonState>>,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let addons_count = IntGaugeVec::new(
            Opts::new("addon_operator_addons_count", "Number of addons by state"),
            &["state"],
        )?;
        let reconcile_duration = HistogramVec::new(
            HistogramOpts::new(
                "addon_operator_reconcile_duration_seconds",
                "Duration of reconciliation in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
            &["controller"],
        )?;
        let ocm_request_duration = HistogramVec::new(
            HistogramOpts::new(
                "addon_operator_ocm_api_requests_duration_seconds",
                "Duration of OCM API requests in seconds",
            )
            .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0]),
            &["method"],
        )?;

        registry.register(Box::new(addons_count.clone()))?;
        registry.register(Box::new(reconcile_duration.clone()))?;
        registry.register(Box::new(ocm_request_duration.clone()))?;

        for state in STATES {
            addons_count.with_label_values(&[state]).set(0);
        }

        Ok(Self {
            registry,
            addons_count,
            reconcile_duration,
            ocm_request_duration,
            addons: Mutex::new(HashMap::new()),
        })
    }

    /// Record the current state of `addon` and refresh the gauges
    pub fn record_addon(&self, addon: &Addon) {
        let conditions = addon.conditions();
        let state = AddonState {
            available: conditions.is_condition_true(AVAILABLE),
            paused: conditions.is_condition_true(PAUSED),
        };
        let mut addons = self.addons.lock().unwrap_or_else(PoisonError::into_inner);
        addons.insert(addon.name_any(), state);
        self.refresh(&addons);
    }

    /// Stop counting a deleted addon
    pub fn forget_addon(&self, name: &str) {
        let mut addons = self.addons.lock().unwrap_or_else(PoisonError::into_inner);
        if addons.remove(name).is_some() {
            self.refresh(&addons);
        }
    }

    fn refresh(&self, addons: &HashMap<String, AddonState>) {
        let available = addons.values().filter(|s| s.available).count();
        let paused = addons.values().filter(|s| s.paused).count();
        let counts = [addons.len(), available, addons.len() - available, paused];
        for (state, count) in STATES.into_iter().zip(counts) {
            self.addons_count
                .with_label_values(&[state])
                .set(i64::try_from(count).unwrap_or(i64::MAX));
        }
    }

    pub fn observe_reconcile(&self, controller: &str, elapsed: Duration) {
        self.reconcile_duration
            .with_label_values(&[controller])
            .observe(elapsed.as_secs_f64());
    }

    pub fn observe_ocm_request(&self, method: &str, elapsed: Duration) {
        self.ocm_request_duration
            .with_label_values(&[method])
            .observe(elapsed.as_secs_f64());
    }

    /// Text exposition of every registered metric
    pub fn gather(&self) -> prometheus::Result<String> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }

    #[cfg(test)]
    fn count(&self, state: &str) -> i64 {
        self.addons_count.with_label_values(&[state]).get()
    }
}

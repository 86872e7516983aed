// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Parsing of Kubernetes style duration strings ("10s", "1h30m", "1.5h").

use std::time::Duration;

use crate::constants::{DEFAULT_RETRY_SECS, MAX_REQUEUE_SECS};
use crate::error::{AddonError, Result};

/// Keep a requeue delay between the retry interval and one day.
pub fn bounded_requeue(after: Duration) -> Duration {
    after.clamp(
        Duration::from_secs(DEFAULT_RETRY_SECS),
        Duration::from_secs(MAX_REQUEUE_SECS),
    )
}

/// Parse a duration made of `<number><unit>` segments, units h/m/s/ms.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let invalid = || AddonError::InvalidDuration(input.to_string());
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }
    if trimmed == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total = 0f64;
    let mut rest = trimmed;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        if number_len == 0 {
            return Err(invalid());
        }
        let value: f64 = rest[..number_len].parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "h" => 3_600_000_000_000.0,
            "m" => 60_000_000_000.0,
            "s" => 1_000_000_000.0,
            "ms" => 1_000_000.0,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];
        total += value * nanos_per_unit;
    }

    Ok(Duration::from_nanos(total.round() as u64))
}

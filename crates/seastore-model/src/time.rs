// SPDX-License-Identifier: Apache-2.0

//! Numeric time axes: CF `<unit> since <reference>` strings and the EPIC
//! true-Julian-day plus milliseconds-of-day pair.

use crate::ValidationError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// EPIC day number of 1970-01-01 (2440000 is 1968-05-23 00:00).
pub const JULIAN_DAY_AT_UNIX_EPOCH: i64 = 2_440_588;
pub const MILLIS_PER_DAY: i64 = 86_400_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    #[must_use]
    pub const fn seconds(self) -> f64 {
        match self {
            Self::Milliseconds => 0.001,
            Self::Seconds => 1.0,
            Self::Minutes => 60.0,
            Self::Hours => 3_600.0,
            Self::Days => 86_400.0,
        }
    }

    fn parse(token: &str) -> Option<Self> {
        match token.trim() {
            "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => Some(Self::Milliseconds),
            "s" | "sec" | "secs" | "second" | "seconds" => Some(Self::Seconds),
            "min" | "mins" | "minute" | "minutes" => Some(Self::Minutes),
            "h" | "hr" | "hrs" | "hour" | "hours" => Some(Self::Hours),
            "d" | "day" | "days" => Some(Self::Days),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeUnits {
    pub unit: TimeUnit,
    pub epoch: DateTime<Utc>,
}

impl TimeUnits {
    #[must_use]
    pub fn seconds_since_unix_epoch() -> Self {
        Self {
            unit: TimeUnit::Seconds,
            epoch: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let lower = raw.trim().to_ascii_lowercase();
        let (unit_part, reference) = lower
            .split_once(" since ")
            .ok_or_else(|| ValidationError(format!("time units `{raw}` lack `since`")))?;
        let unit = TimeUnit::parse(unit_part)
            .ok_or_else(|| ValidationError(format!("unsupported time unit in `{raw}`")))?;
        let epoch = parse_reference(reference)
            .ok_or_else(|| ValidationError(format!("unparsable reference time in `{raw}`")))?;
        Ok(Self { unit, epoch })
    }

    #[must_use]
    pub fn to_value(&self, at: DateTime<Utc>) -> f64 {
        let micros = at.timestamp_micros() - self.epoch.timestamp_micros();
        (micros as f64 / 1_000_000.0) / self.unit.seconds()
    }

    #[must_use]
    pub fn to_datetime(&self, value: f64) -> Option<DateTime<Utc>> {
        if !value.is_finite() {
            return None;
        }
        let micros = (value * self.unit.seconds() * 1_000_000.0).round();
        if micros.abs() > i64::MAX as f64 / 2.0 {
            return None;
        }
        self.epoch
            .checked_add_signed(chrono::Duration::microseconds(micros as i64))
    }
}

fn parse_reference(raw: &str) -> Option<DateTime<Utc>> {
    let mut text = raw.trim().to_string();
    for suffix in ["utc", "gmt"] {
        if let Some(stripped) = text.strip_suffix(suffix) {
            text = stripped.trim_end().to_string();
        }
    }
    if let Some(stripped) = text.strip_suffix('z') {
        text = stripped.to_string();
    }
    let text = text.replace('t', " ").replace('/', "-");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");

    for fmt in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%z"] {
        if let Ok(dt) = DateTime::parse_from_str(&text, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&text, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    let date = NaiveDate::parse_from_str(&text, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

/// EPIC whole-day number containing `at`.
#[must_use]
pub fn epic_day(at: DateTime<Utc>) -> i64 {
    at.timestamp().div_euclid(86_400) + JULIAN_DAY_AT_UNIX_EPOCH
}

/// Milliseconds since midnight of `at`.
#[must_use]
pub fn epic_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis().rem_euclid(MILLIS_PER_DAY)
}

#[must_use]
pub fn epic_to_datetime(day: f64, millis: f64) -> Option<DateTime<Utc>> {
    if !day.is_finite() || !millis.is_finite() {
        return None;
    }
    let days = day.round() as i64 - JULIAN_DAY_AT_UNIX_EPOCH;
    let total = days
        .checked_mul(MILLIS_PER_DAY)?
        .checked_add(millis.round() as i64)?;
    Utc.timestamp_millis_opt(total).single()
}

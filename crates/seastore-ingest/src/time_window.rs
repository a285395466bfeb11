// SPDX-License-Identifier: Apache-2.0

use crate::classify::conventions;
use crate::dataset::DatasetHandle;
use crate::{IngestError, IngestErrorCode};
use chrono::{DateTime, Utc};
use seastore_model::{epic_day, epic_millis, epic_to_datetime, TimeUnits};
use std::ops::Range;

/// Companion variable holding milliseconds since midnight for EPIC files.
pub const EPIC_MILLIS_VARIABLE: &str = "time2";

/// Requested slice of the time axis. `append_since` replaces `start` as an
/// exclusive lower bound; `end` is inclusive and open when absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub append_since: Option<DateTime<Utc>>,
}

impl TimeWindow {
    /// Lower bound and whether it is exclusive.
    #[must_use]
    pub fn lower(&self) -> Option<(DateTime<Utc>, bool)> {
        self.append_since
            .map(|t| (t, true))
            .or_else(|| self.start.map(|t| (t, false)))
    }

    pub fn validate(&self) -> Result<(), IngestError> {
        if let (Some((lower, _)), Some(end)) = (self.lower(), self.end) {
            if end <= lower {
                return Err(IngestError::new(
                    IngestErrorCode::InvalidSliceRequest,
                    format!("window end {end} is not after its lower bound {lower}"),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TimeEncoding {
    Standard(TimeUnits),
    /// Whole true Julian days with a milliseconds-of-day companion axis.
    Epic,
}

/// A fully read time axis and how to interpret it.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeAxis {
    pub name: String,
    pub encoding: TimeEncoding,
    values: Vec<f64>,
    millis: Vec<f64>,
}

impl TimeAxis {
    pub fn standard(name: &str, units: TimeUnits, values: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            encoding: TimeEncoding::Standard(units),
            values,
            millis: Vec::new(),
        }
    }

    pub fn epic(name: &str, days: Vec<f64>, millis: Vec<f64>) -> Result<Self, IngestError> {
        if days.len() != millis.len() {
            return Err(IngestError::new(
                IngestErrorCode::MissingCoordinates,
                format!(
                    "EPIC time axis `{name}` has {} days but {} millisecond values",
                    days.len(),
                    millis.len()
                ),
            ));
        }
        Ok(Self {
            name: name.to_string(),
            encoding: TimeEncoding::Epic,
            values: days,
            millis,
        })
    }

    /// Reads `name` from the dataset and detects its encoding.
    pub fn load(handle: &dyn DatasetHandle, name: &str) -> Result<Self, IngestError> {
        let variable = handle.variable(name).ok_or_else(|| {
            IngestError::new(
                IngestErrorCode::MissingCoordinates,
                format!("time axis `{name}` is not in {}", handle.url()),
            )
        })?;
        let values = variable.read_all().map_err(IngestError::from)?;
        let units = variable.attributes().text("units").unwrap_or_default();
        let is_epic = conventions(handle.global_attributes()).contains("epic")
            || units.to_ascii_lowercase().contains("julian");
        if is_epic {
            let companion = handle.variable(EPIC_MILLIS_VARIABLE).ok_or_else(|| {
                IngestError::new(
                    IngestErrorCode::MissingCoordinates,
                    format!("EPIC time axis `{name}` has no `{EPIC_MILLIS_VARIABLE}` companion"),
                )
            })?;
            let millis = companion.read_all().map_err(IngestError::from)?;
            return Self::epic(name, values, millis);
        }
        let units = TimeUnits::parse(units).map_err(|e| {
            IngestError::new(
                IngestErrorCode::MissingCoordinates,
                format!("time axis `{name}`: {e}"),
            )
        })?;
        Ok(Self::standard(name, units, values))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn datetime(&self, index: usize) -> Option<DateTime<Utc>> {
        let value = *self.values.get(index)?;
        match &self.encoding {
            TimeEncoding::Standard(units) => units.to_datetime(value),
            TimeEncoding::Epic => epic_to_datetime(value, *self.millis.get(index)?),
        }
    }

    /// Half-open index range `[first, last + 1)` of axis values inside `window`.
    pub fn index_range(&self, window: &TimeWindow) -> Result<Range<usize>, IngestError> {
        window.validate()?;
        let range = match &self.encoding {
            TimeEncoding::Standard(units) => standard_range(&self.values, units, window),
            TimeEncoding::Epic => epic_range(&self.values, &self.millis, window),
        };
        match range {
            Some(r) if r.end > r.start => Ok(r),
            Some(r) => Err(IngestError::new(
                IngestErrorCode::InvalidSliceRequest,
                format!("time axis `{}` yields empty slice {}..{}", self.name, r.start, r.end),
            )),
            None => Err(IngestError::new(
                IngestErrorCode::NoValidData,
                format!(
                    "no values of time axis `{}` fall in the requested window",
                    self.name
                ),
            )),
        }
    }
}

fn standard_range(values: &[f64], units: &TimeUnits, window: &TimeWindow) -> Option<Range<usize>> {
    let lower = window
        .lower()
        .map(|(t, exclusive)| (units.to_value(t), exclusive));
    let upper = window.end.map(|t| units.to_value(t));
    let inside = |v: &f64| {
        v.is_finite()
            && lower.map_or(true, |(l, exclusive)| if exclusive { *v > l } else { *v >= l })
            && upper.map_or(true, |u| *v <= u)
    };
    let first = values.iter().position(inside)?;
    let last = values.iter().rposition(inside)?;
    Some(first..last + 1)
}

/// Day-granular match first, then the boundary days are trimmed with the
/// milliseconds axis.
fn epic_range(days: &[f64], millis: &[f64], window: &TimeWindow) -> Option<Range<usize>> {
    let day = |i: usize| days[i].round() as i64;
    let valid = |i: usize| days[i].is_finite() && millis[i].is_finite();
    let lower = window
        .lower()
        .map(|(t, exclusive)| (epic_day(t), epic_millis(t) as f64, exclusive));
    let upper = window.end.map(|t| (epic_day(t), epic_millis(t) as f64));

    let in_days = |i: usize| {
        valid(i)
            && lower.map_or(true, |(d, _, _)| day(i) >= d)
            && upper.map_or(true, |(d, _)| day(i) <= d)
    };
    let mut first = (0..days.len()).find(|&i| in_days(i))?;
    let mut last = (0..days.len()).rev().find(|&i| in_days(i))?;

    if let Some((lo_day, lo_ms, exclusive)) = lower {
        while first <= last && valid(first) && day(first) == lo_day {
            let ms = millis[first];
            let after = if exclusive { ms > lo_ms } else { ms >= lo_ms };
            if after {
                break;
            }
            first += 1;
        }
    }
    if let Some((hi_day, hi_ms)) = upper {
        while last >= first && valid(last) && day(last) == hi_day && millis[last] > hi_ms {
            if last == 0 {
                return None;
            }
            last -= 1;
        }
    }
    if first > last {
        return None;
    }
    Some(first..last + 1)
}

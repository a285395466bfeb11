// SPDX-License-Identifier: Apache-2.0

use crate::dataset::Attributes;

/// Readings above this are treated as absent even without a declared fill value.
pub const HUGE_VALUE: f64 = 1e34;

static FILL_KEYS: [&str; 2] = ["_FillValue", "FillValue"];
static MISSING_KEY: &str = "missing_value";

/// Declared fill and missing values of one variable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sentinels {
    values: Vec<f64>,
    /// Sentinel attributes present but not numeric.
    pub undecodable: Vec<String>,
}

impl Sentinels {
    #[must_use]
    pub fn from_attributes(attrs: &Attributes) -> Self {
        let mut out = Self::default();
        let fill_key = FILL_KEYS.iter().find(|k| attrs.contains(k));
        for key in fill_key.into_iter().chain(std::iter::once(&MISSING_KEY)) {
            let Some(value) = attrs.get(key) else {
                continue;
            };
            match value.as_numbers() {
                Some(numbers) => out.values.extend(numbers),
                None => out.undecodable.push((*key).to_string()),
            }
        }
        out
    }

    #[must_use]
    pub fn matches(&self, value: f64) -> bool {
        self.values.iter().any(|s| is_close(value, *s))
    }

    /// True for fill, missing, NaN and infinite values.
    #[must_use]
    pub fn is_absent(&self, value: f64) -> bool {
        !value.is_finite() || self.matches(value)
    }
}

/// Relative-plus-absolute closeness, as used for floating-point sentinels.
#[must_use]
pub fn is_close(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    if !a.is_finite() || !b.is_finite() {
        return false;
    }
    (a - b).abs() <= 1e-8 + 1e-5 * b.abs()
}

// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Time,
    Latitude,
    Longitude,
    Depth,
}

impl Axis {
    pub const ALL: [Axis; 4] = [Axis::Time, Axis::Latitude, Axis::Longitude, Axis::Depth];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
            Self::Depth => "depth",
        }
    }

    /// Maps a CF `standard_name`. Pressure is accepted as a depth proxy.
    #[must_use]
    pub fn from_standard_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "time" => Some(Self::Time),
            "latitude" => Some(Self::Latitude),
            "longitude" => Some(Self::Longitude),
            "depth" | "sea_water_pressure" => Some(Self::Depth),
            _ => None,
        }
    }

    /// Maps a COARDS/CF `axis` attribute (`T`, `Y`, `X`, `Z`).
    #[must_use]
    pub fn from_axis_attribute(value: &str) -> Option<Self> {
        match value.trim() {
            "T" | "t" => Some(Self::Time),
            "Y" | "y" => Some(Self::Latitude),
            "X" | "x" => Some(Self::Longitude),
            "Z" | "z" => Some(Self::Depth),
            _ => None,
        }
    }
}

impl Display for Axis {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where one axis gets its values: a dataset variable, or a constant broadcast to every row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordSource {
    Variable(String),
    Constant(f64),
}

impl CoordSource {
    #[must_use]
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    #[must_use]
    pub fn variable_name(&self) -> Option<&str> {
        match self {
            Self::Variable(name) => Some(name),
            Self::Constant(_) => None,
        }
    }
}

/// Fully resolved coordinates for one data variable. Time is always a variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoordinateMap {
    pub time: String,
    pub latitude: CoordSource,
    pub longitude: CoordSource,
    pub depth: CoordSource,
}

impl CoordinateMap {
    #[must_use]
    pub fn source(&self, axis: Axis) -> CoordSource {
        match axis {
            Axis::Time => CoordSource::Variable(self.time.clone()),
            Axis::Latitude => self.latitude.clone(),
            Axis::Longitude => self.longitude.clone(),
            Axis::Depth => self.depth.clone(),
        }
    }
}

/// Axis assignments collected while resolving, possibly incomplete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartialCoordinateMap(BTreeMap<Axis, CoordSource>);

impl PartialCoordinateMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, axis: Axis, source: CoordSource) -> Self {
        self.0.insert(axis, source);
        self
    }

    pub fn set(&mut self, axis: Axis, source: CoordSource) {
        self.0.insert(axis, source);
    }

    #[must_use]
    pub fn get(&self, axis: Axis) -> Option<&CoordSource> {
        self.0.get(&axis)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copies axes from `other` that are not yet assigned here.
    pub fn fill_gaps_from(&mut self, other: &PartialCoordinateMap) {
        for (axis, source) in &other.0 {
            self.0.entry(*axis).or_insert_with(|| source.clone());
        }
    }

    #[must_use]
    pub fn missing(&self) -> Vec<Axis> {
        Axis::ALL
            .into_iter()
            .filter(|a| !self.0.contains_key(a))
            .collect()
    }

    /// Converts to a complete map, or returns the axes that are missing or unusable.
    pub fn complete(&self) -> Result<CoordinateMap, Vec<Axis>> {
        let mut missing = self.missing();
        let time = match self.0.get(&Axis::Time) {
            Some(CoordSource::Variable(name)) => Some(name.clone()),
            Some(CoordSource::Constant(_)) => {
                missing.push(Axis::Time);
                None
            }
            None => None,
        };
        if !missing.is_empty() {
            missing.sort();
            missing.dedup();
            return Err(missing);
        }
        let pick = |axis: Axis| self.0.get(&axis).cloned().ok_or_else(|| vec![axis]);
        Ok(CoordinateMap {
            time: time.ok_or_else(|| vec![Axis::Time])?,
            latitude: pick(Axis::Latitude)?,
            longitude: pick(Axis::Longitude)?,
            depth: pick(Axis::Depth)?,
        })
    }
}

impl From<BTreeMap<Axis, CoordSource>> for PartialCoordinateMap {
    fn from(value: BTreeMap<Axis, CoordSource>) -> Self {
        Self(value)
    }
}

/// Caller-supplied axis assignments keyed by data variable name.
pub type CoordinateOverrides = BTreeMap<String, PartialCoordinateMap>;

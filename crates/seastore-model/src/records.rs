// SPDX-License-Identifier: Apache-2.0

use crate::{FeatureType, Track};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

macro_rules! row_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

row_id!(ActivityId);
row_id!(InstantPointId);
row_id!(MeasurementId);
row_id!(NominalLocationId);
row_id!(ParameterId);
row_id!(PlatformId);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformSpec {
    pub name: String,
    pub platform_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub id: PlatformId,
    pub name: String,
    pub platform_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewActivity {
    pub name: String,
    pub platform: PlatformId,
    pub feature_type: FeatureType,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub source_url: String,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub name: String,
    pub platform: PlatformId,
    pub feature_type: FeatureType,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub source_url: String,
    pub comment: String,
    pub num_measured_parameters: i64,
    pub loaded_at: Option<DateTime<Utc>>,
    pub min_depth: Option<f64>,
    pub max_depth: Option<f64>,
    pub track: Option<Track>,
}

/// Statistics written onto an activity once its load has finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityFinalization {
    pub end: Option<DateTime<Utc>>,
    pub num_measured_parameters: i64,
    pub num_parameters: i64,
    pub comment: String,
    pub loaded_at: DateTime<Utc>,
    pub min_depth: Option<f64>,
    pub max_depth: Option<f64>,
    pub track: Option<Track>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNominalLocation {
    pub activity: ActivityId,
    pub depth: f64,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMeasurement {
    pub instant_point: InstantPointId,
    pub depth: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub nominal_location: Option<NominalLocationId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasuredValue {
    Scalar(f64),
    Array(Vec<Option<f64>>),
}

impl MeasuredValue {
    /// Finite scalars, or arrays with at least one finite element.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Scalar(v) => v.is_finite(),
            Self::Array(items) => items.iter().flatten().any(|v| v.is_finite()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMeasuredParameter {
    pub measurement: MeasurementId,
    pub parameter: ParameterId,
    pub value: MeasuredValue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub standard_name: Option<String>,
    #[serde(default)]
    pub long_name: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
}

impl ParameterSpec {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub id: ParameterId,
    pub name: String,
    pub units: Option<String>,
    pub standard_name: Option<String>,
    pub long_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterStats {
    pub parameter: ParameterId,
    pub count: i64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Simplified (epoch milliseconds, depth) series for one activity or nominal depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleDepthTime {
    pub activity: ActivityId,
    pub nominal_location: Option<NominalLocationId>,
    pub points: Vec<(i64, f64)>,
}

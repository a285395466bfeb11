// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Discrete sampling geometry of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeatureType {
    Trajectory,
    TimeSeries,
    TimeSeriesProfile,
    TrajectoryProfile,
}

impl FeatureType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trajectory => "trajectory",
            Self::TimeSeries => "timeSeries",
            Self::TimeSeriesProfile => "timeSeriesProfile",
            Self::TrajectoryProfile => "trajectoryProfile",
        }
    }

    /// Accepts the canonical names in any case plus the legacy `station` synonym.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "trajectory" => Some(Self::Trajectory),
            "timeseries" => Some(Self::TimeSeries),
            "timeseriesprofile" | "station" => Some(Self::TimeSeriesProfile),
            "trajectoryprofile" => Some(Self::TrajectoryProfile),
            _ => None,
        }
    }

    /// Moorings and stations: position is constant for the whole activity.
    #[must_use]
    pub const fn is_fixed_position(self) -> bool {
        matches!(self, Self::TimeSeries | Self::TimeSeriesProfile)
    }

    #[must_use]
    pub const fn is_profile(self) -> bool {
        matches!(self, Self::TimeSeriesProfile | Self::TrajectoryProfile)
    }
}

impl Display for FeatureType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::FeatureType;

    #[test]
    fn station_is_time_series_profile() {
        assert_eq!(
            FeatureType::parse("Station"),
            Some(FeatureType::TimeSeriesProfile)
        );
        assert_eq!(FeatureType::parse("TRAJECTORY"), Some(FeatureType::Trajectory));
        assert_eq!(FeatureType::parse("grid"), None);
    }

    #[test]
    fn canonical_names_roundtrip() {
        for ft in [
            FeatureType::Trajectory,
            FeatureType::TimeSeries,
            FeatureType::TimeSeriesProfile,
            FeatureType::TrajectoryProfile,
        ] {
            assert_eq!(FeatureType::parse(ft.as_str()), Some(ft));
        }
    }
}

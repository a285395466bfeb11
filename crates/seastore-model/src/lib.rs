// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod coordinates;
mod feature;
mod geometry;
mod platform;
mod records;
mod time;

use std::fmt::{Display, Formatter};

pub use coordinates::{Axis, CoordSource, CoordinateMap, CoordinateOverrides, PartialCoordinateMap};
pub use feature::FeatureType;
pub use geometry::{Track, TrackPoint};
pub use platform::{PlatformDescriptor, StoreAlias, STORE_ALIAS_MAX_LEN};
pub use records::{
    Activity, ActivityFinalization, ActivityId, InstantPointId, MeasuredValue, MeasurementId,
    NewActivity, NewMeasuredParameter, NewMeasurement, NewNominalLocation, NominalLocationId,
    Parameter, ParameterId, ParameterSpec, ParameterStats, Platform, PlatformId, PlatformSpec,
    SimpleDepthTime,
};
pub use time::{
    epic_day, epic_millis, epic_to_datetime, TimeUnit, TimeUnits, JULIAN_DAY_AT_UNIX_EPOCH,
    MILLIS_PER_DAY,
};

pub const CRATE_NAME: &str = "seastore-model";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ValidationError {}

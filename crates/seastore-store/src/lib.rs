// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod registry;
mod sqlite;

use chrono::{DateTime, Utc};
use seastore_core::MachineError;
use seastore_model::{
    Activity, ActivityFinalization, ActivityId, InstantPointId, MeasurementId,
    NewActivity, NewMeasuredParameter, NewMeasurement, NewNominalLocation, NominalLocationId,
    Parameter, ParameterId, ParameterSpec, ParameterStats, Platform, PlatformId, PlatformSpec,
    SimpleDepthTime, StoreAlias, TrackPoint,
};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

pub use registry::{StoreConfig, StoreRegistry};
pub use sqlite::{SqliteStore, SQLITE_SCHEMA_VERSION};

pub const CRATE_NAME: &str = "seastore-store";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorCode {
    NotFound,
    Validation,
    Conflict,
    Io,
    Internal,
}

impl StoreErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Validation => "validation_error",
            Self::Conflict => "conflict",
            Self::Io => "io_error",
            Self::Internal => "internal_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub code: StoreErrorCode,
    pub message: String,
}

impl StoreError {
    #[must_use]
    pub fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.code == StoreErrorCode::Conflict
    }

    #[must_use]
    pub fn to_machine_error(&self) -> MachineError {
        MachineError::new(self.code.as_str(), &self.message)
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        let code = match &value {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreErrorCode::Conflict
            }
            rusqlite::Error::QueryReturnedNoRows => StoreErrorCode::NotFound,
            rusqlite::Error::SqliteFailure(e, _)
                if matches!(
                    e.code,
                    rusqlite::ErrorCode::CannotOpen
                        | rusqlite::ErrorCode::ReadOnly
                        | rusqlite::ErrorCode::DiskFull
                        | rusqlite::ErrorCode::SystemIoFailure
                ) =>
            {
                StoreErrorCode::Io
            }
            _ => StoreErrorCode::Internal,
        };
        Self::new(code, value.to_string())
    }
}

/// Persistence contract for one measurement store.
///
/// Bulk operations are all-or-nothing: a uniqueness violation anywhere in
/// the batch returns [`StoreErrorCode::Conflict`] and nothing is written, so
/// callers can fall back to the row-wise `get_or_create_*` operations.
pub trait MeasurementStore {
    fn alias(&self) -> &StoreAlias;

    fn get_or_create_platform(&mut self, spec: &PlatformSpec) -> Result<Platform, StoreError>;

    /// Registers a parameter by name. An existing row is returned unchanged.
    fn register_parameter(&mut self, spec: &ParameterSpec) -> Result<Parameter, StoreError>;
    fn find_parameter(&self, name: &str) -> Result<Option<Parameter>, StoreError>;

    /// Fails with `Conflict` when an activity of that name already exists for the platform.
    fn create_activity(&mut self, new: &NewActivity) -> Result<ActivityId, StoreError>;
    fn find_activity(
        &self,
        name: &str,
        platform: PlatformId,
    ) -> Result<Option<Activity>, StoreError>;
    fn activity(&self, id: ActivityId) -> Result<Activity, StoreError>;
    fn finalize_activity(
        &mut self,
        id: ActivityId,
        finalization: &ActivityFinalization,
    ) -> Result<(), StoreError>;
    fn max_timevalue(&self, activity: ActivityId) -> Result<Option<DateTime<Utc>>, StoreError>;

    fn bulk_create_instant_points(
        &mut self,
        activity: ActivityId,
        times: &[DateTime<Utc>],
    ) -> Result<Vec<InstantPointId>, StoreError>;
    /// Returns the id and whether a new row was inserted.
    fn get_or_create_instant_point(
        &mut self,
        activity: ActivityId,
        time: DateTime<Utc>,
    ) -> Result<(InstantPointId, bool), StoreError>;

    fn get_or_create_nominal_location(
        &mut self,
        new: &NewNominalLocation,
    ) -> Result<NominalLocationId, StoreError>;

    fn bulk_create_measurements(
        &mut self,
        rows: &[NewMeasurement],
    ) -> Result<Vec<MeasurementId>, StoreError>;
    fn get_or_create_measurement(
        &mut self,
        row: &NewMeasurement,
    ) -> Result<(MeasurementId, bool), StoreError>;

    fn bulk_create_measured_parameters(
        &mut self,
        rows: &[NewMeasuredParameter],
    ) -> Result<usize, StoreError>;
    /// Row-wise insert that skips rows whose (measurement, parameter) already exists.
    /// Returns the number of rows actually inserted.
    fn insert_missing_measured_parameters(
        &mut self,
        rows: &[NewMeasuredParameter],
    ) -> Result<usize, StoreError>;
    /// Removes rows of `parameter` in `activity` whose value is null, NaN or infinite.
    fn delete_invalid_measured_parameters(
        &mut self,
        activity: ActivityId,
        parameter: ParameterId,
    ) -> Result<usize, StoreError>;

    fn count_instant_points(&self, activity: ActivityId) -> Result<i64, StoreError>;
    fn count_measurements(&self, activity: ActivityId) -> Result<i64, StoreError>;
    fn count_measured_parameters(&self, activity: ActivityId) -> Result<i64, StoreError>;
    fn parameter_counts(&self, activity: ActivityId) -> Result<BTreeMap<String, i64>, StoreError>;

    /// Measurement positions ordered by time, then depth.
    fn measurement_track(&self, activity: ActivityId) -> Result<Vec<TrackPoint>, StoreError>;
    fn depth_range(&self, activity: ActivityId) -> Result<Option<(f64, f64)>, StoreError>;
    fn update_activity_parameter_stats(
        &mut self,
        activity: ActivityId,
    ) -> Result<Vec<ParameterStats>, StoreError>;
    /// Replaces the series stored for the same activity and nominal location.
    fn insert_simple_depth_time(&mut self, series: &SimpleDepthTime) -> Result<(), StoreError>;
}

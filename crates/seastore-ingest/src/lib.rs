// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

pub mod classify;
mod config;
pub mod coordinate_loader;
pub mod coords;
mod dataset;
pub mod grouping;
mod logging;
mod memory;
mod orchestrator;
pub mod parameters;
mod platform;
pub mod sentinel;
pub mod time_window;
pub mod track;
pub mod value_loader;

use chrono::{DateTime, Duration, Utc};
use seastore_core::MachineError;
use seastore_model::{
    ActivityId, CoordinateOverrides, FeatureType, PlatformSpec, StoreAlias, Track,
};
use seastore_store::StoreError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

pub const CRATE_NAME: &str = "seastore-ingest";

pub use config::{CoordinateBounds, IngestConfig};
pub use dataset::{AttrValue, Attributes, DatasetError, DatasetHandle, DatasetOpener, Variable};
pub use logging::{init_tracing, IngestEvent, IngestLog, IngestStage};
pub use memory::{MemoryDataset, MemoryOpener, MemoryVariable};
pub use orchestrator::{
    activity_display_name, load_dataset, load_dataset_with, load_from_registry,
    ActivityAggregator, AggregateInput, AggregateSummary, DefaultAggregator, LoadState,
};
pub use platform::{load_platform, FileOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestErrorCode {
    DatasetUnavailable,
    NoValidData,
    InvalidSliceRequest,
    MissingCoordinates,
    ParameterNotFound,
    DuplicateData,
    ValueDecodeError,
    Validation,
    Store,
}

impl IngestErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DatasetUnavailable => "dataset_unavailable",
            Self::NoValidData => "no_valid_data",
            Self::InvalidSliceRequest => "invalid_slice_request",
            Self::MissingCoordinates => "missing_coordinates",
            Self::ParameterNotFound => "parameter_not_found",
            Self::DuplicateData => "duplicate_data",
            Self::ValueDecodeError => "value_decode_error",
            Self::Validation => "validation_error",
            Self::Store => "store_error",
        }
    }

    /// Empty or out-of-range sources that a caller iterating many files may skip.
    #[must_use]
    pub const fn is_empty_source(self) -> bool {
        matches!(self, Self::NoValidData | Self::InvalidSliceRequest)
    }

    /// Errors confined to one variable; siblings keep loading.
    #[must_use]
    pub const fn is_per_variable(self) -> bool {
        matches!(
            self,
            Self::MissingCoordinates | Self::ParameterNotFound | Self::InvalidSliceRequest
        )
    }
}

/// A variable that was not loaded, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedVariable {
    pub variable: String,
    pub code: IngestErrorCode,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestError {
    pub code: IngestErrorCode,
    pub message: String,
    /// Activity left in place by a load that failed after creating it.
    pub activity: Option<ActivityId>,
    /// Variables skipped before the failure.
    pub skipped: Vec<SkippedVariable>,
}

impl IngestError {
    #[must_use]
    pub fn new(code: IngestErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            activity: None,
            skipped: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_activity(mut self, activity: ActivityId) -> Self {
        self.activity = Some(activity);
        self
    }

    #[must_use]
    pub fn with_skipped(mut self, skipped: Vec<SkippedVariable>) -> Self {
        self.skipped = skipped;
        self
    }

    #[must_use]
    pub fn to_machine_error(&self) -> MachineError {
        let mut err = MachineError::new(self.code.as_str(), &self.message);
        if let Some(activity) = self.activity {
            err = err.with_detail("activity", &activity.to_string());
        }
        if !self.skipped.is_empty() {
            let names: Vec<&str> = self.skipped.iter().map(|s| s.variable.as_str()).collect();
            err = err.with_detail("skipped", &names.join(","));
        }
        err
    }
}

impl Display for IngestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)?;
        if self.code == IngestErrorCode::DuplicateData {
            write!(f, " (delete the activity and load again instead of appending)")?;
        }
        Ok(())
    }
}

impl std::error::Error for IngestError {}

impl From<DatasetError> for IngestError {
    fn from(value: DatasetError) -> Self {
        Self::new(IngestErrorCode::DatasetUnavailable, value.0)
    }
}

impl From<StoreError> for IngestError {
    fn from(value: StoreError) -> Self {
        Self::new(IngestErrorCode::Store, value.to_string())
    }
}

/// Everything one load needs to know about its source and destination.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub url: String,
    pub activity_name: String,
    pub platform: PlatformSpec,
    pub parameters: Vec<String>,
    pub stride: usize,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Exclusive lower bound; replaces `start`.
    pub append_since: Option<DateTime<Utc>>,
    /// Continue the existing activity from its last stored time.
    pub append: bool,
    /// Reload this much before the last stored time when appending.
    pub backfill: Option<Duration>,
    pub coordinate_overrides: CoordinateOverrides,
    pub store: StoreAlias,
}

impl Default for LoadRequest {
    fn default() -> Self {
        Self {
            url: String::new(),
            activity_name: String::new(),
            platform: PlatformSpec {
                name: String::new(),
                platform_type: String::new(),
            },
            parameters: Vec::new(),
            stride: 1,
            start: None,
            end: None,
            append_since: None,
            append: false,
            backfill: None,
            coordinate_overrides: CoordinateOverrides::new(),
            store: StoreAlias::default_alias(),
        }
    }
}

impl LoadRequest {
    #[must_use]
    pub fn is_append(&self) -> bool {
        self.append || self.append_since.is_some()
    }

    pub fn validate(&self) -> Result<(), IngestError> {
        let invalid = |msg: &str| Err(IngestError::new(IngestErrorCode::Validation, msg));
        if self.url.trim().is_empty() {
            return invalid("url must not be empty");
        }
        if self.activity_name.trim().is_empty() {
            return invalid("activity name must not be empty");
        }
        if self.platform.name.trim().is_empty() {
            return invalid("platform name must not be empty");
        }
        if self.parameters.is_empty() {
            return invalid("at least one parameter is required");
        }
        if self.stride == 0 {
            return invalid("stride must be at least 1");
        }
        if self.backfill.is_some_and(|b| b < Duration::zero()) {
            return invalid("backfill must not be negative");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadResult {
    pub activity: ActivityId,
    pub activity_name: String,
    pub feature_type: FeatureType,
    pub state: LoadState,
    pub records_loaded: usize,
    pub instant_points_created: usize,
    pub measurements_created: usize,
    pub parameter_counts: BTreeMap<String, i64>,
    pub track: Option<Track>,
    pub skipped: Vec<SkippedVariable>,
    pub value_decode_errors: usize,
    pub events: Vec<IngestEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn machine_error_carries_activity_and_skips() {
        let err = IngestError::new(IngestErrorCode::NoValidData, "nothing stored")
            .with_activity(ActivityId(4))
            .with_skipped(vec![SkippedVariable {
                variable: "oxygen".to_string(),
                code: IngestErrorCode::MissingCoordinates,
                reason: "no depth".to_string(),
            }]);
        let machine = err.to_machine_error();
        assert_eq!(machine.code, "no_valid_data");
        assert_eq!(machine.details.get("activity").map(String::as_str), Some("4"));
        assert_eq!(machine.details.get("skipped").map(String::as_str), Some("oxygen"));
    }

    #[test]
    fn duplicate_data_message_suggests_reload() {
        let err = IngestError::new(IngestErrorCode::DuplicateData, "activity exists");
        assert!(err.to_string().contains("delete the activity"));
    }

    #[test]
    fn request_validation_rejects_zero_stride() {
        let req = LoadRequest {
            url: "memory://a".to_string(),
            activity_name: "a".to_string(),
            platform: PlatformSpec {
                name: "p".to_string(),
                platform_type: "glider".to_string(),
            },
            parameters: vec!["temperature".to_string()],
            stride: 0,
            ..LoadRequest::default()
        };
        let err = req.validate().expect_err("stride");
        assert_eq!(err.code, IngestErrorCode::Validation);
    }
}

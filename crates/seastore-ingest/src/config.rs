// SPDX-License-Identifier: Apache-2.0

use seastore_core::config::{env_bool, env_f64, env_usize};
use seastore_core::{
    ENV_SEASTORE_DEPTH_TIME_TOLERANCE, ENV_SEASTORE_LOG_JSON, ENV_SEASTORE_MAX_DEPTH,
    ENV_SEASTORE_MIN_DEPTH, ENV_SEASTORE_PROGRESS_EVERY, ENV_SEASTORE_TRACK_TOLERANCE,
};

/// Plausibility limits applied to coordinate rows before they are stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateBounds {
    pub min_depth: f64,
    pub max_depth: f64,
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl Default for CoordinateBounds {
    fn default() -> Self {
        Self {
            min_depth: -1_000.0,
            max_depth: 5_000.0,
            min_latitude: -90.0,
            max_latitude: 90.0,
            min_longitude: -720.0,
            max_longitude: 720.0,
        }
    }
}

impl CoordinateBounds {
    #[must_use]
    pub fn accepts(&self, depth: f64, latitude: f64, longitude: f64) -> bool {
        (self.min_depth..=self.max_depth).contains(&depth)
            && (self.min_latitude..=self.max_latitude).contains(&latitude)
            && (self.min_longitude..=self.max_longitude).contains(&longitude)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestConfig {
    pub bounds: CoordinateBounds,
    /// Douglas-Peucker tolerance for map tracks, in degrees.
    pub track_tolerance: f64,
    /// Tolerance for the (epoch ms, depth) series.
    pub depth_time_tolerance: f64,
    pub progress_every: usize,
    pub log_json: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            bounds: CoordinateBounds::default(),
            track_tolerance: 0.001,
            depth_time_tolerance: 10.0,
            progress_every: 500,
            log_json: false,
        }
    }
}

impl IngestConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            bounds: CoordinateBounds {
                min_depth: env_f64(ENV_SEASTORE_MIN_DEPTH, d.bounds.min_depth),
                max_depth: env_f64(ENV_SEASTORE_MAX_DEPTH, d.bounds.max_depth),
                ..d.bounds
            },
            track_tolerance: env_f64(ENV_SEASTORE_TRACK_TOLERANCE, d.track_tolerance),
            depth_time_tolerance: env_f64(
                ENV_SEASTORE_DEPTH_TIME_TOLERANCE,
                d.depth_time_tolerance,
            ),
            progress_every: env_usize(ENV_SEASTORE_PROGRESS_EVERY, d.progress_every).max(1),
            log_json: env_bool(ENV_SEASTORE_LOG_JSON, d.log_json),
        }
    }

    /// Installs the global subscriber in the configured output format.
    pub fn init_tracing(&self) {
        crate::logging::init_tracing(self.log_json);
    }
}

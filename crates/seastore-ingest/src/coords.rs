// SPDX-License-Identifier: Apache-2.0

//! Axis resolution for one data variable. Each step is a pure function over
//! the dataset that either contributes axis assignments or does not apply.

use crate::dataset::{DatasetHandle, Variable};
use crate::{IngestError, IngestErrorCode};
use seastore_model::{Axis, CoordSource, CoordinateMap, CoordinateOverrides, PartialCoordinateMap};

/// Axis a coordinate variable stands for, from `standard_name` then `axis`.
fn axis_of(variable: &dyn Variable) -> Option<Axis> {
    let attrs = variable.attributes();
    attrs
        .text("standard_name")
        .and_then(Axis::from_standard_name)
        .or_else(|| attrs.text("axis").and_then(Axis::from_axis_attribute))
}

/// Variables named by the CF `coordinates` attribute. `None` when the attribute is absent.
#[must_use]
pub fn from_coordinates_attribute(
    handle: &dyn DatasetHandle,
    variable: &dyn Variable,
) -> Option<PartialCoordinateMap> {
    let declared = variable.attributes().text("coordinates")?;
    let mut map = PartialCoordinateMap::new();
    for name in declared.split_whitespace() {
        if let Some(axis) = handle.variable(name).and_then(axis_of) {
            if map.get(axis).is_none() {
                map.set(axis, CoordSource::variable(name));
            }
        }
    }
    Some(map)
}

/// COARDS layout: dimensions that are themselves coordinate variables.
#[must_use]
pub fn from_dimensions(
    handle: &dyn DatasetHandle,
    variable: &dyn Variable,
) -> Option<PartialCoordinateMap> {
    let mut map = PartialCoordinateMap::new();
    for dim in variable.dimensions() {
        if let Some(axis) = handle.variable(dim).and_then(axis_of) {
            if map.get(axis).is_none() {
                map.set(axis, CoordSource::variable(dim.as_str()));
            }
        }
    }
    (!map.is_empty()).then_some(map)
}

/// Caller-supplied assignments for datasets with broken metadata.
#[must_use]
pub fn from_override(
    overrides: &CoordinateOverrides,
    variable: &str,
) -> Option<PartialCoordinateMap> {
    overrides.get(variable).cloned()
}

/// Single-element latitude/longitude variables describe a fixed position.
#[must_use]
pub fn degenerate_position(handle: &dyn DatasetHandle) -> PartialCoordinateMap {
    let mut map = PartialCoordinateMap::new();
    for name in handle.variable_names() {
        let Some(variable) = handle.variable(&name) else {
            continue;
        };
        let total: usize = variable.shape().iter().product();
        if total != 1 {
            continue;
        }
        if let Some(axis @ (Axis::Latitude | Axis::Longitude)) = axis_of(variable) {
            if map.get(axis).is_none() {
                map.set(axis, CoordSource::variable(name.as_str()));
            }
        }
    }
    map
}

/// Runs the resolution chain for `name`: declared coordinates (or the COARDS
/// dimensions when none are declared), then overrides, then a degenerate fixed
/// position. Anything still missing is a `MissingCoordinates` error.
pub fn resolve(
    handle: &dyn DatasetHandle,
    name: &str,
    overrides: &CoordinateOverrides,
) -> Result<CoordinateMap, IngestError> {
    let variable = handle.variable(name).ok_or_else(|| {
        IngestError::new(
            IngestErrorCode::ParameterNotFound,
            format!("variable `{name}` is not in {}", handle.url()),
        )
    })?;

    let mut map = from_coordinates_attribute(handle, variable)
        .or_else(|| from_dimensions(handle, variable))
        .unwrap_or_default();
    if let Some(over) = from_override(overrides, name) {
        map.fill_gaps_from(&over);
    }
    if map.get(Axis::Latitude).is_none() || map.get(Axis::Longitude).is_none() {
        map.fill_gaps_from(&degenerate_position(handle));
    }

    map.complete().map_err(|missing| {
        let axes: Vec<&str> = missing.iter().map(|a| a.as_str()).collect();
        IngestError::new(
            IngestErrorCode::MissingCoordinates,
            format!("variable `{name}` has no {} coordinate", axes.join("/")),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryDataset, MemoryVariable};

    fn axis_var(name: &str, dim: &str, standard_name: &str, data: Vec<f64>) -> MemoryVariable {
        MemoryVariable::new(name, dim, data).attr("standard_name", standard_name)
    }

    fn trajectory() -> MemoryDataset {
        MemoryDataset::new("memory://traj")
            .variable(axis_var("t", "obs", "time", vec![0.0, 1.0]))
            .variable(axis_var("lat", "obs", "latitude", vec![1.0, 1.0]))
            .variable(axis_var("lon", "obs", "longitude", vec![2.0, 2.0]))
            .variable(axis_var("z", "obs", "depth", vec![3.0, 3.0]))
    }

    #[test]
    fn coordinates_attribute_is_matched_by_standard_name() {
        let ds = trajectory().variable(
            MemoryVariable::new("temp", "obs", vec![1.0, 2.0]).attr("coordinates", "z lon lat t"),
        );
        let map = resolve(&ds, "temp", &CoordinateOverrides::new()).expect("resolved");
        assert_eq!(map.time, "t");
        assert_eq!(map.depth, CoordSource::variable("z"));
        assert_eq!(map.longitude, CoordSource::variable("lon"));
    }

    #[test]
    fn override_fills_gaps_only() {
        let ds = trajectory().variable(
            MemoryVariable::new("temp", "obs", vec![1.0, 2.0]).attr("coordinates", "t lat lon"),
        );
        let mut overrides = CoordinateOverrides::new();
        overrides.insert(
            "temp".to_string(),
            PartialCoordinateMap::new()
                .with(Axis::Depth, CoordSource::Constant(0.5))
                .with(Axis::Time, CoordSource::variable("ignored")),
        );
        let map = resolve(&ds, "temp", &overrides).expect("resolved");
        assert_eq!(map.depth, CoordSource::Constant(0.5));
        assert_eq!(map.time, "t");
    }

    #[test]
    fn coards_dimensions_and_degenerate_position() {
        let ds = MemoryDataset::new("memory://mooring")
            .variable(axis_var("time", "time", "time", vec![0.0, 60.0]))
            .variable(axis_var("depth", "depth", "depth", vec![5.0, 10.0]))
            .variable(axis_var("lat", "lat", "latitude", vec![36.7]))
            .variable(axis_var("lon", "lon", "longitude", vec![-122.0]))
            .variable(
                MemoryVariable::with_shape("temp", &["time", "depth"], &[2, 2], vec![0.0; 4])
                    .expect("shape"),
            );
        let map = resolve(&ds, "temp", &CoordinateOverrides::new()).expect("resolved");
        assert_eq!(map.time, "time");
        assert_eq!(map.depth, CoordSource::variable("depth"));
        assert_eq!(map.latitude, CoordSource::variable("lat"));
        assert_eq!(map.longitude, CoordSource::variable("lon"));
    }

    #[test]
    fn unresolved_axes_are_reported() {
        let ds = trajectory().variable(
            MemoryVariable::new("temp", "obs", vec![1.0, 2.0]).attr("coordinates", "t"),
        );
        let err = resolve(&ds, "temp", &CoordinateOverrides::new()).expect_err("missing");
        assert_eq!(err.code, IngestErrorCode::MissingCoordinates);
        assert!(err.message.contains("latitude/longitude/depth"), "{}", err.message);
    }

    #[test]
    fn unknown_variable_is_parameter_not_found() {
        let err = resolve(&trajectory(), "salinity", &CoordinateOverrides::new())
            .expect_err("absent");
        assert_eq!(err.code, IngestErrorCode::ParameterNotFound);
    }
}

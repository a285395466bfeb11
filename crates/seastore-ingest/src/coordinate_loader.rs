// SPDX-License-Identifier: Apache-2.0

use crate::config::CoordinateBounds;
use crate::dataset::DatasetHandle;
use crate::grouping::LoadGroup;
use crate::sentinel::Sentinels;
use crate::time_window::TimeAxis;
use crate::{IngestError, IngestErrorCode};
use chrono::{DateTime, Utc};
use seastore_model::{
    ActivityId, Axis, CoordSource, FeatureType, InstantPointId, MeasurementId, NewMeasurement,
    NewNominalLocation, NominalLocationId,
};
use seastore_store::MeasurementStore;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Range;
use tracing::{debug, info};

/// Values of one spatial axis laid out against the sliced time steps.
#[derive(Debug, Clone, PartialEq)]
enum AxisValues {
    Broadcast(f64),
    PerTime(Vec<f64>),
    /// `levels` values per time step, row-major.
    PerRow(Vec<f64>),
    /// A vertical dimension independent of time, repeated at every time step.
    Levels(Vec<f64>),
}

impl AxisValues {
    fn levels(&self, steps: usize) -> usize {
        match self {
            Self::Broadcast(_) | Self::PerTime(_) => 1,
            Self::PerRow(v) => v.len() / steps.max(1),
            Self::Levels(v) => v.len(),
        }
    }

    fn at(&self, step: usize, level: usize, levels: usize) -> f64 {
        let value = match self {
            Self::Broadcast(v) => Some(*v),
            Self::PerTime(v) => v.get(step).copied(),
            Self::PerRow(v) => v.get(step * levels + level).copied(),
            Self::Levels(v) => v.get(level).copied(),
        };
        value.unwrap_or(f64::NAN)
    }
}

pub struct CoordinateContext<'a> {
    pub handle: &'a dyn DatasetHandle,
    pub activity: ActivityId,
    pub feature_type: FeatureType,
    pub bounds: &'a CoordinateBounds,
}

/// Coordinate rows of one group, aligned with the group's value reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedCoordinates {
    pub rows: usize,
    /// Rows per time step.
    pub levels: usize,
    /// One id per valid row, in row order.
    pub measurements: Vec<MeasurementId>,
    /// One flag per row; `true` rows have no measurement.
    pub invalid: Vec<bool>,
    pub instant_points_created: usize,
    pub measurements_created: usize,
    /// Whether any bulk insert fell back to row-wise reconciliation.
    pub reconciled: bool,
}

impl LoadedCoordinates {
    #[must_use]
    pub fn valid_rows(&self) -> usize {
        self.measurements.len()
    }
}

struct AxisRead {
    values: AxisValues,
    sentinels: Sentinels,
}

fn read_axis(
    handle: &dyn DatasetHandle,
    axis: Axis,
    source: &CoordSource,
    time_dimension: Option<&str>,
    range: &Range<usize>,
    stride: usize,
    steps: usize,
) -> Result<AxisRead, IngestError> {
    let name = match source {
        CoordSource::Constant(c) => {
            return Ok(AxisRead {
                values: AxisValues::Broadcast(*c),
                sentinels: Sentinels::default(),
            })
        }
        CoordSource::Variable(name) => name,
    };
    let variable = handle.variable(name).ok_or_else(|| {
        IngestError::new(
            IngestErrorCode::MissingCoordinates,
            format!("{axis} variable `{name}` is not in {}", handle.url()),
        )
    })?;
    let sentinels = Sentinels::from_attributes(variable.attributes());
    let total: usize = variable.shape().iter().product();
    if total == 1 {
        let all = variable.read_all()?;
        return Ok(AxisRead {
            values: AxisValues::Broadcast(all.first().copied().unwrap_or(f64::NAN)),
            sentinels,
        });
    }
    let along_time = time_dimension.is_some()
        && variable.dimensions().first().map(String::as_str) == time_dimension;
    if along_time {
        let values = variable.read(range.clone(), stride)?;
        if values.len() == steps {
            return Ok(AxisRead {
                values: AxisValues::PerTime(values),
                sentinels,
            });
        }
        if steps > 0 && values.len() % steps == 0 {
            return Ok(AxisRead {
                values: AxisValues::PerRow(values),
                sentinels,
            });
        }
        return Err(IngestError::new(
            IngestErrorCode::MissingCoordinates,
            format!(
                "{axis} variable `{name}` returned {} values for {steps} time steps",
                values.len()
            ),
        ));
    }
    if axis == Axis::Depth {
        return Ok(AxisRead {
            values: AxisValues::Levels(variable.read_all()?),
            sentinels,
        });
    }
    Err(IngestError::new(
        IngestErrorCode::MissingCoordinates,
        format!("{axis} variable `{name}` is not aligned with the time axis"),
    ))
}

/// One candidate coordinate row before persistence.
#[derive(Debug, Clone, Copy)]
struct Row {
    step: usize,
    depth: f64,
    latitude: f64,
    longitude: f64,
}

fn row_is_valid(
    row: &Row,
    time: Option<DateTime<Utc>>,
    reads: [&AxisRead; 3],
    bounds: &CoordinateBounds,
) -> bool {
    let [depth, lat, lon] = reads;
    if time.is_none() {
        return false;
    }
    if depth.sentinels.is_absent(row.depth)
        || lat.sentinels.is_absent(row.latitude)
        || lon.sentinels.is_absent(row.longitude)
    {
        return false;
    }
    // A zero latitude or longitude is how several sources write "no fix".
    if row.latitude == 0.0 || row.longitude == 0.0 {
        return false;
    }
    bounds.accepts(row.depth, row.latitude, row.longitude)
}

/// Creates InstantPoints and Measurements for `range` of the group's axes.
pub fn load_coordinates(
    ctx: &CoordinateContext<'_>,
    store: &mut dyn MeasurementStore,
    group: &LoadGroup,
    time: &TimeAxis,
    range: Range<usize>,
    stride: usize,
) -> Result<LoadedCoordinates, IngestError> {
    let coords = &group.coordinates;
    let indices: Vec<usize> = range.clone().step_by(stride.max(1)).collect();
    let steps = indices.len();
    let times: Vec<Option<DateTime<Utc>>> = indices.iter().map(|i| time.datetime(*i)).collect();
    let time_dimension = ctx
        .handle
        .variable(&coords.time)
        .and_then(|v| v.dimensions().first().cloned());
    let read = |axis: Axis| {
        read_axis(
            ctx.handle,
            axis,
            &coords.source(axis),
            time_dimension.as_deref(),
            &range,
            stride,
            steps,
        )
    };
    let depth = read(Axis::Depth)?;
    let latitude = read(Axis::Latitude)?;
    let longitude = read(Axis::Longitude)?;

    let levels = depth.values.levels(steps).max(1);
    for (axis, r) in [(Axis::Latitude, &latitude), (Axis::Longitude, &longitude)] {
        if let AxisValues::PerRow(_) = r.values {
            if r.values.levels(steps) != levels {
                return Err(IngestError::new(
                    IngestErrorCode::MissingCoordinates,
                    format!("{axis} rows do not match {levels} depth levels"),
                ));
            }
        }
    }

    let rows: Vec<Row> = (0..steps * levels)
        .map(|r| {
            let (step, level) = (r / levels, r % levels);
            Row {
                step,
                depth: depth.values.at(step, level, levels),
                latitude: latitude.values.at(step, level, levels),
                longitude: longitude.values.at(step, level, levels),
            }
        })
        .collect();
    let invalid: Vec<bool> = rows
        .iter()
        .map(|row| !row_is_valid(row, times[row.step], [&depth, &latitude, &longitude], ctx.bounds))
        .collect();

    reject_duplicates(&rows, &invalid, &times, &coords.time)?;

    let mut out = LoadedCoordinates {
        rows: rows.len(),
        levels,
        invalid,
        ..LoadedCoordinates::default()
    };

    // Time steps that carry at least one valid row, in order.
    let live_steps: BTreeSet<usize> = rows
        .iter()
        .zip(&out.invalid)
        .filter(|(_, bad)| !**bad)
        .map(|(row, _)| row.step)
        .collect();
    let step_times: Vec<(usize, DateTime<Utc>)> = live_steps
        .iter()
        .filter_map(|s| times[*s].map(|t| (*s, t)))
        .collect();
    let instant_points = create_instant_points(ctx.activity, store, &step_times, &mut out)?;

    let mut nominal_cache: HashMap<[u64; 3], NominalLocationId> = HashMap::new();
    let mut new_rows = Vec::with_capacity(step_times.len() * levels);
    for (row, bad) in rows.iter().zip(&out.invalid) {
        if *bad {
            continue;
        }
        let Some(instant_point) = instant_points.get(&row.step).copied() else {
            continue;
        };
        let nominal_location = if ctx.feature_type.is_fixed_position() {
            let key = [
                row.depth.to_bits(),
                row.latitude.to_bits(),
                row.longitude.to_bits(),
            ];
            let id = match nominal_cache.get(&key) {
                Some(id) => *id,
                None => {
                    let id = store.get_or_create_nominal_location(&NewNominalLocation {
                        activity: ctx.activity,
                        depth: row.depth,
                        latitude: row.latitude,
                        longitude: row.longitude,
                    })?;
                    nominal_cache.insert(key, id);
                    id
                }
            };
            Some(id)
        } else {
            None
        };
        new_rows.push(NewMeasurement {
            instant_point,
            depth: row.depth,
            latitude: row.latitude,
            longitude: row.longitude,
            nominal_location,
        });
    }
    out.measurements = create_measurements(store, &new_rows, &mut out)?;

    info!(
        time = %coords.time,
        rows = out.rows,
        valid = out.valid_rows(),
        instant_points = out.instant_points_created,
        measurements = out.measurements_created,
        reconciled = out.reconciled,
        "coordinates loaded"
    );
    Ok(out)
}

fn reject_duplicates(
    rows: &[Row],
    invalid: &[bool],
    times: &[Option<DateTime<Utc>>],
    time_name: &str,
) -> Result<(), IngestError> {
    let mut step_of_time: BTreeMap<DateTime<Utc>, usize> = BTreeMap::new();
    let mut seen_rows: BTreeSet<(DateTime<Utc>, [u64; 3])> = BTreeSet::new();
    for (row, bad) in rows.iter().zip(invalid) {
        if *bad {
            continue;
        }
        let Some(at) = times[row.step] else {
            continue;
        };
        let first_step = *step_of_time.entry(at).or_insert(row.step);
        if first_step != row.step {
            return Err(IngestError::new(
                IngestErrorCode::DuplicateData,
                format!("time axis `{time_name}` repeats {at} at steps {first_step} and {}", row.step),
            ));
        }
        let key = (
            at,
            [row.depth.to_bits(), row.latitude.to_bits(), row.longitude.to_bits()],
        );
        if !seen_rows.insert(key) {
            return Err(IngestError::new(
                IngestErrorCode::DuplicateData,
                format!(
                    "coordinate row ({at}, depth {}, lat {}, lon {}) appears twice",
                    row.depth, row.latitude, row.longitude
                ),
            ));
        }
    }
    Ok(())
}

fn create_instant_points(
    activity: ActivityId,
    store: &mut dyn MeasurementStore,
    step_times: &[(usize, DateTime<Utc>)],
    out: &mut LoadedCoordinates,
) -> Result<BTreeMap<usize, InstantPointId>, IngestError> {
    let times: Vec<DateTime<Utc>> = step_times.iter().map(|(_, t)| *t).collect();
    let ids = match store.bulk_create_instant_points(activity, &times) {
        Ok(ids) => {
            out.instant_points_created += ids.len();
            ids
        }
        Err(e) if e.is_conflict() => {
            debug!(error = %e, "instant points overlap earlier rows, reconciling");
            out.reconciled = true;
            let mut ids = Vec::with_capacity(times.len());
            for at in &times {
                let (id, created) = store.get_or_create_instant_point(activity, *at)?;
                out.instant_points_created += usize::from(created);
                ids.push(id);
            }
            ids
        }
        Err(e) => return Err(e.into()),
    };
    Ok(step_times
        .iter()
        .map(|(step, _)| *step)
        .zip(ids)
        .collect())
}

fn create_measurements(
    store: &mut dyn MeasurementStore,
    rows: &[NewMeasurement],
    out: &mut LoadedCoordinates,
) -> Result<Vec<MeasurementId>, IngestError> {
    match store.bulk_create_measurements(rows) {
        Ok(ids) => {
            out.measurements_created += ids.len();
            Ok(ids)
        }
        Err(e) if e.is_conflict() => {
            debug!(error = %e, "measurements overlap earlier rows, reconciling");
            out.reconciled = true;
            let mut ids = Vec::with_capacity(rows.len());
            for row in rows {
                let (id, created) = store.get_or_create_measurement(row)?;
                out.measurements_created += usize::from(created);
                ids.push(id);
            }
            Ok(ids)
        }
        Err(e) => Err(e.into()),
    }
}

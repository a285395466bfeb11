// SPDX-License-Identifier: Apache-2.0

use crate::coordinate_loader::LoadedCoordinates;
use crate::dataset::DatasetHandle;
use crate::sentinel::{Sentinels, HUGE_VALUE};
use crate::{IngestError, IngestErrorCode};
use seastore_model::{ActivityId, MeasuredValue, NewMeasuredParameter, Parameter};
use seastore_store::MeasurementStore;
use std::ops::Range;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Decoded {
    Present(f64),
    Absent,
    /// Implausibly large reading that is not the declared fill value.
    Undecodable,
}

fn decode(value: f64, sentinels: &Sentinels) -> Decoded {
    if sentinels.is_absent(value) {
        Decoded::Absent
    } else if value.abs() > HUGE_VALUE {
        Decoded::Undecodable
    } else {
        Decoded::Present(value)
    }
}

/// Outcome of loading one variable onto a group's coordinate rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedValues {
    pub variable: String,
    pub loaded: usize,
    pub absent: usize,
    pub decode_errors: usize,
    pub removed_by_cleanup: usize,
    /// Elements per row; above one the values are stored as arrays.
    pub width: usize,
}

pub struct ValueContext<'a> {
    pub handle: &'a dyn DatasetHandle,
    pub activity: ActivityId,
    pub progress_every: usize,
}

/// Loads `variable` over the same slice the coordinates were read with.
///
/// A read that returns nothing, or a shape that cannot be aligned with the
/// coordinate rows, is reported as `InvalidSliceRequest` so the caller can
/// skip the variable. Read failures are `DatasetUnavailable`.
pub fn load_values(
    ctx: &ValueContext<'_>,
    store: &mut dyn MeasurementStore,
    parameter: &Parameter,
    coords: &LoadedCoordinates,
    range: Range<usize>,
    stride: usize,
) -> Result<LoadedValues, IngestError> {
    let name = parameter.name.as_str();
    let variable = ctx.handle.variable(name).ok_or_else(|| {
        IngestError::new(
            IngestErrorCode::ParameterNotFound,
            format!("variable `{name}` is not in {}", ctx.handle.url()),
        )
    })?;
    let sentinels = Sentinels::from_attributes(variable.attributes());
    let mut out = LoadedValues {
        variable: name.to_string(),
        decode_errors: sentinels.undecodable.len(),
        ..LoadedValues::default()
    };
    for key in &sentinels.undecodable {
        warn!(variable = name, attribute = %key, "sentinel attribute is not numeric");
    }

    let raw = variable.read(range.clone(), stride)?;
    if raw.is_empty() {
        return Err(IngestError::new(
            IngestErrorCode::InvalidSliceRequest,
            format!("variable `{name}` returned no values for {}..{}", range.start, range.end),
        ));
    }
    if coords.rows == 0 || raw.len() % coords.rows != 0 {
        return Err(IngestError::new(
            IngestErrorCode::InvalidSliceRequest,
            format!(
                "variable `{name}` returned {} values for {} coordinate rows",
                raw.len(),
                coords.rows
            ),
        ));
    }
    let width = raw.len() / coords.rows;
    out.width = width;

    let mut rows = Vec::with_capacity(coords.valid_rows());
    let mut measurements = coords.measurements.iter();
    for (index, chunk) in raw.chunks(width).enumerate() {
        if coords.invalid.get(index).copied().unwrap_or(true) {
            continue;
        }
        let Some(measurement) = measurements.next().copied() else {
            break;
        };
        let decoded: Vec<Decoded> = chunk
            .iter()
            .map(|v| decode(*v, &sentinels))
            .collect();
        out.decode_errors += decoded
            .iter()
            .filter(|d| **d == Decoded::Undecodable)
            .count();
        let value = if width == 1 {
            match decoded[0] {
                Decoded::Present(v) => Some(MeasuredValue::Scalar(v)),
                _ => None,
            }
        } else {
            let items: Vec<Option<f64>> = decoded
                .iter()
                .map(|d| match d {
                    Decoded::Present(v) => Some(*v),
                    _ => None,
                })
                .collect();
            Some(MeasuredValue::Array(items)).filter(MeasuredValue::is_valid)
        };
        match value {
            Some(value) => rows.push(NewMeasuredParameter {
                measurement,
                parameter: parameter.id,
                value,
            }),
            None => out.absent += 1,
        }
        if (index + 1) % ctx.progress_every.max(1) == 0 {
            debug!(variable = name, prepared = rows.len(), row = index, "values prepared");
        }
    }
    if out.decode_errors > 0 {
        warn!(
            variable = name,
            dropped = out.decode_errors,
            "values above {HUGE_VALUE:e} that are not the fill value were dropped"
        );
    }

    let inserted = match store.bulk_create_measured_parameters(&rows) {
        Ok(n) => n,
        Err(e) if e.is_conflict() => {
            debug!(variable = name, error = %e, "values already present, inserting the remainder");
            store.insert_missing_measured_parameters(&rows)?
        }
        Err(e) => return Err(e.into()),
    };
    out.removed_by_cleanup = store.delete_invalid_measured_parameters(ctx.activity, parameter.id)?;
    out.loaded = inserted.saturating_sub(out.removed_by_cleanup);
    info!(
        variable = name,
        loaded = out.loaded,
        absent = out.absent,
        decode_errors = out.decode_errors,
        width,
        "values loaded"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_separates_fill_from_real_zero() {
        let mut attrs = crate::dataset::Attributes::new();
        attrs.insert("_FillValue", 9999.0);
        let s = Sentinels::from_attributes(&attrs);
        assert_eq!(decode(9999.0, &s), Decoded::Absent);
        assert_eq!(decode(0.0, &s), Decoded::Present(0.0));
        assert_eq!(decode(f64::NAN, &s), Decoded::Absent);
    }

    #[test]
    fn huge_values_are_undecodable_unless_they_are_fill() {
        let s = Sentinels::default();
        assert_eq!(decode(1e35, &s), Decoded::Undecodable);
        assert_eq!(decode(-1e36, &s), Decoded::Undecodable);
        assert_eq!(decode(1e33, &s), Decoded::Present(1e33));
        let mut attrs = crate::dataset::Attributes::new();
        attrs.insert("_FillValue", 1.0000001e35);
        assert_eq!(decode(1e35, &Sentinels::from_attributes(&attrs)), Decoded::Absent);
    }
}

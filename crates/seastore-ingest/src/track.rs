// SPDX-License-Identifier: Apache-2.0

//! Map tracks and depth-time outlines derived from stored measurements.

use geo::{LineString, Simplify};
use seastore_model::{ActivityId, NominalLocationId, SimpleDepthTime, Track, TrackPoint};
use std::collections::BTreeMap;

/// Ramer-Douglas-Peucker simplification. Endpoints are always kept.
#[must_use]
pub fn simplify_points(points: &[(f64, f64)], tolerance: f64) -> Vec<(f64, f64)> {
    let line: LineString<f64> = points.iter().copied().collect();
    line.simplify(&tolerance)
        .coords()
        .map(|c| (c.x, c.y))
        .collect()
}

/// Simplified (longitude, latitude) geometry. `None` when there are no points.
#[must_use]
pub fn build_track(points: &[TrackPoint], tolerance: f64) -> Option<Track> {
    let mut positions: Vec<(f64, f64)> = Vec::with_capacity(points.len());
    for p in points {
        let xy = (p.longitude, p.latitude);
        if positions.last() != Some(&xy) {
            positions.push(xy);
        }
    }
    if positions.is_empty() {
        return None;
    }
    let line: LineString<f64> = positions.into_iter().collect();
    Some(Track::from(line.simplify(&tolerance)))
}

/// One simplified (epoch ms, depth) series per activity, or per nominal
/// location when the platform stays in place.
#[must_use]
pub fn depth_time_series(
    activity: ActivityId,
    points: &[TrackPoint],
    by_nominal_location: bool,
    tolerance: f64,
) -> Vec<SimpleDepthTime> {
    let mut series: BTreeMap<Option<NominalLocationId>, Vec<(f64, f64)>> = BTreeMap::new();
    for p in points {
        let key = if by_nominal_location {
            p.nominal_location
        } else {
            None
        };
        series
            .entry(key)
            .or_default()
            .push((p.time.timestamp_millis() as f64, p.depth));
    }
    series
        .into_iter()
        .map(|(nominal_location, raw)| SimpleDepthTime {
            activity,
            nominal_location,
            points: simplify_points(&raw, tolerance)
                .into_iter()
                .map(|(ms, depth)| (ms as i64, depth))
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn point(secs: i64, lon: f64, lat: f64, depth: f64) -> TrackPoint {
        TrackPoint {
            time: Utc.timestamp_opt(secs, 0).single().expect("time"),
            longitude: lon,
            latitude: lat,
            depth,
            nominal_location: None,
        }
    }

    #[test]
    fn collinear_points_collapse_to_endpoints() {
        let pts = vec![(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0)];
        assert_eq!(simplify_points(&pts, 0.01), vec![(0.0, 0.0), (3.0, 3.0)]);
    }

    #[test]
    fn corners_survive_simplification() {
        let pts = vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (2.0, 1.0), (2.0, 2.0)];
        assert_eq!(
            simplify_points(&pts, 0.01),
            vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0)]
        );
    }

    #[test]
    fn stationary_track_is_a_point() {
        let pts = vec![point(0, -120.0, 10.0, 1.0), point(60, -120.0, 10.0, 2.0)];
        assert_eq!(build_track(&pts, 0.001), Some(Track::Point((-120.0, 10.0))));
        assert_eq!(build_track(&[], 0.001), None);
    }

    #[test]
    fn moving_track_is_a_line() {
        let pts = vec![point(0, -120.0, 10.0, 1.0), point(60, -119.0, 10.5, 2.0)];
        assert_eq!(
            build_track(&pts, 0.001),
            Some(Track::LineString(vec![(-120.0, 10.0), (-119.0, 10.5)]))
        );
    }

    #[test]
    fn depth_series_split_by_nominal_location() {
        let mut a = point(0, -122.0, 36.7, 5.0);
        let mut b = point(0, -122.0, 36.7, 20.0);
        a.nominal_location = Some(NominalLocationId(1));
        b.nominal_location = Some(NominalLocationId(2));
        let series = depth_time_series(ActivityId(7), &[a, b], true, 10.0);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].points, vec![(0, 5.0)]);
        let merged = depth_time_series(ActivityId(7), &[a, b], false, 10.0);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].nominal_location, None);
    }
}

// SPDX-License-Identifier: Apache-2.0

use crate::NominalLocationId;
use chrono::{DateTime, Utc};
use geo::{Geometry, LineString, Point};
use serde::{Deserialize, Serialize};
use wkt::ToWkt;

/// One measurement position in time order, as read back for track building.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub time: DateTime<Utc>,
    pub longitude: f64,
    pub latitude: f64,
    pub depth: f64,
    pub nominal_location: Option<NominalLocationId>,
}

/// Simplified map geometry of an activity, in (longitude, latitude) order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Track {
    LineString(Vec<(f64, f64)>),
    Point((f64, f64)),
}

impl Track {
    #[must_use]
    pub fn to_geometry(&self) -> Geometry<f64> {
        match self {
            Self::Point((x, y)) => Geometry::Point(Point::new(*x, *y)),
            Self::LineString(points) => {
                Geometry::LineString(points.iter().copied().collect::<LineString<f64>>())
            }
        }
    }

    #[must_use]
    pub fn to_wkt(&self) -> String {
        self.to_geometry().wkt_string()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Point(_) => 1,
            Self::LineString(points) => points.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<LineString<f64>> for Track {
    /// Collapses a line whose vertices all coincide into a point.
    fn from(line: LineString<f64>) -> Self {
        let points: Vec<(f64, f64)> = line.coords().map(|c| (c.x, c.y)).collect();
        match points.first() {
            Some(first) if points.iter().all(|p| p == first) => Self::Point(*first),
            _ => Self::LineString(points),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Track;
    use geo::{Geometry, LineString};
    use wkt::Wkt;

    fn parse(text: &str) -> Geometry<f64> {
        let wkt: Wkt<f64> = text.parse().expect("wkt");
        Geometry::try_from(wkt).expect("geometry")
    }

    #[test]
    fn wkt_uses_lon_lat_order() {
        let line = Track::LineString(vec![(-122.0, 36.5), (-121.5, 36.75)]);
        let text = line.to_wkt();
        assert!(text.starts_with("LINESTRING"));
        assert_eq!(parse(&text), line.to_geometry());

        let point = Track::Point((-120.0, 10.0));
        assert!(point.to_wkt().starts_with("POINT"));
        assert_eq!(parse(&point.to_wkt()), point.to_geometry());
    }

    #[test]
    fn coincident_line_collapses_to_point() {
        let line: LineString<f64> = vec![(-120.0, 10.0), (-120.0, 10.0)].into();
        assert_eq!(Track::from(line), Track::Point((-120.0, 10.0)));
        let moving: LineString<f64> = vec![(-120.0, 10.0), (-119.0, 10.5)].into();
        assert_eq!(
            Track::from(moving),
            Track::LineString(vec![(-120.0, 10.0), (-119.0, 10.5)])
        );
    }
}

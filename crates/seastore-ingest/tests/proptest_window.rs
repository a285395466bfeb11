// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use seastore_ingest::time_window::{TimeAxis, TimeWindow};
use seastore_ingest::track::simplify_points;
use seastore_model::{TimeUnits, JULIAN_DAY_AT_UNIX_EPOCH};

fn secs(s: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(s, 0).single().expect("time")
}

fn sorted_axis() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::btree_set(-200_000i64..200_000, 1..40)
        .prop_map(|set| set.into_iter().collect())
}

fn window() -> impl Strategy<Value = (i64, i64)> {
    (-250_000i64..250_000, 1i64..300_000).prop_map(|(start, len)| (start, start + len))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn window_range_is_maximal(values in sorted_axis(), (start, end) in window()) {
        let axis = TimeAxis::standard(
            "time",
            TimeUnits::seconds_since_unix_epoch(),
            values.iter().map(|v| *v as f64).collect(),
        );
        let w = TimeWindow { start: Some(secs(start)), end: Some(secs(end)), append_since: None };
        let inside = |v: i64| v >= start && v <= end;
        match axis.index_range(&w) {
            Ok(r) => {
                prop_assert!(r.start < r.end);
                prop_assert!(values[r.clone()].iter().all(|v| inside(*v)));
                prop_assert!(values[..r.start].iter().all(|v| !inside(*v)));
                prop_assert!(values[r.end..].iter().all(|v| !inside(*v)));
            }
            Err(e) => {
                prop_assert_eq!(e.code, seastore_ingest::IngestErrorCode::NoValidData);
                prop_assert!(values.iter().all(|v| !inside(*v)));
            }
        }
    }

    #[test]
    fn epic_and_standard_axes_agree(values in sorted_axis(), (start, end) in window(), exclusive in any::<bool>()) {
        let standard = TimeAxis::standard(
            "time",
            TimeUnits::seconds_since_unix_epoch(),
            values.iter().map(|v| *v as f64).collect(),
        );
        let days = values
            .iter()
            .map(|v| (v.div_euclid(86_400) + JULIAN_DAY_AT_UNIX_EPOCH) as f64)
            .collect();
        let millis = values
            .iter()
            .map(|v| (v.rem_euclid(86_400) * 1_000) as f64)
            .collect();
        let epic = TimeAxis::epic("time", days, millis).expect("epic");
        let w = if exclusive {
            TimeWindow { start: None, end: Some(secs(end)), append_since: Some(secs(start)) }
        } else {
            TimeWindow { start: Some(secs(start)), end: Some(secs(end)), append_since: None }
        };
        let a = standard.index_range(&w).map_err(|e| e.code);
        let b = epic.index_range(&w).map_err(|e| e.code);
        prop_assert_eq!(a, b);
        for i in 0..values.len() {
            prop_assert_eq!(standard.datetime(i), epic.datetime(i));
        }
    }

    #[test]
    fn simplification_keeps_endpoints_and_order(
        points in prop::collection::vec((-180.0f64..180.0, -90.0f64..90.0), 2..60),
        tolerance in 0.0f64..5.0,
    ) {
        let out = simplify_points(&points, tolerance);
        prop_assert!(out.len() >= 2);
        prop_assert_eq!(out.first(), points.first());
        prop_assert_eq!(out.last(), points.last());
        let mut cursor = 0;
        for p in &out {
            let found = points[cursor..].iter().position(|q| q == p);
            prop_assert!(found.is_some());
            cursor += found.unwrap_or(0) + 1;
        }
    }
}

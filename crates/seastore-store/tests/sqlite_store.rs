// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, TimeZone, Utc};
use seastore_model::{
    ActivityFinalization, FeatureType, MeasuredValue, NewActivity, NewMeasuredParameter,
    NewMeasurement, NewNominalLocation, ParameterSpec, PlatformSpec, SimpleDepthTime, StoreAlias,
    Track,
};
use seastore_store::{MeasurementStore, SqliteStore, StoreErrorCode};
use tempfile::tempdir;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().expect("time")
}

fn new_activity(store: &mut SqliteStore, name: &str) -> seastore_model::ActivityId {
    let platform = store
        .get_or_create_platform(&PlatformSpec {
            name: "dorado".to_string(),
            platform_type: "auv".to_string(),
        })
        .expect("platform");
    store
        .create_activity(&NewActivity {
            name: name.to_string(),
            platform: platform.id,
            feature_type: FeatureType::Trajectory,
            start: Some(at(0)),
            end: None,
            source_url: "memory://survey".to_string(),
            comment: String::new(),
        })
        .expect("activity")
}

#[test]
fn duplicate_activity_name_is_conflict() {
    let mut store = SqliteStore::open_in_memory(StoreAlias::default_alias()).expect("store");
    new_activity(&mut store, "survey");
    let platform = store
        .get_or_create_platform(&PlatformSpec {
            name: "dorado".to_string(),
            platform_type: "auv".to_string(),
        })
        .expect("platform");
    let err = store
        .create_activity(&NewActivity {
            name: "survey".to_string(),
            platform: platform.id,
            feature_type: FeatureType::Trajectory,
            start: None,
            end: None,
            source_url: String::new(),
            comment: String::new(),
        })
        .expect_err("duplicate");
    assert_eq!(err.code, StoreErrorCode::Conflict);
    assert!(store
        .find_activity("survey", platform.id)
        .expect("lookup")
        .is_some());
}

#[test]
fn bulk_instant_points_roll_back_on_conflict() {
    let mut store = SqliteStore::open_in_memory(StoreAlias::default_alias()).expect("store");
    let activity = new_activity(&mut store, "survey");
    store
        .bulk_create_instant_points(activity, &[at(0), at(60)])
        .expect("first batch");
    let err = store
        .bulk_create_instant_points(activity, &[at(120), at(60), at(180)])
        .expect_err("overlap");
    assert!(err.is_conflict());
    assert_eq!(store.count_instant_points(activity).expect("count"), 2);

    let (existing, created) = store
        .get_or_create_instant_point(activity, at(60))
        .expect("reuse");
    assert!(!created);
    let (_, created) = store
        .get_or_create_instant_point(activity, at(120))
        .expect("create");
    assert!(created);
    assert_ne!(existing.get(), 0);
    assert_eq!(store.max_timevalue(activity).expect("max"), Some(at(120)));
}

#[test]
fn measurements_values_and_cleanup() {
    let mut store = SqliteStore::open_in_memory(StoreAlias::default_alias()).expect("store");
    let activity = new_activity(&mut store, "survey");
    let ips = store
        .bulk_create_instant_points(activity, &[at(0), at(60), at(120)])
        .expect("ips");
    let rows: Vec<NewMeasurement> = ips
        .iter()
        .enumerate()
        .map(|(i, ip)| NewMeasurement {
            instant_point: *ip,
            depth: i as f64 + 1.0,
            latitude: 10.0,
            longitude: -120.0,
            nominal_location: None,
        })
        .collect();
    let ms = store.bulk_create_measurements(&rows).expect("measurements");
    let (again, created) = store.get_or_create_measurement(&rows[1]).expect("reuse");
    assert!(!created);
    assert_eq!(again, ms[1]);

    let temp = store
        .register_parameter(&ParameterSpec::named("temperature"))
        .expect("param");
    let values = vec![
        NewMeasuredParameter {
            measurement: ms[0],
            parameter: temp.id,
            value: MeasuredValue::Scalar(15.0),
        },
        NewMeasuredParameter {
            measurement: ms[1],
            parameter: temp.id,
            value: MeasuredValue::Scalar(f64::NAN),
        },
        NewMeasuredParameter {
            measurement: ms[2],
            parameter: temp.id,
            value: MeasuredValue::Scalar(f64::INFINITY),
        },
    ];
    assert_eq!(store.bulk_create_measured_parameters(&values).expect("insert"), 3);
    assert_eq!(
        store
            .delete_invalid_measured_parameters(activity, temp.id)
            .expect("cleanup"),
        2
    );
    assert_eq!(store.count_measured_parameters(activity).expect("count"), 1);

    let retry = vec![
        values[0].clone(),
        NewMeasuredParameter {
            measurement: ms[1],
            parameter: temp.id,
            value: MeasuredValue::Scalar(16.5),
        },
    ];
    assert!(store
        .bulk_create_measured_parameters(&retry)
        .expect_err("overlap")
        .is_conflict());
    assert_eq!(store.insert_missing_measured_parameters(&retry).expect("fill in"), 1);
    assert_eq!(
        store
            .delete_invalid_measured_parameters(activity, temp.id)
            .expect("cleanup"),
        0
    );
    assert_eq!(store.count_measured_parameters(activity).expect("count"), 2);
    assert_eq!(
        store.parameter_counts(activity).expect("counts").get("temperature"),
        Some(&2)
    );
    let stats = store
        .update_activity_parameter_stats(activity)
        .expect("stats");
    assert_eq!(stats.len(), 1);
    assert!((stats[0].mean - 15.75).abs() < 1e-12);
    assert_eq!(store.depth_range(activity).expect("depth"), Some((1.0, 3.0)));

    let track = store.measurement_track(activity).expect("track");
    assert_eq!(track.len(), 3);
    assert!(track.windows(2).all(|w| w[0].time <= w[1].time));
}

#[test]
fn nominal_locations_are_shared() {
    let mut store = SqliteStore::open_in_memory(StoreAlias::default_alias()).expect("store");
    let activity = new_activity(&mut store, "mooring");
    let loc = NewNominalLocation {
        activity,
        depth: 10.0,
        latitude: 36.7,
        longitude: -122.0,
    };
    let a = store.get_or_create_nominal_location(&loc).expect("a");
    let b = store.get_or_create_nominal_location(&loc).expect("b");
    assert_eq!(a, b);
    store
        .insert_simple_depth_time(&SimpleDepthTime {
            activity,
            nominal_location: Some(a),
            points: vec![(0, 10.0), (3_600_000, 10.0)],
        })
        .expect("depth time");
}

#[test]
fn finalized_activity_reads_back_from_file() {
    let dir = tempdir().expect("tmp");
    let path = dir.path().join("campaign.db");
    let alias = StoreAlias::parse("campaign").expect("alias");
    let id = {
        let mut store = SqliteStore::open(alias.clone(), &path).expect("open");
        let id = new_activity(&mut store, "survey");
        store
            .finalize_activity(
                id,
                &ActivityFinalization {
                    end: Some(at(120)),
                    num_measured_parameters: 2,
                    num_parameters: 1,
                    comment: "loaded".to_string(),
                    loaded_at: at(1_000),
                    min_depth: Some(1.0),
                    max_depth: Some(3.0),
                    track: Some(Track::LineString(vec![(-120.0, 10.0), (-120.5, 10.5)])),
                },
            )
            .expect("finalize");
        id
    };
    let store = SqliteStore::open(alias, &path).expect("reopen");
    let activity = store.activity(id).expect("activity");
    assert_eq!(activity.end, Some(at(120)));
    assert_eq!(activity.num_measured_parameters, 2);
    assert_eq!(activity.feature_type, FeatureType::Trajectory);
    assert!(matches!(activity.track, Some(Track::LineString(ref p)) if p.len() == 2));
}

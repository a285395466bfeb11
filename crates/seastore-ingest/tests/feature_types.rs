// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, TimeZone, Utc};
use seastore_ingest::{
    load_dataset, load_from_registry, load_platform, IngestConfig, IngestErrorCode, LoadRequest,
    MemoryDataset, MemoryOpener, MemoryVariable,
};
use seastore_model::{
    FeatureType, PlatformDescriptor, PlatformSpec, StoreAlias, Track, JULIAN_DAY_AT_UNIX_EPOCH,
};
use seastore_store::{MeasurementStore, SqliteStore, StoreConfig, StoreRegistry};
use tempfile::tempdir;

fn secs(s: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(s, 0).single().expect("time")
}

fn platform(name: &str, platform_type: &str) -> PlatformSpec {
    PlatformSpec {
        name: name.to_string(),
        platform_type: platform_type.to_string(),
    }
}

fn mooring(url: &str) -> MemoryDataset {
    MemoryDataset::new(url)
        .global("Conventions", "CF-1.6")
        .global("featureType", "timeSeriesProfile")
        .variable(
            MemoryVariable::new("time", "time", vec![0.0, 3_600.0])
                .attr("standard_name", "time")
                .attr("units", "seconds since 1970-01-01T00:00:00Z"),
        )
        .variable(MemoryVariable::new("depth", "depth", vec![10.0, 20.0]).attr("axis", "Z"))
        .variable(MemoryVariable::new("lat", "lat", vec![36.7]).attr("standard_name", "latitude"))
        .variable(MemoryVariable::new("lon", "lon", vec![-122.0]).attr("standard_name", "longitude"))
        .variable(
            MemoryVariable::with_shape("temperature", &["time", "depth"], &[2, 2], vec![12.0, 11.0, 12.5, -1e20])
                .expect("shape")
                .attr("_FillValue", -1e20),
        )
}

#[test]
fn mooring_profile_expands_time_by_depth_with_nominal_locations() {
    let url = "memory://m1/2020.nc";
    let opener = MemoryOpener::new().with(mooring(url));
    let mut store = SqliteStore::open_in_memory(StoreAlias::default_alias()).expect("store");
    let req = LoadRequest {
        url: url.to_string(),
        activity_name: "m1 2020".to_string(),
        platform: platform("m1", "mooring"),
        parameters: vec!["temperature".to_string()],
        ..LoadRequest::default()
    };
    let result = load_dataset(&opener, &mut store, &req, &IngestConfig::default()).expect("load");
    assert_eq!(result.feature_type, FeatureType::TimeSeriesProfile);
    assert_eq!(result.instant_points_created, 2);
    assert_eq!(result.measurements_created, 4);
    assert_eq!(result.records_loaded, 3);
    assert_eq!(result.track, Some(Track::Point((-122.0, 36.7))));

    let track = store.measurement_track(result.activity).expect("track");
    let mut nominal: Vec<_> = track.iter().filter_map(|p| p.nominal_location).collect();
    nominal.sort();
    nominal.dedup();
    assert_eq!(nominal.len(), 2);

    let activity = store.activity(result.activity).expect("activity");
    assert_eq!(activity.start, Some(secs(0)));
    assert_eq!(activity.end, Some(secs(3_600)));
    assert_eq!(activity.feature_type, FeatureType::TimeSeriesProfile);
}

#[test]
fn epic_axis_refines_the_window_with_milliseconds() {
    let day = JULIAN_DAY_AT_UNIX_EPOCH as f64;
    let url = "memory://adcp/epic.nc";
    let ds = MemoryDataset::new(url)
        .global("Conventions", "PMEL-EPIC")
        .variable(
            MemoryVariable::new("time", "time", vec![day, day, day + 1.0])
                .attr("standard_name", "time")
                .attr("units", "True Julian Day"),
        )
        .variable(MemoryVariable::new("time2", "time", vec![0.0, 3_600_000.0, 0.0]))
        .variable(MemoryVariable::new("depth", "depth", vec![25.0]).attr("standard_name", "depth"))
        .variable(MemoryVariable::new("lat", "lat", vec![36.8]).attr("standard_name", "latitude"))
        .variable(MemoryVariable::new("lon", "lon", vec![-121.9]).attr("standard_name", "longitude"))
        .variable(
            MemoryVariable::new("u", "time", vec![0.1, 0.2, 0.3])
                .attr("coordinates", "time depth lat lon")
                .attr("units", "m/s"),
        );
    let opener = MemoryOpener::new().with(ds);
    let mut store = SqliteStore::open_in_memory(StoreAlias::default_alias()).expect("store");
    let req = LoadRequest {
        url: url.to_string(),
        activity_name: "adcp".to_string(),
        platform: platform("adcp", "mooring"),
        parameters: vec!["u".to_string()],
        start: Some(secs(1_800)),
        end: Some(secs(86_400)),
        ..LoadRequest::default()
    };
    let result = load_dataset(&opener, &mut store, &req, &IngestConfig::default()).expect("load");
    assert_eq!(result.feature_type, FeatureType::Trajectory);
    assert_eq!(result.instant_points_created, 2);
    assert_eq!(result.records_loaded, 2);
    assert_eq!(
        store.max_timevalue(result.activity).expect("max"),
        Some(secs(86_400))
    );
}

#[test]
fn registry_routes_loads_to_the_aliased_file_store() {
    let dir = tempdir().expect("tmp");
    let path = dir.path().join("canon.db");
    let config = StoreConfig::parse(&format!("canon={}", path.display())).expect("config");
    let mut registry = StoreRegistry::open(&config).expect("registry");

    let url = "memory://m1/2020.nc";
    let opener = MemoryOpener::new().with(mooring(url));
    let alias = StoreAlias::parse("canon").expect("alias");
    let req = LoadRequest {
        url: url.to_string(),
        activity_name: "m1 2020".to_string(),
        platform: platform("m1", "mooring"),
        parameters: vec!["temperature".to_string()],
        store: alias.clone(),
        ..LoadRequest::default()
    };
    let result = load_from_registry(&opener, &mut registry, &req, &IngestConfig::default())
        .expect("load");
    drop(registry);

    let reopened = SqliteStore::open(alias, &path).expect("reopen");
    assert_eq!(
        reopened.count_measured_parameters(result.activity).expect("count"),
        3
    );

    let mut empty = StoreRegistry::new();
    let err = load_from_registry(&opener, &mut empty, &req, &IngestConfig::default())
        .expect_err("unknown alias");
    assert_eq!(err.code, IngestErrorCode::Store);
}

#[test]
fn platform_loop_loads_each_file_and_tolerates_empty_ones() {
    let opener = MemoryOpener::new()
        .with(mooring("memory://m1/a.nc"))
        .with(mooring("memory://m1/b.nc"));
    let mut store = SqliteStore::open_in_memory(StoreAlias::default_alias()).expect("store");
    let descriptor = PlatformDescriptor {
        name: "m1".to_string(),
        platform_type: "mooring".to_string(),
        base_url: "memory://m1".to_string(),
        files: vec!["a.nc".to_string(), "b.nc".to_string(), "missing.nc".to_string()],
        parameters: vec!["temperature".to_string()],
        start: None,
        end: None,
        stride: 2,
    };
    let outcomes = load_platform(&opener, &mut store, &descriptor, &IngestConfig::default());
    assert_eq!(outcomes.len(), 3);
    let a = outcomes[0].outcome.as_ref().expect("a loaded");
    assert_eq!(a.activity_name, "a.nc (stride=2)");
    assert_eq!(a.instant_points_created, 1);
    assert!(outcomes[1].is_acceptable());
    assert_eq!(outcomes[2].url, "memory://m1/missing.nc");
    let err = outcomes[2].outcome.as_ref().expect_err("missing");
    assert_eq!(err.code, IngestErrorCode::DatasetUnavailable);
    assert!(!outcomes[2].is_acceptable());
}

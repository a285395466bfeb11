// SPDX-License-Identifier: Apache-2.0

use seastore_model::{
    Axis, CoordSource, FeatureType, MeasuredValue, PartialCoordinateMap, PlatformDescriptor,
    StoreAlias, Track,
};

#[test]
fn feature_type_serializes_camel_case() {
    let text = serde_json::to_string(&FeatureType::TimeSeriesProfile).expect("json");
    assert_eq!(text, "\"timeSeriesProfile\"");
}

#[test]
fn partial_coordinate_map_reads_override_json() {
    let raw = r#"{"time":{"variable":"Time"},"depth":{"constant":0.5}}"#;
    let parsed: PartialCoordinateMap = serde_json::from_str(raw).expect("parse");
    assert_eq!(parsed.get(Axis::Time), Some(&CoordSource::variable("Time")));
    assert_eq!(parsed.get(Axis::Depth), Some(&CoordSource::Constant(0.5)));
    assert_eq!(parsed.missing(), vec![Axis::Latitude, Axis::Longitude]);
}

#[test]
fn store_alias_is_validated_on_deserialize() {
    assert!(serde_json::from_str::<StoreAlias>("\"campaign-1\"").is_ok());
    assert!(serde_json::from_str::<StoreAlias>("\"bad alias\"").is_err());
}

#[test]
fn platform_descriptor_rejects_unknown_fields() {
    let raw = r#"{"name":"m1","platform_type":"mooring","base_url":"","files":[],"parameters":[],"colour":"red"}"#;
    assert!(serde_json::from_str::<PlatformDescriptor>(raw).is_err());
    let ok = r#"{"name":"m1","platform_type":"mooring","base_url":"","files":[],"parameters":[]}"#;
    let d: PlatformDescriptor = serde_json::from_str(ok).expect("descriptor");
    assert_eq!(d.stride, 1);
}

#[test]
fn array_values_keep_gaps() {
    let v = MeasuredValue::Array(vec![Some(1.0), None, Some(f64::NAN)]);
    assert!(v.is_valid());
    assert!(!MeasuredValue::Array(vec![None, None]).is_valid());
    assert!(!MeasuredValue::Scalar(f64::INFINITY).is_valid());
}

#[test]
fn track_serializes_tagged() {
    let text = serde_json::to_string(&Track::Point((-120.0, 10.0))).expect("json");
    assert_eq!(text, r#"{"type":"Point","coordinates":[-120.0,10.0]}"#);
}

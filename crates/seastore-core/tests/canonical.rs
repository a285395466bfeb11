// SPDX-License-Identifier: Apache-2.0

use seastore_core::{canonical, sha256_hex, MachineError};
use serde_json::json;

#[test]
fn stable_json_bytes_are_key_order_deterministic() {
    let a = json!({"time": "t", "depth": {"const": 5.0}, "latitude": "lat"});
    let b = json!({"latitude": "lat", "time": "t", "depth": {"const": 5.0}});
    let ba = canonical::stable_json_bytes(&a).expect("stable json a");
    let bb = canonical::stable_json_bytes(&b).expect("stable json b");
    assert_eq!(ba, bb);
}

#[test]
fn stable_json_string_sorts_nested_keys() {
    let value = json!({"z": {"b": 1, "a": 2}, "a": [ {"y": 1, "x": 2} ]});
    let text = canonical::stable_json_string(&value).expect("stable string");
    assert_eq!(text, r#"{"a":[{"x":2,"y":1}],"z":{"a":2,"b":1}}"#);
}

#[test]
fn sha256_matches_known_vector() {
    assert_eq!(
        sha256_hex(b"abc"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[test]
fn machine_error_serializes_details_in_key_order() {
    let err = MachineError::new("no_valid_data", "window matched nothing")
        .with_detail("url", "memory://a")
        .with_detail("activity", "deployment");
    let text = serde_json::to_string(&err).expect("json");
    assert!(text.find("activity").unwrap_or(usize::MAX) < text.find("url").unwrap_or(0));
    assert_eq!(err.to_string(), "no_valid_data: window matched nothing");
}

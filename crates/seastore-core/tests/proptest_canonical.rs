// SPDX-License-Identifier: Apache-2.0

use proptest::prelude::*;
use proptest::test_runner::Config;
use seastore_core::canonical;
use serde_json::{Map, Value};

proptest! {
    #![proptest_config(Config::with_cases(128))]
    #[test]
    fn canonical_bytes_ignore_insertion_order(
        entries in proptest::collection::btree_map("[a-z]{1,8}", -1_000_i64..1_000_i64, 1..12)
    ) {
        let mut forward = Map::new();
        for (k, v) in &entries {
            forward.insert(k.clone(), Value::from(*v));
        }
        let mut reverse = Map::new();
        for (k, v) in entries.iter().rev() {
            reverse.insert(k.clone(), Value::from(*v));
        }
        let a = canonical::stable_json_bytes(&Value::Object(forward)).expect("forward");
        let b = canonical::stable_json_bytes(&Value::Object(reverse)).expect("reverse");
        prop_assert_eq!(a, b);
    }
}

// SPDX-License-Identifier: Apache-2.0

use crate::dataset::Attributes;
use seastore_model::FeatureType;
use tracing::warn;

const CONVENTION_KEYS: [&str; 3] = ["Conventions", "Convention", "conventions"];

/// Legacy spellings, tried in order when the dataset does not declare CF-1.6 or later.
const LEGACY_FEATURE_TYPE_KEYS: [&str; 6] = [
    "cdm_data_type",
    "thredds_data_type",
    "CF%3afeatureType",
    "CF_featureType",
    "CF:featureType",
    "featureType",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub feature_type: FeatureType,
    /// Attribute the value came from; `None` when the default was applied.
    pub source: Option<String>,
}

#[must_use]
pub fn conventions(globals: &Attributes) -> String {
    CONVENTION_KEYS
        .iter()
        .find_map(|k| globals.text(k))
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// True when a `CF-<major>.<minor>` token at or after 1.6 is listed, the
/// version that made `featureType` authoritative.
#[must_use]
pub fn declares_feature_type_conventions(conventions: &str) -> bool {
    conventions
        .split(|c: char| c == ',' || c == ' ' || c == ';')
        .filter_map(|token| token.trim().strip_prefix("cf-"))
        .filter_map(|version| {
            let (major, minor) = version.split_once('.').unwrap_or((version, "0"));
            Some((major.parse::<u32>().ok()?, minor.parse::<u32>().ok()?))
        })
        .any(|(major, minor)| major > 1 || (major == 1 && minor >= 6))
}

/// Always yields a feature type; unknown or absent metadata falls back to trajectory.
#[must_use]
pub fn classify(globals: &Attributes) -> Classification {
    let declared = if declares_feature_type_conventions(&conventions(globals)) {
        globals
            .text("featureType")
            .map(|v| ("featureType", v))
            .or_else(|| legacy_feature_type(globals))
    } else {
        legacy_feature_type(globals)
    };

    match declared {
        Some((key, raw)) => match FeatureType::parse(raw) {
            Some(feature_type) => Classification {
                feature_type,
                source: Some(key.to_string()),
            },
            None => {
                warn!(attribute = key, value = raw, "unsupported featureType, assuming trajectory");
                fallback()
            }
        },
        None => {
            warn!("dataset declares no featureType, assuming trajectory");
            fallback()
        }
    }
}

fn legacy_feature_type(globals: &Attributes) -> Option<(&'static str, &str)> {
    LEGACY_FEATURE_TYPE_KEYS
        .iter()
        .find_map(|k| globals.text(k).map(|v| (*k, v)))
}

fn fallback() -> Classification {
    Classification {
        feature_type: FeatureType::Trajectory,
        source: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        let mut a = Attributes::new();
        for (k, v) in pairs {
            a.insert(*k, *v);
        }
        a
    }

    #[test]
    fn cf16_uses_feature_type() {
        let c = classify(&attrs(&[
            ("Conventions", "CF-1.6"),
            ("featureType", "timeSeries"),
            ("cdm_data_type", "Trajectory"),
        ]));
        assert_eq!(c.feature_type, FeatureType::TimeSeries);
        assert_eq!(c.source.as_deref(), Some("featureType"));
    }

    #[test]
    fn legacy_keys_are_prioritized() {
        let c = classify(&attrs(&[
            ("CF:featureType", "trajectory"),
            ("thredds_data_type", "Station"),
        ]));
        assert_eq!(c.feature_type, FeatureType::TimeSeriesProfile);
        assert_eq!(c.source.as_deref(), Some("thredds_data_type"));
    }

    #[test]
    fn missing_or_unknown_defaults_to_trajectory() {
        assert_eq!(classify(&Attributes::new()).feature_type, FeatureType::Trajectory);
        let c = classify(&attrs(&[("cdm_data_type", "Grid")]));
        assert_eq!(c.feature_type, FeatureType::Trajectory);
        assert!(c.source.is_none());
    }

    #[test]
    fn later_cf_versions_trust_feature_type() {
        for conventions in ["CF-1.7", "CF-1.8, ACDD-1.3", "CF-1.10", "CF-2.0"] {
            let c = classify(&attrs(&[
                ("Conventions", conventions),
                ("featureType", "timeSeries"),
                ("cdm_data_type", "Trajectory"),
            ]));
            assert_eq!(c.feature_type, FeatureType::TimeSeries, "{conventions}");
            assert_eq!(c.source.as_deref(), Some("featureType"));
        }
    }

    #[test]
    fn older_cf_versions_keep_legacy_order() {
        assert!(!declares_feature_type_conventions("cf-1.4"));
        assert!(!declares_feature_type_conventions("coards"));
        let c = classify(&attrs(&[
            ("Conventions", "CF-1.4"),
            ("featureType", "timeSeries"),
            ("cdm_data_type", "Trajectory"),
        ]));
        assert_eq!(c.feature_type, FeatureType::Trajectory);
        assert_eq!(c.source.as_deref(), Some("cdm_data_type"));
    }

    #[test]
    fn cf16_without_feature_type_tries_legacy_keys() {
        let c = classify(&attrs(&[("Conventions", "CF-1.6"), ("CF_featureType", "timeSeriesProfile")]));
        assert_eq!(c.feature_type, FeatureType::TimeSeriesProfile);
    }
}

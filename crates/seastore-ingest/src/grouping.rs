// SPDX-License-Identifier: Apache-2.0

use crate::{IngestError, IngestErrorCode};
use seastore_core::canonical;
use seastore_model::CoordinateMap;
use std::collections::BTreeMap;

/// Variables sampled on one identical set of coordinate axes.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadGroup {
    pub signature: String,
    /// Short stable identifier for logs.
    pub digest: String,
    pub coordinates: CoordinateMap,
    pub variables: Vec<String>,
}

/// Canonical JSON of the four axis sources; equal maps give equal strings.
pub fn signature(coordinates: &CoordinateMap) -> Result<String, IngestError> {
    canonical::stable_json_string(coordinates).map_err(|e| {
        IngestError::new(
            IngestErrorCode::Validation,
            format!("coordinate signature: {e}"),
        )
    })
}

/// Groups in signature order, variables in request order within each group.
pub fn group_by_coordinates(
    resolved: &[(String, CoordinateMap)],
) -> Result<Vec<LoadGroup>, IngestError> {
    let mut groups: BTreeMap<String, LoadGroup> = BTreeMap::new();
    for (name, coordinates) in resolved {
        let key = signature(coordinates)?;
        if let Some(group) = groups.get_mut(&key) {
            group.variables.push(name.clone());
            continue;
        }
        let mut digest = canonical::stable_json_hash_hex(coordinates).map_err(|e| {
            IngestError::new(
                IngestErrorCode::Validation,
                format!("coordinate digest: {e}"),
            )
        })?;
        digest.truncate(12);
        groups.insert(
            key.clone(),
            LoadGroup {
                signature: key,
                digest,
                coordinates: coordinates.clone(),
                variables: vec![name.clone()],
            },
        );
    }
    Ok(groups.into_values().collect())
}

// SPDX-License-Identifier: Apache-2.0

use crate::config::IngestConfig;
use crate::dataset::DatasetOpener;
use crate::orchestrator::load_dataset;
use crate::{IngestError, LoadRequest, LoadResult};
use seastore_model::{PlatformDescriptor, PlatformSpec};
use seastore_store::MeasurementStore;
use tracing::{info, warn};

/// Result of loading one file of a platform.
#[derive(Debug, Clone, PartialEq)]
pub struct FileOutcome {
    pub file: String,
    pub url: String,
    pub outcome: Result<LoadResult, IngestError>,
}

impl FileOutcome {
    /// Loaded, or legitimately empty for the requested window.
    #[must_use]
    pub fn is_acceptable(&self) -> bool {
        match &self.outcome {
            Ok(_) => true,
            Err(e) => e.code.is_empty_source(),
        }
    }
}

/// Loads every file the platform publishes, one activity per file.
///
/// Failures are collected per file; one bad file does not stop the rest.
pub fn load_platform(
    opener: &dyn DatasetOpener,
    store: &mut dyn MeasurementStore,
    descriptor: &PlatformDescriptor,
    config: &IngestConfig,
) -> Vec<FileOutcome> {
    let platform = PlatformSpec {
        name: descriptor.name.clone(),
        platform_type: descriptor.platform_type.clone(),
    };
    let mut outcomes = Vec::with_capacity(descriptor.files.len());
    for file in &descriptor.files {
        let url = descriptor.file_url(file);
        let request = LoadRequest {
            url: url.clone(),
            activity_name: descriptor.activity_name(file),
            platform: platform.clone(),
            parameters: descriptor.parameters.clone(),
            stride: descriptor.stride.max(1),
            start: descriptor.start,
            end: descriptor.end,
            store: store.alias().clone(),
            ..LoadRequest::default()
        };
        let outcome = load_dataset(opener, store, &request, config);
        match &outcome {
            Ok(result) => info!(
                platform = %descriptor.name,
                file = %file,
                records = result.records_loaded,
                "file loaded"
            ),
            Err(e) if e.code.is_empty_source() => {
                info!(platform = %descriptor.name, file = %file, reason = %e.message, "no data in window")
            }
            Err(e) => warn!(platform = %descriptor.name, file = %file, error = %e, "file failed"),
        }
        outcomes.push(FileOutcome {
            file: file.clone(),
            url,
            outcome,
        });
    }
    outcomes
}

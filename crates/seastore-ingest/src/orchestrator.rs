// SPDX-License-Identifier: Apache-2.0

use crate::classify::classify;
use crate::config::IngestConfig;
use crate::coordinate_loader::{load_coordinates, CoordinateContext};
use crate::coords::resolve;
use crate::dataset::{DatasetHandle, DatasetOpener};
use crate::grouping::{group_by_coordinates, LoadGroup};
use crate::logging::{IngestLog, IngestStage};
use crate::parameters::{spec_for, ParameterCache};
use crate::time_window::{TimeAxis, TimeWindow};
use crate::track::{build_track, depth_time_series};
use crate::value_loader::{load_values, ValueContext};
use crate::{IngestError, IngestErrorCode, LoadRequest, LoadResult, SkippedVariable};
use chrono::{DateTime, Duration, Utc};
use seastore_model::{
    ActivityFinalization, ActivityId, CoordinateMap, FeatureType, NewActivity, Track,
};
use seastore_store::{MeasurementStore, StoreError, StoreRegistry};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::Range;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    Unclassified,
    Classified,
    CoordinatesResolved,
    Grouped,
    PerGroupLoading,
    Finalized,
    Failed,
}

impl LoadState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unclassified => "unclassified",
            Self::Classified => "classified",
            Self::CoordinatesResolved => "coordinates_resolved",
            Self::Grouped => "grouped",
            Self::PerGroupLoading => "per_group_loading",
            Self::Finalized => "finalized",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finalized | Self::Failed)
    }
}

/// What the aggregation step needs to know about a finished load.
#[derive(Debug, Clone)]
pub struct AggregateInput<'a> {
    pub activity: ActivityId,
    pub feature_type: FeatureType,
    pub url: &'a str,
    pub variables: &'a [String],
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub stride: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSummary {
    pub track: Option<Track>,
    pub parameter_counts: BTreeMap<String, i64>,
    pub measured_parameters: i64,
    pub depth_range: Option<(f64, f64)>,
}

/// Post-load bookkeeping over the rows an activity owns.
pub trait ActivityAggregator {
    fn finalize(
        &self,
        store: &mut dyn MeasurementStore,
        input: &AggregateInput<'_>,
    ) -> Result<AggregateSummary, StoreError>;
}

/// Simplified track, depth-time series, parameter statistics and the activity comment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefaultAggregator {
    pub track_tolerance: f64,
    pub depth_time_tolerance: f64,
}

impl DefaultAggregator {
    #[must_use]
    pub fn from_config(config: &IngestConfig) -> Self {
        Self {
            track_tolerance: config.track_tolerance,
            depth_time_tolerance: config.depth_time_tolerance,
        }
    }
}

fn load_comment(input: &AggregateInput<'_>, now: DateTime<Utc>) -> String {
    let fmt = |t: DateTime<Utc>| t.format("%Y-%m-%d %H:%M:%S").to_string();
    let mut comment = format!(
        "Loaded variables {} from {}",
        input.variables.join(", "),
        input.url
    );
    if let (Some(start), Some(end)) = (input.start, input.end) {
        comment.push_str(&format!(" between {} and {}", fmt(start), fmt(end)));
    }
    comment.push_str(&format!(
        " with a stride of {} on {}Z",
        input.stride,
        fmt(now)
    ));
    comment
}

impl ActivityAggregator for DefaultAggregator {
    fn finalize(
        &self,
        store: &mut dyn MeasurementStore,
        input: &AggregateInput<'_>,
    ) -> Result<AggregateSummary, StoreError> {
        let points = store.measurement_track(input.activity)?;
        let track = build_track(&points, self.track_tolerance);
        for series in depth_time_series(
            input.activity,
            &points,
            input.feature_type.is_fixed_position(),
            self.depth_time_tolerance,
        ) {
            store.insert_simple_depth_time(&series)?;
        }
        let stats = store.update_activity_parameter_stats(input.activity)?;
        let parameter_counts = store.parameter_counts(input.activity)?;
        let measured_parameters = store.count_measured_parameters(input.activity)?;
        let depth_range = store.depth_range(input.activity)?;
        let last_time = points.iter().map(|p| p.time).max();
        let now = Utc::now();
        store.finalize_activity(
            input.activity,
            &ActivityFinalization {
                end: last_time.or(input.end),
                num_measured_parameters: measured_parameters,
                num_parameters: stats.len() as i64,
                comment: load_comment(input, now),
                loaded_at: now,
                min_depth: depth_range.map(|(lo, _)| lo),
                max_depth: depth_range.map(|(_, hi)| hi),
                track: track.clone(),
            },
        )?;
        Ok(AggregateSummary {
            track,
            parameter_counts,
            measured_parameters,
            depth_range,
        })
    }
}

/// Name stored for the activity. A fully bounded window is appended, ahead of
/// any trailing `(stride=N)` suffix.
#[must_use]
pub fn activity_display_name(
    name: &str,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> String {
    let (Some(start), Some(_)) = (start, end) else {
        return name.to_string();
    };
    let stamp = format!("starting at {}", start.format("%Y-%m-%d %H:%M:%S"));
    match name.rfind(" (stride=") {
        Some(at) if name.ends_with(')') => format!("{} {stamp}{}", &name[..at], &name[at..]),
        _ => format!("{name} {stamp}"),
    }
}

/// State, log and skip list of one load in progress.
struct Run {
    state: LoadState,
    log: IngestLog,
    skipped: Vec<SkippedVariable>,
    activity: Option<ActivityId>,
}

impl Run {
    fn new() -> Self {
        Self {
            state: LoadState::Unclassified,
            log: IngestLog::default(),
            skipped: Vec::new(),
            activity: None,
        }
    }

    fn advance(&mut self, stage: IngestStage, next: LoadState) {
        debug!(from = self.state.as_str(), to = next.as_str(), "load state");
        self.log.emit_with(
            stage,
            "state.transition",
            [
                ("from", self.state.as_str().to_string()),
                ("to", next.as_str().to_string()),
            ],
        );
        self.state = next;
    }

    fn skip(&mut self, stage: IngestStage, variable: &str, err: &IngestError) {
        warn!(variable, code = err.code.as_str(), reason = %err.message, "variable skipped");
        self.log.emit_with(
            stage,
            "variable.skipped",
            [
                ("variable", variable.to_string()),
                ("code", err.code.as_str().to_string()),
            ],
        );
        self.skipped.push(SkippedVariable {
            variable: variable.to_string(),
            code: err.code,
            reason: err.message.clone(),
        });
    }

    fn fail(&mut self, stage: IngestStage, err: IngestError) -> IngestError {
        self.advance(stage, LoadState::Failed);
        warn!(code = err.code.as_str(), error = %err.message, "load failed");
        let mut err = err.with_skipped(std::mem::take(&mut self.skipped));
        if let Some(activity) = self.activity {
            err = err.with_activity(activity);
        }
        err
    }
}

/// A group whose time axis yielded a non-empty slice.
struct PlannedGroup {
    group: LoadGroup,
    time: TimeAxis,
    range: Range<usize>,
}

fn time_span(planned: &[PlannedGroup]) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let times = planned
        .iter()
        .flat_map(|p| p.range.clone().filter_map(|i| p.time.datetime(i)));
    let (mut lo, mut hi) = (None, None);
    for t in times {
        lo = Some(lo.map_or(t, |l: DateTime<Utc>| l.min(t)));
        hi = Some(hi.map_or(t, |h: DateTime<Utc>| h.max(t)));
    }
    (lo, hi)
}

/// Loads with the default aggregation step.
pub fn load_dataset(
    opener: &dyn DatasetOpener,
    store: &mut dyn MeasurementStore,
    request: &LoadRequest,
    config: &IngestConfig,
) -> Result<LoadResult, IngestError> {
    load_dataset_with(
        opener,
        store,
        request,
        config,
        &DefaultAggregator::from_config(config),
    )
}

/// Loads into the store registered under `request.store`.
pub fn load_from_registry(
    opener: &dyn DatasetOpener,
    registry: &mut StoreRegistry,
    request: &LoadRequest,
    config: &IngestConfig,
) -> Result<LoadResult, IngestError> {
    let store = registry.get_mut(&request.store)?;
    load_dataset(opener, store, request, config)
}

pub fn load_dataset_with(
    opener: &dyn DatasetOpener,
    store: &mut dyn MeasurementStore,
    request: &LoadRequest,
    config: &IngestConfig,
    aggregator: &dyn ActivityAggregator,
) -> Result<LoadResult, IngestError> {
    let mut run = Run::new();
    request.validate()?;
    info!(url = %request.url, activity = %request.activity_name, store = %request.store.as_str(), "load start");
    run.log.emit_with(
        IngestStage::Prepare,
        "load.start",
        [
            ("url", request.url.clone()),
            ("store", request.store.as_str().to_string()),
        ],
    );
    let handle = opener
        .open(&request.url)
        .map_err(|e| run.fail(IngestStage::Prepare, e.into()))?;
    let handle = handle.as_ref();

    let classification = classify(handle.global_attributes());
    let feature_type = classification.feature_type;
    run.log.emit_with(
        IngestStage::Classify,
        "feature_type",
        [
            ("feature_type", feature_type.as_str().to_string()),
            (
                "source",
                classification.source.unwrap_or_else(|| "default".to_string()),
            ),
        ],
    );
    run.advance(IngestStage::Classify, LoadState::Classified);

    let mut resolved: Vec<(String, CoordinateMap)> = Vec::new();
    for name in &request.parameters {
        match resolve(handle, name, &request.coordinate_overrides) {
            Ok(map) => resolved.push((name.clone(), map)),
            Err(e) if e.code.is_per_variable() => run.skip(IngestStage::Resolve, name, &e),
            Err(e) => return Err(run.fail(IngestStage::Resolve, e)),
        }
    }
    if resolved.is_empty() {
        let err = IngestError::new(
            IngestErrorCode::NoValidData,
            format!("none of the requested variables resolved in {}", request.url),
        );
        return Err(run.fail(IngestStage::Resolve, err));
    }
    run.advance(IngestStage::Resolve, LoadState::CoordinatesResolved);

    let groups = group_by_coordinates(&resolved).map_err(|e| run.fail(IngestStage::Group, e))?;
    run.log.emit_with(
        IngestStage::Group,
        "groups",
        [
            ("groups", groups.len().to_string()),
            ("variables", resolved.len().to_string()),
        ],
    );
    run.advance(IngestStage::Group, LoadState::Grouped);

    let platform = store
        .get_or_create_platform(&request.platform)
        .map_err(|e| run.fail(IngestStage::Group, e.into()))?;
    let activity_name = activity_display_name(&request.activity_name, request.start, request.end);
    let existing = store
        .find_activity(&activity_name, platform.id)
        .map_err(|e| run.fail(IngestStage::Group, e.into()))?;
    let mut append_since = request.append_since;
    match &existing {
        Some(activity) if request.is_append() => {
            if append_since.is_none() {
                let last = store
                    .max_timevalue(activity.id)
                    .map_err(|e| run.fail(IngestStage::Group, e.into()))?;
                append_since = last.map(|t| t - request.backfill.unwrap_or_else(Duration::zero));
            }
            info!(activity = %activity.id, since = ?append_since, "appending to existing activity");
        }
        Some(activity) => {
            let err = IngestError::new(
                IngestErrorCode::DuplicateData,
                format!(
                    "activity `{activity_name}` already exists for platform `{}`",
                    platform.name
                ),
            )
            .with_activity(activity.id);
            return Err(run.fail(IngestStage::Group, err));
        }
        None => {}
    }
    let window = TimeWindow {
        start: request.start,
        end: request.end,
        append_since,
    };
    window
        .validate()
        .map_err(|e| run.fail(IngestStage::Group, e))?;

    let mut axes: BTreeMap<String, TimeAxis> = BTreeMap::new();
    let mut planned = Vec::with_capacity(groups.len());
    let mut window_errors = Vec::new();
    for group in groups {
        let time_name = group.coordinates.time.clone();
        let time = match axes.get(&time_name) {
            Some(t) => t.clone(),
            None => match TimeAxis::load(handle, &time_name) {
                Ok(t) => {
                    axes.insert(time_name.clone(), t.clone());
                    t
                }
                Err(e) if e.code == IngestErrorCode::DatasetUnavailable => {
                    return Err(run.fail(IngestStage::Group, e))
                }
                Err(e) => {
                    for v in &group.variables {
                        run.skip(IngestStage::Group, v, &e);
                    }
                    continue;
                }
            },
        };
        match time.index_range(&window) {
            Ok(range) => {
                debug!(group = %group.digest, time = %time_name, start = range.start, end = range.end, "group window");
                run.log.emit_with(
                    IngestStage::Group,
                    "group.window",
                    [
                        ("group", group.digest.clone()),
                        ("variables", group.variables.join(",")),
                        ("rows", range.len().to_string()),
                    ],
                );
                planned.push(PlannedGroup { group, time, range });
            }
            Err(e) => {
                for v in &group.variables {
                    run.skip(IngestStage::Group, v, &e);
                }
                window_errors.push(e);
            }
        }
    }
    if planned.is_empty() {
        let err = window_errors
            .into_iter()
            .find(|e| e.code == IngestErrorCode::NoValidData)
            .or_else(|| {
                run.skipped.first().map(|s| {
                    IngestError::new(s.code, format!("no group could be loaded: {}", s.reason))
                })
            })
            .unwrap_or_else(|| {
                IngestError::new(IngestErrorCode::NoValidData, "no group could be loaded")
            });
        return Err(run.fail(IngestStage::Group, err));
    }

    let (first, last) = time_span(&planned);
    let (start, end) = (request.start.or(first), request.end.or(last));
    let activity = match &existing {
        Some(activity) => activity.id,
        None => {
            let created = store.create_activity(&NewActivity {
                name: activity_name.clone(),
                platform: platform.id,
                feature_type,
                start,
                end,
                source_url: request.url.clone(),
                comment: String::new(),
            });
            match created {
                Ok(id) => id,
                Err(e) if e.is_conflict() => {
                    let err = IngestError::new(
                        IngestErrorCode::DuplicateData,
                        format!("activity `{activity_name}` was created concurrently: {e}"),
                    );
                    return Err(run.fail(IngestStage::Group, err));
                }
                Err(e) => return Err(run.fail(IngestStage::Group, e.into())),
            }
        }
    };
    run.activity = Some(activity);
    run.log.emit_with(
        IngestStage::Load,
        "activity",
        [
            ("activity", activity.to_string()),
            ("name", activity_name.clone()),
        ],
    );
    run.advance(IngestStage::Load, LoadState::PerGroupLoading);

    let mut cache = ParameterCache::new();
    for p in &planned {
        for name in &p.group.variables {
            let Some(variable) = handle.variable(name) else {
                continue;
            };
            cache
                .get_or_register(store, &spec_for(variable, &activity_name))
                .map_err(|e| run.fail(IngestStage::Load, e.into()))?;
        }
    }

    let coord_ctx = CoordinateContext {
        handle,
        activity,
        feature_type,
        bounds: &config.bounds,
    };
    let value_ctx = ValueContext {
        handle,
        activity,
        progress_every: config.progress_every,
    };
    let mut records_loaded = 0usize;
    let mut instant_points_created = 0usize;
    let mut measurements_created = 0usize;
    let mut value_decode_errors = 0usize;
    let mut loaded_variables = Vec::new();
    for p in &planned {
        let coords = match load_coordinates(
            &coord_ctx,
            store,
            &p.group,
            &p.time,
            p.range.clone(),
            request.stride,
        ) {
            Ok(c) => c,
            Err(e) if e.code == IngestErrorCode::MissingCoordinates => {
                for v in &p.group.variables {
                    run.skip(IngestStage::Load, v, &e);
                }
                continue;
            }
            Err(e) => return Err(run.fail(IngestStage::Load, e)),
        };
        instant_points_created += coords.instant_points_created;
        measurements_created += coords.measurements_created;
        for name in &p.group.variables {
            let Some(parameter) = cache.get(name) else {
                continue;
            };
            match load_values(
                &value_ctx,
                store,
                parameter,
                &coords,
                p.range.clone(),
                request.stride,
            ) {
                Ok(values) => {
                    records_loaded += values.loaded;
                    value_decode_errors += values.decode_errors;
                    run.log.emit_with(
                        IngestStage::Load,
                        "variable.loaded",
                        [
                            ("variable", name.clone()),
                            ("loaded", values.loaded.to_string()),
                            ("absent", values.absent.to_string()),
                        ],
                    );
                    loaded_variables.push(name.clone());
                }
                Err(e) if e.code.is_per_variable() => run.skip(IngestStage::Load, name, &e),
                Err(e) => return Err(run.fail(IngestStage::Load, e)),
            }
        }
    }

    if records_loaded == 0 {
        let err = IngestError::new(
            IngestErrorCode::NoValidData,
            format!("no values stored from {}", request.url),
        );
        return Err(run.fail(IngestStage::Finalize, err));
    }

    let input = AggregateInput {
        activity,
        feature_type,
        url: &request.url,
        variables: &loaded_variables,
        start: request.start,
        end: request.end,
        stride: request.stride,
    };
    let summary = aggregator
        .finalize(store, &input)
        .map_err(|e| run.fail(IngestStage::Finalize, e.into()))?;
    run.log.emit_with(
        IngestStage::Finalize,
        "load.complete",
        [
            ("records", records_loaded.to_string()),
            ("skipped", run.skipped.len().to_string()),
        ],
    );
    run.advance(IngestStage::Finalize, LoadState::Finalized);
    info!(
        activity = %activity,
        records = records_loaded,
        skipped = run.skipped.len(),
        "load complete"
    );

    Ok(LoadResult {
        activity,
        activity_name,
        feature_type,
        state: run.state,
        records_loaded,
        instant_points_created,
        measurements_created,
        parameter_counts: summary.parameter_counts,
        track: summary.track,
        skipped: run.skipped,
        value_decode_errors,
        events: run.log.into_events(),
    })
}

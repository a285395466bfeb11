// SPDX-License-Identifier: Apache-2.0

use crate::{MeasurementStore, StoreError, StoreErrorCode};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use seastore_model::{
    Activity, ActivityFinalization, ActivityId, FeatureType, InstantPointId, MeasuredValue,
    MeasurementId, NewActivity, NewMeasuredParameter, NewMeasurement, NewNominalLocation,
    NominalLocationId, Parameter, ParameterId, ParameterSpec, ParameterStats, Platform,
    PlatformId, PlatformSpec, SimpleDepthTime, StoreAlias, Track, TrackPoint,
};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

pub const SQLITE_SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS store_meta (
      k TEXT PRIMARY KEY,
      v TEXT NOT NULL
    ) WITHOUT ROWID;
    CREATE TABLE IF NOT EXISTS platform (
      id INTEGER PRIMARY KEY,
      name TEXT NOT NULL UNIQUE,
      platform_type TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS activity (
      id INTEGER PRIMARY KEY,
      name TEXT NOT NULL,
      platform_id INTEGER NOT NULL REFERENCES platform(id),
      feature_type TEXT NOT NULL,
      startdate TEXT,
      enddate TEXT,
      source_url TEXT NOT NULL,
      comment TEXT NOT NULL,
      num_measuredparameters INTEGER NOT NULL DEFAULT 0,
      num_parameters INTEGER NOT NULL DEFAULT 0,
      loaded_date TEXT,
      mindepth REAL,
      maxdepth REAL,
      maptrack TEXT,
      maptrack_wkt TEXT,
      UNIQUE (name, platform_id)
    );
    CREATE TABLE IF NOT EXISTS instantpoint (
      id INTEGER PRIMARY KEY,
      activity_id INTEGER NOT NULL REFERENCES activity(id),
      timevalue INTEGER NOT NULL,
      UNIQUE (activity_id, timevalue)
    );
    CREATE TABLE IF NOT EXISTS nominallocation (
      id INTEGER PRIMARY KEY,
      activity_id INTEGER NOT NULL REFERENCES activity(id),
      depth REAL NOT NULL,
      latitude REAL NOT NULL,
      longitude REAL NOT NULL,
      UNIQUE (activity_id, depth, latitude, longitude)
    );
    CREATE TABLE IF NOT EXISTS measurement (
      id INTEGER PRIMARY KEY,
      instantpoint_id INTEGER NOT NULL REFERENCES instantpoint(id),
      nominallocation_id INTEGER REFERENCES nominallocation(id),
      depth REAL NOT NULL,
      latitude REAL NOT NULL,
      longitude REAL NOT NULL,
      UNIQUE (instantpoint_id, depth, latitude, longitude)
    );
    CREATE TABLE IF NOT EXISTS parameter (
      id INTEGER PRIMARY KEY,
      name TEXT NOT NULL UNIQUE,
      units TEXT,
      standard_name TEXT,
      long_name TEXT,
      origin TEXT
    );
    CREATE TABLE IF NOT EXISTS measuredparameter (
      id INTEGER PRIMARY KEY,
      measurement_id INTEGER NOT NULL REFERENCES measurement(id),
      parameter_id INTEGER NOT NULL REFERENCES parameter(id),
      datavalue REAL,
      dataarray TEXT,
      UNIQUE (measurement_id, parameter_id)
    );
    CREATE TABLE IF NOT EXISTS activityparameter (
      activity_id INTEGER NOT NULL REFERENCES activity(id),
      parameter_id INTEGER NOT NULL REFERENCES parameter(id),
      number INTEGER NOT NULL,
      min REAL,
      max REAL,
      mean REAL,
      PRIMARY KEY (activity_id, parameter_id)
    ) WITHOUT ROWID;
    CREATE TABLE IF NOT EXISTS simpledepthtime (
      id INTEGER PRIMARY KEY,
      activity_id INTEGER NOT NULL REFERENCES activity(id),
      nominallocation_id INTEGER REFERENCES nominallocation(id),
      points TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_measurement_instantpoint ON measurement(instantpoint_id);
    CREATE INDEX IF NOT EXISTS idx_measuredparameter_parameter ON measuredparameter(parameter_id);
";

const ACTIVITY_COLUMNS: &str = "id, name, platform_id, feature_type, startdate, enddate, source_url, \
     comment, num_measuredparameters, loaded_date, mindepth, maxdepth, maptrack";

const ACTIVITY_MEASURED_PARAMETERS: &str = "
    FROM measuredparameter mp
    JOIN measurement m ON m.id = mp.measurement_id
    JOIN instantpoint ip ON ip.id = m.instantpoint_id
    WHERE ip.activity_id = ?1";

/// SQLite-backed measurement store. One connection, used from one load at a time.
pub struct SqliteStore {
    alias: StoreAlias,
    conn: Connection,
}

impl SqliteStore {
    pub fn open(alias: StoreAlias, path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| {
            StoreError::new(
                StoreErrorCode::Io,
                format!("failed to open {}: {e}", path.display()),
            )
        })?;
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA temp_store=MEMORY;
            PRAGMA cache_size=-32000;
            ",
        )?;
        Self::init(alias, conn)
    }

    pub fn open_in_memory(alias: StoreAlias) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init(alias, conn)
    }

    fn init(alias: StoreAlias, conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        let existing: Option<String> = conn
            .query_row(
                "SELECT v FROM store_meta WHERE k = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        match existing {
            None => {
                conn.execute(
                    "INSERT INTO store_meta (k, v) VALUES ('schema_version', ?1)",
                    params![SQLITE_SCHEMA_VERSION.to_string()],
                )?;
            }
            Some(v) if v == SQLITE_SCHEMA_VERSION.to_string() => {}
            Some(v) => {
                return Err(StoreError::new(
                    StoreErrorCode::Validation,
                    format!(
                        "store `{alias}` has schema version {v}, expected {SQLITE_SCHEMA_VERSION}"
                    ),
                ))
            }
        }
        debug!(alias = %alias, "measurement store ready");
        Ok(Self { alias, conn })
    }

    fn parameter_by_name(&self, name: &str) -> Result<Option<Parameter>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, units, standard_name, long_name FROM parameter WHERE name = ?1",
                params![name],
                |row| {
                    Ok(Parameter {
                        id: ParameterId(row.get(0)?),
                        name: row.get(1)?,
                        units: row.get(2)?,
                        standard_name: row.get(3)?,
                        long_name: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    fn count(&self, sql: &str, activity: ActivityId) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .query_row(sql, params![activity.get()], |row| row.get(0))?)
    }
}

struct ActivityRow {
    id: i64,
    name: String,
    platform: i64,
    feature_type: String,
    start: Option<String>,
    end: Option<String>,
    source_url: String,
    comment: String,
    num_measured_parameters: i64,
    loaded_at: Option<String>,
    min_depth: Option<f64>,
    max_depth: Option<f64>,
    track: Option<String>,
}

impl ActivityRow {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            platform: row.get(2)?,
            feature_type: row.get(3)?,
            start: row.get(4)?,
            end: row.get(5)?,
            source_url: row.get(6)?,
            comment: row.get(7)?,
            num_measured_parameters: row.get(8)?,
            loaded_at: row.get(9)?,
            min_depth: row.get(10)?,
            max_depth: row.get(11)?,
            track: row.get(12)?,
        })
    }

    fn into_activity(self) -> Result<Activity, StoreError> {
        let feature_type = FeatureType::parse(&self.feature_type).ok_or_else(|| {
            StoreError::new(
                StoreErrorCode::Internal,
                format!("stored feature type `{}` is unknown", self.feature_type),
            )
        })?;
        let track = match self.track {
            Some(raw) => Some(serde_json::from_str::<Track>(&raw).map_err(|e| {
                StoreError::new(StoreErrorCode::Internal, format!("stored track: {e}"))
            })?),
            None => None,
        };
        Ok(Activity {
            id: ActivityId(self.id),
            name: self.name,
            platform: PlatformId(self.platform),
            feature_type,
            start: parse_rfc3339(self.start.as_deref())?,
            end: parse_rfc3339(self.end.as_deref())?,
            source_url: self.source_url,
            comment: self.comment,
            num_measured_parameters: self.num_measured_parameters,
            loaded_at: parse_rfc3339(self.loaded_at.as_deref())?,
            min_depth: self.min_depth,
            max_depth: self.max_depth,
            track,
        })
    }
}

fn parse_rfc3339(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, StoreError> {
    raw.map(|s| {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StoreError::new(StoreErrorCode::Internal, format!("stored date `{s}`: {e}")))
    })
    .transpose()
}

fn to_micros(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

fn from_micros(micros: i64) -> Result<DateTime<Utc>, StoreError> {
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    Utc.timestamp_opt(secs, nanos).single().ok_or_else(|| {
        StoreError::new(
            StoreErrorCode::Internal,
            format!("stored time value {micros} out of range"),
        )
    })
}

fn value_columns(value: &MeasuredValue) -> Result<(Option<f64>, Option<String>), StoreError> {
    match value {
        MeasuredValue::Scalar(v) => Ok((Some(*v), None)),
        MeasuredValue::Array(items) => {
            let text = serde_json::to_string(items).map_err(|e| {
                StoreError::new(StoreErrorCode::Validation, format!("array value: {e}"))
            })?;
            Ok((None, Some(text)))
        }
    }
}

impl MeasurementStore for SqliteStore {
    fn alias(&self) -> &StoreAlias {
        &self.alias
    }

    fn get_or_create_platform(&mut self, spec: &PlatformSpec) -> Result<Platform, StoreError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO platform (name, platform_type) VALUES (?1, ?2)",
            params![spec.name, spec.platform_type],
        )?;
        let platform = self.conn.query_row(
            "SELECT id, name, platform_type FROM platform WHERE name = ?1",
            params![spec.name],
            |row| {
                Ok(Platform {
                    id: PlatformId(row.get(0)?),
                    name: row.get(1)?,
                    platform_type: row.get(2)?,
                })
            },
        )?;
        Ok(platform)
    }

    fn register_parameter(&mut self, spec: &ParameterSpec) -> Result<Parameter, StoreError> {
        if spec.name.trim().is_empty() {
            return Err(StoreError::new(
                StoreErrorCode::Validation,
                "parameter name must not be empty",
            ));
        }
        self.conn.execute(
            "INSERT OR IGNORE INTO parameter (name, units, standard_name, long_name, origin)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                spec.name,
                spec.units,
                spec.standard_name,
                spec.long_name,
                spec.origin
            ],
        )?;
        self.parameter_by_name(&spec.name)?.ok_or_else(|| {
            StoreError::new(
                StoreErrorCode::Internal,
                format!("parameter `{}` vanished after insert", spec.name),
            )
        })
    }

    fn find_parameter(&self, name: &str) -> Result<Option<Parameter>, StoreError> {
        self.parameter_by_name(name)
    }

    fn create_activity(&mut self, new: &NewActivity) -> Result<ActivityId, StoreError> {
        self.conn
            .execute(
                "INSERT INTO activity (name, platform_id, feature_type, startdate, enddate, source_url, comment)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    new.name,
                    new.platform.get(),
                    new.feature_type.as_str(),
                    new.start.map(|d| d.to_rfc3339()),
                    new.end.map(|d| d.to_rfc3339()),
                    new.source_url,
                    new.comment
                ],
            )
            .map_err(|e| {
                let err = StoreError::from(e);
                if err.is_conflict() {
                    StoreError::new(
                        StoreErrorCode::Conflict,
                        format!("activity `{}` already exists for platform {}", new.name, new.platform),
                    )
                } else {
                    err
                }
            })?;
        Ok(ActivityId(self.conn.last_insert_rowid()))
    }

    fn find_activity(
        &self,
        name: &str,
        platform: PlatformId,
    ) -> Result<Option<Activity>, StoreError> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {ACTIVITY_COLUMNS} FROM activity WHERE name = ?1 AND platform_id = ?2"
                ),
                params![name, platform.get()],
                ActivityRow::read,
            )
            .optional()?;
        row.map(ActivityRow::into_activity).transpose()
    }

    fn activity(&self, id: ActivityId) -> Result<Activity, StoreError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {ACTIVITY_COLUMNS} FROM activity WHERE id = ?1"),
                params![id.get()],
                ActivityRow::read,
            )
            .optional()?
            .ok_or_else(|| {
                StoreError::new(StoreErrorCode::NotFound, format!("activity {id} not found"))
            })?;
        row.into_activity()
    }

    fn finalize_activity(
        &mut self,
        id: ActivityId,
        finalization: &ActivityFinalization,
    ) -> Result<(), StoreError> {
        let track_json = finalization
            .track
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::new(StoreErrorCode::Validation, format!("track: {e}")))?;
        let changed = self.conn.execute(
            "UPDATE activity SET
               enddate = COALESCE(?2, enddate),
               num_measuredparameters = ?3,
               num_parameters = ?4,
               comment = ?5,
               loaded_date = ?6,
               mindepth = ?7,
               maxdepth = ?8,
               maptrack = ?9,
               maptrack_wkt = ?10
             WHERE id = ?1",
            params![
                id.get(),
                finalization.end.map(|d| d.to_rfc3339()),
                finalization.num_measured_parameters,
                finalization.num_parameters,
                finalization.comment,
                finalization.loaded_at.to_rfc3339(),
                finalization.min_depth,
                finalization.max_depth,
                track_json,
                finalization.track.as_ref().map(Track::to_wkt)
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::new(
                StoreErrorCode::NotFound,
                format!("activity {id} not found"),
            ));
        }
        Ok(())
    }

    fn max_timevalue(&self, activity: ActivityId) -> Result<Option<DateTime<Utc>>, StoreError> {
        let max: Option<i64> = self.conn.query_row(
            "SELECT MAX(timevalue) FROM instantpoint WHERE activity_id = ?1",
            params![activity.get()],
            |row| row.get(0),
        )?;
        max.map(from_micros).transpose()
    }

    fn bulk_create_instant_points(
        &mut self,
        activity: ActivityId,
        times: &[DateTime<Utc>],
    ) -> Result<Vec<InstantPointId>, StoreError> {
        let tx = self.conn.transaction()?;
        let mut ids = Vec::with_capacity(times.len());
        {
            let mut stmt =
                tx.prepare("INSERT INTO instantpoint (activity_id, timevalue) VALUES (?1, ?2)")?;
            for at in times {
                stmt.execute(params![activity.get(), to_micros(*at)])?;
                ids.push(InstantPointId(tx.last_insert_rowid()));
            }
        }
        tx.commit()?;
        Ok(ids)
    }

    fn get_or_create_instant_point(
        &mut self,
        activity: ActivityId,
        time: DateTime<Utc>,
    ) -> Result<(InstantPointId, bool), StoreError> {
        let micros = to_micros(time);
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM instantpoint WHERE activity_id = ?1 AND timevalue = ?2",
                params![activity.get(), micros],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok((InstantPointId(id), false));
        }
        self.conn.execute(
            "INSERT INTO instantpoint (activity_id, timevalue) VALUES (?1, ?2)",
            params![activity.get(), micros],
        )?;
        Ok((InstantPointId(self.conn.last_insert_rowid()), true))
    }

    fn get_or_create_nominal_location(
        &mut self,
        new: &NewNominalLocation,
    ) -> Result<NominalLocationId, StoreError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO nominallocation (activity_id, depth, latitude, longitude)
             VALUES (?1, ?2, ?3, ?4)",
            params![new.activity.get(), new.depth, new.latitude, new.longitude],
        )?;
        let id: i64 = self.conn.query_row(
            "SELECT id FROM nominallocation
             WHERE activity_id = ?1 AND depth = ?2 AND latitude = ?3 AND longitude = ?4",
            params![new.activity.get(), new.depth, new.latitude, new.longitude],
            |row| row.get(0),
        )?;
        Ok(NominalLocationId(id))
    }

    fn bulk_create_measurements(
        &mut self,
        rows: &[NewMeasurement],
    ) -> Result<Vec<MeasurementId>, StoreError> {
        let tx = self.conn.transaction()?;
        let mut ids = Vec::with_capacity(rows.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO measurement (instantpoint_id, nominallocation_id, depth, latitude, longitude)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for m in rows {
                stmt.execute(params![
                    m.instant_point.get(),
                    m.nominal_location.map(NominalLocationId::get),
                    m.depth,
                    m.latitude,
                    m.longitude
                ])?;
                ids.push(MeasurementId(tx.last_insert_rowid()));
            }
        }
        tx.commit()?;
        Ok(ids)
    }

    fn get_or_create_measurement(
        &mut self,
        row: &NewMeasurement,
    ) -> Result<(MeasurementId, bool), StoreError> {
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM measurement
                 WHERE instantpoint_id = ?1 AND depth = ?2 AND latitude = ?3 AND longitude = ?4",
                params![row.instant_point.get(), row.depth, row.latitude, row.longitude],
                |r| r.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok((MeasurementId(id), false));
        }
        self.conn.execute(
            "INSERT INTO measurement (instantpoint_id, nominallocation_id, depth, latitude, longitude)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                row.instant_point.get(),
                row.nominal_location.map(NominalLocationId::get),
                row.depth,
                row.latitude,
                row.longitude
            ],
        )?;
        Ok((MeasurementId(self.conn.last_insert_rowid()), true))
    }

    fn bulk_create_measured_parameters(
        &mut self,
        rows: &[NewMeasuredParameter],
    ) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO measuredparameter (measurement_id, parameter_id, datavalue, dataarray)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for mp in rows {
                let (scalar, array) = value_columns(&mp.value)?;
                stmt.execute(params![mp.measurement.get(), mp.parameter.get(), scalar, array])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    fn insert_missing_measured_parameters(
        &mut self,
        rows: &[NewMeasuredParameter],
    ) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO measuredparameter (measurement_id, parameter_id, datavalue, dataarray)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for mp in rows {
                let (scalar, array) = value_columns(&mp.value)?;
                inserted +=
                    stmt.execute(params![mp.measurement.get(), mp.parameter.get(), scalar, array])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn delete_invalid_measured_parameters(
        &mut self,
        activity: ActivityId,
        parameter: ParameterId,
    ) -> Result<usize, StoreError> {
        let removed = self.conn.execute(
            "DELETE FROM measuredparameter
             WHERE parameter_id = ?2
               AND measurement_id IN (
                 SELECT m.id FROM measurement m
                 JOIN instantpoint ip ON ip.id = m.instantpoint_id
                 WHERE ip.activity_id = ?1)
               AND ((datavalue IS NULL AND dataarray IS NULL)
                    OR abs(datavalue) > 1.7976931348623157e308)",
            params![activity.get(), parameter.get()],
        )?;
        Ok(removed)
    }

    fn count_instant_points(&self, activity: ActivityId) -> Result<i64, StoreError> {
        self.count(
            "SELECT COUNT(*) FROM instantpoint WHERE activity_id = ?1",
            activity,
        )
    }

    fn count_measurements(&self, activity: ActivityId) -> Result<i64, StoreError> {
        self.count(
            "SELECT COUNT(*) FROM measurement m
             JOIN instantpoint ip ON ip.id = m.instantpoint_id
             WHERE ip.activity_id = ?1",
            activity,
        )
    }

    fn count_measured_parameters(&self, activity: ActivityId) -> Result<i64, StoreError> {
        self.count(
            &format!("SELECT COUNT(*) {ACTIVITY_MEASURED_PARAMETERS}"),
            activity,
        )
    }

    fn parameter_counts(&self, activity: ActivityId) -> Result<BTreeMap<String, i64>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT p.name, COUNT(*)
             FROM measuredparameter mp
             JOIN parameter p ON p.id = mp.parameter_id
             JOIN measurement m ON m.id = mp.measurement_id
             JOIN instantpoint ip ON ip.id = m.instantpoint_id
             WHERE ip.activity_id = ?1
             GROUP BY p.name",
        )?;
        let rows = stmt.query_map(params![activity.get()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut out = BTreeMap::new();
        for row in rows {
            let (name, count) = row?;
            out.insert(name, count);
        }
        Ok(out)
    }

    fn measurement_track(&self, activity: ActivityId) -> Result<Vec<TrackPoint>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT ip.timevalue, m.longitude, m.latitude, m.depth, m.nominallocation_id
             FROM measurement m
             JOIN instantpoint ip ON ip.id = m.instantpoint_id
             WHERE ip.activity_id = ?1
             ORDER BY ip.timevalue, m.depth",
        )?;
        let rows = stmt.query_map(params![activity.get()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, Option<i64>>(4)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (micros, longitude, latitude, depth, nominal) = row?;
            out.push(TrackPoint {
                time: from_micros(micros)?,
                longitude,
                latitude,
                depth,
                nominal_location: nominal.map(NominalLocationId),
            });
        }
        Ok(out)
    }

    fn depth_range(&self, activity: ActivityId) -> Result<Option<(f64, f64)>, StoreError> {
        let (min, max): (Option<f64>, Option<f64>) = self.conn.query_row(
            "SELECT MIN(m.depth), MAX(m.depth) FROM measurement m
             JOIN instantpoint ip ON ip.id = m.instantpoint_id
             WHERE ip.activity_id = ?1",
            params![activity.get()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(min.zip(max))
    }

    fn update_activity_parameter_stats(
        &mut self,
        activity: ActivityId,
    ) -> Result<Vec<ParameterStats>, StoreError> {
        let stats = {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT mp.parameter_id, COUNT(*), MIN(mp.datavalue), MAX(mp.datavalue), AVG(mp.datavalue)
                 {ACTIVITY_MEASURED_PARAMETERS} AND mp.datavalue IS NOT NULL
                 GROUP BY mp.parameter_id
                 ORDER BY mp.parameter_id"
            ))?;
            let rows = stmt.query_map(params![activity.get()], |row| {
                Ok(ParameterStats {
                    parameter: ParameterId(row.get(0)?),
                    count: row.get(1)?,
                    min: row.get(2)?,
                    max: row.get(3)?,
                    mean: row.get(4)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO activityparameter (activity_id, parameter_id, number, min, max, mean)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for s in &stats {
                stmt.execute(params![
                    activity.get(),
                    s.parameter.get(),
                    s.count,
                    s.min,
                    s.max,
                    s.mean
                ])?;
            }
        }
        tx.commit()?;
        Ok(stats)
    }

    fn insert_simple_depth_time(&mut self, series: &SimpleDepthTime) -> Result<(), StoreError> {
        let points = serde_json::to_string(&series.points).map_err(|e| {
            StoreError::new(StoreErrorCode::Validation, format!("depth-time points: {e}"))
        })?;
        let nominal = series.nominal_location.map(NominalLocationId::get);
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM simpledepthtime WHERE activity_id = ?1 AND nominallocation_id IS ?2",
            params![series.activity.get(), nominal],
        )?;
        tx.execute(
            "INSERT INTO simpledepthtime (activity_id, nominallocation_id, points) VALUES (?1, ?2, ?3)",
            params![series.activity.get(), nominal, points],
        )?;
        tx.commit()?;
        Ok(())
    }
}

//! Storage layer for noisemap.
//!
//! This module provides `SQLite`-based persistent storage for noise reports:
//! atomic creation, recency listings, per-user listings, exact-coordinate
//! map aggregation, and bounding-box lookups served by an R*Tree index.
//!
//! [`Storage`] is synchronous and owns a single connection. Async callers go
//! through the [`ReportStore`] trait, implemented by [`SqliteReportStore`].

pub mod migrations;
pub mod schema;
mod store;

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::geo::{self, BoundingBox, GeoPoint, Location};
use crate::report::{CoordinateCluster, MediaType, NewReport, NoiseReport};

use schema::REPORT_COLUMNS;

pub use store::{ReportStore, SqliteReportStore};

/// Storage engine for noise reports.
///
/// Provides persistent storage using `SQLite` with support for:
/// - Atomic report insertion (row and spatial index entry together)
/// - Newest-first listings, globally and per user
/// - Grouping located reports by exact coordinate
/// - Bounding-box queries over the spatial index
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // WAL keeps readers from blocking on the single writer
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store a new report and return the stored record.
    ///
    /// Assigns `id` and `createdAt`, derives `geoLocation` from the location,
    /// and writes the report row and its spatial index entry in a single
    /// transaction. On failure nothing is visible.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert(&self, report: &NewReport) -> Result<NoiseReport> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now().trunc_subsecs(6);
        let geo_location = geo::normalize(report.location.as_ref());

        let latitude = report.location.as_ref().map(|l| l.latitude);
        let longitude = report.location.as_ref().map(|l| l.longitude);
        let address = report
            .location
            .as_ref()
            .and_then(|l| l.address.as_ref())
            .map(serde_json::to_string)
            .transpose()?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            r"
            INSERT INTO reports (id, user_id, media_url, media_type, reason, comment,
                latitude, longitude, address, geo_type, geo_longitude, geo_latitude, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ",
            params![
                id,
                report.user_id,
                report.media_url,
                report.media_type.as_str(),
                report.reason,
                report.comment,
                latitude,
                longitude,
                address,
                geo_location.map(|p| p.kind.to_string()),
                geo_location.map(|p| p.longitude()),
                geo_location.map(|p| p.latitude()),
                format_timestamp(&created_at),
            ],
        )?;
        let seq = tx.last_insert_rowid();

        if let Some(point) = &geo_location {
            tx.execute(
                r"
                INSERT INTO reports_geo (seq, min_lon, max_lon, min_lat, max_lat)
                VALUES (?1, ?2, ?2, ?3, ?3)
                ",
                params![seq, point.longitude(), point.latitude()],
            )?;
        }
        tx.commit()?;

        debug!("Inserted report {} (seq {})", id, seq);
        Ok(NoiseReport {
            id,
            user_id: report.user_id.clone(),
            media_url: report.media_url.clone(),
            media_type: report.media_type,
            reason: report.reason.clone(),
            comment: report.comment.clone(),
            location: report.location.clone(),
            geo_location,
            created_at,
        })
    }

    /// Get a report by its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get(&self, id: &str) -> Result<Option<NoiseReport>> {
        let sql = format!("SELECT {REPORT_COLUMNS} FROM reports r WHERE r.id = ?1");
        let result = self
            .conn
            .query_row(&sql, [id], Self::row_to_report)
            .optional()?;
        Ok(result)
    }

    /// List every report, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_all(&self) -> Result<Vec<NoiseReport>> {
        let sql = format!(
            "SELECT {REPORT_COLUMNS} FROM reports r ORDER BY r.created_at DESC, r.seq DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let reports = stmt
            .query_map([], Self::row_to_report)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(reports)
    }

    /// List the reports submitted by one user, newest first.
    ///
    /// An unknown user yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_by_user(&self, user_id: &str) -> Result<Vec<NoiseReport>> {
        let sql = format!(
            r"
            SELECT {REPORT_COLUMNS} FROM reports r
            WHERE r.user_id = ?1
            ORDER BY r.created_at DESC, r.seq DESC
            "
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let reports = stmt
            .query_map([user_id], Self::row_to_report)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(reports)
    }

    /// Group located reports by exact coordinate pair.
    ///
    /// Reports without numeric coordinates are skipped. Two reports share a
    /// cluster only when both coordinates are exactly equal; no radius is
    /// applied. Clusters come back in order of their first report.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn aggregate_by_coordinate(&self) -> Result<Vec<CoordinateCluster>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT latitude, longitude, COUNT(*) FROM reports
            WHERE typeof(latitude) IN ('real', 'integer')
              AND typeof(longitude) IN ('real', 'integer')
            GROUP BY latitude, longitude
            ORDER BY MIN(seq)
            ",
        )?;

        let clusters = stmt
            .query_map([], |row| {
                let latitude: f64 = row.get(0)?;
                let longitude: f64 = row.get(1)?;
                let count: i64 = row.get(2)?;
                Ok(CoordinateCluster {
                    coordinates: [longitude, latitude],
                    count: u64::try_from(count).unwrap_or_default(),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(clusters)
    }

    /// List reports whose point lies inside a bounding box, newest first.
    ///
    /// The R*Tree narrows candidates (its single-precision boxes are
    /// rounded outward), then the exact stored coordinates are checked.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_within(&self, bounds: &BoundingBox) -> Result<Vec<NoiseReport>> {
        let sql = format!(
            r"
            SELECT {REPORT_COLUMNS} FROM reports_geo g
            JOIN reports r ON r.seq = g.seq
            WHERE g.max_lat >= ?1 AND g.min_lat <= ?3
              AND g.max_lon >= ?2 AND g.min_lon <= ?4
              AND r.geo_latitude BETWEEN ?1 AND ?3
              AND r.geo_longitude BETWEEN ?2 AND ?4
            ORDER BY r.created_at DESC, r.seq DESC
            "
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let reports = stmt
            .query_map(
                params![bounds.min_lat, bounds.min_lon, bounds.max_lat, bounds.max_lon],
                Self::row_to_report,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(reports)
    }

    /// Count total reports in storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM reports", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let (total_reports, located_reports, oldest, newest): (
            i64,
            i64,
            Option<String>,
            Option<String>,
        ) = self.conn.query_row(
            r"
            SELECT COUNT(*), COUNT(latitude), MIN(created_at), MAX(created_at)
            FROM reports
            ",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

        let oldest_report = oldest.as_deref().and_then(parse_timestamp);
        let newest_report = newest.as_deref().and_then(parse_timestamp);

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_reports,
            located_reports,
            oldest_report,
            newest_report,
            db_size_bytes,
        })
    }

    /// Convert a database row selected with [`REPORT_COLUMNS`] to a report.
    fn row_to_report(row: &Row) -> rusqlite::Result<NoiseReport> {
        let media_type: String = row.get(3)?;
        let media_type = MediaType::parse(&media_type).map_err(|e| conversion_failure(3, e))?;

        let latitude: Option<f64> = row.get(6)?;
        let longitude: Option<f64> = row.get(7)?;
        let address: Option<String> = row.get(8)?;
        let address = address
            .map(|a| serde_json::from_str::<Value>(&a))
            .transpose()
            .map_err(|e| conversion_failure(8, e))?;

        let location = match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Some(Location {
                latitude,
                longitude,
                address,
            }),
            _ => None,
        };

        let geo_longitude: Option<f64> = row.get(9)?;
        let geo_latitude: Option<f64> = row.get(10)?;
        let geo_location = match (geo_longitude, geo_latitude) {
            (Some(lon), Some(lat)) => Some(GeoPoint::new(lon, lat)),
            _ => None,
        };

        let created_at: String = row.get(11)?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_failure(11, e))?;

        Ok(NoiseReport {
            id: row.get(0)?,
            user_id: row.get(1)?,
            media_url: row.get(2)?,
            media_type,
            reason: row.get(4)?,
            comment: row.get(5)?,
            location,
            geo_location,
            created_at,
        })
    }
}

/// Fixed-width UTC form, so text order matches time order.
fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn conversion_failure<E>(column: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Total number of reports stored.
    pub total_reports: i64,
    /// Reports that carry a location.
    pub located_reports: i64,
    /// Creation time of the oldest report.
    pub oldest_report: Option<DateTime<Utc>>,
    /// Creation time of the newest report.
    pub newest_report: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

//! `SQLite` schema definitions for noisemap.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the reports table.
///
/// The CHECK constraints pin the data-model invariants at the storage
/// level: location coordinates come in pairs, and the normalized geometry
/// exists exactly when the location does and mirrors its coordinates.
pub const CREATE_REPORTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS reports (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    user_id TEXT NOT NULL,
    media_url TEXT NOT NULL,
    media_type TEXT NOT NULL CHECK (media_type IN ('audio', 'video')),
    reason TEXT NOT NULL,
    comment TEXT NOT NULL DEFAULT '',
    latitude REAL,
    longitude REAL,
    address TEXT,
    geo_type TEXT CHECK (geo_type = 'Point'),
    geo_longitude REAL,
    geo_latitude REAL,
    created_at TEXT NOT NULL,
    CHECK ((latitude IS NULL) = (longitude IS NULL)),
    CHECK (
        (latitude IS NULL AND address IS NULL AND geo_type IS NULL
            AND geo_longitude IS NULL AND geo_latitude IS NULL)
        OR (latitude IS NOT NULL AND geo_type = 'Point'
            AND geo_longitude = longitude AND geo_latitude = latitude)
    )
)
";

/// SQL statement to create the spatial index over report geometries.
///
/// An R*Tree keyed by `reports.seq`; points are stored as degenerate boxes.
pub const CREATE_GEO_INDEX: &str = r"
CREATE VIRTUAL TABLE IF NOT EXISTS reports_geo USING rtree(
    seq,
    min_lon, max_lon,
    min_lat, max_lat
)
";

/// SQL statement to create an index on `created_at` for recency listing.
pub const CREATE_CREATED_AT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_reports_created_at ON reports(created_at DESC, seq DESC)
";

/// SQL statement to create an index for per-user listing.
pub const CREATE_USER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_reports_user ON reports(user_id, created_at DESC)
";

/// SQL statement to create an index on the coordinate pair for map grouping.
pub const CREATE_COORDINATE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_reports_coordinates ON reports(latitude, longitude)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_REPORTS_TABLE,
    CREATE_GEO_INDEX,
    CREATE_CREATED_AT_INDEX,
    CREATE_USER_INDEX,
    CREATE_COORDINATE_INDEX,
    CREATE_METADATA_TABLE,
];

/// Columns selected whenever a full report row is read, in row-mapping order.
pub const REPORT_COLUMNS: &str = "r.id, r.user_id, r.media_url, r.media_type, r.reason, \
     r.comment, r.latitude, r.longitude, r.address, r.geo_longitude, r.geo_latitude, \
     r.created_at";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.is_empty());
        }
    }

    #[test]
    fn test_create_reports_table_contains_required_columns() {
        assert!(CREATE_REPORTS_TABLE.contains("id TEXT NOT NULL UNIQUE"));
        assert!(CREATE_REPORTS_TABLE.contains("user_id TEXT NOT NULL"));
        assert!(CREATE_REPORTS_TABLE.contains("media_url TEXT NOT NULL"));
        assert!(CREATE_REPORTS_TABLE.contains("reason TEXT NOT NULL"));
        assert!(CREATE_REPORTS_TABLE.contains("created_at TEXT NOT NULL"));
    }

    #[test]
    fn test_geo_index_is_rtree() {
        assert!(CREATE_GEO_INDEX.contains("USING rtree"));
    }

    #[test]
    fn test_report_columns_count() {
        assert_eq!(REPORT_COLUMNS.split(',').count(), 12);
    }

    #[test]
    fn test_create_metadata_table_structure() {
        assert!(CREATE_METADATA_TABLE.contains("key TEXT PRIMARY KEY"));
        assert!(CREATE_METADATA_TABLE.contains("value TEXT NOT NULL"));
    }
}

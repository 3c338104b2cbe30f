//! `noisemap` - Geotagged noise-disturbance reports
//!
//! This library accepts noise reports with an audio or video attachment,
//! normalizes their location into a point geometry, persists them in
//! `SQLite`, and serves listings and a coordinate-clustered map view over
//! HTTP.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod geo;
pub mod ingest;
pub mod logging;
pub mod media;
pub mod report;
pub mod server;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result, ValidationError};
pub use geo::{BoundingBox, GeoPoint, Location};
pub use ingest::{Ingestor, Submission};
pub use logging::init_logging;
pub use media::{LocalMediaStore, MediaStore, MediaUpload};
pub use report::{CoordinateCluster, MediaType, NewReport, NoiseReport};
pub use storage::{ReportStore, SqliteReportStore, Storage, StorageStats};

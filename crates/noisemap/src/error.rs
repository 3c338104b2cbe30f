//! Error types for noisemap.
//!
//! This module defines the crate-wide [`Error`] type and the
//! [`ValidationError`] taxonomy for caller-supplied data. Validation errors
//! carry the exact user-facing message returned with an HTTP 400.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for noisemap operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Submission Errors ===
    /// Caller-supplied data failed a required-field or shape check.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The media store could not persist an upload.
    #[error("failed to store media: {message}")]
    MediaStore {
        /// Description of what went wrong.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for noisemap operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a new media store error.
    #[must_use]
    pub fn media_store(message: impl Into<String>) -> Self {
        Self::MediaStore {
            message: message.into(),
        }
    }

    /// Check if this error was caused by invalid caller input.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this error came from the database layer.
    #[must_use]
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::DatabaseOpen { .. } | Self::DatabaseQuery(_) | Self::DatabaseMigration { .. }
        )
    }
}

/// Rejections of caller-supplied report data.
///
/// The `Display` output of each variant is the message sent back to the
/// client, so keep them short and human readable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// No submitting user was given.
    #[error("User ID is required.")]
    MissingUserId,

    /// Neither an uploaded media part nor a media reference was given, or the
    /// reason is blank.
    #[error("Media and reason are required.")]
    MissingMediaOrReason,

    /// The media type is absent or not one of the supported kinds.
    #[error("Media type must be one of: audio, video.")]
    InvalidMediaType,

    /// The location field is not valid JSON.
    #[error("Location is not valid JSON: {0}")]
    MalformedLocation(String),

    /// The location payload is valid JSON but not an object.
    #[error("Location must be an object with latitude and longitude.")]
    LocationNotObject,

    /// One of the two coordinates is absent.
    #[error("Location is missing {0}.")]
    MissingCoordinate(&'static str),

    /// A coordinate is present but not a finite number.
    #[error("Location {0} is not a number.")]
    NonNumericCoordinate(&'static str),

    /// A coordinate lies outside its valid range.
    #[error("Location {axis} {value} is out of range.")]
    CoordinateOutOfRange {
        /// Which coordinate, `latitude` or `longitude`.
        axis: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A bounding box is inverted or outside valid coordinate ranges.
    #[error("Invalid area: {0}")]
    InvalidBounds(String),

    /// The multipart request body could not be read.
    #[error("Malformed form data: {0}")]
    MalformedForm(String),
}

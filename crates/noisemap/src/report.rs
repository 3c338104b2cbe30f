//! Core report types for noisemap.
//!
//! A [`NoiseReport`] is the only persisted entity. It couples the raw
//! client [`Location`] with the normalized [`GeoPoint`] derived from it; the
//! two are always written together by the storage layer and never diverge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::geo::{GeoPoint, Location};

/// Kind of media attached to a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    /// An audio recording.
    Audio,
    /// A video recording.
    Video,
}

impl MediaType {
    /// Parse the wire form (`audio` / `video`, case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidMediaType`] for anything else.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "audio" => Ok(Self::Audio),
            "video" => Ok(Self::Video),
            _ => Err(ValidationError::InvalidMediaType),
        }
    }

    /// The stored/serialized name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MediaType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A validated report that has not been stored yet.
///
/// The store assigns `id` and `createdAt` and derives the geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReport {
    /// Submitting user (opaque reference).
    pub user_id: String,
    /// Reference to previously uploaded media.
    pub media_url: String,
    /// Kind of media behind `media_url`.
    pub media_type: MediaType,
    /// Free-text classification.
    pub reason: String,
    /// Free-text comment, empty when not given.
    pub comment: String,
    /// Where the disturbance happened, if known.
    pub location: Option<Location>,
}

impl NewReport {
    /// Create a report without comment or location.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        media_url: impl Into<String>,
        media_type: MediaType,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            media_url: media_url.into(),
            media_type,
            reason: reason.into(),
            comment: String::new(),
            location: None,
        }
    }

    /// Set the comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Set the location.
    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

/// A stored noise report, as returned by every read path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoiseReport {
    /// Store-assigned identifier.
    pub id: String,
    /// Submitting user (opaque reference).
    pub user_id: String,
    /// Reference to the uploaded media.
    pub media_url: String,
    /// Kind of media.
    pub media_type: MediaType,
    /// Free-text classification.
    pub reason: String,
    /// Free-text comment.
    pub comment: String,
    /// Raw client location, `null` when not supplied.
    pub location: Option<Location>,
    /// Normalized geometry, `null` exactly when `location` is `null`.
    pub geo_location: Option<GeoPoint>,
    /// When the store accepted the report.
    pub created_at: DateTime<Utc>,
}

impl NoiseReport {
    /// Whether the two location representations agree.
    #[must_use]
    pub fn geometry_consistent(&self) -> bool {
        match (&self.location, &self.geo_location) {
            (None, None) => true,
            (Some(location), Some(point)) => {
                point.coordinates == [location.longitude, location.latitude]
            }
            _ => false,
        }
    }
}

/// One map cluster: every report at an exact coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateCluster {
    /// `[longitude, latitude]`.
    pub coordinates: [f64; 2],
    /// Number of reports at this coordinate.
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_report(location: Option<Location>) -> NoiseReport {
        let geo_location = crate::geo::normalize(location.as_ref());
        NoiseReport {
            id: "r1".to_string(),
            user_id: "u1".to_string(),
            media_url: "m1".to_string(),
            media_type: MediaType::Audio,
            reason: "loud music".to_string(),
            comment: String::new(),
            location,
            geo_location,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_media_type_parse() {
        assert_eq!(MediaType::parse("audio").unwrap(), MediaType::Audio);
        assert_eq!(MediaType::parse(" Video ").unwrap(), MediaType::Video);
        assert_eq!(
            MediaType::parse("image").unwrap_err(),
            ValidationError::InvalidMediaType
        );
        assert!("".parse::<MediaType>().is_err());
    }

    #[test]
    fn test_media_type_display() {
        assert_eq!(MediaType::Audio.to_string(), "audio");
        assert_eq!(MediaType::Video.to_string(), "video");
    }

    #[test]
    fn test_new_report_builder() {
        let report = NewReport::new("u1", "m1", MediaType::Video, "construction")
            .with_comment("every night")
            .with_location(Location::new(1.0, 2.0));
        assert_eq!(report.comment, "every night");
        assert_eq!(report.location, Some(Location::new(1.0, 2.0)));
    }

    #[test]
    fn test_report_wire_shape() {
        let report = sample_report(Some(Location::new(12.9, 77.6)));
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["userId"], "u1");
        assert_eq!(value["mediaUrl"], "m1");
        assert_eq!(value["mediaType"], "audio");
        assert_eq!(value["location"], json!({"latitude": 12.9, "longitude": 77.6}));
        assert_eq!(
            value["geoLocation"],
            json!({"type": "Point", "coordinates": [77.6, 12.9]})
        );
        assert!(value["createdAt"].is_string());
    }

    #[test]
    fn test_report_without_location_serializes_nulls() {
        let report = sample_report(None);
        let value = serde_json::to_value(&report).unwrap();
        assert!(value["location"].is_null());
        assert!(value["geoLocation"].is_null());
    }

    #[test]
    fn test_geometry_consistent() {
        assert!(sample_report(None).geometry_consistent());
        assert!(sample_report(Some(Location::new(3.0, 4.0))).geometry_consistent());

        let mut report = sample_report(Some(Location::new(3.0, 4.0)));
        report.geo_location = Some(GeoPoint::new(3.0, 4.0));
        assert!(!report.geometry_consistent());

        report.geo_location = None;
        assert!(!report.geometry_consistent());
    }
}

//! Location parsing and point-geometry normalization.
//!
//! Clients send the report location as a serialized JSON object with
//! `latitude`, `longitude` and an opaque `address`. This module turns that
//! payload into a validated [`Location`] and derives the normalized
//! [`GeoPoint`] (`[longitude, latitude]`) stored alongside it. Everything
//! here is pure: no I/O, no clock.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

const LATITUDE: &str = "latitude";
const LONGITUDE: &str = "longitude";

/// A raw, client-supplied location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in decimal degrees, `[-90, 90]`.
    pub latitude: f64,
    /// Longitude in decimal degrees, `[-180, 180]`.
    pub longitude: f64,
    /// Opaque address blob (e.g. a reverse-geocoding result), stored verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Value>,
}

impl Location {
    /// Create a location without an address.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            address: None,
        }
    }

    /// Attach an address blob.
    #[must_use]
    pub fn with_address(mut self, address: Value) -> Self {
        self.address = Some(address);
        self
    }

    /// Parse the serialized wire form of a location.
    ///
    /// An empty string or a JSON `null` means "no location" and yields
    /// `Ok(None)`. Coordinates may be JSON numbers or numeric strings.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the payload is not JSON, not an
    /// object, or has a missing, non-numeric or out-of-range coordinate.
    pub fn parse(raw: &str) -> Result<Option<Self>, ValidationError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }

        let value: Value = serde_json::from_str(raw)
            .map_err(|e| ValidationError::MalformedLocation(e.to_string()))?;
        Self::from_value(&value)
    }

    /// Validate an already-decoded location payload.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Location::parse`], minus JSON syntax errors.
    pub fn from_value(value: &Value) -> Result<Option<Self>, ValidationError> {
        let object = match value {
            Value::Null => return Ok(None),
            Value::Object(object) => object,
            _ => return Err(ValidationError::LocationNotObject),
        };

        let latitude = coordinate(object.get(LATITUDE), LATITUDE, 90.0)?;
        let longitude = coordinate(object.get(LONGITUDE), LONGITUDE, 180.0)?;
        let address = object.get("address").filter(|a| !a.is_null()).cloned();

        Ok(Some(Self {
            latitude,
            longitude,
            address,
        }))
    }
}

/// Read one coordinate out of the payload and range-check it.
fn coordinate(
    value: Option<&Value>,
    axis: &'static str,
    limit: f64,
) -> Result<f64, ValidationError> {
    let number = match value {
        None | Some(Value::Null) => return Err(ValidationError::MissingCoordinate(axis)),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    let number = number
        .filter(|n| n.is_finite())
        .ok_or(ValidationError::NonNumericCoordinate(axis))?;

    if !(-limit..=limit).contains(&number) {
        return Err(ValidationError::CoordinateOutOfRange {
            axis,
            value: number,
        });
    }

    Ok(number)
}

/// Geometry discriminator. Only points are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GeometryType {
    /// A single position.
    #[default]
    Point,
}

impl std::fmt::Display for GeometryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Point => write!(f, "Point"),
        }
    }
}

/// Normalized point geometry, `{ "type": "Point", "coordinates": [lon, lat] }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Always [`GeometryType::Point`].
    #[serde(rename = "type")]
    pub kind: GeometryType,
    /// `[longitude, latitude]`.
    pub coordinates: [f64; 2],
}

impl GeoPoint {
    /// Build a point from a longitude/latitude pair.
    #[must_use]
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            kind: GeometryType::Point,
            coordinates: [longitude, latitude],
        }
    }

    /// Derive the point for a location.
    #[must_use]
    pub fn from_location(location: &Location) -> Self {
        Self::new(location.longitude, location.latitude)
    }

    /// Longitude component.
    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    /// Latitude component.
    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }
}

/// Derive the stored geometry for an optional location.
///
/// `None` in, `None` out; a location always yields a point whose
/// coordinates are exactly `[longitude, latitude]`.
#[must_use]
pub fn normalize(location: Option<&Location>) -> Option<GeoPoint> {
    location.map(GeoPoint::from_location)
}

/// An axis-aligned latitude/longitude box, inclusive on every edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    /// Southern edge.
    pub min_lat: f64,
    /// Western edge.
    pub min_lon: f64,
    /// Northern edge.
    pub max_lat: f64,
    /// Eastern edge.
    pub max_lon: f64,
}

impl BoundingBox {
    /// Build and validate a bounding box.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidBounds`] if an edge is not finite,
    /// out of range, or the box is inverted. Boxes crossing the
    /// antimeridian are not supported.
    pub fn new(
        min_lat: f64,
        min_lon: f64,
        max_lat: f64,
        max_lon: f64,
    ) -> Result<Self, ValidationError> {
        let bounds = Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        };
        bounds.validate()?;
        Ok(bounds)
    }

    /// Check edge ranges and ordering.
    ///
    /// # Errors
    ///
    /// See [`BoundingBox::new`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        let edges = [self.min_lat, self.min_lon, self.max_lat, self.max_lon];
        if edges.iter().any(|e| !e.is_finite()) {
            return Err(ValidationError::InvalidBounds(
                "coordinates must be finite numbers".to_string(),
            ));
        }
        if !(-90.0..=90.0).contains(&self.min_lat) || !(-90.0..=90.0).contains(&self.max_lat) {
            return Err(ValidationError::InvalidBounds(
                "latitude must be within [-90, 90]".to_string(),
            ));
        }
        if !(-180.0..=180.0).contains(&self.min_lon) || !(-180.0..=180.0).contains(&self.max_lon)
        {
            return Err(ValidationError::InvalidBounds(
                "longitude must be within [-180, 180]".to_string(),
            ));
        }
        if self.min_lat > self.max_lat || self.min_lon > self.max_lon {
            return Err(ValidationError::InvalidBounds(
                "minimum edges must not exceed maximum edges".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a point lies inside the box.
    #[must_use]
    pub fn contains(&self, point: &GeoPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.latitude())
            && (self.min_lon..=self.max_lon).contains(&point.longitude())
    }
}

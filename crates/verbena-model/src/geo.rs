//! Geospatial value types.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Mean earth radius in kilometers, used for haversine distance.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// A 2D canvas position for a workflow node.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
  pub x: f64,
  pub y: f64,
}

impl Position {
  pub fn new(x: f64, y: f64) -> Self {
    Self { x, y }
  }
}

/// A geographic coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
  latitude: f64,
  longitude: f64,
}

impl GeoLocation {
  pub fn new(latitude: f64, longitude: f64) -> Result<Self, ModelError> {
    if !(-90.0..=90.0).contains(&latitude) {
      return Err(ModelError::LatitudeOutOfRange(latitude));
    }
    if !(-180.0..=180.0).contains(&longitude) {
      return Err(ModelError::LongitudeOutOfRange(longitude));
    }
    Ok(Self {
      latitude,
      longitude,
    })
  }

  pub fn latitude(&self) -> f64 {
    self.latitude
  }

  pub fn longitude(&self) -> f64 {
    self.longitude
  }

  /// Great-circle distance to another location, in kilometers.
  pub fn distance_km(&self, other: &GeoLocation) -> f64 {
    let lat1 = self.latitude.to_radians();
    let lat2 = other.latitude.to_radians();
    let dlat = (other.latitude - self.latitude).to_radians();
    let dlon = (other.longitude - self.longitude).to_radians();

    let a =
      (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
  }
}

/// An axis-aligned geographic rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
  min_latitude: f64,
  min_longitude: f64,
  max_latitude: f64,
  max_longitude: f64,
}

impl BoundingBox {
  pub fn new(
    min_latitude: f64,
    min_longitude: f64,
    max_latitude: f64,
    max_longitude: f64,
  ) -> Result<Self, ModelError> {
    // Validate the corners individually first so range errors surface
    // before inversion errors.
    GeoLocation::new(min_latitude, min_longitude)?;
    GeoLocation::new(max_latitude, max_longitude)?;
    if min_latitude > max_latitude {
      return Err(ModelError::InvertedBounds { axis: "latitude" });
    }
    if min_longitude > max_longitude {
      return Err(ModelError::InvertedBounds { axis: "longitude" });
    }
    Ok(Self {
      min_latitude,
      min_longitude,
      max_latitude,
      max_longitude,
    })
  }

  pub fn min_latitude(&self) -> f64 {
    self.min_latitude
  }

  pub fn min_longitude(&self) -> f64 {
    self.min_longitude
  }

  pub fn max_latitude(&self) -> f64 {
    self.max_latitude
  }

  pub fn max_longitude(&self) -> f64 {
    self.max_longitude
  }

  /// The geometric center of the box.
  pub fn center(&self) -> GeoLocation {
    GeoLocation {
      latitude: (self.min_latitude + self.max_latitude) / 2.0,
      longitude: (self.min_longitude + self.max_longitude) / 2.0,
    }
  }

  /// Whether a location falls inside the box, borders inclusive.
  pub fn contains(&self, location: &GeoLocation) -> bool {
    location.latitude >= self.min_latitude
      && location.latitude <= self.max_latitude
      && location.longitude >= self.min_longitude
      && location.longitude <= self.max_longitude
  }
}

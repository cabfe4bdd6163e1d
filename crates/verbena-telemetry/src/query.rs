//! Telemetry query values.
//!
//! Queries are built through [`TelemetryQueryBuilder`], which enforces the
//! cross-field constraints at construction: `from <= to`, positive radius
//! and limit, and at most one spatial filter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use verbena_model::{BoundingBox, DeviceId, GeoLocation};

use crate::data::TelemetryData;
use crate::error::TelemetryError;

/// Aggregation applied to a set of numeric samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationType {
  Average,
  Min,
  Max,
  Sum,
  Count,
}

impl AggregationType {
  /// Apply the aggregation to a non-empty sample set. Returns 0.0 for an
  /// empty slice.
  pub fn apply(&self, values: &[f64]) -> f64 {
    if values.is_empty() {
      return 0.0;
    }
    match self {
      AggregationType::Average => values.iter().sum::<f64>() / values.len() as f64,
      AggregationType::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
      AggregationType::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
      AggregationType::Sum => values.iter().sum(),
      AggregationType::Count => values.len() as f64,
    }
  }
}

/// Spatial restriction of a query: a radius around a center, or a box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpatialFilter {
  Radius { center: GeoLocation, radius_km: f64 },
  Bounds(BoundingBox),
}

impl SpatialFilter {
  pub fn contains(&self, location: &GeoLocation) -> bool {
    match self {
      SpatialFilter::Radius { center, radius_km } => {
        center.distance_km(location) <= *radius_km
      }
      SpatialFilter::Bounds(bbox) => bbox.contains(location),
    }
  }
}

/// A validated telemetry query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryQuery {
  organization_id: String,
  #[serde(skip_serializing_if = "Vec::is_empty", default)]
  device_ids: Vec<DeviceId>,
  #[serde(skip_serializing_if = "Option::is_none")]
  from_time: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  to_time: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Vec::is_empty", default)]
  metric_names: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  spatial: Option<SpatialFilter>,
  #[serde(skip_serializing_if = "Option::is_none")]
  aggregation: Option<AggregationType>,
  #[serde(skip_serializing_if = "Option::is_none")]
  limit: Option<usize>,
}

impl TelemetryQuery {
  pub fn builder(organization_id: impl Into<String>) -> TelemetryQueryBuilder {
    TelemetryQueryBuilder {
      organization_id: organization_id.into(),
      device_ids: Vec::new(),
      from_time: None,
      to_time: None,
      metric_names: Vec::new(),
      radius: None,
      bounds: None,
      aggregation: None,
      limit: None,
    }
  }

  pub fn organization_id(&self) -> &str {
    &self.organization_id
  }

  pub fn device_ids(&self) -> &[DeviceId] {
    &self.device_ids
  }

  pub fn from_time(&self) -> Option<DateTime<Utc>> {
    self.from_time
  }

  pub fn to_time(&self) -> Option<DateTime<Utc>> {
    self.to_time
  }

  pub fn metric_names(&self) -> &[String] {
    &self.metric_names
  }

  pub fn spatial(&self) -> Option<&SpatialFilter> {
    self.spatial.as_ref()
  }

  pub fn aggregation(&self) -> Option<AggregationType> {
    self.aggregation
  }

  pub fn limit(&self) -> Option<usize> {
    self.limit
  }

  /// Whether a record satisfies every filter of this query.
  pub fn matches(&self, record: &TelemetryData) -> bool {
    if record.organization_id() != self.organization_id {
      return false;
    }
    if !self.device_ids.is_empty() && !self.device_ids.contains(record.device_id()) {
      return false;
    }
    if let Some(from) = self.from_time
      && record.timestamp() < from
    {
      return false;
    }
    if let Some(to) = self.to_time
      && record.timestamp() > to
    {
      return false;
    }
    if !self.metric_names.is_empty()
      && !self
        .metric_names
        .iter()
        .any(|name| record.metric(name).is_some())
    {
      return false;
    }
    if let Some(spatial) = &self.spatial {
      match record.location() {
        Some(location) => {
          if !spatial.contains(location) {
            return false;
          }
        }
        None => return false,
      }
    }
    true
  }
}

/// Builder enforcing the query's cross-field constraints.
#[derive(Debug, Clone)]
pub struct TelemetryQueryBuilder {
  organization_id: String,
  device_ids: Vec<DeviceId>,
  from_time: Option<DateTime<Utc>>,
  to_time: Option<DateTime<Utc>>,
  metric_names: Vec<String>,
  radius: Option<(GeoLocation, f64)>,
  bounds: Option<BoundingBox>,
  aggregation: Option<AggregationType>,
  limit: Option<i64>,
}

impl TelemetryQueryBuilder {
  pub fn device_ids(mut self, device_ids: impl IntoIterator<Item = DeviceId>) -> Self {
    self.device_ids = device_ids.into_iter().collect();
    self
  }

  pub fn from_time(mut self, from: DateTime<Utc>) -> Self {
    self.from_time = Some(from);
    self
  }

  pub fn to_time(mut self, to: DateTime<Utc>) -> Self {
    self.to_time = Some(to);
    self
  }

  pub fn between(self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
    self.from_time(from).to_time(to)
  }

  pub fn metric_names(
    mut self,
    names: impl IntoIterator<Item = impl Into<String>>,
  ) -> Self {
    self.metric_names = names.into_iter().map(Into::into).collect();
    self
  }

  /// Restrict results to a radius (km) around a center. Center and radius
  /// always travel together.
  pub fn within_radius(mut self, center: GeoLocation, radius_km: f64) -> Self {
    self.radius = Some((center, radius_km));
    self
  }

  pub fn bounding_box(mut self, bounds: BoundingBox) -> Self {
    self.bounds = Some(bounds);
    self
  }

  pub fn aggregation(mut self, aggregation: AggregationType) -> Self {
    self.aggregation = Some(aggregation);
    self
  }

  pub fn limit(mut self, limit: i64) -> Self {
    self.limit = Some(limit);
    self
  }

  pub fn build(self) -> Result<TelemetryQuery, TelemetryError> {
    if self.organization_id.trim().is_empty() {
      return Err(TelemetryError::EmptyOrganization);
    }
    if let (Some(from), Some(to)) = (self.from_time, self.to_time)
      && from > to
    {
      return Err(TelemetryError::InvalidTimeRange { from, to });
    }
    if self.radius.is_some() && self.bounds.is_some() {
      return Err(TelemetryError::ConflictingSpatialFilters);
    }

    let spatial = match (self.radius, self.bounds) {
      (Some((center, radius_km)), None) => {
        if radius_km <= 0.0 {
          return Err(TelemetryError::NonPositiveRadius(radius_km));
        }
        Some(SpatialFilter::Radius { center, radius_km })
      }
      (None, Some(bounds)) => Some(SpatialFilter::Bounds(bounds)),
      (None, None) => None,
      (Some(_), Some(_)) => unreachable!("checked above"),
    };

    let limit = match self.limit {
      Some(limit) if limit <= 0 => return Err(TelemetryError::NonPositiveLimit(limit)),
      Some(limit) => Some(limit as usize),
      None => None,
    };

    Ok(TelemetryQuery {
      organization_id: self.organization_id,
      device_ids: self.device_ids,
      from_time: self.from_time,
      to_time: self.to_time,
      metric_names: self.metric_names,
      spatial,
      aggregation: self.aggregation,
      limit,
    })
  }
}

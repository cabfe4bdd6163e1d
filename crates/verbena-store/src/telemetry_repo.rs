use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use verbena_model::{BoundingBox, DeviceId, GeoLocation};
use verbena_telemetry::{AggregationType, TelemetryData, TelemetryQuery};

use crate::StoreError;
use crate::types::{AggregateBucket, DeviceSummary, MetricStatistics, TelemetryPage};

/// Persistence port for telemetry records.
///
/// Writes distinguish plain time-series records from spatial ones (which
/// must carry a location); reads cover time, device, metric, and spatial
/// axes plus the polymorphic [`query`](TelemetryRepository::query).
#[async_trait]
pub trait TelemetryRepository: Send + Sync {
  async fn save_time_series(&self, record: &TelemetryData) -> Result<(), StoreError>;

  /// Save a record that carries a location. Fails with
  /// [`StoreError::MissingLocation`] otherwise.
  async fn save_spatial_data(&self, record: &TelemetryData) -> Result<(), StoreError>;

  /// Save many records; returns how many were stored.
  async fn save_batch(&self, records: &[TelemetryData]) -> Result<usize, StoreError>;

  /// Records in a time range, optionally restricted to one device and a
  /// set of metric names.
  async fn query_time_series(
    &self,
    device_id: Option<&DeviceId>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    metrics: Option<&[String]>,
  ) -> Result<Vec<TelemetryData>, StoreError>;

  /// An organization's records from the trailing window.
  async fn query_recent_data(
    &self,
    organization_id: &str,
    window: Duration,
  ) -> Result<Vec<TelemetryData>, StoreError>;

  /// An organization's records from the last minute.
  async fn query_real_time_data(
    &self,
    organization_id: &str,
  ) -> Result<Vec<TelemetryData>, StoreError>;

  async fn query_spatial(&self, bounds: &BoundingBox) -> Result<Vec<TelemetryData>, StoreError>;

  async fn query_spatial_between(
    &self,
    bounds: &BoundingBox,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> Result<Vec<TelemetryData>, StoreError>;

  async fn query_by_radius(
    &self,
    center: &GeoLocation,
    radius_km: f64,
  ) -> Result<Vec<TelemetryData>, StoreError>;

  async fn query_by_radius_between(
    &self,
    center: &GeoLocation,
    radius_km: f64,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> Result<Vec<TelemetryData>, StoreError>;

  /// An organization's records carrying the given metric.
  async fn query_by_metric(
    &self,
    organization_id: &str,
    metric: &str,
  ) -> Result<Vec<TelemetryData>, StoreError>;

  async fn query_by_metric_between(
    &self,
    organization_id: &str,
    metric: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> Result<Vec<TelemetryData>, StoreError>;

  /// The polymorphic query: every filter of [`TelemetryQuery`] applied,
  /// first page.
  async fn query(&self, query: &TelemetryQuery) -> Result<TelemetryPage, StoreError>;

  /// Continue a paged query with a token from a previous page.
  async fn query_page(
    &self,
    query: &TelemetryQuery,
    page_token: Option<&str>,
  ) -> Result<TelemetryPage, StoreError>;

  /// Time-bucketed aggregation of the records matched by `query`.
  async fn aggregate(
    &self,
    query: &TelemetryQuery,
    aggregation: AggregationType,
    interval: Duration,
  ) -> Result<Vec<AggregateBucket>, StoreError>;

  async fn metric_statistics(
    &self,
    device_id: &DeviceId,
    metric: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> Result<MetricStatistics, StoreError>;

  async fn device_summaries(
    &self,
    organization_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> Result<Vec<DeviceSummary>, StoreError>;

  /// Delete records older than the cutoff. Returns how many were removed.
  async fn delete_old_data(&self, before: DateTime<Utc>) -> Result<usize, StoreError>;

  async fn delete_by_device(&self, device_id: &DeviceId) -> Result<usize, StoreError>;

  async fn count(&self, organization_id: &str) -> Result<usize, StoreError>;

  async fn latest_timestamp(
    &self,
    organization_id: &str,
  ) -> Result<Option<DateTime<Utc>>, StoreError>;

  async fn earliest_timestamp(
    &self,
    organization_id: &str,
  ) -> Result<Option<DateTime<Utc>>, StoreError>;

  /// Devices with at least one record since the given instant, sorted.
  async fn active_devices(
    &self,
    organization_id: &str,
    since: DateTime<Utc>,
  ) -> Result<Vec<DeviceId>, StoreError>;
}

//! In-memory telemetry repository.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use verbena_model::{BoundingBox, DeviceId, GeoLocation};
use verbena_telemetry::{AggregationType, TelemetryData, TelemetryQuery};

use crate::StoreError;
use crate::telemetry_repo::TelemetryRepository;
use crate::types::{AggregateBucket, DeviceSummary, MetricStatistics, TelemetryPage};

/// Trailing window served by `query_real_time_data`.
const REAL_TIME_WINDOW_SECONDS: i64 = 60;

/// Vec-backed [`TelemetryRepository`] for tests and embedded use.
#[derive(Debug, Default)]
pub struct MemoryTelemetryRepository {
  records: RwLock<Vec<TelemetryData>>,
}

impl MemoryTelemetryRepository {
  pub fn new() -> Self {
    Self {
      records: RwLock::new(Vec::new()),
    }
  }

  fn filtered<F>(&self, predicate: F) -> Vec<TelemetryData>
  where
    F: Fn(&TelemetryData) -> bool,
  {
    let records = self.records.read().unwrap_or_else(|e| e.into_inner());
    let mut matched: Vec<TelemetryData> =
      records.iter().filter(|r| predicate(r)).cloned().collect();
    matched.sort_by_key(|r| r.timestamp());
    matched
  }
}

#[async_trait]
impl TelemetryRepository for MemoryTelemetryRepository {
  async fn save_time_series(&self, record: &TelemetryData) -> Result<(), StoreError> {
    let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
    records.push(record.clone());
    Ok(())
  }

  async fn save_spatial_data(&self, record: &TelemetryData) -> Result<(), StoreError> {
    if record.location().is_none() {
      return Err(StoreError::MissingLocation);
    }
    self.save_time_series(record).await
  }

  async fn save_batch(&self, batch: &[TelemetryData]) -> Result<usize, StoreError> {
    let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
    records.extend_from_slice(batch);
    Ok(batch.len())
  }

  async fn query_time_series(
    &self,
    device_id: Option<&DeviceId>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    metrics: Option<&[String]>,
  ) -> Result<Vec<TelemetryData>, StoreError> {
    Ok(self.filtered(|r| {
      if let Some(device) = device_id
        && r.device_id() != device
      {
        return false;
      }
      if r.timestamp() < from || r.timestamp() > to {
        return false;
      }
      if let Some(metrics) = metrics
        && !metrics.iter().any(|m| r.metric(m).is_some())
      {
        return false;
      }
      true
    }))
  }

  async fn query_recent_data(
    &self,
    organization_id: &str,
    window: Duration,
  ) -> Result<Vec<TelemetryData>, StoreError> {
    let cutoff = Utc::now() - window;
    Ok(self.filtered(|r| r.organization_id() == organization_id && r.timestamp() >= cutoff))
  }

  async fn query_real_time_data(
    &self,
    organization_id: &str,
  ) -> Result<Vec<TelemetryData>, StoreError> {
    self
      .query_recent_data(organization_id, Duration::seconds(REAL_TIME_WINDOW_SECONDS))
      .await
  }

  async fn query_spatial(&self, bounds: &BoundingBox) -> Result<Vec<TelemetryData>, StoreError> {
    Ok(self.filtered(|r| r.location().is_some_and(|l| bounds.contains(l))))
  }

  async fn query_spatial_between(
    &self,
    bounds: &BoundingBox,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> Result<Vec<TelemetryData>, StoreError> {
    Ok(self.filtered(|r| {
      r.location().is_some_and(|l| bounds.contains(l))
        && r.timestamp() >= from
        && r.timestamp() <= to
    }))
  }

  async fn query_by_radius(
    &self,
    center: &GeoLocation,
    radius_km: f64,
  ) -> Result<Vec<TelemetryData>, StoreError> {
    Ok(self.filtered(|r| {
      r.location()
        .is_some_and(|l| center.distance_km(l) <= radius_km)
    }))
  }

  async fn query_by_radius_between(
    &self,
    center: &GeoLocation,
    radius_km: f64,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> Result<Vec<TelemetryData>, StoreError> {
    Ok(self.filtered(|r| {
      r.location()
        .is_some_and(|l| center.distance_km(l) <= radius_km)
        && r.timestamp() >= from
        && r.timestamp() <= to
    }))
  }

  async fn query_by_metric(
    &self,
    organization_id: &str,
    metric: &str,
  ) -> Result<Vec<TelemetryData>, StoreError> {
    Ok(self.filtered(|r| r.organization_id() == organization_id && r.metric(metric).is_some()))
  }

  async fn query_by_metric_between(
    &self,
    organization_id: &str,
    metric: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> Result<Vec<TelemetryData>, StoreError> {
    Ok(self.filtered(|r| {
      r.organization_id() == organization_id
        && r.metric(metric).is_some()
        && r.timestamp() >= from
        && r.timestamp() <= to
    }))
  }

  async fn query(&self, query: &TelemetryQuery) -> Result<TelemetryPage, StoreError> {
    self.query_page(query, None).await
  }

  async fn query_page(
    &self,
    query: &TelemetryQuery,
    page_token: Option<&str>,
  ) -> Result<TelemetryPage, StoreError> {
    let offset = match page_token {
      Some(token) => token
        .parse::<usize>()
        .map_err(|_| StoreError::InvalidPageToken(token.to_string()))?,
      None => 0,
    };

    let matched = self.filtered(|r| query.matches(r));
    let total_count = matched.len();
    let page_size = query.limit().unwrap_or(total_count.max(1));
    let data: Vec<TelemetryData> = matched.into_iter().skip(offset).take(page_size).collect();
    let consumed = offset + data.len();
    let has_more = consumed < total_count;

    Ok(TelemetryPage {
      data,
      total_count,
      has_more,
      next_page_token: has_more.then(|| consumed.to_string()),
    })
  }

  async fn aggregate(
    &self,
    query: &TelemetryQuery,
    aggregation: AggregationType,
    interval: Duration,
  ) -> Result<Vec<AggregateBucket>, StoreError> {
    let interval_ms = interval.num_milliseconds();
    if interval_ms <= 0 {
      return Err(StoreError::Backend {
        context: "aggregate".to_string(),
        message: format!("interval must be positive, got {interval_ms}ms"),
      });
    }

    let matched = self.filtered(|r| query.matches(r));

    // (bucket start, metric) -> numeric samples.
    let mut buckets: BTreeMap<(i64, String), Vec<f64>> = BTreeMap::new();
    for record in &matched {
      let bucket_start = record.timestamp().timestamp_millis().div_euclid(interval_ms) * interval_ms;
      for (name, value) in record.metrics() {
        let Ok(value) = value.numeric() else {
          continue;
        };
        if !query.metric_names().is_empty()
          && !query.metric_names().iter().any(|m| m == name)
        {
          continue;
        }
        buckets
          .entry((bucket_start, name.clone()))
          .or_default()
          .push(value);
      }
    }

    Ok(
      buckets
        .into_iter()
        .map(|((bucket_start, metric), values)| AggregateBucket {
          timestamp: DateTime::from_timestamp_millis(bucket_start)
            .unwrap_or_else(Utc::now),
          metric,
          value: aggregation.apply(&values),
          count: values.len(),
          aggregation,
        })
        .collect(),
    )
  }

  async fn metric_statistics(
    &self,
    device_id: &DeviceId,
    metric: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> Result<MetricStatistics, StoreError> {
    let values: Vec<f64> = self
      .filtered(|r| {
        r.device_id() == device_id && r.timestamp() >= from && r.timestamp() <= to
      })
      .iter()
      .filter_map(|r| r.metric(metric).and_then(|v| v.numeric().ok()))
      .collect();

    if values.is_empty() {
      return Ok(MetricStatistics {
        metric: metric.to_string(),
        count: 0,
        min: 0.0,
        max: 0.0,
        avg: 0.0,
        std_dev: 0.0,
      });
    }

    let count = values.len();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = values.iter().sum::<f64>() / count as f64;
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / count as f64;

    Ok(MetricStatistics {
      metric: metric.to_string(),
      count,
      min,
      max,
      avg,
      std_dev: variance.sqrt(),
    })
  }

  async fn device_summaries(
    &self,
    organization_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> Result<Vec<DeviceSummary>, StoreError> {
    let matched = self.filtered(|r| {
      r.organization_id() == organization_id && r.timestamp() >= from && r.timestamp() <= to
    });

    let mut summaries: BTreeMap<DeviceId, DeviceSummary> = BTreeMap::new();
    for record in &matched {
      let summary = summaries
        .entry(record.device_id().clone())
        .or_insert_with(|| DeviceSummary {
          device_id: record.device_id().clone(),
          record_count: 0,
          first_seen: record.timestamp(),
          last_seen: record.timestamp(),
          metrics: Vec::new(),
        });
      summary.record_count += 1;
      summary.first_seen = summary.first_seen.min(record.timestamp());
      summary.last_seen = summary.last_seen.max(record.timestamp());
      for name in record.metrics().keys() {
        if !summary.metrics.contains(name) {
          summary.metrics.push(name.clone());
        }
      }
    }

    Ok(
      summaries
        .into_values()
        .map(|mut summary| {
          summary.metrics.sort();
          summary
        })
        .collect(),
    )
  }

  async fn delete_old_data(&self, before: DateTime<Utc>) -> Result<usize, StoreError> {
    let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
    let len_before = records.len();
    records.retain(|r| r.timestamp() >= before);
    Ok(len_before - records.len())
  }

  async fn delete_by_device(&self, device_id: &DeviceId) -> Result<usize, StoreError> {
    let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
    let len_before = records.len();
    records.retain(|r| r.device_id() != device_id);
    Ok(len_before - records.len())
  }

  async fn count(&self, organization_id: &str) -> Result<usize, StoreError> {
    let records = self.records.read().unwrap_or_else(|e| e.into_inner());
    Ok(
      records
        .iter()
        .filter(|r| r.organization_id() == organization_id)
        .count(),
    )
  }

  async fn latest_timestamp(
    &self,
    organization_id: &str,
  ) -> Result<Option<DateTime<Utc>>, StoreError> {
    let records = self.records.read().unwrap_or_else(|e| e.into_inner());
    Ok(
      records
        .iter()
        .filter(|r| r.organization_id() == organization_id)
        .map(|r| r.timestamp())
        .max(),
    )
  }

  async fn earliest_timestamp(
    &self,
    organization_id: &str,
  ) -> Result<Option<DateTime<Utc>>, StoreError> {
    let records = self.records.read().unwrap_or_else(|e| e.into_inner());
    Ok(
      records
        .iter()
        .filter(|r| r.organization_id() == organization_id)
        .map(|r| r.timestamp())
        .min(),
    )
  }

  async fn active_devices(
    &self,
    organization_id: &str,
    since: DateTime<Utc>,
  ) -> Result<Vec<DeviceId>, StoreError> {
    let records = self.records.read().unwrap_or_else(|e| e.into_inner());
    let mut devices: Vec<DeviceId> = records
      .iter()
      .filter(|r| r.organization_id() == organization_id && r.timestamp() >= since)
      .map(|r| r.device_id().clone())
      .collect();
    devices.sort();
    devices.dedup();
    Ok(devices)
  }
}

//! Telemetry analysis: per-metric statistics, anomalies, and trends.
//!
//! Results are a deterministic function of the queried data. A short TTL
//! cache keyed by the query avoids recomputing hot analyses.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use verbena_model::DeviceId;
use verbena_store::TelemetryRepository;
use verbena_telemetry::{TelemetryData, TelemetryQuery};

use crate::error::IngestError;

/// How long a cached analysis stays fresh.
const CACHE_TTL: Duration = Duration::from_secs(30);

/// Percentile levels reported per metric.
const PERCENTILE_LEVELS: [u8; 5] = [25, 50, 75, 95, 99];

/// Samples further than this many standard deviations from the mean are
/// anomalies.
const ANOMALY_SIGMA: f64 = 3.0;

/// Relative band within which a metric counts as stable.
const TREND_BAND: f64 = 0.05;

/// Distribution summary of one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricProfile {
  pub count: usize,
  pub min: f64,
  pub max: f64,
  pub avg: f64,
  pub std_dev: f64,
  /// `(level, value)` pairs for the levels in [`PERCENTILE_LEVELS`].
  pub percentiles: Vec<(u8, f64)>,
}

/// A sample unusually far from its metric's mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
  pub device_id: DeviceId,
  pub metric: String,
  pub value: f64,
  pub timestamp: DateTime<Utc>,
  /// Distance from the mean in standard deviations.
  pub deviation_sigma: f64,
}

/// Direction a metric moved across the queried range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
  Rising,
  Falling,
  Stable,
}

/// The full analysis result for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryAnalysis {
  pub organization_id: String,
  pub record_count: usize,
  pub metrics: BTreeMap<String, MetricProfile>,
  pub anomalies: Vec<Anomaly>,
  pub trends: BTreeMap<String, Trend>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
  organization_id: String,
  from: Option<i64>,
  to: Option<i64>,
  query_hash: u64,
}

/// Computes and caches telemetry analyses over the repository port.
pub struct Analyzer {
  repository: Arc<dyn TelemetryRepository>,
  cache: Mutex<HashMap<CacheKey, (Instant, Arc<TelemetryAnalysis>)>>,
  ttl: Duration,
}

impl Analyzer {
  pub fn new(repository: Arc<dyn TelemetryRepository>) -> Self {
    Self::with_ttl(repository, CACHE_TTL)
  }

  pub fn with_ttl(repository: Arc<dyn TelemetryRepository>, ttl: Duration) -> Self {
    Self {
      repository,
      cache: Mutex::new(HashMap::new()),
      ttl,
    }
  }

  /// Analyze the records matched by a query, serving from cache when a
  /// fresh result exists.
  pub async fn analyze(
    &self,
    query: &TelemetryQuery,
  ) -> Result<Arc<TelemetryAnalysis>, IngestError> {
    let key = cache_key(query);

    {
      let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
      if let Some((cached_at, analysis)) = cache.get(&key)
        && cached_at.elapsed() < self.ttl
      {
        return Ok(analysis.clone());
      }
    }

    let page = self.repository.query(query).await?;
    let analysis = Arc::new(compute(query.organization_id(), &page.data));

    let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
    cache.retain(|_, (cached_at, _)| cached_at.elapsed() < self.ttl);
    cache.insert(key, (Instant::now(), analysis.clone()));
    Ok(analysis)
  }
}

fn cache_key(query: &TelemetryQuery) -> CacheKey {
  let mut hasher = DefaultHasher::new();
  // The serialized query covers every filter field.
  serde_json::to_string(query)
    .unwrap_or_default()
    .hash(&mut hasher);
  CacheKey {
    organization_id: query.organization_id().to_string(),
    from: query.from_time().map(|t| t.timestamp_millis()),
    to: query.to_time().map(|t| t.timestamp_millis()),
    query_hash: hasher.finish(),
  }
}

fn compute(organization_id: &str, records: &[TelemetryData]) -> TelemetryAnalysis {
  // Per-metric numeric samples in timestamp order, with their origin.
  let mut series: BTreeMap<String, Vec<(DateTime<Utc>, DeviceId, f64)>> = BTreeMap::new();
  let mut ordered: Vec<&TelemetryData> = records.iter().collect();
  ordered.sort_by_key(|r| r.timestamp());

  for record in ordered {
    for (name, value) in record.metrics() {
      let Ok(value) = value.numeric() else {
        continue;
      };
      series.entry(name.clone()).or_default().push((
        record.timestamp(),
        record.device_id().clone(),
        value,
      ));
    }
  }

  let mut metrics = BTreeMap::new();
  let mut anomalies = Vec::new();
  let mut trends = BTreeMap::new();

  for (name, samples) in &series {
    let values: Vec<f64> = samples.iter().map(|(_, _, v)| *v).collect();
    let profile = profile(&values);

    if profile.std_dev > 0.0 {
      for (timestamp, device_id, value) in samples {
        let deviation = (value - profile.avg).abs() / profile.std_dev;
        if deviation > ANOMALY_SIGMA {
          anomalies.push(Anomaly {
            device_id: device_id.clone(),
            metric: name.clone(),
            value: *value,
            timestamp: *timestamp,
            deviation_sigma: deviation,
          });
        }
      }
    }

    trends.insert(name.clone(), trend(&values));
    metrics.insert(name.clone(), profile);
  }

  TelemetryAnalysis {
    organization_id: organization_id.to_string(),
    record_count: records.len(),
    metrics,
    anomalies,
    trends,
  }
}

fn profile(values: &[f64]) -> MetricProfile {
  let count = values.len();
  if count == 0 {
    return MetricProfile {
      count: 0,
      min: 0.0,
      max: 0.0,
      avg: 0.0,
      std_dev: 0.0,
      percentiles: PERCENTILE_LEVELS.iter().map(|&p| (p, 0.0)).collect(),
    };
  }

  let mut sorted = values.to_vec();
  sorted.sort_by(|a, b| a.total_cmp(b));

  let min = sorted[0];
  let max = sorted[count - 1];
  let avg = sorted.iter().sum::<f64>() / count as f64;
  let variance = sorted.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / count as f64;

  let percentiles = PERCENTILE_LEVELS
    .iter()
    .map(|&level| (level, nearest_rank(&sorted, level)))
    .collect();

  MetricProfile {
    count,
    min,
    max,
    avg,
    std_dev: variance.sqrt(),
    percentiles,
  }
}

/// Nearest-rank percentile over a sorted, non-empty sample.
fn nearest_rank(sorted: &[f64], level: u8) -> f64 {
  let rank = ((level as f64 / 100.0) * sorted.len() as f64).ceil() as usize;
  sorted[rank.clamp(1, sorted.len()) - 1]
}

/// Compare the second half of the series against the first.
fn trend(values: &[f64]) -> Trend {
  if values.len() < 4 {
    return Trend::Stable;
  }
  let mid = values.len() / 2;
  let first = values[..mid].iter().sum::<f64>() / mid as f64;
  let second = values[mid..].iter().sum::<f64>() / (values.len() - mid) as f64;

  if first == 0.0 {
    return if second > 0.0 {
      Trend::Rising
    } else if second < 0.0 {
      Trend::Falling
    } else {
      Trend::Stable
    };
  }

  let ratio = second / first;
  if ratio > 1.0 + TREND_BAND {
    Trend::Rising
  } else if ratio < 1.0 - TREND_BAND {
    Trend::Falling
  } else {
    Trend::Stable
  }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
  #[error("{kind} must not be empty")]
  EmptyIdentifier { kind: &'static str },

  #[error("latitude {0} is out of range [-90, 90]")]
  LatitudeOutOfRange(f64),

  #[error("longitude {0} is out of range [-180, 180]")]
  LongitudeOutOfRange(f64),

  #[error("bounding box has min {axis} greater than max {axis}")]
  InvertedBounds { axis: &'static str },

  #[error("metric value is {actual}, expected {expected}")]
  MetricTypeMismatch {
    expected: &'static str,
    actual: &'static str,
  },
}

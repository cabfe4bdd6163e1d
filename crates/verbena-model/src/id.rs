//! Opaque identifier types.
//!
//! Each identifier wraps a non-empty string. Identifiers are value-equal,
//! hashable, and usable as map keys. `generate()` produces a random unique
//! identifier for the kind.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

macro_rules! identifier {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct $name(String);

    impl $name {
      /// Wrap an existing identifier string. Rejects empty or
      /// whitespace-only input.
      pub fn new(value: impl Into<String>) -> Result<Self, ModelError> {
        let value = value.into();
        if value.trim().is_empty() {
          return Err(ModelError::EmptyIdentifier {
            kind: stringify!($name),
          });
        }
        Ok(Self(value))
      }

      /// Generate a random unique identifier.
      pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
      }

      pub fn as_str(&self) -> &str {
        &self.0
      }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
      }
    }

    impl AsRef<str> for $name {
      fn as_ref(&self) -> &str {
        &self.0
      }
    }
  };
}

identifier!(
  /// Identifies a workflow aggregate.
  WorkflowId
);
identifier!(
  /// Identifies a node within a workflow.
  NodeId
);
identifier!(
  /// Identifies an edge within a workflow.
  EdgeId
);
identifier!(
  /// Identifies one live run of a workflow.
  ExecutionId
);
identifier!(
  /// Identifies the device a telemetry record came from.
  DeviceId
);
identifier!(
  /// Identifies a single telemetry record.
  TelemetryId
);

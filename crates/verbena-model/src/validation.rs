//! Validation reporting shared by the workflow and condition validators.

use serde::{Deserialize, Serialize};

/// Outcome of a validation pass: errors make the subject invalid, warnings
/// do not.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
  pub valid: bool,
  pub errors: Vec<String>,
  pub warnings: Vec<String>,
}

impl ValidationResult {
  pub fn new() -> Self {
    Self {
      valid: true,
      errors: Vec::new(),
      warnings: Vec::new(),
    }
  }

  pub fn add_error(&mut self, message: impl Into<String>) {
    self.valid = false;
    self.errors.push(message.into());
  }

  pub fn add_warning(&mut self, message: impl Into<String>) {
    self.warnings.push(message.into());
  }

  /// Fold another result into this one.
  pub fn merge(&mut self, other: ValidationResult) {
    self.valid = self.valid && other.valid;
    self.errors.extend(other.errors);
    self.warnings.extend(other.warnings);
  }
}

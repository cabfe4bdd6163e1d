use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConditionError {
  #[error("condition leaf is missing '{0}'")]
  MissingKey(&'static str),

  #[error("unknown logical operator '{0}'")]
  UnknownLogicalOperator(String),

  #[error("malformed condition expression '{0}'")]
  MalformedExpression(String),

  #[error("unsupported condition value: {0}")]
  UnsupportedValue(String),
}

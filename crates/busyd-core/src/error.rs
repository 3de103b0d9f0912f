use thiserror::Error;

/// Errors raised while building a [`VisibilityEngine`](crate::engine::VisibilityEngine).
///
/// Runtime input never produces an error; only construction can fail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid config: `{field}` must be >= 0, got {value}")]
    InvalidConfig { field: &'static str, value: i64 },
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

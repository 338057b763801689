//! Library error types.
//!
//! Everything here is a configuration error: the scoring spec was authored
//! wrong. Missing facts and hard rejections are never errors.

#[derive(Debug, thiserror::Error)]
pub enum SpecError {
    #[error("Invalid range token '{token}': {reason}")]
    InvalidRange { token: String, reason: String },

    #[error("Unknown metric '{name}'")]
    UnknownMetric { name: String },

    #[error("Unknown mode '{0}'")]
    UnknownMode(String),

    #[error("Invalid scoring spec:\n  - {}", .0.join("\n  - "))]
    Invalid(Vec<String>),
}

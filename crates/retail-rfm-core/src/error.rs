use thiserror::Error;

#[derive(Debug, Error)]
pub enum RfmError {
    #[error("Validation error: {field} — {reason}")]
    Validation { field: String, reason: String },

    #[error("Scoring error: cannot bin {metric} into {bins} bins — {reason}")]
    Scoring {
        metric: String,
        bins: u32,
        reason: String,
    },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl RfmError {
    pub(crate) fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        RfmError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for RfmError {
    fn from(e: serde_json::Error) -> Self {
        RfmError::SerializationError(e.to_string())
    }
}

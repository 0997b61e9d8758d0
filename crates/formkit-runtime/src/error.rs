//! Error types for the runtime controllers

use formkit_client::ServiceError;
use formkit_core::FieldErrors;
use std::path::PathBuf;

/// Client-side storage failures
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed
    #[error("storage I/O failed for {path}: {source}")]
    Io {
        /// Backing file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Backing file exists but does not hold a string map
    #[error("storage file {path} is corrupt: {message}")]
    Corrupt {
        /// Backing file
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// Value could not be encoded
    #[error("failed to encode stored value: {0}")]
    Encode(String),
}

/// Failures of the respondent session outside of submit
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Session was submitted or closed
    #[error("session is closed")]
    Closed,

    /// Form has nothing to fill
    #[error("form {0} has no cards")]
    EmptyForm(String),

    /// Change names a field the form does not collect
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// Background work needs a tokio runtime
    #[error("no async runtime available: {0}")]
    NoRuntime(String),
}

/// Failures of the final submit
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubmitError {
    /// Required fields are empty; nothing was sent
    #[error("{} required field(s) are empty", errors.len())]
    Validation {
        /// Error message per field id
        errors: FieldErrors,
    },

    /// Service rejected or did not answer the final save
    #[error("submission failed: {0}")]
    Service(#[from] ServiceError),

    /// Session was already submitted or closed
    #[error("session is closed")]
    Closed,
}

impl SubmitError {
    /// Whether the respondent can fix this by editing answers
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Whether retrying the same submit may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Service(e) => e.is_transient(),
            Self::Validation { .. } | Self::Closed => false,
        }
    }

    /// Message shown to the respondent
    #[must_use]
    pub fn alert_message(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "Please fill in all required fields.",
            Self::Service(_) => "Submission failed. Please try again.",
            Self::Closed => "This form has already been submitted.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_error_classification() {
        let mut errors = FieldErrors::new();
        errors.insert("email".to_string(), formkit_core::REQUIRED_MESSAGE.to_string());
        let validation = SubmitError::Validation { errors };
        assert!(validation.is_validation());
        assert!(!validation.is_retryable());
        assert_eq!(validation.to_string(), "1 required field(s) are empty");

        let transient = SubmitError::from(ServiceError::Timeout);
        assert!(transient.is_retryable());
        assert!(!SubmitError::from(ServiceError::NotFound("form".into())).is_retryable());
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Validation,
    ImageUnreadable,
    EmptyResponse,
    PayloadTooLarge,
    ServerUnavailable,
    MalformedResponse,
    ServerError,
    Transport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationIssue {
    MissingImages,
    AlreadySubmitting,
    MissingUri,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValidationIssue::MissingImages => "Please select both images.",
            ValidationIssue::AlreadySubmitting => "A comparison is already in progress.",
            ValidationIssue::MissingUri => "The selected image has no location.",
        })
    }
}

/// Every way a comparison can fail. The `Display` text is the default
/// English notification shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("{0}")]
    Validation(ValidationIssue),
    #[error("Could not read image {name}: {reason}")]
    ImageUnreadable { name: String, reason: String },
    #[error("Empty response from server")]
    EmptyResponse,
    #[error("{}", payload_too_large_message(.exact_marker))]
    PayloadTooLarge { exact_marker: bool },
    #[error("Server is temporarily unavailable. Please try again later.")]
    ServerUnavailable,
    #[error("Invalid response format from server")]
    MalformedResponse,
    #[error("{0}")]
    ServerError(String),
    #[error("An error occurred while processing the request: {0}")]
    Transport(String),
}

impl SubmissionError {
    pub fn missing_images() -> Self {
        Self::Validation(ValidationIssue::MissingImages)
    }

    pub fn already_submitting() -> Self {
        Self::Validation(ValidationIssue::AlreadySubmitting)
    }

    pub fn missing_uri() -> Self {
        Self::Validation(ValidationIssue::MissingUri)
    }

    pub fn server_status(status: u16) -> Self {
        Self::ServerError(format!("Server error: {status}"))
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            SubmissionError::Validation(_) => ErrorCode::Validation,
            SubmissionError::ImageUnreadable { .. } => ErrorCode::ImageUnreadable,
            SubmissionError::EmptyResponse => ErrorCode::EmptyResponse,
            SubmissionError::PayloadTooLarge { .. } => ErrorCode::PayloadTooLarge,
            SubmissionError::ServerUnavailable => ErrorCode::ServerUnavailable,
            SubmissionError::MalformedResponse => ErrorCode::MalformedResponse,
            SubmissionError::ServerError(_) => ErrorCode::ServerError,
            SubmissionError::Transport(_) => ErrorCode::Transport,
        }
    }
}

fn payload_too_large_message(exact_marker: &bool) -> &'static str {
    if *exact_marker {
        "Image files are too large. Please try with smaller images."
    } else {
        "Request too large. Please try with smaller images."
    }
}

/// Serializable form of a failure, for machine-readable output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorReport {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<&SubmissionError> for ErrorReport {
    fn from(value: &SubmissionError) -> Self {
        Self::new(value.code(), value.to_string())
    }
}

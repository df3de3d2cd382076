//! Error taxonomy for calls against the pharmacy backend.

use thiserror::Error;

/// Message used when a failed API response carries no `error` field.
pub const DEFAULT_API_ERROR: &str = "API request failed";

/// Message used when a failed upload response carries no `error` field.
pub const DEFAULT_UPLOAD_ERROR: &str = "Upload failed";

#[derive(Debug, Error)]
pub enum ApiError {
    /// The relative endpoint was empty, so no request was built.
    #[error("Endpoint must be a non-empty relative path")]
    InvalidEndpoint,

    /// A caller-supplied header name or value could not be encoded.
    #[error("Invalid header `{0}`")]
    InvalidHeader(String),

    /// The backend answered with a non-2xx status.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The upload endpoint answered with a non-2xx status.
    #[error("{message}")]
    Upload { status: u16, message: String },

    /// Connection-level failure (DNS, refused, reset, TLS).
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not the JSON we expected.
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The upload succeeded but the response did not name the new prescription.
    #[error("No prescription ID returned")]
    MissingPrescriptionId,
}

impl ApiError {
    /// HTTP status for errors that came back from the backend.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } | ApiError::Upload { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Pull the server-supplied message out of an error envelope `{"error": "..."}`.
pub(crate) fn envelope_message(body: &serde_json::Value, fallback: &str) -> String {
    body.get("error")
        .and_then(|e| e.as_str())
        .filter(|e| !e.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

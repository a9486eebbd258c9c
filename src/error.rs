//! Errors raised by the REST layer and during start-up.

use reqwest::StatusCode;
use thiserror::Error;

use crate::session::store::StorageError;

/// Convenient result alias returning [`ApiError`] failures.
pub type ApiResult<T> = Result<T, ApiError>;

/// Failures that can occur while talking to the REST backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build HTTP client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// The request could not be sent or timed out.
    #[error("failed to send request to `{path}`")]
    RequestSend {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// The backend rejected the session; the local session has been cleared.
    #[error("session rejected by backend for `{path}`")]
    Unauthorized {
        path: String,
        message: Option<String>,
    },
    /// The backend answered with a non-success status.
    #[error("unexpected response status {status} for `{path}`")]
    RequestStatus {
        path: String,
        status: StatusCode,
        /// `message` field of the error body, when the backend sent one.
        message: Option<String>,
    },
    /// The response body could not be read.
    #[error("failed to read response body for `{path}`")]
    ReadBody {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// The response body could not be decoded into the expected shape.
    #[error("failed to decode response for `{path}`")]
    DecodeBody {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// The response decoded but is missing required data.
    #[error("invalid response from server: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Message reported by the backend in the error body, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::RequestStatus { message, .. } | ApiError::Unauthorized { message, .. } => {
                message.as_deref()
            }
            _ => None,
        }
    }

    /// HTTP status attached to the failure, if the backend answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::RequestStatus { status, .. } => Some(*status),
            ApiError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            _ => None,
        }
    }

    /// Text shown to users: the server message when present, else the error itself.
    pub fn user_message(&self) -> String {
        self.server_message()
            .map(str::to_owned)
            .unwrap_or_else(|| self.to_string())
    }
}

/// Errors raised while assembling the application root.
#[derive(Debug, Error)]
pub enum InitError {
    /// The persisted session storage could not be opened.
    #[error("failed to open session storage")]
    Storage(#[from] StorageError),
    /// The REST client could not be built.
    #[error("failed to build REST client")]
    Client(#[from] ApiError),
}

//! Error taxonomy for the SDK.
//!
//! DESIGN
//! ======
//! Two layers. [`AuthError`] is the closed set of failure kinds callers are
//! expected to branch on; auth operations hand it back inside the
//! [`Envelope`](crate::types::Envelope). [`Error`] covers everything else
//! (store I/O, construction, config) and travels through `Result::Err`.
//!
//! The status-code classification in [`crate::fetch::handle_error`] is the
//! only protocol decision here: 502/503/504 are retryable, every other
//! failure status is an API error, and a failure without any response is
//! unknown. Classification is informational; nothing in this crate retries.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::session_store::StoreError;
use crate::upload::UploadError;

/// Statuses that signal transient unavailability of the backend.
pub const NETWORK_ERROR_CODES: [u16; 3] = [502, 503, 504];

/// Shared, cloneable handle on an unclassified failure.
pub type Cause = Arc<dyn std::error::Error + Send + Sync>;

// =============================================================================
// AUTH ERROR
// =============================================================================

/// A failure belonging to the auth taxonomy.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    /// The backend answered with a non-transient failure status.
    #[error("{message}")]
    Api { message: String, status: u16 },

    /// The backend was temporarily unreachable (502/503/504) or the response
    /// could not be read in full.
    #[error("{message}")]
    RetryableFetch { message: String, status: u16 },

    /// The caller supplied a credentials shape that no flow accepts. Raised
    /// before any request is made.
    #[error("{message}")]
    InvalidCredentials { message: String },

    /// A success response lacked the fields the flow requires.
    #[error("Auth session or user missing")]
    InvalidTokenResponse,

    /// Anything that could not be classified.
    #[error("{message}")]
    Unknown {
        message: String,
        #[source]
        cause: Option<Cause>,
    },
}

impl AuthError {
    pub(crate) fn invalid_credentials(message: impl Into<String>) -> Self {
        Self::InvalidCredentials { message: message.into() }
    }

    pub(crate) fn unknown<E>(message: impl Into<String>, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Unknown { message: message.into(), cause: Some(Arc::new(cause)) }
    }

    /// Wire name of the error kind.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Api { .. } => "AuthApiError",
            Self::RetryableFetch { .. } => "AuthRetryableFetchError",
            Self::InvalidCredentials { .. } => "AuthInvalidCredentialsError",
            Self::InvalidTokenResponse => "AuthInvalidTokenResponseError",
            Self::Unknown { .. } => "AuthUnknownError",
        }
    }

    /// HTTP-like status attached to the error, if the kind carries one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } | Self::RetryableFetch { status, .. } => Some(*status),
            Self::InvalidCredentials { .. } => Some(400),
            Self::InvalidTokenResponse => Some(500),
            Self::Unknown { .. } => None,
        }
    }

    /// Grepable code for logs and CLI output.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Api { .. } => "E_AUTH_API",
            Self::RetryableFetch { .. } => "E_AUTH_RETRYABLE_FETCH",
            Self::InvalidCredentials { .. } => "E_AUTH_INVALID_CREDENTIALS",
            Self::InvalidTokenResponse => "E_AUTH_INVALID_TOKEN_RESPONSE",
            Self::Unknown { .. } => "E_AUTH_UNKNOWN",
        }
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RetryableFetch { .. })
    }

    /// The original failure behind an [`AuthError::Unknown`].
    #[must_use]
    pub fn cause(&self) -> Option<&Cause> {
        match self {
            Self::Unknown { cause, .. } => cause.as_ref(),
            _ => None,
        }
    }

    /// JSON form `{name, message, status}`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name(),
            "message": self.to_string(),
            "status": self.status(),
        })
    }
}

// =============================================================================
// CRATE ERROR
// =============================================================================

/// Failures outside the auth taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A taxonomy error on its way to an envelope.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A required construction parameter was empty.
    #[error("{0} is required.")]
    MissingParameter(&'static str),

    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The session store failed to read, write or delete.
    #[error("session store failed: {0}")]
    Store(#[from] StoreError),

    /// A session could not be encoded for storage.
    #[error("session encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

// =============================================================================
// RPC ERROR
// =============================================================================

/// Failure of a remote function invocation. `context` carries the server
/// payload when the backend answered.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct RpcError {
    pub message: String,
    pub status: Option<u16>,
    pub context: Option<Value>,
}

impl RpcError {
    pub(crate) const DEFAULT_MESSAGE: &'static str = "Failed to send a Rpc";

    #[must_use]
    pub fn name(&self) -> &'static str {
        "RpcError"
    }
}

// =============================================================================
// STORAGE ERROR
// =============================================================================

/// Error value carried in a storage envelope. Never returned as `Err`.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The upload went through but its response body is not JSON; the raw
    /// body is handed back as is.
    #[error("{0}")]
    InvalidBody(String),

    /// The upload itself failed.
    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl StorageError {
    /// Raw response body, when the upload reached the server.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::InvalidBody(body) => Some(body),
            Self::Upload(_) => None,
        }
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

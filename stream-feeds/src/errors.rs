//! Unified error types for the `stream-feeds` crate.
//!
//! Every failure surfaces as one top-level [`Error`] plus the [`Result`] alias.
//! Lower-level errors (token signing, feed id validation, URL parsing,
//! transport failures) are mapped into structured variants so callers can
//! decide what to do with them. Nothing is retried here; retry policy belongs
//! to the [`crate::HttpTransport`] in use.

use reqwest::StatusCode;
use thiserror::Error;

/// Boxed error returned by an [`crate::HttpTransport`].
pub type TransportError = Box<dyn std::error::Error + Send + Sync + 'static>;

// --- The Main Operational Error Enum ---

/// The crate’s top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// The client is misconfigured (missing key or secret, bad base URL, ...).
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The call cannot be made with the arguments given, e.g. reconciling the
    /// targets of an activity that has no `foreign_id` and `time`.
    #[error("Precondition failed: {message}")]
    Precondition {
        /// What was missing.
        message: String,
    },

    /// HTTP request/response failed (transport, server, validation, JSON).
    #[error("Request failed: {0}")]
    Request(#[from] RequestError),

    /// URL parsing failed while preparing a request.
    #[error("Failed to parse URL: {0}")]
    Parse(#[from] url::ParseError),
}

impl Error {
    pub(crate) fn precondition(message: impl Into<String>) -> Self {
        Error::Precondition {
            message: message.into(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Error::Request(RequestError::Validation {
            message: message.into(),
        })
    }
}

// --- Configuration Errors ---

/// Errors building a [`crate::StreamClient`] or signing with its credentials.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No API key was provided.
    #[error("API key must not be empty")]
    MissingApiKey,

    /// No API secret was provided.
    #[error("API secret must not be empty")]
    MissingApiSecret,

    /// A required environment variable is not set.
    #[error("Environment variable {0} is not set")]
    MissingEnv(&'static str),

    /// The base URL could not be parsed.
    #[error("Invalid base URL {url:?}: {source}")]
    InvalidBaseUrl {
        /// The rejected value.
        url: String,
        /// Parser error.
        source: url::ParseError,
    },

    /// A token could not be signed.
    #[error("Token signing failed: {0}")]
    Token(#[from] stream_common::token::Error),

    /// A feed slug or user id was rejected.
    #[error("Invalid feed id: {0}")]
    FeedId(#[from] stream_common::feed_id::Error),

    /// Failed to build the default HTTP transport.
    #[error("Failed to build the HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

// --- Consolidated Request Error ---

/// Transport and server-side HTTP errors.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Network/protocol failure reported by the transport, unchanged.
    #[error("HTTP transport error: {0}")]
    Transport(#[source] TransportError),

    /// The service returned a non-success status.
    #[error("Server responded with an error: {status} - {message}")]
    Server {
        /// The HTTP status code returned by the service.
        status: StatusCode,
        /// The service's error detail, or the raw body when it sent none.
        message: String,
    },

    /// Caller supplied an invalid argument for this API.
    #[error("Invalid request: {message}")]
    Validation {
        /// Human-readable explanation of what was invalid.
        message: String,
    },

    /// JSON encoding or decoding failed.
    #[error("JSON decode error: {message}")]
    DecodeJson {
        /// Error message from serde_json, with context.
        message: String,
    },
}

impl RequestError {
    /// Returns true if the service answered `404 Not Found`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RequestError::Server { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

/// A specialized `Result` type for `stream-feeds` operations.
pub type Result<T> = std::result::Result<T, Error>;

// A macro to reduce boilerplate for converting base errors into the top-level Error.
macro_rules! impl_from_for_error {
    ($from_type:ty, $to_variant:path) => {
        impl From<$from_type> for Error {
            fn from(err: $from_type) -> Self {
                $to_variant(err.into())
            }
        }
    };
}

impl_from_for_error!(stream_common::token::Error, Error::Configuration);
impl_from_for_error!(stream_common::feed_id::Error, Error::Configuration);

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Request(RequestError::DecodeJson {
            message: err.to_string(),
        })
    }
}

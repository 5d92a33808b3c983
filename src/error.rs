//! Error types for the Beacon assistant client

use thiserror::Error;

use crate::api::RunStatus;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the assistant or playing audio
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (missing credential, bad setting)
    #[error("configuration error: {0}")]
    Config(String),

    /// Remote service answered with a non-200 status
    #[error("remote request failed with status {status}: {body}")]
    RemoteRequest {
        /// HTTP status code
        status: u16,
        /// Raw response body text
        body: String,
    },

    /// Remote service answered 200 but the body did not match the expected record
    #[error("malformed {context} response: {message}")]
    MalformedResponse {
        /// Which record was being decoded
        context: &'static str,
        /// Decoder message
        message: String,
    },

    /// Run reached a failure status
    #[error("run {run_id} ended with status {status}: {reason}")]
    RunFailed {
        /// Run identifier
        run_id: String,
        /// Terminal status observed
        status: RunStatus,
        /// Error reported by the service, if any
        reason: String,
    },

    /// Run did not finish within the polling budget
    #[error("run did not complete after {attempts} status checks")]
    Timeout {
        /// Number of status checks performed
        attempts: u32,
    },

    /// Interrupted by the user
    #[error("cancelled")]
    Cancelled,

    /// Audio payload could not be decoded
    #[error("audio decode error: {0}")]
    AudioDecode(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

//! Error taxonomy for client calls.
//!
//! Each failure class carries its own structured payload so callers can
//! match on what actually went wrong instead of scraping message strings.

use std::fmt;

use thiserror::Error;

use crate::completion::CompletionResponse;

/// The error type returned by every client operation.
#[derive(Debug, Error)]
pub enum Error {
    /// The HTTP round trip itself could not complete (connection refused,
    /// DNS failure, timeout, mid-stream read failure).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a status code outside `[200, 400)`.
    #[error(transparent)]
    Api(ApiError),

    /// A complete response body was not valid JSON for the target type.
    #[error("invalid response body: {0}")]
    Decode(#[source] serde_json::Error),

    /// One streamed data frame was not valid JSON. Carries the offending
    /// frame content verbatim.
    #[error("invalid json stream data: {source}")]
    StreamData {
        content: String,
        #[source]
        source: serde_json::Error,
    },

    /// The streamed body ended before the `[DONE]` marker was seen.
    #[error("stream closed before the [DONE] marker")]
    UnexpectedEof,

    /// The client could not be constructed from the given settings.
    #[error("invalid client configuration: {0}")]
    Configuration(String),
}

/// A failing HTTP status, with the service-provided details when the
/// error body could be parsed. Only the status code and message appear
/// in the display form; the remaining fields are for callers that
/// branch on them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiError {
    pub status_code: u16,
    pub message: Option<String>,
    pub error_type: Option<String>,
    pub param: Option<String>,
    pub code: Option<String>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(
                f,
                "error, status code: {}, message: {}",
                self.status_code, message
            ),
            None => write!(f, "error, status code: {}", self.status_code),
        }
    }
}

impl std::error::Error for ApiError {}

/// Terminal error of a streaming call, paired with whatever was
/// accumulated before the failure.
///
/// The partial result reflects every frame merged strictly before the
/// error; callers may inspect it but must treat the call as failed.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct StreamError {
    pub partial: CompletionResponse,
    #[source]
    pub source: Error,
}

//! Record sink abstraction: where finished submissions are written.

use async_trait::async_trait;

use crate::session::SubmissionRecord;

/// Failure to append a submission.
///
/// The conversation treats every variant the same way; the variant only
/// shapes the diagnostic that ends up in the logs.
#[derive(Debug, Clone)]
pub enum SinkError {
    /// Credentials were rejected or a token could not be obtained
    Auth(String),
    /// The request never produced a response (DNS, TLS, connection reset)
    Request(String),
    /// The backend answered with a non-success status
    Api { status: u16, message: String },
    /// The backend answered with something we could not interpret
    MalformedResponse(String),
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::Auth(msg) => write!(f, "Authorization error: {msg}"),
            SinkError::Request(msg) => write!(f, "Request error: {msg}"),
            SinkError::Api { status, message } => write!(f, "API error ({status}): {message}"),
            SinkError::MalformedResponse(msg) => write!(f, "Malformed response: {msg}"),
        }
    }
}

impl std::error::Error for SinkError {}

impl From<reqwest::Error> for SinkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SinkError::MalformedResponse(err.to_string())
        } else {
            SinkError::Request(err.to_string())
        }
    }
}

/// Appends one submission as one row. No validation, no retries.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn append(&self, record: &SubmissionRecord) -> Result<(), SinkError>;
}

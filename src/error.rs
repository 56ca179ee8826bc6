//! Error types for the screening client.
//!
//! Remote API failures are data: a non-2xx status comes back as a `Remote`
//! variant carrying the status code and the server's message, never as a
//! panic or a transport error.

/// Configuration could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// The HMAC could not be initialised from the configured key material.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("invalid signing key: {0}")]
    InvalidKey(String),
}

/// Network-level failure: DNS, connect, timeout or malformed framing.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request signing failed: {0}")]
    Signing(#[from] SigningError),

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {message}")]
    Connect { url: String, message: String },

    #[error("malformed response from {url}: {message}")]
    Framing { url: String, message: String },
}

/// Failure of the case submission flow.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("{message}")]
    Remote { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl SubmissionError {
    /// Transport failures may succeed on a later attempt; everything else will not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubmissionError::Transport(_))
    }

    /// HTTP status of a remote rejection, if that is what this is.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            SubmissionError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failure of the report workflow, including its terminal non-success states.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("Report request rejected: {message}")]
    Remote { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Report {report_id} failed")]
    Failed { report_id: String, diagnostic: String },

    #[error("Report {report_id} still processing after {attempts} status checks")]
    TimedOut { report_id: String, attempts: u32 },
}

impl ReportError {
    /// A timed-out job may be retried with a fresh workflow invocation, and
    /// transport failures at the caller's discretion.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReportError::Transport(_) | ReportError::TimedOut { .. })
    }

    /// Error-detail payload fetched after the report reached `FAILED`.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            ReportError::Failed { diagnostic, .. } => Some(diagnostic),
            _ => None,
        }
    }
}

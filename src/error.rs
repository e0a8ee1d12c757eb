//! Error types for the lecture2notes library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`ClientError`] (**fatal**): the request cannot proceed at all (missing
//!   input file, bad configuration, unwritable output). Returned as
//!   `Err(ClientError)` from the top-level `summarize*` functions.
//!
//! * [`TransportError`]: a single backend call failed at the HTTP layer.
//!   Produced by [`crate::transport::Transport`] implementations and handed
//!   to the state machine, which never lets it escape as a panic or `Err`.
//!
//! * [`JobFailure`] (**recovered**): the job ended in
//!   [`crate::model::JobState::Failed`]. Its `Display` text is exactly the
//!   message shown to the user.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the lecture2notes library.
#[derive(Debug, Error)]
pub enum ClientError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Media file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is neither a readable file nor an HTTP/HTTPS URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Job errors ────────────────────────────────────────────────────────
    /// The job reached the `Failed` state.
    #[error("Job {} failed: {message}", job_id.as_deref().unwrap_or("<unassigned>"))]
    JobFailed {
        job_id: Option<String>,
        message: String,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an export file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A summary could not be serialised to JSON.
    #[error("Failed to serialise summary: {0}")]
    Serialization(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A failed backend call.
///
/// The `Display` form is the human-readable message surfaced to the user,
/// combining HTTP status, status text and the body's `detail` when present.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum TransportError {
    /// The server answered with a non-success HTTP status.
    #[error("Server returned {status}: {status_text}{}", detail.as_ref().map(|d| format!(" - {d}")).unwrap_or_default())]
    Http {
        status: u16,
        status_text: String,
        detail: Option<String>,
    },

    /// The request never produced a response (DNS, connect, unreadable file).
    #[error("Client error: {0}")]
    Client(String),

    /// No response within the configured request timeout.
    #[error("Request timed out after {secs}s")]
    Timeout { secs: u64 },
}

/// Why a job ended in the `Failed` state.
///
/// Every failure is recovered locally by the state machine; this type only
/// names the cause and renders the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum JobFailure {
    /// The upload or transcribe call failed at the transport layer.
    #[error("{0}")]
    UploadTransport(TransportError),

    /// A status poll failed at the transport layer.
    #[error("{0}")]
    PollTransport(String),

    /// The submission response had no job id and no usable result.
    #[error("Invalid response from server")]
    InvalidSubmission,

    /// A status response was empty or had no `status` field.
    #[error("Invalid status response from server")]
    InvalidStatus,

    /// A status response carried a status string we do not know.
    #[error("Unexpected status: {0}")]
    UnexpectedStatus(String),

    /// The summary was present but could not be decoded.
    #[error("Failed to process the summary data")]
    UndecodableSummary,

    /// The backend reported `error: <message>`.
    #[error("{0}")]
    BackendReported(String),

    /// The job reported `completed` without any summary.
    #[error("No summary data in completed job")]
    IncompleteResult,
}

impl JobFailure {
    /// Fallback text for a poll transport failure with an empty message.
    pub const POLL_FALLBACK: &'static str = "Failed to check processing status";

    /// Build a [`JobFailure::PollTransport`], substituting the generic text
    /// when the transport produced no message of its own.
    pub fn poll_transport(err: &TransportError) -> Self {
        match err {
            TransportError::Client(msg) if msg.trim().is_empty() => {
                JobFailure::PollTransport(Self::POLL_FALLBACK.to_string())
            }
            other => JobFailure::PollTransport(other.to_string()),
        }
    }

    /// Whether the displayed message is cleared automatically after the
    /// error-clear delay.
    pub fn auto_clears(&self) -> bool {
        matches!(
            self,
            JobFailure::BackendReported(_) | JobFailure::PollTransport(_)
        )
    }
}

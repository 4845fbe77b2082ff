//! Structured error taxonomy for the repository layer and workflow.
//!
//! Every remote failure is classified at the HTTP boundary so callers can
//! render kind-specific messages and decide retry eligibility: only
//! transport failures are safely retryable — a conflict or validation
//! rejection will fail the same way again.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Rejected locally before any request was issued (missing required
    /// selection, illegal status transition, malformed input).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Slot already taken — availability check or create rejected.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authentication required or credentials rejected")]
    Unauthorized,

    /// Could not reach the backend at all.
    #[error("Cannot connect to backend at {0}")]
    Connection(String),

    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Transport-level failure other than connect/timeout.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Backend responded with a non-success status not covered above.
    #[error("Backend error {status}: {message}")]
    Backend { status: u16, message: String },

    /// Response body did not match the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid appointment status: {value}")]
    InvalidStatus { value: String },
}

impl ApiError {
    /// Whether a retry of the same request could plausibly succeed.
    ///
    /// Conflict and validation failures are deterministic; only transport
    /// faults (unreachable backend, timeout, dropped connection) qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Timeout { .. } | Self::Transport(_)
        )
    }

    /// Is this a validation-class rejection (illegal input or transition)?
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidStatus { .. })
    }
}

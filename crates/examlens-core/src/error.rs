//! Diagnostic error types.
//!
//! Every failure that can reach a caller of the report or practice entry
//! points maps to one of these, and each carries a stable wire code.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by report generation and remediation selection.
#[derive(Debug, Error)]
pub enum DiagnosticError {
    /// No attempt id was supplied.
    #[error("attempt id is required")]
    MissingAttemptId,

    /// The attempt does not exist.
    #[error("attempt not found: {0}")]
    AttemptNotFound(String),

    /// The attempt lacks the certificate/subject scope needed for practice.
    #[error("attempt {0} has no certificate or subject scope")]
    AttemptIncomplete(String),

    /// The store failed while loading practice data.
    #[error("failed to load practice data for attempt {attempt_id}")]
    PracticeLoadFailed {
        attempt_id: String,
        #[source]
        source: anyhow::Error,
    },

    /// The store failed while loading report data.
    #[error("failed to load report data for attempt {attempt_id}")]
    ReportLoadFailed {
        attempt_id: String,
        #[source]
        source: anyhow::Error,
    },
}

impl DiagnosticError {
    /// Stable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticError::MissingAttemptId => "MISSING_ATTEMPT_ID",
            DiagnosticError::AttemptNotFound(_) => "ATTEMPT_NOT_FOUND",
            DiagnosticError::AttemptIncomplete(_) => "ATTEMPT_INCOMPLETE",
            DiagnosticError::PracticeLoadFailed { .. } => "PRACTICE_LOAD_FAILED",
            DiagnosticError::ReportLoadFailed { .. } => "REPORT_LOAD_FAILED",
        }
    }

    /// Returns `true` for failures of the backing store rather than the request.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            DiagnosticError::PracticeLoadFailed { .. } | DiagnosticError::ReportLoadFailed { .. }
        )
    }

    /// The `{error: {code, message}}` response body.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        }
    }
}

/// Error response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Error code and human-readable message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

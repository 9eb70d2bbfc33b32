//! Error taxonomy for comparison and adjustment commands
//!
//! Every variant is scoped to a single command on a single session and is
//! returned to the caller as-is. Only `ConcurrentModification` is meant to be
//! retried (re-read the current state, then resend).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompareError {
    #[error(
        "surveys do not overlap in measured depth (overlap start {overlap_start:.3} >= end {overlap_end:.3})"
    )]
    NoOverlap { overlap_start: f64, overlap_end: f64 },

    #[error("aligned grid contains no points")]
    EmptyGrid,

    #[error("invalid survey '{survey_id}': {reason}")]
    InvalidSurvey { survey_id: String, reason: String },

    #[error("invalid resolution {resolution}: must be between {min} and {max} m")]
    InvalidResolution { resolution: u32, min: u32, max: u32 },

    #[error("invalid adjustment range [{md_start}, {md_end}]: {reason}")]
    InvalidRange {
        md_start: f64,
        md_end: f64,
        reason: String,
    },

    #[error("invalid offset: {0}")]
    InvalidOffset(String),

    #[error("nothing to undo: session is at its baseline")]
    NothingToUndo,

    #[error("nothing to redo: cursor is at the newest adjustment")]
    NothingToRedo,

    #[error("no adjustment to recalculate: session is at its baseline")]
    NoAdjustment,

    #[error(
        "session {session_id} was modified concurrently (expected cursor {expected}, found {actual})"
    )]
    ConcurrentModification {
        session_id: String,
        expected: u64,
        actual: u64,
    },

    #[error("survey '{0}' is already registered")]
    SurveyExists(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("storage error: {0}")]
    Storage(String),
}

impl CompareError {
    /// Stable machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            CompareError::NoOverlap { .. } => "NO_OVERLAP",
            CompareError::EmptyGrid => "EMPTY_GRID",
            CompareError::InvalidSurvey { .. } => "INVALID_SURVEY",
            CompareError::InvalidResolution { .. } => "INVALID_RESOLUTION",
            CompareError::InvalidRange { .. } => "INVALID_RANGE",
            CompareError::InvalidOffset(_) => "INVALID_OFFSET",
            CompareError::NothingToUndo => "NOTHING_TO_UNDO",
            CompareError::NothingToRedo => "NOTHING_TO_REDO",
            CompareError::NoAdjustment => "NO_ADJUSTMENT",
            CompareError::ConcurrentModification { .. } => "CONCURRENT_MODIFICATION",
            CompareError::SurveyExists(_) => "SURVEY_EXISTS",
            CompareError::NotFound { .. } => "NOT_FOUND",
            CompareError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Whether a caller may reasonably retry the same command.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CompareError::ConcurrentModification { .. })
    }

    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        CompareError::NotFound { kind, id: id.into() }
    }

    pub(crate) fn invalid_range(md_start: f64, md_end: f64, reason: impl Into<String>) -> Self {
        CompareError::InvalidRange {
            md_start,
            md_end,
            reason: reason.into(),
        }
    }
}

impl From<crate::storage::PersistenceError> for CompareError {
    fn from(err: crate::storage::PersistenceError) -> Self {
        CompareError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            CompareError::NoOverlap { overlap_start: 1.0, overlap_end: 0.0 },
            CompareError::EmptyGrid,
            CompareError::InvalidSurvey { survey_id: "a".into(), reason: "b".into() },
            CompareError::InvalidResolution { resolution: 0, min: 1, max: 100 },
            CompareError::invalid_range(2.0, 1.0, "inverted"),
            CompareError::InvalidOffset("nan".into()),
            CompareError::NothingToUndo,
            CompareError::NothingToRedo,
            CompareError::NoAdjustment,
            CompareError::ConcurrentModification { session_id: "s".into(), expected: 1, actual: 2 },
            CompareError::SurveyExists("P".into()),
            CompareError::not_found("session", "x"),
            CompareError::Storage("disk".into()),
        ];
        let mut codes: Vec<_> = errors.iter().map(CompareError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_only_concurrent_modification_is_retryable() {
        assert!(CompareError::ConcurrentModification {
            session_id: "s".into(),
            expected: 0,
            actual: 1
        }
        .is_retryable());
        assert!(!CompareError::NothingToUndo.is_retryable());
    }

    #[test]
    fn test_display_includes_context() {
        let err = CompareError::invalid_range(1200.0, 1100.0, "md_start must be below md_end");
        let msg = err.to_string();
        assert!(msg.contains("1200"));
        assert!(msg.contains("md_start must be below md_end"));
    }
}

use thiserror::Error;

/// Shown with every user-visible failure, whatever went wrong.
pub const CALL_911_NOTICE: &str = "Call 911 if this is life-threatening.";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TriageError {
    /// Rejected before any collaborator is contacted.
    #[error("invalid emergency report: {0}")]
    InvalidReport(String),
    /// Completion collaborator failed; always absorbed by the heuristic
    /// classifier and never returned to callers.
    #[error("classification degraded: {0}")]
    ClassificationDegraded(String),
    #[error("emergency service search unavailable: {0}")]
    ServiceSearchUnavailable(String),
}

impl TriageError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidReport(_) => "invalid_report",
            Self::ClassificationDegraded(_) => "classification_degraded",
            Self::ServiceSearchUnavailable(_) => "service_search_unavailable",
        }
    }
}

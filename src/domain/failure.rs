use thiserror::Error;

/// Failure of a backend request, as seen by use cases and the shell.
///
/// Transport errors and non-2xx statuses collapse into `Unavailable`; a 401 is
/// kept apart because it ends the session instead of being retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("session expired, please log in again")]
    Unauthorized,
    #[error("backend unavailable: {detail}")]
    Unavailable { detail: String },
    #[error("{}", .message.as_deref().unwrap_or("request rejected by backend"))]
    Rejected { message: Option<String> },
    #[error("unexpected response from backend: {detail}")]
    InvalidData { detail: String },
}

impl SourceError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Stable code for structured logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "API_UNAUTHORIZED",
            Self::Unavailable { .. } => "API_UNAVAILABLE",
            Self::Rejected { .. } => "API_REJECTED",
            Self::InvalidData { .. } => "API_INVALID_DATA",
        }
    }
}

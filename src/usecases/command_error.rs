use thiserror::Error;

use crate::{domain::failure::SourceError, usecases::conversations::ConversationError};

/// Failure of a one-shot administrative command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    Invalid(String),
    #[error("no website selected; run `livedesk websites select <id>` first")]
    NoWebsiteSelected,
    #[error("no website matches `{0}`")]
    UnknownWebsite(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("this operation needs an admin account")]
    AdminRequired,
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Local(#[from] anyhow::Error),
}

impl CommandError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Source(source) if source.is_unauthorized())
    }
}

impl From<ConversationError> for CommandError {
    fn from(error: ConversationError) -> Self {
        match error {
            ConversationError::NoWebsiteSelected => Self::NoWebsiteSelected,
            ConversationError::NotFound(session_id) => {
                Self::NotFound(format!("conversation {session_id}"))
            }
            ConversationError::Source(source) => Self::Source(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_source_errors_are_detected() {
        assert!(CommandError::from(SourceError::Unauthorized).is_unauthorized());
        assert!(!CommandError::NoWebsiteSelected.is_unauthorized());
    }

    #[test]
    fn conversation_errors_keep_their_meaning() {
        let error = CommandError::from(ConversationError::NotFound("s-1".to_owned()));

        assert_eq!(error.to_string(), "conversation s-1 not found");
        assert!(matches!(
            CommandError::from(ConversationError::NoWebsiteSelected),
            CommandError::NoWebsiteSelected
        ));
    }
}

//! Sending an agent reply into a live chat.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{active_chat::ChatAddress, failure::SourceError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageCommand {
    pub address: ChatAddress,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendMessageError {
    #[error("message is empty")]
    EmptyMessage,
    #[error(transparent)]
    Source(#[from] SourceError),
}

#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Posts `text` as the agent into the chat at `address`.
    async fn send_agent_message(&self, address: &ChatAddress, text: &str)
        -> Result<(), SourceError>;
}

/// Trims the reply; blank replies are refused before any request is made.
pub fn validate_text(text: &str) -> Result<&str, SendMessageError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(SendMessageError::EmptyMessage);
    }
    Ok(text)
}

pub async fn send_message(
    sender: &(dyn MessageSender + '_),
    command: SendMessageCommand,
) -> Result<(), SendMessageError> {
    let text = validate_text(&command.text)?;

    sender
        .send_agent_message(&command.address, text)
        .await
        .map_err(SendMessageError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct StubSender {
        result: Result<(), SourceError>,
        captured: Mutex<Option<(String, String)>>,
    }

    impl StubSender {
        fn with_result(result: Result<(), SourceError>) -> Self {
            Self {
                result,
                captured: Mutex::new(None),
            }
        }

        fn captured(&self) -> Option<(String, String)> {
            self.captured.lock().expect("capture lock").clone()
        }
    }

    #[async_trait]
    impl MessageSender for StubSender {
        async fn send_agent_message(
            &self,
            address: &ChatAddress,
            text: &str,
        ) -> Result<(), SourceError> {
            *self.captured.lock().expect("capture lock") =
                Some((address.chat_id(), text.to_owned()));
            self.result.clone()
        }
    }

    fn command(text: &str) -> SendMessageCommand {
        SendMessageCommand {
            address: ChatAddress::parse("v42@shop.com/cart").expect("valid id"),
            text: text.to_owned(),
        }
    }

    #[tokio::test]
    async fn rejects_whitespace_only_message() {
        let sender = StubSender::with_result(Ok(()));

        let result = send_message(&sender, command("   \n\t  ")).await;

        assert_eq!(result, Err(SendMessageError::EmptyMessage));
        assert!(sender.captured().is_none());
    }

    #[tokio::test]
    async fn trims_text_and_targets_full_chat_id() {
        let sender = StubSender::with_result(Ok(()));

        send_message(&sender, command("  hello there  "))
            .await
            .expect("send should succeed");

        assert_eq!(
            sender.captured(),
            Some(("v42@shop.com/cart".to_owned(), "hello there".to_owned()))
        );
    }

    #[tokio::test]
    async fn wraps_source_errors() {
        let sender = StubSender::with_result(Err(SourceError::Unavailable {
            detail: "timeout".to_owned(),
        }));

        let result = send_message(&sender, command("hello")).await;

        assert!(matches!(
            result,
            Err(SendMessageError::Source(SourceError::Unavailable { .. }))
        ));
    }
}

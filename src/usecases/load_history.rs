use async_trait::async_trait;

use crate::domain::{
    active_chat::ChatAddress,
    failure::SourceError,
    message::{parse_timestamp, ChatMessage},
};

#[async_trait]
pub trait ChatHistorySource: Send + Sync {
    async fn chat_history(&self, address: &ChatAddress) -> Result<Vec<ChatMessage>, SourceError>;
}

/// History of one live chat in chronological order.
pub async fn load_history(
    source: &(dyn ChatHistorySource + '_),
    address: &ChatAddress,
) -> Result<Vec<ChatMessage>, SourceError> {
    let mut messages = source.chat_history(address).await?;
    messages.sort_by_cached_key(|message| parse_timestamp(&message.timestamp));
    Ok(messages)
}

//! Conversation history of a website: listing, detail, read marking.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{
    conversation::{conversation_messages, group_into_conversations, Conversation},
    failure::SourceError,
    message::RawMessage,
};

pub const DEFAULT_HISTORY_LIMIT: usize = 1_000;
const MAX_HISTORY_LIMIT: usize = 5_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub config_id: String,
    pub search: Option<String>,
    pub limit: usize,
}

impl HistoryQuery {
    pub fn for_site(config_id: impl Into<String>, limit: usize) -> Self {
        Self {
            config_id: config_id.into(),
            search: None,
            limit,
        }
    }

    pub fn normalized_limit(&self) -> usize {
        match self.limit {
            0 => DEFAULT_HISTORY_LIMIT,
            value if value > MAX_HISTORY_LIMIT => MAX_HISTORY_LIMIT,
            value => value,
        }
    }
}

#[async_trait]
pub trait AdminHistorySource: Send + Sync {
    async fn admin_history(&self, query: &HistoryQuery) -> Result<Vec<RawMessage>, SourceError>;
    async fn mark_read(&self, session_id: &str) -> Result<(), SourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    #[error("no website selected; run `livedesk websites select` first")]
    NoWebsiteSelected,
    #[error("conversation {0} not found")]
    NotFound(String),
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Raw history of a site with the limit clamped.
pub async fn fetch_history(
    source: &(dyn AdminHistorySource + '_),
    query: &HistoryQuery,
) -> Result<Vec<RawMessage>, SourceError> {
    let query = HistoryQuery {
        limit: query.normalized_limit(),
        ..query.clone()
    };
    source.admin_history(&query).await
}

pub async fn load_conversations(
    source: &(dyn AdminHistorySource + '_),
    config_id: Option<&str>,
    limit: usize,
) -> Result<Vec<Conversation>, ConversationError> {
    let config_id = config_id.ok_or(ConversationError::NoWebsiteSelected)?;
    let messages = fetch_history(source, &HistoryQuery::for_site(config_id, limit)).await?;
    Ok(group_into_conversations(&messages))
}

/// Messages of one session, searched server-side and filtered locally.
pub async fn load_conversation_detail(
    source: &(dyn AdminHistorySource + '_),
    config_id: Option<&str>,
    session_id: &str,
    limit: usize,
) -> Result<Vec<RawMessage>, ConversationError> {
    let config_id = config_id.ok_or(ConversationError::NoWebsiteSelected)?;
    let query = HistoryQuery {
        config_id: config_id.to_owned(),
        search: Some(session_id.to_owned()),
        limit,
    };
    let messages = fetch_history(source, &query).await?;

    let detail = conversation_messages(&messages, session_id);
    if detail.is_empty() {
        return Err(ConversationError::NotFound(session_id.to_owned()));
    }
    Ok(detail)
}

pub async fn mark_conversation_read(
    source: &(dyn AdminHistorySource + '_),
    session_id: &str,
) -> Result<(), SourceError> {
    source.mark_read(session_id).await
}

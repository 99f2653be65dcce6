use super::{
    active_chat::ActiveChat,
    failure::SourceError,
    message::{ChatMessage, RawMessage},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Tick,
    QuitRequested,
    InputKey(KeyInput),
    Background(BackgroundEvent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInput {
    pub key: String,
    pub ctrl: bool,
}

impl KeyInput {
    pub fn new(key: impl Into<String>, ctrl: bool) -> Self {
        Self {
            key: key.into(),
            ctrl,
        }
    }
}

/// Results produced off the UI thread. Poll results carry the generation of
/// the target they were fetched for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundEvent {
    ActiveChatsPolled {
        generation: u64,
        result: Result<Vec<ActiveChat>, SourceError>,
    },
    ChatHistoryPolled {
        generation: u64,
        chat_id: String,
        result: Result<Vec<ChatMessage>, SourceError>,
    },
    ConversationsPolled {
        generation: u64,
        config_id: String,
        result: Result<Vec<RawMessage>, SourceError>,
    },
    SendFinished {
        chat_id: String,
        local_id: String,
        result: Result<(), SourceError>,
    },
    MarkReadFinished {
        session_id: String,
        result: Result<(), SourceError>,
    },
}

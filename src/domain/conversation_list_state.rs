use std::collections::HashSet;

use super::{
    conversation::{group_into_conversations, Conversation},
    message::RawMessage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationListUiState {
    /// No website is selected, so there is nothing to poll.
    NoSelection,
    Loading,
    Ready,
    Empty,
    Error,
}

/// Conversation history of the selected website.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationListState {
    ui_state: ConversationListUiState,
    config_id: Option<String>,
    conversations: Vec<Conversation>,
    selected_index: Option<usize>,
    /// Session whose messages are shown in the detail pane.
    open_session_id: Option<String>,
    detail_scroll: usize,
    /// Sessions marked read locally whose request has not completed yet.
    read_in_flight: HashSet<String>,
    stale: bool,
}

impl Default for ConversationListState {
    fn default() -> Self {
        Self {
            ui_state: ConversationListUiState::NoSelection,
            config_id: None,
            conversations: Vec::new(),
            selected_index: None,
            open_session_id: None,
            detail_scroll: 0,
            read_in_flight: HashSet::new(),
            stale: false,
        }
    }
}

impl ConversationListState {
    pub fn ui_state(&self) -> ConversationListUiState {
        self.ui_state
    }

    pub fn config_id(&self) -> Option<&str> {
        self.config_id.as_deref()
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected_index
    }

    pub fn selected_conversation(&self) -> Option<&Conversation> {
        self.selected_index
            .and_then(|index| self.conversations.get(index))
    }

    pub fn open_conversation(&self) -> Option<&Conversation> {
        let session_id = self.open_session_id.as_deref()?;
        self.conversations
            .iter()
            .find(|conversation| conversation.session_id == session_id)
    }

    pub fn detail_scroll(&self) -> usize {
        self.detail_scroll
    }

    pub fn total_unread(&self) -> usize {
        self.conversations.iter().map(|c| c.unread_count).sum()
    }

    /// Switches to another website (or none); everything shown is dropped.
    pub fn retarget(&mut self, config_id: Option<String>) {
        self.ui_state = if config_id.is_some() {
            ConversationListUiState::Loading
        } else {
            ConversationListUiState::NoSelection
        };
        self.config_id = config_id;
        self.conversations.clear();
        self.selected_index = None;
        self.open_session_id = None;
        self.detail_scroll = 0;
        self.read_in_flight.clear();
        self.stale = false;
    }

    /// Regroups a fresh history snapshot.
    pub fn set_ready(&mut self, messages: &[RawMessage]) {
        let mut conversations = group_into_conversations(messages);
        for conversation in &mut conversations {
            if self.read_in_flight.contains(&conversation.session_id) {
                conversation.unread_count = 0;
            }
        }

        let previous = self
            .selected_conversation()
            .map(|conversation| conversation.session_id.clone());

        self.stale = false;
        self.ui_state = if conversations.is_empty() {
            ConversationListUiState::Empty
        } else {
            ConversationListUiState::Ready
        };
        self.conversations = conversations;
        self.selected_index = previous
            .and_then(|session_id| {
                self.conversations
                    .iter()
                    .position(|conversation| conversation.session_id == session_id)
            })
            .or(if self.conversations.is_empty() {
                None
            } else {
                Some(0)
            });
    }

    pub fn set_error(&mut self) {
        if self.conversations.is_empty() {
            self.ui_state = ConversationListUiState::Error;
        } else {
            self.stale = true;
        }
    }

    /// Opens the selected conversation and zeroes its unread counter.
    /// Returns the session id when a read request should be sent.
    pub fn open_selected(&mut self) -> Option<String> {
        let index = self.selected_index?;
        let conversation = self.conversations.get_mut(index)?;
        let session_id = conversation.session_id.clone();

        self.open_session_id = Some(session_id.clone());
        self.detail_scroll = 0;

        if conversation.unread_count == 0 {
            return None;
        }
        conversation.unread_count = 0;
        self.read_in_flight.insert(session_id.clone());
        Some(session_id)
    }

    pub fn read_finished(&mut self, session_id: &str) {
        self.read_in_flight.remove(session_id);
    }

    pub fn close_detail(&mut self) {
        self.open_session_id = None;
        self.detail_scroll = 0;
    }

    pub fn scroll_detail_down(&mut self) {
        let limit = self
            .open_conversation()
            .map(|conversation| conversation.messages.len().saturating_sub(1))
            .unwrap_or(0);
        self.detail_scroll = (self.detail_scroll + 1).min(limit);
    }

    pub fn scroll_detail_up(&mut self) {
        self.detail_scroll = self.detail_scroll.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        let Some(index) = self.selected_index else {
            return;
        };

        let last_index = self.conversations.len().saturating_sub(1);
        self.selected_index = Some(std::cmp::min(index.saturating_add(1), last_index));
    }

    pub fn select_previous(&mut self) {
        let Some(index) = self.selected_index else {
            return;
        };

        self.selected_index = Some(index.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::message::Sender;

    fn raw(session_id: &str, minute: u32, is_read: bool) -> RawMessage {
        RawMessage {
            session_id: session_id.to_owned(),
            timestamp: format!("2024-01-14T10:{minute:02}:00Z"),
            sender: Sender::Customer,
            text: format!("{session_id}-{minute}"),
            domain: "a.com".to_owned(),
            rating: None,
            is_read,
        }
    }

    fn ready_state(messages: &[RawMessage]) -> ConversationListState {
        let mut state = ConversationListState::default();
        state.retarget(Some("cfg".to_owned()));
        state.set_ready(messages);
        state
    }

    #[test]
    fn starts_without_selection() {
        let state = ConversationListState::default();

        assert_eq!(state.ui_state(), ConversationListUiState::NoSelection);
        assert_eq!(state.config_id(), None);
    }

    #[test]
    fn retarget_to_site_starts_loading_and_to_none_clears() {
        let mut state = ready_state(&[raw("s1", 1, false)]);

        state.retarget(Some("other".to_owned()));
        assert_eq!(state.ui_state(), ConversationListUiState::Loading);
        assert!(state.conversations().is_empty());

        state.retarget(None);
        assert_eq!(state.ui_state(), ConversationListUiState::NoSelection);
    }

    #[test]
    fn set_ready_groups_and_selects_latest_conversation() {
        let state = ready_state(&[raw("s1", 1, true), raw("s2", 5, true)]);

        assert_eq!(state.ui_state(), ConversationListUiState::Ready);
        assert_eq!(
            state.selected_conversation().map(|c| c.session_id.as_str()),
            Some("s2")
        );
    }

    #[test]
    fn opening_unread_conversation_zeroes_counter_and_requests_read() {
        let mut state = ready_state(&[raw("s1", 1, false), raw("s1", 2, false)]);

        let request = state.open_selected();

        assert_eq!(request.as_deref(), Some("s1"));
        assert_eq!(state.open_conversation().map(|c| c.unread_count), Some(0));
        assert_eq!(state.total_unread(), 0);
    }

    #[test]
    fn opening_read_conversation_sends_nothing() {
        let mut state = ready_state(&[raw("s1", 1, true)]);

        assert_eq!(state.open_selected(), None);
        assert!(state.open_conversation().is_some());
    }

    #[test]
    fn local_read_survives_refresh_until_request_finishes() {
        let messages = [raw("s1", 1, false)];
        let mut state = ready_state(&messages);
        state.open_selected();

        state.set_ready(&messages);
        assert_eq!(state.conversations()[0].unread_count, 0);

        state.read_finished("s1");
        state.set_ready(&messages);
        assert_eq!(state.conversations()[0].unread_count, 1);
    }

    #[test]
    fn refresh_keeps_selection_by_session_id() {
        let mut state = ready_state(&[raw("s1", 1, true), raw("s2", 5, true)]);
        state.select_next();

        state.set_ready(&[raw("s1", 1, true), raw("s2", 5, true), raw("s3", 9, true)]);

        assert_eq!(
            state.selected_conversation().map(|c| c.session_id.as_str()),
            Some("s1")
        );
    }

    #[test]
    fn error_keeps_previous_conversations() {
        let mut state = ready_state(&[raw("s1", 1, true)]);

        state.set_error();

        assert_eq!(state.ui_state(), ConversationListUiState::Ready);
        assert!(state.is_stale());
    }

    #[test]
    fn detail_scroll_is_bounded_by_message_count() {
        let mut state = ready_state(&[raw("s1", 1, true), raw("s1", 2, true)]);
        state.open_selected();

        state.scroll_detail_down();
        state.scroll_detail_down();
        state.scroll_detail_down();
        assert_eq!(state.detail_scroll(), 1);

        state.scroll_detail_up();
        state.scroll_detail_up();
        assert_eq!(state.detail_scroll(), 0);
    }
}

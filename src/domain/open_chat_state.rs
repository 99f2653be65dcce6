use std::collections::HashMap;

use super::message::{ChatMessage, DeliveryState, Sender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenChatUiState {
    Empty,
    Loading,
    Ready,
    Error,
}

/// Scroll margin - number of items to keep visible above/below cursor before scrolling.
const SCROLL_MARGIN: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
struct LocalEcho {
    message: ChatMessage,
    acknowledged_at_ms: Option<i64>,
}

/// The live chat currently taken over by the operator.
///
/// Server history and locally sent messages are kept apart: every poll
/// replaces the server part wholesale, local echoes survive until the server
/// shows the same text or, once acknowledged, until the grace period ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenChatState {
    chat_id: Option<String>,
    chat_title: String,
    server: Vec<ChatMessage>,
    has_snapshot: bool,
    local: Vec<LocalEcho>,
    ui_state: OpenChatUiState,
    stale: bool,
    selected_index: Option<usize>,
    scroll_offset: usize,
}

impl Default for OpenChatState {
    fn default() -> Self {
        Self {
            chat_id: None,
            chat_title: String::new(),
            server: Vec::new(),
            has_snapshot: false,
            local: Vec::new(),
            ui_state: OpenChatUiState::Empty,
            stale: false,
            selected_index: None,
            scroll_offset: 0,
        }
    }
}

impl OpenChatState {
    pub fn chat_id(&self) -> Option<&str> {
        self.chat_id.as_deref()
    }

    pub fn chat_title(&self) -> &str {
        &self.chat_title
    }

    /// Server history followed by local echoes.
    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> + '_ {
        self.server
            .iter()
            .chain(self.local.iter().map(|echo| &echo.message))
    }

    pub fn message_count(&self) -> usize {
        self.server.len() + self.local.len()
    }

    pub fn ui_state(&self) -> OpenChatUiState {
        self.ui_state
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected_index
    }

    pub fn selected_message(&self) -> Option<&ChatMessage> {
        self.selected_index
            .and_then(|index| self.messages().nth(index))
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn is_open(&self) -> bool {
        self.chat_id.is_some()
    }

    pub fn is_showing(&self, chat_id: &str) -> bool {
        self.chat_id.as_deref() == Some(chat_id)
    }

    pub fn set_loading(&mut self, chat_id: String, chat_title: String) {
        self.chat_id = Some(chat_id);
        self.chat_title = chat_title;
        self.server.clear();
        self.has_snapshot = false;
        self.local.clear();
        self.ui_state = OpenChatUiState::Loading;
        self.stale = false;
        self.selected_index = None;
        self.scroll_offset = 0;
    }

    /// Applies a fresh history snapshot and reconciles local echoes with it.
    ///
    /// An echo is dropped when an agent message with the same text appeared
    /// since the previous snapshot. Unmatched pending and failed echoes stay;
    /// acknowledged ones stay until `grace_ms` has passed since the ack.
    pub fn set_ready(&mut self, server: Vec<ChatMessage>, now_ms: i64, grace_ms: i64) {
        let follow_tail = self.is_at_tail();

        let baseline = if self.has_snapshot {
            agent_text_counts(&self.server)
        } else {
            agent_text_counts(&server)
        };
        let mut arrivals = agent_text_counts(&server);
        for (text, count) in arrivals.iter_mut() {
            *count = count.saturating_sub(baseline.get(text).copied().unwrap_or(0));
        }

        self.local.retain(|echo| {
            if let Some(count) = arrivals.get_mut(echo.message.text.as_str()) {
                if *count > 0 {
                    *count -= 1;
                    return false;
                }
            }

            match echo.message.delivery {
                DeliveryState::Pending | DeliveryState::Failed => true,
                DeliveryState::Sent => echo
                    .acknowledged_at_ms
                    .map_or(true, |acked| now_ms.saturating_sub(acked) < grace_ms),
                DeliveryState::Confirmed => false,
            }
        });

        self.server = server;
        self.has_snapshot = true;
        self.ui_state = OpenChatUiState::Ready;
        self.stale = false;
        self.reposition_selection(follow_tail);
    }

    /// A failed refresh keeps the last snapshot on screen.
    pub fn set_error(&mut self) {
        if self.has_snapshot {
            self.stale = true;
        } else {
            self.ui_state = OpenChatUiState::Error;
        }
    }

    pub fn push_local(&mut self, message: ChatMessage) {
        self.local.push(LocalEcho {
            message,
            acknowledged_at_ms: None,
        });
        self.selected_index = self.message_count().checked_sub(1);
    }

    pub fn mark_sent(&mut self, local_id: &str, now_ms: i64) -> bool {
        let Some(echo) = self.echo_mut(local_id) else {
            return false;
        };

        echo.message.delivery = DeliveryState::Sent;
        echo.acknowledged_at_ms = Some(now_ms);
        true
    }

    pub fn mark_failed(&mut self, local_id: &str) -> bool {
        let Some(echo) = self.echo_mut(local_id) else {
            return false;
        };

        echo.message.delivery = DeliveryState::Failed;
        true
    }

    /// Moves a failed echo back to pending and returns its text for resending.
    pub fn retry(&mut self, local_id: &str) -> Option<String> {
        let echo = self.echo_mut(local_id)?;
        if echo.message.delivery != DeliveryState::Failed {
            return None;
        }

        echo.message.delivery = DeliveryState::Pending;
        Some(echo.message.text.clone())
    }

    /// Drops a failed echo the operator gave up on.
    pub fn dismiss(&mut self, local_id: &str) -> bool {
        let before = self.local.len();
        self.local.retain(|echo| {
            echo.message.id != local_id || echo.message.delivery != DeliveryState::Failed
        });
        let removed = self.local.len() != before;
        if removed {
            self.reposition_selection(false);
        }
        removed
    }

    /// Selects the next message (moves down in the list).
    pub fn select_next(&mut self) {
        let count = self.message_count();
        if count == 0 {
            return;
        }

        self.selected_index = match self.selected_index {
            None => Some(0),
            Some(idx) if idx + 1 < count => Some(idx + 1),
            Some(idx) => Some(idx),
        };
    }

    /// Selects the previous message (moves up in the list).
    pub fn select_previous(&mut self) {
        let count = self.message_count();
        if count == 0 {
            return;
        }

        self.selected_index = match self.selected_index {
            None => Some(count - 1),
            Some(idx) => Some(idx.saturating_sub(1)),
        };
    }

    /// Keeps the cursor visible with SCROLL_MARGIN rows above and below.
    ///
    /// `element_index` is the visual index in the list (date separators
    /// included).
    pub fn update_scroll_offset(&mut self, element_index: usize, viewport_height: usize) {
        if viewport_height == 0 {
            return;
        }

        let effective_margin = SCROLL_MARGIN.min(viewport_height / 2);

        if element_index < self.scroll_offset + effective_margin {
            self.scroll_offset = element_index.saturating_sub(effective_margin);
        }

        let visible_bottom = self.scroll_offset + viewport_height;
        if element_index + effective_margin >= visible_bottom {
            self.scroll_offset =
                (element_index + effective_margin + 1).saturating_sub(viewport_height);
        }
    }

    fn echo_mut(&mut self, local_id: &str) -> Option<&mut LocalEcho> {
        self.local
            .iter_mut()
            .find(|echo| echo.message.id == local_id)
    }

    fn is_at_tail(&self) -> bool {
        match self.selected_index {
            None => true,
            Some(index) => index + 1 >= self.message_count(),
        }
    }

    fn reposition_selection(&mut self, follow_tail: bool) {
        let last = self.message_count().checked_sub(1);
        self.selected_index = match (self.selected_index, last) {
            (_, None) => None,
            (None, Some(last)) => Some(last),
            (Some(_), Some(last)) if follow_tail => Some(last),
            (Some(index), Some(last)) => Some(index.min(last)),
        };
    }
}

fn agent_text_counts(messages: &[ChatMessage]) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for message in messages.iter().filter(|m| m.sender == Sender::Agent) {
        *counts.entry(message.text.as_str()).or_insert(0) += 1;
    }
    counts
}

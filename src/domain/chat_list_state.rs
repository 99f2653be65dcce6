use super::active_chat::{sort_by_activity, ActiveChat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatListUiState {
    Loading,
    Ready,
    Empty,
    Error,
}

/// Sidebar of active live sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatListState {
    ui_state: ChatListUiState,
    chats: Vec<ActiveChat>,
    selected_index: Option<usize>,
    /// Set when the last poll failed but an earlier snapshot is still shown.
    stale: bool,
}

impl Default for ChatListState {
    fn default() -> Self {
        Self {
            ui_state: ChatListUiState::Loading,
            chats: Vec::new(),
            selected_index: None,
            stale: false,
        }
    }
}

impl ChatListState {
    pub fn ui_state(&self) -> ChatListUiState {
        self.ui_state
    }

    pub fn chats(&self) -> &[ActiveChat] {
        &self.chats
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected_index
    }

    pub fn selected_chat(&self) -> Option<&ActiveChat> {
        self.selected_index.and_then(|index| self.chats.get(index))
    }

    pub fn set_loading(&mut self) {
        self.ui_state = ChatListUiState::Loading;
        self.chats.clear();
        self.selected_index = None;
        self.stale = false;
    }

    /// Replaces the list wholesale, keeping the cursor on the same chat id.
    pub fn set_ready(&mut self, mut chats: Vec<ActiveChat>) {
        self.stale = false;
        if chats.is_empty() {
            self.ui_state = ChatListUiState::Empty;
            self.chats.clear();
            self.selected_index = None;
            return;
        }

        sort_by_activity(&mut chats);
        let previous_selected_chat_id = self.selected_chat().map(|chat| chat.chat_id.clone());
        self.ui_state = ChatListUiState::Ready;
        self.chats = chats;
        self.selected_index =
            resolve_selection_index(&self.chats, previous_selected_chat_id.as_deref());
    }

    /// A failed refresh keeps whatever was on screen.
    pub fn set_error(&mut self) {
        if self.chats.is_empty() {
            self.ui_state = ChatListUiState::Error;
            self.selected_index = None;
        } else {
            self.stale = true;
        }
    }

    pub fn select_next(&mut self) {
        let Some(index) = self.selected_index else {
            return;
        };

        let last_index = self.chats.len().saturating_sub(1);
        self.selected_index = Some(std::cmp::min(index.saturating_add(1), last_index));
    }

    pub fn select_previous(&mut self) {
        let Some(index) = self.selected_index else {
            return;
        };

        self.selected_index = Some(index.saturating_sub(1));
    }
}

fn resolve_selection_index(
    chats: &[ActiveChat],
    previous_selected_chat_id: Option<&str>,
) -> Option<usize> {
    if chats.is_empty() {
        return None;
    }

    previous_selected_chat_id
        .and_then(|chat_id| chats.iter().position(|chat| chat.chat_id == chat_id))
        .or(Some(0))
}

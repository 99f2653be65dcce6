use super::{
    chat_list_state::ChatListState, conversation_list_state::ConversationListState,
    message_input_state::MessageInputState, notice::Notices, open_chat_state::OpenChatState,
};

/// Top-level screen of the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Live,
    History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivePane {
    ChatList,
    Messages,
    MessageInput,
    Conversations,
    ConversationDetail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellState {
    running: bool,
    session_expired: bool,
    view: View,
    active_pane: ActivePane,
    website_label: Option<String>,
    chat_list: ChatListState,
    open_chat: OpenChatState,
    message_input: MessageInputState,
    conversations: ConversationListState,
    notices: Notices,
}

impl Default for ShellState {
    fn default() -> Self {
        Self {
            running: true,
            session_expired: false,
            view: View::Live,
            active_pane: ActivePane::ChatList,
            website_label: None,
            chat_list: ChatListState::default(),
            open_chat: OpenChatState::default(),
            message_input: MessageInputState::default(),
            conversations: ConversationListState::default(),
            notices: Notices::default(),
        }
    }
}

impl ShellState {
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn session_expired(&self) -> bool {
        self.session_expired
    }

    pub fn expire_session(&mut self) {
        self.session_expired = true;
        self.running = false;
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn active_pane(&self) -> ActivePane {
        self.active_pane
    }

    /// Switching views also moves focus to the view's list pane.
    pub fn set_view(&mut self, view: View) {
        self.view = view;
        self.active_pane = match view {
            View::Live => ActivePane::ChatList,
            View::History => ActivePane::Conversations,
        };
    }

    pub fn set_active_pane(&mut self, pane: ActivePane) {
        self.active_pane = pane;
    }

    pub fn website_label(&self) -> Option<&str> {
        self.website_label.as_deref()
    }

    pub fn set_website_label(&mut self, label: Option<String>) {
        self.website_label = label;
    }

    pub fn chat_list(&self) -> &ChatListState {
        &self.chat_list
    }

    pub fn chat_list_mut(&mut self) -> &mut ChatListState {
        &mut self.chat_list
    }

    pub fn open_chat(&self) -> &OpenChatState {
        &self.open_chat
    }

    pub fn open_chat_mut(&mut self) -> &mut OpenChatState {
        &mut self.open_chat
    }

    pub fn message_input(&self) -> &MessageInputState {
        &self.message_input
    }

    pub fn message_input_mut(&mut self) -> &mut MessageInputState {
        &mut self.message_input
    }

    pub fn conversations(&self) -> &ConversationListState {
        &self.conversations
    }

    pub fn conversations_mut(&mut self) -> &mut ConversationListState {
        &mut self.conversations
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn notices_mut(&mut self) -> &mut Notices {
        &mut self.notices
    }
}

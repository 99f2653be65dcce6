use anyhow::Result;

use crate::domain::{active_chat::ChatAddress, events::AppEvent, shell_state::ShellState};

pub trait AppEventSource {
    fn next_event(&mut self) -> Result<Option<AppEvent>>;
}

pub trait ShellOrchestrator {
    fn state(&self) -> &ShellState;
    fn state_mut(&mut self) -> &mut ShellState;
    /// Kicks off the pollers for the initial targets.
    fn start(&mut self);
    fn handle_event(&mut self, event: AppEvent) -> Result<()>;
}

/// Work the shell hands off to the async runtime. Results come back as
/// `AppEvent::Background`.
pub trait BackgroundTasks {
    fn poll_active_chats(&mut self, generation: u64);
    /// `None` stops the history poller.
    fn poll_chat_history(&mut self, target: Option<(u64, ChatAddress)>);
    /// `None` stops the conversation poller.
    fn poll_conversations(&mut self, target: Option<(u64, String)>);
    fn send_message(&mut self, chat_id: String, local_id: String, address: ChatAddress, text: String);
    fn mark_read(&mut self, session_id: String);
    fn stop_all(&mut self);
}

/// Runs when the backend rejects the stored session.
pub trait SessionExpiry {
    fn session_expired(&mut self);
}

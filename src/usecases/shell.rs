use anyhow::Result;

use crate::{
    domain::{
        active_chat::ChatAddress,
        events::{AppEvent, BackgroundEvent, KeyInput},
        failure::SourceError,
        message::DeliveryState,
        shell_state::{ActivePane, ShellState, View},
    },
    infra::contracts::{Clock, ExternalOpener},
};

use super::{
    contracts::{BackgroundTasks, SessionExpiry, ShellOrchestrator},
    optimistic_send::{
        begin_send, finish_send, retry_send, BeginSendError, LocalIdSequence, SendOutcome,
    },
    poller::PollTracker,
};

const SHELL_SESSION_EXPIRED: &str = "SHELL_SESSION_EXPIRED";
const SHELL_POLL_FAILED: &str = "SHELL_POLL_FAILED";
const SHELL_SEND_FAILED: &str = "SHELL_SEND_FAILED";
const SHELL_MARK_READ_FAILED: &str = "SHELL_MARK_READ_FAILED";
const SHELL_OPEN_FAILED: &str = "SHELL_OPEN_FAILED";
const SHELL_STALE_RESULT_DISCARDED: &str = "SHELL_STALE_RESULT_DISCARDED";

/// Startup context of the interactive shell.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShellOptions {
    pub config_id: Option<String>,
    pub website_label: Option<String>,
    pub reconcile_grace_ms: i64,
}

pub struct DefaultShellOrchestrator<T, O, C, E>
where
    T: BackgroundTasks,
    O: ExternalOpener,
    C: Clock,
    E: SessionExpiry,
{
    state: ShellState,
    tasks: T,
    opener: O,
    clock: C,
    expiry: E,
    options: ShellOptions,
    list_poll: PollTracker,
    detail_poll: PollTracker,
    conversations_poll: PollTracker,
    local_ids: LocalIdSequence,
}

impl<T, O, C, E> DefaultShellOrchestrator<T, O, C, E>
where
    T: BackgroundTasks,
    O: ExternalOpener,
    C: Clock,
    E: SessionExpiry,
{
    pub fn new(tasks: T, opener: O, clock: C, expiry: E, options: ShellOptions) -> Self {
        Self {
            state: ShellState::default(),
            tasks,
            opener,
            clock,
            expiry,
            options,
            list_poll: PollTracker::default(),
            detail_poll: PollTracker::default(),
            conversations_poll: PollTracker::default(),
            local_ids: LocalIdSequence::default(),
        }
    }

    fn handle_key(&mut self, key: KeyInput) {
        if key.ctrl {
            if key.key == "o" {
                self.open_selected_chat_page();
            }
            return;
        }

        let pane = self.state.active_pane();
        if pane != ActivePane::MessageInput {
            match key.key.as_str() {
                "q" => {
                    self.stop();
                    return;
                }
                "tab" => {
                    let next = match self.state.view() {
                        View::Live => View::History,
                        View::History => View::Live,
                    };
                    self.state.set_view(next);
                    return;
                }
                "x" => {
                    self.state.notices_mut().dismiss_latest();
                    return;
                }
                _ => {}
            }
        }

        match pane {
            ActivePane::ChatList => self.handle_chat_list_key(&key.key),
            ActivePane::Messages => self.handle_messages_key(&key.key),
            ActivePane::MessageInput => self.handle_input_key(&key.key),
            ActivePane::Conversations => self.handle_conversations_key(&key.key),
            ActivePane::ConversationDetail => self.handle_detail_key(&key.key),
        }
    }

    fn handle_chat_list_key(&mut self, key: &str) {
        match key {
            "j" | "down" => self.state.chat_list_mut().select_next(),
            "k" | "up" => self.state.chat_list_mut().select_previous(),
            "enter" | "l" | "right" => self.open_selected_chat(),
            "r" => self.restart_list_poll(),
            _ => {}
        }
    }

    fn handle_messages_key(&mut self, key: &str) {
        match key {
            "j" | "down" => self.state.open_chat_mut().select_next(),
            "k" | "up" => self.state.open_chat_mut().select_previous(),
            "i" => {
                if self.state.open_chat().is_open() {
                    self.state.set_active_pane(ActivePane::MessageInput);
                }
            }
            "h" | "esc" | "left" => self.state.set_active_pane(ActivePane::ChatList),
            "R" => self.retry_selected_message(),
            "d" => self.dismiss_selected_message(),
            _ => {}
        }
    }

    fn handle_input_key(&mut self, key: &str) {
        match key {
            "esc" => return self.state.set_active_pane(ActivePane::Messages),
            "enter" => return self.submit_reply(),
            _ => {}
        }

        let input = self.state.message_input_mut();
        match key {
            "backspace" => input.delete_char_before(),
            "delete" => input.delete_char_at(),
            "left" => input.move_cursor_left(),
            "right" => input.move_cursor_right(),
            "home" => input.move_cursor_home(),
            "end" => input.move_cursor_end(),
            other => {
                let mut chars = other.chars();
                if let (Some(ch), None) = (chars.next(), chars.next()) {
                    input.insert_char(ch);
                }
            }
        }
    }

    fn handle_conversations_key(&mut self, key: &str) {
        match key {
            "j" | "down" => self.state.conversations_mut().select_next(),
            "k" | "up" => self.state.conversations_mut().select_previous(),
            "enter" | "l" | "right" => {
                if self.state.conversations().selected_conversation().is_none() {
                    return;
                }
                let read_request = self.state.conversations_mut().open_selected();
                self.state.set_active_pane(ActivePane::ConversationDetail);
                if let Some(session_id) = read_request {
                    self.tasks.mark_read(session_id);
                }
            }
            "r" => {
                let config_id = self.state.conversations().config_id().map(str::to_owned);
                self.retarget_conversations(config_id);
            }
            _ => {}
        }
    }

    fn handle_detail_key(&mut self, key: &str) {
        match key {
            "j" | "down" => self.state.conversations_mut().scroll_detail_down(),
            "k" | "up" => self.state.conversations_mut().scroll_detail_up(),
            "h" | "esc" | "left" => {
                self.state.conversations_mut().close_detail();
                self.state.set_active_pane(ActivePane::Conversations);
            }
            _ => {}
        }
    }

    fn restart_list_poll(&mut self) {
        let generation = self.list_poll.retarget(true);
        self.tasks.poll_active_chats(generation);
    }

    fn retarget_conversations(&mut self, config_id: Option<String>) {
        self.state.conversations_mut().retarget(config_id.clone());
        let generation = self.conversations_poll.retarget(config_id.is_some());
        self.tasks
            .poll_conversations(config_id.map(|config_id| (generation, config_id)));
    }

    fn open_selected_chat(&mut self) {
        let Some(chat) = self.state.chat_list().selected_chat().cloned() else {
            return;
        };
        let Some(address) = chat.address() else {
            let now = self.clock.now_ms();
            self.state
                .notices_mut()
                .error(format!("chat {} has no domain part", chat.chat_id), now);
            return;
        };

        if !self.state.open_chat().is_showing(&chat.chat_id) {
            self.state
                .open_chat_mut()
                .set_loading(chat.chat_id.clone(), chat.display_name().to_owned());
            self.state.message_input_mut().clear();
            let generation = self.detail_poll.retarget(true);
            self.tasks.poll_chat_history(Some((generation, address)));
        }
        self.state.set_active_pane(ActivePane::Messages);
    }

    fn open_selected_chat_page(&mut self) {
        let chat_id = match self.state.active_pane() {
            ActivePane::ChatList => self
                .state
                .chat_list()
                .selected_chat()
                .map(|chat| chat.chat_id.clone()),
            _ => self.state.open_chat().chat_id().map(str::to_owned),
        };
        let Some(address) = chat_id.as_deref().and_then(ChatAddress::parse) else {
            return;
        };

        if let Err(error) = self.opener.open(&address.page_url()) {
            tracing::warn!(code = SHELL_OPEN_FAILED, error = %error, "failed to open chat page");
            let now = self.clock.now_ms();
            self.state
                .notices_mut()
                .error(format!("could not open browser: {error}"), now);
        }
    }

    fn submit_reply(&mut self) {
        let now = self.clock.now_ms();
        let text = self.state.message_input().text();

        match begin_send(self.state.open_chat_mut(), &mut self.local_ids, &text, now) {
            Ok(outgoing) => {
                self.state.message_input_mut().clear();
                self.tasks.send_message(
                    outgoing.chat_id,
                    outgoing.local_id,
                    outgoing.address,
                    outgoing.text,
                );
            }
            Err(BeginSendError::EmptyMessage) => {}
            Err(error) => self.state.notices_mut().error(error.to_string(), now),
        }
    }

    fn selected_failed_id(&self) -> Option<String> {
        self.state
            .open_chat()
            .selected_message()
            .filter(|message| message.delivery == DeliveryState::Failed)
            .map(|message| message.id.clone())
    }

    fn retry_selected_message(&mut self) {
        let Some(local_id) = self.selected_failed_id() else {
            return;
        };
        if let Some(outgoing) = retry_send(self.state.open_chat_mut(), &local_id) {
            self.tasks.send_message(
                outgoing.chat_id,
                outgoing.local_id,
                outgoing.address,
                outgoing.text,
            );
        }
    }

    fn dismiss_selected_message(&mut self) {
        if let Some(local_id) = self.selected_failed_id() {
            self.state.open_chat_mut().dismiss(&local_id);
        }
    }

    fn handle_background(&mut self, event: BackgroundEvent) {
        match event {
            BackgroundEvent::ActiveChatsPolled { generation, result } => {
                if !self.list_poll.settle(generation, result.is_ok()) {
                    tracing::debug!(
                        code = SHELL_STALE_RESULT_DISCARDED,
                        target = "active_chats",
                        generation,
                        "discarding stale poll result"
                    );
                    return;
                }
                match result {
                    Ok(chats) => self.state.chat_list_mut().set_ready(chats),
                    Err(error) => {
                        self.state.chat_list_mut().set_error();
                        let first = self.list_poll.consecutive_failures() == 1;
                        self.poll_failed("active chats", error, first);
                    }
                }
            }
            BackgroundEvent::ChatHistoryPolled {
                generation,
                chat_id,
                result,
            } => {
                if !self.state.open_chat().is_showing(&chat_id)
                    || !self.detail_poll.settle(generation, result.is_ok())
                {
                    tracing::debug!(
                        code = SHELL_STALE_RESULT_DISCARDED,
                        target = "chat_history",
                        generation,
                        "discarding stale poll result"
                    );
                    return;
                }
                match result {
                    Ok(messages) => {
                        let now = self.clock.now_ms();
                        let grace = self.options.reconcile_grace_ms;
                        self.state.open_chat_mut().set_ready(messages, now, grace);
                    }
                    Err(error) => {
                        self.state.open_chat_mut().set_error();
                        let first = self.detail_poll.consecutive_failures() == 1;
                        self.poll_failed("chat history", error, first);
                    }
                }
            }
            BackgroundEvent::ConversationsPolled {
                generation,
                config_id,
                result,
            } => {
                if self.state.conversations().config_id() != Some(config_id.as_str())
                    || !self.conversations_poll.settle(generation, result.is_ok())
                {
                    tracing::debug!(
                        code = SHELL_STALE_RESULT_DISCARDED,
                        target = "conversations",
                        generation,
                        "discarding stale poll result"
                    );
                    return;
                }
                match result {
                    Ok(messages) => self.state.conversations_mut().set_ready(&messages),
                    Err(error) => {
                        self.state.conversations_mut().set_error();
                        let first = self.conversations_poll.consecutive_failures() == 1;
                        self.poll_failed("conversation history", error, first);
                    }
                }
            }
            BackgroundEvent::SendFinished {
                chat_id,
                local_id,
                result,
            } => {
                if matches!(&result, Err(error) if error.is_unauthorized()) {
                    self.expire_session();
                    return;
                }
                let now = self.clock.now_ms();
                let outcome =
                    finish_send(self.state.open_chat_mut(), &chat_id, &local_id, &result, now);
                if let Err(error) = result {
                    tracing::warn!(
                        code = SHELL_SEND_FAILED,
                        chat_id = %chat_id,
                        error_code = error.code(),
                        error = %error,
                        "agent reply was not delivered"
                    );
                    if outcome == SendOutcome::Failed {
                        self.state.notices_mut().error(
                            format!("reply not delivered: {error} (R to retry, d to drop)"),
                            now,
                        );
                    }
                }
            }
            BackgroundEvent::MarkReadFinished { session_id, result } => {
                self.state.conversations_mut().read_finished(&session_id);
                if let Err(error) = result {
                    if error.is_unauthorized() {
                        self.expire_session();
                        return;
                    }
                    tracing::warn!(
                        code = SHELL_MARK_READ_FAILED,
                        session_id = %session_id,
                        error = %error,
                        "failed to mark conversation read"
                    );
                    let now = self.clock.now_ms();
                    self.state
                        .notices_mut()
                        .error(format!("could not mark conversation read: {error}"), now);
                }
            }
        }
    }

    /// Poll errors become one notice per failure streak; a 401 ends the session.
    fn poll_failed(&mut self, target: &str, error: SourceError, notify: bool) {
        if error.is_unauthorized() {
            self.expire_session();
            return;
        }

        tracing::warn!(
            code = SHELL_POLL_FAILED,
            target,
            error_code = error.code(),
            error = %error,
            "poll failed; showing last known data"
        );
        if notify {
            let now = self.clock.now_ms();
            self.state
                .notices_mut()
                .error(format!("{target}: {error}"), now);
        }
    }

    fn expire_session(&mut self) {
        if self.state.session_expired() {
            return;
        }

        tracing::warn!(code = SHELL_SESSION_EXPIRED, "backend rejected the session");
        self.tasks.stop_all();
        self.list_poll.stop();
        self.detail_poll.stop();
        self.conversations_poll.stop();
        self.state.expire_session();
        self.expiry.session_expired();
    }

    fn stop(&mut self) {
        self.tasks.stop_all();
        self.state.stop();
    }
}

impl<T, O, C, E> ShellOrchestrator for DefaultShellOrchestrator<T, O, C, E>
where
    T: BackgroundTasks,
    O: ExternalOpener,
    C: Clock,
    E: SessionExpiry,
{
    fn state(&self) -> &ShellState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ShellState {
        &mut self.state
    }

    fn start(&mut self) {
        self.state
            .set_website_label(self.options.website_label.clone());
        self.state.chat_list_mut().set_loading();
        self.restart_list_poll();
        let config_id = self.options.config_id.clone();
        if config_id.is_none() {
            let now = self.clock.now_ms();
            self.state.notices_mut().info(
                "no website selected; run `livedesk websites select` for history",
                now,
            );
        }
        self.retarget_conversations(config_id);
    }

    fn handle_event(&mut self, event: AppEvent) -> Result<()> {
        match event {
            AppEvent::Tick => {
                let now = self.clock.now_ms();
                self.state.notices_mut().expire(now);
            }
            AppEvent::QuitRequested => self.stop(),
            AppEvent::InputKey(key) => self.handle_key(key),
            AppEvent::Background(event) => self.handle_background(event),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::domain::{
        active_chat::ActiveChat,
        chat_list_state::ChatListUiState,
        conversation_list_state::ConversationListUiState,
        message::{ChatMessage, RawMessage, Sender},
        notice::NoticeLevel,
    };

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        ActiveChats(u64),
        History(Option<(u64, String)>),
        Conversations(Option<(u64, String)>),
        Send { local_id: String, text: String },
        MarkRead(String),
        StopAll,
    }

    #[derive(Default)]
    struct RecordingTasks {
        calls: Vec<Call>,
    }

    impl BackgroundTasks for RecordingTasks {
        fn poll_active_chats(&mut self, generation: u64) {
            self.calls.push(Call::ActiveChats(generation));
        }

        fn poll_chat_history(&mut self, target: Option<(u64, ChatAddress)>) {
            self.calls.push(Call::History(
                target.map(|(generation, address)| (generation, address.chat_id())),
            ));
        }

        fn poll_conversations(&mut self, target: Option<(u64, String)>) {
            self.calls.push(Call::Conversations(target));
        }

        fn send_message(
            &mut self,
            _chat_id: String,
            local_id: String,
            _address: ChatAddress,
            text: String,
        ) {
            self.calls.push(Call::Send { local_id, text });
        }

        fn mark_read(&mut self, session_id: String) {
            self.calls.push(Call::MarkRead(session_id));
        }

        fn stop_all(&mut self) {
            self.calls.push(Call::StopAll);
        }
    }

    #[derive(Default)]
    struct RecordingOpener {
        opened: RefCell<Vec<String>>,
    }

    impl ExternalOpener for RecordingOpener {
        fn open(&self, target: &str) -> Result<()> {
            self.opened.borrow_mut().push(target.to_owned());
            Ok(())
        }
    }

    struct FixedClock {
        now: Cell<i64>,
    }

    impl Clock for FixedClock {
        fn now_ms(&self) -> i64 {
            self.now.get()
        }
    }

    #[derive(Default)]
    struct RecordingExpiry {
        calls: usize,
    }

    impl SessionExpiry for RecordingExpiry {
        fn session_expired(&mut self) {
            self.calls += 1;
        }
    }

    type TestOrchestrator =
        DefaultShellOrchestrator<RecordingTasks, RecordingOpener, FixedClock, RecordingExpiry>;

    const NOW: i64 = 1_705_226_400_000;

    fn orchestrator(config_id: Option<&str>) -> TestOrchestrator {
        let mut orchestrator = DefaultShellOrchestrator::new(
            RecordingTasks::default(),
            RecordingOpener::default(),
            FixedClock {
                now: Cell::new(NOW),
            },
            RecordingExpiry::default(),
            ShellOptions {
                config_id: config_id.map(str::to_owned),
                website_label: config_id.map(|_| "Shop".to_owned()),
                reconcile_grace_ms: 10_000,
            },
        );
        orchestrator.start();
        orchestrator
    }

    fn chat(chat_id: &str, name: &str, last_activity_ms: i64) -> ActiveChat {
        ActiveChat {
            chat_id: chat_id.to_owned(),
            domain: "shop.com".to_owned(),
            session_id: format!("session-{name}"),
            name: name.to_owned(),
            avatar: None,
            last_activity_ms,
            is_bot_active: false,
        }
    }

    fn customer(id: &str, text: &str) -> ChatMessage {
        ChatMessage {
            id: id.to_owned(),
            sender: Sender::Customer,
            text: text.to_owned(),
            timestamp: "2024-01-14T10:00:00Z".to_owned(),
            is_read: true,
            delivery: DeliveryState::Confirmed,
        }
    }

    fn raw(session_id: &str, is_read: bool) -> RawMessage {
        RawMessage {
            session_id: session_id.to_owned(),
            timestamp: "2024-01-14T10:00:00Z".to_owned(),
            sender: Sender::Customer,
            text: "hello".to_owned(),
            domain: "shop.com".to_owned(),
            rating: None,
            is_read,
        }
    }

    fn key(orchestrator: &mut TestOrchestrator, name: &str) {
        orchestrator
            .handle_event(AppEvent::InputKey(KeyInput::new(name, false)))
            .expect("key must be handled");
    }

    fn background(orchestrator: &mut TestOrchestrator, event: BackgroundEvent) {
        orchestrator
            .handle_event(AppEvent::Background(event))
            .expect("background event must be handled");
    }

    fn with_open_chat() -> TestOrchestrator {
        let mut orchestrator = orchestrator(Some("cfg-1"));
        background(
            &mut orchestrator,
            BackgroundEvent::ActiveChatsPolled {
                generation: 1,
                result: Ok(vec![chat("v1@shop.com/cart", "Alice", 10)]),
            },
        );
        key(&mut orchestrator, "enter");
        background(
            &mut orchestrator,
            BackgroundEvent::ChatHistoryPolled {
                generation: 1,
                chat_id: "v1@shop.com/cart".to_owned(),
                result: Ok(vec![customer("1", "hi, anyone?")]),
            },
        );
        orchestrator
    }

    #[test]
    fn start_polls_list_and_selected_site() {
        let orchestrator = orchestrator(Some("cfg-1"));

        assert_eq!(
            orchestrator.tasks.calls,
            [
                Call::ActiveChats(1),
                Call::Conversations(Some((1, "cfg-1".to_owned()))),
            ]
        );
        assert_eq!(orchestrator.state().website_label(), Some("Shop"));
        assert_eq!(
            orchestrator.state().conversations().ui_state(),
            ConversationListUiState::Loading
        );
    }

    #[test]
    fn start_without_site_leaves_history_unselected() {
        let orchestrator = orchestrator(None);

        assert_eq!(orchestrator.tasks.calls[1], Call::Conversations(None));
        assert_eq!(
            orchestrator.state().conversations().ui_state(),
            ConversationListUiState::NoSelection
        );
        assert_eq!(
            orchestrator.state().notices().latest().map(|n| n.level),
            Some(NoticeLevel::Info)
        );
    }

    #[test]
    fn stops_on_quit_event() {
        let mut orchestrator = orchestrator(None);

        orchestrator
            .handle_event(AppEvent::QuitRequested)
            .expect("event must be handled");

        assert!(!orchestrator.state().is_running());
        assert_eq!(orchestrator.tasks.calls.last(), Some(&Call::StopAll));
    }

    #[test]
    fn list_result_of_previous_generation_is_discarded() {
        let mut orchestrator = orchestrator(None);
        key(&mut orchestrator, "r");

        background(
            &mut orchestrator,
            BackgroundEvent::ActiveChatsPolled {
                generation: 1,
                result: Ok(vec![chat("v1@a.com", "Old", 1)]),
            },
        );
        assert_eq!(
            orchestrator.state().chat_list().ui_state(),
            ChatListUiState::Loading
        );

        background(
            &mut orchestrator,
            BackgroundEvent::ActiveChatsPolled {
                generation: 2,
                result: Ok(vec![chat("v2@a.com", "New", 2)]),
            },
        );
        assert_eq!(orchestrator.state().chat_list().chats()[0].name, "New");
    }

    #[test]
    fn key_contract_navigates_chat_list_with_vim_keys() {
        let mut orchestrator = orchestrator(None);
        background(
            &mut orchestrator,
            BackgroundEvent::ActiveChatsPolled {
                generation: 1,
                result: Ok(vec![
                    chat("a@x.com", "A", 30),
                    chat("b@x.com", "B", 20),
                    chat("c@x.com", "C", 10),
                ]),
            },
        );

        key(&mut orchestrator, "j");
        assert_eq!(orchestrator.state().chat_list().selected_index(), Some(1));
        key(&mut orchestrator, "k");
        assert_eq!(orchestrator.state().chat_list().selected_index(), Some(0));
    }

    #[test]
    fn opening_a_chat_starts_history_polling() {
        let orchestrator = with_open_chat();

        assert!(orchestrator
            .tasks
            .calls
            .contains(&Call::History(Some((1, "v1@shop.com/cart".to_owned())))));
        assert_eq!(orchestrator.state().active_pane(), ActivePane::Messages);
        assert_eq!(orchestrator.state().open_chat().chat_title(), "Alice");
        assert_eq!(orchestrator.state().open_chat().message_count(), 1);
    }

    #[test]
    fn history_for_a_chat_no_longer_open_is_discarded() {
        let mut orchestrator = with_open_chat();

        background(
            &mut orchestrator,
            BackgroundEvent::ChatHistoryPolled {
                generation: 1,
                chat_id: "other@shop.com".to_owned(),
                result: Ok(vec![customer("9", "wrong chat")]),
            },
        );

        let texts: Vec<_> = orchestrator
            .state()
            .open_chat()
            .messages()
            .map(|m| m.text.clone())
            .collect();
        assert_eq!(texts, ["hi, anyone?"]);
    }

    #[test]
    fn reply_is_echoed_then_tagged_failed_and_retried() {
        let mut orchestrator = with_open_chat();
        key(&mut orchestrator, "i");
        for ch in ["o", "k", " ", "q"] {
            key(&mut orchestrator, ch);
        }
        key(&mut orchestrator, "enter");

        assert!(orchestrator.state().is_running());
        assert!(orchestrator.state().message_input().is_empty());
        assert_eq!(
            orchestrator.tasks.calls.last(),
            Some(&Call::Send {
                local_id: "local-1".to_owned(),
                text: "ok q".to_owned()
            })
        );
        let echo = orchestrator.state().open_chat().messages().last().cloned();
        assert_eq!(echo.map(|m| m.delivery), Some(DeliveryState::Pending));

        background(
            &mut orchestrator,
            BackgroundEvent::SendFinished {
                chat_id: "v1@shop.com/cart".to_owned(),
                local_id: "local-1".to_owned(),
                result: Err(SourceError::Unavailable {
                    detail: "502".to_owned(),
                }),
            },
        );
        let selected = orchestrator.state().open_chat().selected_message().cloned();
        assert_eq!(selected.map(|m| m.delivery), Some(DeliveryState::Failed));
        assert_eq!(
            orchestrator.state().notices().latest().map(|n| n.level),
            Some(NoticeLevel::Error)
        );

        key(&mut orchestrator, "esc");
        key(&mut orchestrator, "R");
        assert_eq!(
            orchestrator.tasks.calls.last(),
            Some(&Call::Send {
                local_id: "local-1".to_owned(),
                text: "ok q".to_owned()
            })
        );
        let selected = orchestrator.state().open_chat().selected_message().cloned();
        assert_eq!(selected.map(|m| m.delivery), Some(DeliveryState::Pending));
    }

    #[test]
    fn failed_reply_can_be_dismissed() {
        let mut orchestrator = with_open_chat();
        key(&mut orchestrator, "i");
        key(&mut orchestrator, "x");
        key(&mut orchestrator, "enter");
        background(
            &mut orchestrator,
            BackgroundEvent::SendFinished {
                chat_id: "v1@shop.com/cart".to_owned(),
                local_id: "local-1".to_owned(),
                result: Err(SourceError::Rejected { message: None }),
            },
        );
        key(&mut orchestrator, "esc");

        key(&mut orchestrator, "d");

        assert_eq!(orchestrator.state().open_chat().message_count(), 1);
    }

    #[test]
    fn unauthorized_poll_expires_session_once() {
        let mut orchestrator = orchestrator(Some("cfg-1"));

        background(
            &mut orchestrator,
            BackgroundEvent::ActiveChatsPolled {
                generation: 1,
                result: Err(SourceError::Unauthorized),
            },
        );
        background(
            &mut orchestrator,
            BackgroundEvent::ConversationsPolled {
                generation: 1,
                config_id: "cfg-1".to_owned(),
                result: Err(SourceError::Unauthorized),
            },
        );

        assert!(orchestrator.state().session_expired());
        assert!(!orchestrator.state().is_running());
        assert_eq!(orchestrator.expiry.calls, 1);
        assert!(orchestrator.tasks.calls.contains(&Call::StopAll));
    }

    #[test]
    fn repeated_poll_failures_raise_one_notice_and_keep_data() {
        let mut orchestrator = orchestrator(None);
        background(
            &mut orchestrator,
            BackgroundEvent::ActiveChatsPolled {
                generation: 1,
                result: Ok(vec![chat("v1@a.com", "Alice", 1)]),
            },
        );
        orchestrator.state_mut().notices_mut().dismiss_latest();

        for _ in 0..3 {
            background(
                &mut orchestrator,
                BackgroundEvent::ActiveChatsPolled {
                    generation: 1,
                    result: Err(SourceError::Unavailable {
                        detail: "timeout".to_owned(),
                    }),
                },
            );
        }

        assert_eq!(orchestrator.state().notices().len(), 1);
        assert!(orchestrator.state().chat_list().is_stale());
        assert_eq!(orchestrator.state().chat_list().chats().len(), 1);
    }

    #[test]
    fn opening_unread_conversation_marks_it_read() {
        let mut orchestrator = orchestrator(Some("cfg-1"));
        background(
            &mut orchestrator,
            BackgroundEvent::ConversationsPolled {
                generation: 1,
                config_id: "cfg-1".to_owned(),
                result: Ok(vec![raw("s1", false), raw("s1", false)]),
            },
        );
        key(&mut orchestrator, "tab");
        assert_eq!(orchestrator.state().view(), View::History);

        key(&mut orchestrator, "enter");

        assert_eq!(
            orchestrator.tasks.calls.last(),
            Some(&Call::MarkRead("s1".to_owned()))
        );
        assert_eq!(orchestrator.state().conversations().total_unread(), 0);
        assert_eq!(
            orchestrator.state().active_pane(),
            ActivePane::ConversationDetail
        );
    }

    #[test]
    fn ctrl_o_opens_the_customer_page() {
        let mut orchestrator = with_open_chat();

        orchestrator
            .handle_event(AppEvent::InputKey(KeyInput::new("o", true)))
            .expect("ctrl+o must be handled");

        assert_eq!(
            *orchestrator.opener.opened.borrow(),
            ["https://shop.com/cart"]
        );
    }

    #[test]
    fn tick_expires_old_notices() {
        let mut orchestrator = orchestrator(None);
        assert!(!orchestrator.state().notices().is_empty());

        orchestrator.clock.now.set(NOW + 60_000);
        orchestrator
            .handle_event(AppEvent::Tick)
            .expect("tick must be handled");

        assert!(orchestrator.state().notices().is_empty());
    }
}

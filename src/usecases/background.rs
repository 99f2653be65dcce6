//! Tokio-side execution of the shell's background work.

use std::sync::{mpsc::Sender, Arc};

use async_trait::async_trait;
use tokio::runtime::Handle;

use crate::{
    domain::{
        active_chat::{ActiveChat, ChatAddress},
        events::{AppEvent, BackgroundEvent},
        failure::SourceError,
        message::{ChatMessage, RawMessage},
    },
    usecases::{
        contracts::BackgroundTasks,
        conversations::{fetch_history, mark_conversation_read, AdminHistorySource, HistoryQuery},
        list_active_chats::{list_active_chats, ActiveChatsSource},
        load_history::{load_history, ChatHistorySource},
        poller::{start_poll, BackoffPolicy, PollHandle, PollJob},
        send_message::{send_message, MessageSender, SendMessageCommand, SendMessageError},
    },
};

const BACKGROUND_EVENT_DROPPED: &str = "BACKGROUND_EVENT_DROPPED";

/// Everything the live console needs from the backend.
pub trait ConsoleBackend:
    ActiveChatsSource + ChatHistorySource + AdminHistorySource + MessageSender + 'static
{
}

impl<T> ConsoleBackend for T where
    T: ActiveChatsSource + ChatHistorySource + AdminHistorySource + MessageSender + 'static
{
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackgroundSettings {
    pub policy: BackoffPolicy,
    pub history_limit: usize,
}

pub struct TokioBackgroundTasks<B: ConsoleBackend> {
    runtime: Handle,
    backend: Arc<B>,
    events: Sender<AppEvent>,
    settings: BackgroundSettings,
    active_chats: Option<PollHandle>,
    chat_history: Option<PollHandle>,
    conversations: Option<PollHandle>,
}

impl<B: ConsoleBackend> TokioBackgroundTasks<B> {
    pub fn new(
        runtime: Handle,
        backend: Arc<B>,
        events: Sender<AppEvent>,
        settings: BackgroundSettings,
    ) -> Self {
        Self {
            runtime,
            backend,
            events,
            settings,
            active_chats: None,
            chat_history: None,
            conversations: None,
        }
    }
}

impl<B: ConsoleBackend> BackgroundTasks for TokioBackgroundTasks<B> {
    fn poll_active_chats(&mut self, generation: u64) {
        self.active_chats = None;
        let job = ActiveChatsJob {
            backend: Arc::clone(&self.backend),
            generation,
            events: self.events.clone(),
        };
        self.active_chats = Some(start_poll(&self.runtime, job, self.settings.policy));
    }

    fn poll_chat_history(&mut self, target: Option<(u64, ChatAddress)>) {
        self.chat_history = None;
        let Some((generation, address)) = target else {
            return;
        };

        let job = ChatHistoryJob {
            backend: Arc::clone(&self.backend),
            generation,
            chat_id: address.chat_id(),
            address,
            events: self.events.clone(),
        };
        self.chat_history = Some(start_poll(&self.runtime, job, self.settings.policy));
    }

    fn poll_conversations(&mut self, target: Option<(u64, String)>) {
        self.conversations = None;
        let Some((generation, config_id)) = target else {
            return;
        };

        let job = ConversationsJob {
            backend: Arc::clone(&self.backend),
            generation,
            query: HistoryQuery::for_site(config_id, self.settings.history_limit),
            events: self.events.clone(),
        };
        self.conversations = Some(start_poll(&self.runtime, job, self.settings.policy));
    }

    fn send_message(&mut self, chat_id: String, local_id: String, address: ChatAddress, text: String) {
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();

        self.runtime.spawn(async move {
            let command = SendMessageCommand { address, text };
            let result = send_message(backend.as_ref(), command)
                .await
                .map_err(|error| match error {
                    SendMessageError::Source(source) => source,
                    SendMessageError::EmptyMessage => SourceError::Rejected {
                        message: Some(error.to_string()),
                    },
                });

            emit(
                &events,
                BackgroundEvent::SendFinished {
                    chat_id,
                    local_id,
                    result,
                },
            );
        });
    }

    fn mark_read(&mut self, session_id: String) {
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();

        self.runtime.spawn(async move {
            let result = mark_conversation_read(backend.as_ref(), &session_id).await;
            emit(&events, BackgroundEvent::MarkReadFinished { session_id, result });
        });
    }

    fn stop_all(&mut self) {
        self.active_chats = None;
        self.chat_history = None;
        self.conversations = None;
    }
}

fn emit(events: &Sender<AppEvent>, event: BackgroundEvent) -> bool {
    match events.send(AppEvent::Background(event)) {
        Ok(()) => true,
        Err(_) => {
            tracing::debug!(
                code = BACKGROUND_EVENT_DROPPED,
                "shell event channel closed; dropping background result"
            );
            false
        }
    }
}

struct ActiveChatsJob<B> {
    backend: Arc<B>,
    generation: u64,
    events: Sender<AppEvent>,
}

#[async_trait]
impl<B: ConsoleBackend> PollJob for ActiveChatsJob<B> {
    type Output = Vec<ActiveChat>;

    fn name(&self) -> &'static str {
        "active_chats"
    }

    async fn fetch(&self) -> Result<Vec<ActiveChat>, SourceError> {
        list_active_chats(self.backend.as_ref()).await
    }

    fn deliver(&self, result: Result<Vec<ActiveChat>, SourceError>) -> bool {
        emit(
            &self.events,
            BackgroundEvent::ActiveChatsPolled {
                generation: self.generation,
                result,
            },
        )
    }
}

struct ChatHistoryJob<B> {
    backend: Arc<B>,
    generation: u64,
    chat_id: String,
    address: ChatAddress,
    events: Sender<AppEvent>,
}

#[async_trait]
impl<B: ConsoleBackend> PollJob for ChatHistoryJob<B> {
    type Output = Vec<ChatMessage>;

    fn name(&self) -> &'static str {
        "chat_history"
    }

    async fn fetch(&self) -> Result<Vec<ChatMessage>, SourceError> {
        load_history(self.backend.as_ref(), &self.address).await
    }

    fn deliver(&self, result: Result<Vec<ChatMessage>, SourceError>) -> bool {
        emit(
            &self.events,
            BackgroundEvent::ChatHistoryPolled {
                generation: self.generation,
                chat_id: self.chat_id.clone(),
                result,
            },
        )
    }
}

struct ConversationsJob<B> {
    backend: Arc<B>,
    generation: u64,
    query: HistoryQuery,
    events: Sender<AppEvent>,
}

#[async_trait]
impl<B: ConsoleBackend> PollJob for ConversationsJob<B> {
    type Output = Vec<RawMessage>;

    fn name(&self) -> &'static str {
        "conversations"
    }

    async fn fetch(&self) -> Result<Vec<RawMessage>, SourceError> {
        fetch_history(self.backend.as_ref(), &self.query).await
    }

    fn deliver(&self, result: Result<Vec<RawMessage>, SourceError>) -> bool {
        emit(
            &self.events,
            BackgroundEvent::ConversationsPolled {
                generation: self.generation,
                config_id: self.query.config_id.clone(),
                result,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{mpsc, Mutex},
        time::Duration,
    };

    use tokio::runtime::Runtime;

    use super::*;
    use crate::domain::message::{DeliveryState, Sender as MessageSenderRole};

    #[derive(Default)]
    struct StubBackend {
        sent: Mutex<Vec<(String, String)>>,
        marked: Mutex<Vec<String>>,
        send_error: Option<SourceError>,
    }

    #[async_trait]
    impl ActiveChatsSource for StubBackend {
        async fn list_active_chats(&self) -> Result<Vec<ActiveChat>, SourceError> {
            Ok(vec![ActiveChat {
                chat_id: "v1@a.com".to_owned(),
                domain: "a.com".to_owned(),
                session_id: "s1".to_owned(),
                name: "Alice".to_owned(),
                avatar: None,
                last_activity_ms: 1,
                is_bot_active: false,
            }])
        }
    }

    #[async_trait]
    impl ChatHistorySource for StubBackend {
        async fn chat_history(
            &self,
            address: &ChatAddress,
        ) -> Result<Vec<ChatMessage>, SourceError> {
            Ok(vec![ChatMessage {
                id: "1".to_owned(),
                sender: MessageSenderRole::Customer,
                text: format!("hello from {}", address.local_part),
                timestamp: "2024-01-14T10:00:00Z".to_owned(),
                is_read: true,
                delivery: DeliveryState::Confirmed,
            }])
        }
    }

    #[async_trait]
    impl AdminHistorySource for StubBackend {
        async fn admin_history(
            &self,
            _query: &HistoryQuery,
        ) -> Result<Vec<RawMessage>, SourceError> {
            Ok(Vec::new())
        }

        async fn mark_read(&self, session_id: &str) -> Result<(), SourceError> {
            self.marked
                .lock()
                .expect("marked lock")
                .push(session_id.to_owned());
            Ok(())
        }
    }

    #[async_trait]
    impl MessageSender for StubBackend {
        async fn send_agent_message(
            &self,
            address: &ChatAddress,
            text: &str,
        ) -> Result<(), SourceError> {
            self.sent
                .lock()
                .expect("sent lock")
                .push((address.chat_id(), text.to_owned()));
            match &self.send_error {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            }
        }
    }

    struct Fixture {
        runtime: Runtime,
        backend: Arc<StubBackend>,
        rx: mpsc::Receiver<AppEvent>,
        tasks: TokioBackgroundTasks<StubBackend>,
    }

    fn fixture(backend: StubBackend) -> Fixture {
        let runtime = Runtime::new().expect("runtime");
        let backend = Arc::new(backend);
        let (tx, rx) = mpsc::channel();
        let tasks = TokioBackgroundTasks::new(
            runtime.handle().clone(),
            Arc::clone(&backend),
            tx,
            BackgroundSettings {
                policy: BackoffPolicy::new(Duration::from_millis(5), Duration::from_millis(20)),
                history_limit: 100,
            },
        );

        Fixture {
            runtime,
            backend,
            rx,
            tasks,
        }
    }

    fn next_background(rx: &mpsc::Receiver<AppEvent>) -> BackgroundEvent {
        match rx.recv_timeout(Duration::from_secs(2)).expect("event in time") {
            AppEvent::Background(event) => event,
            other => panic!("unexpected event: {other:?}"),
        }
    }

    fn address(chat_id: &str) -> ChatAddress {
        ChatAddress::parse(chat_id).expect("valid chat id")
    }

    #[test]
    fn active_chat_results_carry_generation() {
        let mut fx = fixture(StubBackend::default());

        fx.tasks.poll_active_chats(7);

        match next_background(&fx.rx) {
            BackgroundEvent::ActiveChatsPolled { generation, result } => {
                assert_eq!(generation, 7);
                assert_eq!(result.expect("chats").len(), 1);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn switching_history_target_stops_previous_driver() {
        let mut fx = fixture(StubBackend::default());

        fx.tasks.poll_chat_history(Some((1, address("a@x.com"))));
        next_background(&fx.rx);
        fx.tasks.poll_chat_history(Some((2, address("b@y.com"))));
        std::thread::sleep(Duration::from_millis(40));
        while fx.rx.try_recv().is_ok() {}

        for _ in 0..3 {
            match next_background(&fx.rx) {
                BackgroundEvent::ChatHistoryPolled {
                    generation,
                    chat_id,
                    ..
                } => {
                    assert_eq!(generation, 2);
                    assert_eq!(chat_id, "b@y.com");
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[test]
    fn clearing_conversation_target_stops_polling() {
        let mut fx = fixture(StubBackend::default());

        fx.tasks.poll_conversations(Some((1, "cfg".to_owned())));
        match next_background(&fx.rx) {
            BackgroundEvent::ConversationsPolled { config_id, .. } => {
                assert_eq!(config_id, "cfg")
            }
            other => panic!("unexpected event: {other:?}"),
        }
        fx.tasks.poll_conversations(None);
        std::thread::sleep(Duration::from_millis(40));
        while fx.rx.try_recv().is_ok() {}
        std::thread::sleep(Duration::from_millis(60));

        assert!(fx.rx.try_recv().is_err());
    }

    #[test]
    fn send_reports_outcome_for_local_echo() {
        let mut fx = fixture(StubBackend {
            send_error: Some(SourceError::Rejected { message: None }),
            ..StubBackend::default()
        });

        fx.tasks.send_message(
            "v1@a.com".to_owned(),
            "local-3".to_owned(),
            address("v1@a.com"),
            "hello".to_owned(),
        );

        assert_eq!(
            next_background(&fx.rx),
            BackgroundEvent::SendFinished {
                chat_id: "v1@a.com".to_owned(),
                local_id: "local-3".to_owned(),
                result: Err(SourceError::Rejected { message: None }),
            }
        );
        assert_eq!(
            *fx.backend.sent.lock().expect("sent lock"),
            [("v1@a.com".to_owned(), "hello".to_owned())]
        );
    }

    #[test]
    fn mark_read_reports_completion() {
        let mut fx = fixture(StubBackend::default());

        fx.tasks.mark_read("s9".to_owned());

        assert_eq!(
            next_background(&fx.rx),
            BackgroundEvent::MarkReadFinished {
                session_id: "s9".to_owned(),
                result: Ok(()),
            }
        );
        assert_eq!(*fx.backend.marked.lock().expect("marked lock"), ["s9"]);
    }
}

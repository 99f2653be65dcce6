use async_trait::async_trait;

use crate::domain::{
    active_chat::{sort_by_activity, ActiveChat},
    failure::SourceError,
};

#[async_trait]
pub trait ActiveChatsSource: Send + Sync {
    async fn list_active_chats(&self) -> Result<Vec<ActiveChat>, SourceError>;
}

/// Active sessions, most recent activity first.
pub async fn list_active_chats(
    source: &(dyn ActiveChatsSource + '_),
) -> Result<Vec<ActiveChat>, SourceError> {
    let mut chats = source.list_active_chats().await?;
    sort_by_activity(&mut chats);
    Ok(chats)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct StubSource {
        result: Result<Vec<ActiveChat>, SourceError>,
        calls: Mutex<usize>,
    }

    impl StubSource {
        fn with_result(result: Result<Vec<ActiveChat>, SourceError>) -> Self {
            Self {
                result,
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl ActiveChatsSource for StubSource {
        async fn list_active_chats(&self) -> Result<Vec<ActiveChat>, SourceError> {
            *self.calls.lock().expect("calls lock") += 1;
            self.result.clone()
        }
    }

    fn chat(chat_id: &str, last_activity_ms: i64) -> ActiveChat {
        ActiveChat {
            chat_id: chat_id.to_owned(),
            domain: "a.com".to_owned(),
            session_id: "s".to_owned(),
            name: String::new(),
            avatar: None,
            last_activity_ms,
            is_bot_active: true,
        }
    }

    #[tokio::test]
    async fn returns_chats_most_recent_first() {
        let source = StubSource::with_result(Ok(vec![chat("a@x", 1), chat("b@x", 5)]));

        let chats = list_active_chats(&source).await.expect("list should succeed");

        assert_eq!(chats[0].chat_id, "b@x");
        assert_eq!(*source.calls.lock().expect("calls lock"), 1);
    }

    #[tokio::test]
    async fn passes_source_errors_through() {
        let source = StubSource::with_result(Err(SourceError::Unauthorized));

        let err = list_active_chats(&source).await.expect_err("must fail");

        assert_eq!(err, SourceError::Unauthorized);
    }
}

//! Local echo of agent replies while the send request is in flight.

use chrono::{DateTime, SecondsFormat};
use thiserror::Error;

use crate::{
    domain::{
        active_chat::ChatAddress,
        failure::SourceError,
        message::{ChatMessage, DeliveryState, Sender},
        open_chat_state::OpenChatState,
    },
    usecases::send_message::validate_text,
};

const LOCAL_ID_PREFIX: &str = "local-";

/// Hands out `local-<n>` ids, unique for the lifetime of the shell.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LocalIdSequence {
    issued: u64,
}

impl LocalIdSequence {
    pub fn next_id(&mut self) -> String {
        self.issued += 1;
        format!("{LOCAL_ID_PREFIX}{}", self.issued)
    }
}

/// A send request ready to be dispatched to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingSend {
    pub chat_id: String,
    pub local_id: String,
    pub address: ChatAddress,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BeginSendError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("no chat is open")]
    NoChatOpen,
    #[error("chat id {0} has no domain part")]
    InvalidChatId(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    Failed,
    /// The chat was switched or the echo is gone.
    Discarded,
}

/// Appends a pending echo to the open chat and returns the request to send.
pub fn begin_send(
    chat: &mut OpenChatState,
    ids: &mut LocalIdSequence,
    text: &str,
    now_ms: i64,
) -> Result<OutgoingSend, BeginSendError> {
    let chat_id = chat.chat_id().ok_or(BeginSendError::NoChatOpen)?.to_owned();
    let text = validate_text(text)
        .map_err(|_| BeginSendError::EmptyMessage)?
        .to_owned();
    let address =
        ChatAddress::parse(&chat_id).ok_or_else(|| BeginSendError::InvalidChatId(chat_id.clone()))?;

    let local_id = ids.next_id();
    chat.push_local(ChatMessage {
        id: local_id.clone(),
        sender: Sender::Agent,
        text: text.clone(),
        timestamp: format_timestamp(now_ms),
        is_read: true,
        delivery: DeliveryState::Pending,
    });

    Ok(OutgoingSend {
        chat_id,
        local_id,
        address,
        text,
    })
}

/// Puts a failed echo back to pending and rebuilds its request.
pub fn retry_send(chat: &mut OpenChatState, local_id: &str) -> Option<OutgoingSend> {
    let chat_id = chat.chat_id()?.to_owned();
    let address = ChatAddress::parse(&chat_id)?;
    let text = chat.retry(local_id)?;

    Some(OutgoingSend {
        chat_id,
        local_id: local_id.to_owned(),
        address,
        text,
    })
}

/// Applies the backend's answer to the echo it belongs to.
pub fn finish_send(
    chat: &mut OpenChatState,
    chat_id: &str,
    local_id: &str,
    result: &Result<(), SourceError>,
    now_ms: i64,
) -> SendOutcome {
    if !chat.is_showing(chat_id) {
        return SendOutcome::Discarded;
    }

    let applied = match result {
        Ok(()) => chat.mark_sent(local_id, now_ms),
        Err(_) => chat.mark_failed(local_id),
    };

    match (applied, result.is_ok()) {
        (false, _) => SendOutcome::Discarded,
        (true, true) => SendOutcome::Sent,
        (true, false) => SendOutcome::Failed,
    }
}

fn format_timestamp(now_ms: i64) -> String {
    DateTime::from_timestamp_millis(now_ms)
        .map(|instant| instant.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

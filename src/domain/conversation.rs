//! Grouping of admin history records into per-session conversations.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::message::{parse_timestamp, RawMessage, Sender};

/// Label used when a session has no customer-authored message.
pub const ANONYMOUS_CUSTOMER: &str = "Anonymous customer";

/// A derived view of one customer session. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub session_id: String,
    /// First customer message text; a display heuristic, not an identity.
    pub customer_name: String,
    /// Origin site of the first message.
    pub domain: String,
    /// Score of the last rated message, if any.
    pub rating: Option<i32>,
    pub unread_count: usize,
    pub start_time: String,
    pub last_message_time: String,
    /// Messages in ascending timestamp order.
    pub messages: Vec<RawMessage>,
}

/// Groups raw messages by session and orders the result by latest activity.
///
/// Within a session messages are sorted ascending by parsed timestamp; a
/// timestamp that does not parse sorts before every parseable one and keeps
/// its arrival order relative to other unparseable ones. Conversations are
/// ordered by last activity descending, ties broken by session id ascending.
pub fn group_into_conversations(messages: &[RawMessage]) -> Vec<Conversation> {
    let mut sessions: BTreeMap<&str, Vec<&RawMessage>> = BTreeMap::new();
    for message in messages {
        sessions
            .entry(message.session_id.as_str())
            .or_default()
            .push(message);
    }

    let mut conversations: Vec<(Option<DateTime<Utc>>, Conversation)> = sessions
        .into_iter()
        .filter_map(|(session_id, group)| build_conversation(session_id, group))
        .collect();

    conversations.sort_by(|(left_at, left), (right_at, right)| {
        right_at
            .cmp(left_at)
            .then_with(|| left.session_id.cmp(&right.session_id))
    });

    conversations
        .into_iter()
        .map(|(_, conversation)| conversation)
        .collect()
}

/// Messages of one session in chronological order.
pub fn conversation_messages(messages: &[RawMessage], session_id: &str) -> Vec<RawMessage> {
    let mut selected: Vec<RawMessage> = messages
        .iter()
        .filter(|message| message.session_id == session_id)
        .cloned()
        .collect();
    selected.sort_by_cached_key(|message| parse_timestamp(&message.timestamp));
    selected
}

fn build_conversation(
    session_id: &str,
    mut group: Vec<&RawMessage>,
) -> Option<(Option<DateTime<Utc>>, Conversation)> {
    group.sort_by_cached_key(|message| parse_timestamp(&message.timestamp));

    let first = *group.first()?;
    let last = *group.last()?;

    let customer_name = group
        .iter()
        .find(|message| message.sender == Sender::Customer)
        .map(|message| message.text.clone())
        .unwrap_or_else(|| ANONYMOUS_CUSTOMER.to_owned());

    let rating = group
        .iter()
        .rev()
        .find_map(|message| message.rating.as_deref())
        .and_then(parse_rating);

    let unread_count = group.iter().filter(|message| !message.is_read).count();

    let conversation = Conversation {
        session_id: session_id.to_owned(),
        customer_name,
        domain: first.domain.clone(),
        rating,
        unread_count,
        start_time: first.timestamp.clone(),
        last_message_time: last.timestamp.clone(),
        messages: group.into_iter().cloned().collect(),
    };

    Some((parse_timestamp(&last.timestamp), conversation))
}

/// Reads the leading integer of a rating string ("5", " 4 ", "3.0").
fn parse_rating(value: &str) -> Option<i32> {
    let value = value.trim();
    let digits_end = value
        .char_indices()
        .find(|(index, ch)| !(ch.is_ascii_digit() || (*index == 0 && (*ch == '-' || *ch == '+'))))
        .map(|(index, _)| index)
        .unwrap_or(value.len());

    value[..digits_end].parse().ok()
}

//! Message list rendering logic.
//!
//! Handles visual formatting of messages including:
//! - Multi-line message display (time + sender on first line, text below)
//! - Sender grouping (consecutive messages from same sender show name only once)
//! - Date separators between messages from different days
//! - Delivery markers on replies the operator sent from this console

use chrono::{DateTime, Local, NaiveDate, Utc};
use ratatui::{
    layout::Alignment,
    text::{Line, Span},
    widgets::ListItem,
};

use crate::domain::message::{parse_timestamp, ChatMessage, DeliveryState, RawMessage, Sender};

use super::styles;

const UNKNOWN_TIME: &str = "??:??";

/// The parts of a message the list needs, for live and history messages alike.
#[derive(Debug, Clone, Copy)]
pub struct MessageView<'a> {
    pub timestamp: &'a str,
    pub sender: &'a Sender,
    pub text: &'a str,
    pub delivery: DeliveryState,
}

impl<'a> From<&'a ChatMessage> for MessageView<'a> {
    fn from(message: &'a ChatMessage) -> Self {
        Self {
            timestamp: &message.timestamp,
            sender: &message.sender,
            text: &message.text,
            delivery: message.delivery,
        }
    }
}

impl<'a> From<&'a RawMessage> for MessageView<'a> {
    fn from(message: &'a RawMessage) -> Self {
        Self {
            timestamp: &message.timestamp,
            sender: &message.sender,
            text: &message.text,
            delivery: DeliveryState::Confirmed,
        }
    }
}

/// Represents a visual element in the messages list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageListElement {
    /// Date separator line (e.g., "——— 14 Feb 2026 ———").
    DateSeparator(String),
    Message {
        time: String,
        /// Shown on the first message of a run from the same sender.
        sender: Option<String>,
        is_agent: bool,
        content: String,
        delivery: DeliveryState,
    },
}

/// Builds a list of visual elements from messages.
///
/// Groups consecutive messages from the same sender and inserts date separators.
pub fn build_message_list_elements<'a>(
    messages: impl IntoIterator<Item = MessageView<'a>>,
) -> Vec<MessageListElement> {
    let mut elements = Vec::new();
    let mut prev_date: Option<Option<NaiveDate>> = None;
    let mut prev_sender: Option<&Sender> = None;

    for message in messages {
        let local = parse_timestamp(message.timestamp).map(to_local);
        let msg_date = local.map(|instant| instant.date_naive());

        if prev_date != Some(msg_date) {
            elements.push(MessageListElement::DateSeparator(
                msg_date.map(format_date).unwrap_or_else(|| "Unknown date".to_owned()),
            ));
            prev_sender = None;
        }

        let sender = (prev_sender != Some(message.sender)).then(|| message.sender.label().to_owned());

        elements.push(MessageListElement::Message {
            time: local
                .map(|instant| instant.format("%H:%M").to_string())
                .unwrap_or_else(|| UNKNOWN_TIME.to_owned()),
            sender,
            is_agent: *message.sender == Sender::Agent,
            content: message.text.to_owned(),
            delivery: message.delivery,
        });

        prev_date = Some(msg_date);
        prev_sender = Some(message.sender);
    }

    elements
}

/// Converts a message index to the corresponding element index in the list.
///
/// Since the element list contains both messages and date separators,
/// this function finds the element index for a given message index.
/// Returns `None` if the message index is out of range.
pub fn message_index_to_element_index(
    elements: &[MessageListElement],
    message_index: usize,
) -> Option<usize> {
    elements
        .iter()
        .enumerate()
        .filter(|(_, element)| matches!(element, MessageListElement::Message { .. }))
        .nth(message_index)
        .map(|(element_index, _)| element_index)
}

/// Converts a list element to a ListItem for ratatui rendering.
pub fn element_to_list_item(element: &MessageListElement) -> ListItem<'static> {
    match element {
        MessageListElement::DateSeparator(date) => date_separator_item(date),
        MessageListElement::Message {
            time,
            sender,
            is_agent,
            content,
            delivery,
        } => message_item(time, sender.as_deref(), *is_agent, content, *delivery),
    }
}

/// Short tag appended to a locally sent reply.
pub fn delivery_marker(state: DeliveryState) -> Option<&'static str> {
    match state {
        DeliveryState::Confirmed => None,
        DeliveryState::Pending => Some("…"),
        DeliveryState::Sent => Some("✓"),
        DeliveryState::Failed => Some("! not sent (R: retry, d: dismiss)"),
    }
}

fn date_separator_item(date: &str) -> ListItem<'static> {
    let separator = format!("——— {date} ———");
    let line = Line::from(vec![Span::styled(
        separator,
        styles::date_separator_style(),
    )])
    .alignment(Alignment::Center);
    ListItem::new(vec![Line::default(), line, Line::default()])
}

fn message_item(
    time: &str,
    sender: Option<&str>,
    is_agent: bool,
    content: &str,
    delivery: DeliveryState,
) -> ListItem<'static> {
    let indent = "      ";
    let mut lines = Vec::new();
    let mut content_lines = content.lines();

    let mut first = vec![Span::styled(format!("{time:>5} "), styles::message_time_style())];
    match sender {
        Some(name) => {
            let style = if is_agent {
                styles::agent_sender_style()
            } else {
                styles::message_sender_style()
            };
            first.push(Span::styled(format!("{name}:"), style));
        }
        None => match content_lines.next() {
            Some(text) => first.push(Span::styled(text.to_owned(), styles::message_text_style())),
            None => first.push(empty_placeholder()),
        },
    }
    if let Some(marker) = delivery_marker(delivery) {
        first.push(Span::styled(format!(" {marker}"), styles::delivery_style(delivery)));
    }
    lines.push(Line::from(first));

    let mut wrote_body = sender.is_none();
    for text in content_lines {
        lines.push(Line::from(vec![
            Span::raw(indent.to_owned()),
            Span::styled(text.to_owned(), styles::message_text_style()),
        ]));
        wrote_body = true;
    }
    if !wrote_body {
        lines.push(Line::from(vec![Span::raw(indent.to_owned()), empty_placeholder()]));
    }

    ListItem::new(lines)
}

fn empty_placeholder() -> Span<'static> {
    Span::styled("[Empty message]".to_owned(), styles::message_placeholder_style())
}

fn to_local(instant: DateTime<Utc>) -> DateTime<Local> {
    instant.with_timezone(&Local)
}

fn format_date(date: NaiveDate) -> String {
    // Format: "14 Feb 2026"
    date.format("%-d %b %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(sender: Sender, text: &str, timestamp: &str, delivery: DeliveryState) -> ChatMessage {
        ChatMessage {
            id: format!("{timestamp}-{text}"),
            sender,
            text: text.to_owned(),
            timestamp: timestamp.to_owned(),
            is_read: true,
            delivery,
        }
    }

    fn customer(text: &str, timestamp: &str) -> ChatMessage {
        msg(Sender::Customer, text, timestamp, DeliveryState::Confirmed)
    }

    fn elements_of(messages: &[ChatMessage]) -> Vec<MessageListElement> {
        build_message_list_elements(messages.iter().map(MessageView::from))
    }

    // Noon UTC keeps both days distinct in every timezone within ±11h.
    const FEB_14_NOON: &str = "2026-02-14T12:00:00Z";
    const FEB_14_NOON_PLUS_MINUTE: &str = "2026-02-14T12:01:00Z";
    const FEB_15_NOON: &str = "2026-02-15T12:00:00Z";

    #[test]
    fn builds_date_separator_for_first_message() {
        let elements = elements_of(&[customer("Hello", FEB_14_NOON)]);

        assert_eq!(elements.len(), 2);
        assert!(matches!(&elements[0], MessageListElement::DateSeparator(_)));
    }

    #[test]
    fn groups_consecutive_messages_from_same_sender() {
        let elements = elements_of(&[
            customer("First", FEB_14_NOON),
            customer("Second", FEB_14_NOON_PLUS_MINUTE),
        ]);

        assert_eq!(elements.len(), 3);
        assert!(matches!(&elements[1], MessageListElement::Message { sender: Some(_), .. }));
        assert!(matches!(&elements[2], MessageListElement::Message { sender: None, .. }));
    }

    #[test]
    fn shows_sender_when_sender_changes() {
        let elements = elements_of(&[
            customer("Hi", FEB_14_NOON),
            msg(Sender::Agent, "Hello", FEB_14_NOON_PLUS_MINUTE, DeliveryState::Confirmed),
        ]);

        assert!(matches!(
            &elements[2],
            MessageListElement::Message { sender: Some(name), is_agent: true, .. } if name == "Agent"
        ));
    }

    #[test]
    fn inserts_date_separator_on_date_change_and_resets_grouping() {
        let elements = elements_of(&[customer("Day 1", FEB_14_NOON), customer("Day 2", FEB_15_NOON)]);

        assert_eq!(elements.len(), 4);
        assert!(matches!(&elements[2], MessageListElement::DateSeparator(_)));
        assert!(matches!(&elements[3], MessageListElement::Message { sender: Some(_), .. }));
    }

    #[test]
    fn unparseable_timestamp_gets_placeholder_time() {
        let elements = elements_of(&[customer("?", "yesterday-ish")]);

        assert_eq!(elements[0], MessageListElement::DateSeparator("Unknown date".to_owned()));
        assert!(matches!(&elements[1], MessageListElement::Message { time, .. } if time == UNKNOWN_TIME));
    }

    #[test]
    fn history_messages_render_as_confirmed() {
        let raw = RawMessage {
            session_id: "s".to_owned(),
            timestamp: FEB_14_NOON.to_owned(),
            sender: Sender::Bot,
            text: "auto reply".to_owned(),
            domain: "shop.com".to_owned(),
            rating: None,
            is_read: true,
        };

        let elements = build_message_list_elements([MessageView::from(&raw)]);

        assert!(matches!(
            &elements[1],
            MessageListElement::Message { delivery: DeliveryState::Confirmed, sender: Some(name), .. } if name == "Bot"
        ));
    }

    #[test]
    fn delivery_markers_distinguish_local_states() {
        assert_eq!(delivery_marker(DeliveryState::Confirmed), None);
        assert_eq!(delivery_marker(DeliveryState::Pending), Some("…"));
        assert_eq!(delivery_marker(DeliveryState::Sent), Some("✓"));
        assert!(delivery_marker(DeliveryState::Failed)
            .is_some_and(|marker| marker.contains("retry")));
    }

    #[test]
    fn format_date_produces_correct_format() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 14).expect("valid date");

        assert_eq!(format_date(date), "14 Feb 2026");
    }

    #[test]
    fn message_index_to_element_index_accounts_for_date_separators() {
        let elements = elements_of(&[customer("Day 1", FEB_14_NOON), customer("Day 2", FEB_15_NOON)]);

        assert_eq!(message_index_to_element_index(&elements, 0), Some(1));
        assert_eq!(message_index_to_element_index(&elements, 1), Some(3));
        assert_eq!(message_index_to_element_index(&elements, 2), None);
    }

    #[test]
    fn message_index_to_element_index_returns_none_for_empty_elements() {
        assert_eq!(message_index_to_element_index(&[], 0), None);
    }

    #[test]
    fn failed_reply_item_carries_marker_text() {
        let element = MessageListElement::Message {
            time: "10:00".to_owned(),
            sender: Some("Agent".to_owned()),
            is_agent: true,
            content: "hello".to_owned(),
            delivery: DeliveryState::Failed,
        };

        let item = element_to_list_item(&element);

        assert_eq!(item.height(), 2);
    }
}

use chrono::{DateTime, NaiveDateTime, Utc};

/// Author role of a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Sender {
    /// Website visitor (`user` on the wire).
    Customer,
    /// Automated responder.
    Bot,
    /// Human operator (`admin` on the wire).
    Agent,
    /// Any role the backend adds later; kept verbatim.
    Other(String),
}

impl Sender {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "user" | "customer" => Self::Customer,
            "bot" => Self::Bot,
            "admin" | "agent" => Self::Agent,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn as_wire(&self) -> &str {
        match self {
            Self::Customer => "user",
            Self::Bot => "bot",
            Self::Agent => "admin",
            Self::Other(value) => value,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Customer => "Customer",
            Self::Bot => "Bot",
            Self::Agent => "Agent",
            Self::Other(value) => value,
        }
    }
}

/// A message record from the admin history endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub session_id: String,
    pub timestamp: String,
    pub sender: Sender,
    pub text: String,
    pub domain: String,
    /// Satisfaction score as delivered (usually "1".."5").
    pub rating: Option<String>,
    pub is_read: bool,
}

/// Local bookkeeping for messages shown in a live chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    /// Came from the server.
    Confirmed,
    /// Appended locally, request in flight.
    Pending,
    /// Backend acknowledged the send; waiting for it to show up in history.
    Sent,
    /// Backend refused or the request never arrived.
    Failed,
}

/// A message in the live chat view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: String,
    pub sender: Sender,
    pub text: String,
    pub timestamp: String,
    pub is_read: bool,
    pub delivery: DeliveryState,
}

/// Parses the backend's timestamps: RFC 3339 first, then a naive
/// `YYYY-MM-DD HH:MM:SS` form interpreted as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

pub fn timestamp_millis(value: &str) -> Option<i64> {
    parse_timestamp(value).map(|instant| instant.timestamp_millis())
}

/// A live session currently open on some website.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveChat {
    /// `local@domain/path`; the identity used by the send endpoint.
    pub chat_id: String,
    pub domain: String,
    pub session_id: String,
    pub name: String,
    pub avatar: Option<String>,
    /// Epoch millis of the last message in the session.
    pub last_activity_ms: i64,
    pub is_bot_active: bool,
}

impl ActiveChat {
    pub fn address(&self) -> Option<ChatAddress> {
        ChatAddress::parse(&self.chat_id)
    }

    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.chat_id
        } else {
            &self.name
        }
    }
}

/// The two halves of a chat id, as the history endpoint wants them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatAddress {
    pub local_part: String,
    /// Everything after the first `@`, including any page path.
    pub domain: String,
}

impl ChatAddress {
    pub fn parse(chat_id: &str) -> Option<Self> {
        let (local_part, domain) = chat_id.split_once('@')?;
        if local_part.is_empty() || domain.is_empty() {
            return None;
        }

        Some(Self {
            local_part: local_part.to_owned(),
            domain: domain.to_owned(),
        })
    }

    pub fn chat_id(&self) -> String {
        format!("{}@{}", self.local_part, self.domain)
    }

    /// Page the customer is chatting from.
    pub fn page_url(&self) -> String {
        if self.domain.starts_with("http://") || self.domain.starts_with("https://") {
            self.domain.clone()
        } else {
            format!("https://{}", self.domain)
        }
    }
}

/// Most recent activity first; equal timestamps fall back to chat id.
pub fn sort_by_activity(chats: &mut [ActiveChat]) {
    chats.sort_by(|left, right| {
        right
            .last_activity_ms
            .cmp(&left.last_activity_ms)
            .then_with(|| left.chat_id.cmp(&right.chat_id))
    });
}

use std::collections::VecDeque;

const MAX_NOTICES: usize = 4;
const NOTICE_TTL_MS: i64 = 8_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A transient message shown in the status area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    pub raised_at_ms: i64,
}

/// Bounded queue of notices; the oldest falls off first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Notices {
    items: VecDeque<Notice>,
}

impl Notices {
    pub fn info(&mut self, text: impl Into<String>, now_ms: i64) {
        self.push(NoticeLevel::Info, text.into(), now_ms);
    }

    pub fn error(&mut self, text: impl Into<String>, now_ms: i64) {
        self.push(NoticeLevel::Error, text.into(), now_ms);
    }

    fn push(&mut self, level: NoticeLevel, text: String, raised_at_ms: i64) {
        // Repeated poll failures would otherwise flood the queue.
        if self
            .items
            .back()
            .is_some_and(|last| last.level == level && last.text == text)
        {
            if let Some(last) = self.items.back_mut() {
                last.raised_at_ms = raised_at_ms;
            }
            return;
        }

        if self.items.len() == MAX_NOTICES {
            self.items.pop_front();
        }
        self.items.push_back(Notice {
            level,
            text,
            raised_at_ms,
        });
    }

    pub fn expire(&mut self, now_ms: i64) {
        self.items
            .retain(|notice| now_ms.saturating_sub(notice.raised_at_ms) < NOTICE_TTL_MS);
    }

    pub fn latest(&self) -> Option<&Notice> {
        self.items.back()
    }

    pub fn dismiss_latest(&mut self) {
        self.items.pop_back();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

//! Style definitions for the UI components.

use ratatui::style::{Color, Modifier, Style};

use crate::domain::{message::DeliveryState, notice::NoticeLevel};

// =============================================================================
// Panels
// =============================================================================

pub fn active_panel_border_style() -> Style {
    Style::default().fg(Color::Cyan)
}

pub fn inactive_panel_border_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn highlight_style() -> Style {
    Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD)
}

// =============================================================================
// Chat and conversation lists
// =============================================================================

/// Style for chat or customer name (bold, bright).
pub fn chat_name_style() -> Style {
    Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::BOLD)
}

/// Style for secondary text such as the page a chat comes from.
pub fn chat_preview_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

/// Style for unread count badge (green).
pub fn unread_count_style() -> Style {
    Style::default().fg(Color::Green)
}

/// Marker for chats currently answered by the bot.
pub fn bot_badge_style() -> Style {
    Style::default().fg(Color::Magenta)
}

pub fn rating_style() -> Style {
    Style::default().fg(Color::Yellow)
}

/// Style for timestamp column.
pub fn timestamp_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

/// Style for separator between timestamp and content.
pub fn separator_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

// =============================================================================
// Message list styles
// =============================================================================

/// Style for message sender name (white, bold).
pub fn message_sender_style() -> Style {
    Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::BOLD)
}

/// Replies written by the operator stand out from customer text.
pub fn agent_sender_style() -> Style {
    Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD)
}

/// Style for message time in the messages panel.
pub fn message_time_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

/// Style for message text content.
pub fn message_text_style() -> Style {
    Style::default().fg(Color::White)
}

/// Style for placeholders like [Empty message].
pub fn message_placeholder_style() -> Style {
    Style::default().fg(Color::Cyan)
}

/// Style for date separator line.
pub fn date_separator_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn delivery_style(state: DeliveryState) -> Style {
    match state {
        DeliveryState::Confirmed | DeliveryState::Sent => Style::default().fg(Color::Green),
        DeliveryState::Pending => Style::default().fg(Color::DarkGray),
        DeliveryState::Failed => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    }
}

// =============================================================================
// Input and status
// =============================================================================

pub fn input_prompt_style() -> Style {
    Style::default().fg(Color::Cyan)
}

pub fn input_text_style() -> Style {
    Style::default().fg(Color::White)
}

pub fn input_placeholder_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn notice_style(level: NoticeLevel) -> Style {
    match level {
        NoticeLevel::Info => Style::default().fg(Color::Cyan),
        NoticeLevel::Error => Style::default().fg(Color::Red),
    }
}

pub fn status_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

use chrono::{Local, TimeZone};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::domain::{
    active_chat::ActiveChat,
    chat_list_state::ChatListUiState,
    conversation::Conversation,
    conversation_list_state::{ConversationListState, ConversationListUiState},
    message::timestamp_millis,
    open_chat_state::{OpenChatState, OpenChatUiState},
    shell_state::{ActivePane, ShellState, View},
};

use super::message_input::render_message_input;
use super::message_rendering::{
    build_message_list_elements, element_to_list_item, message_index_to_element_index, MessageView,
};
use super::styles;

const STALE_SUFFIX: &str = " · stale";

pub fn render(frame: &mut Frame<'_>, state: &mut ShellState) {
    let [content_area, notice_area, status_area] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(frame.area());

    match state.view() {
        View::Live => render_live_view(frame, content_area, state),
        View::History => render_history_view(frame, content_area, state),
    }

    frame.render_widget(Paragraph::new(notice_line(state)), notice_area);
    frame.render_widget(
        Paragraph::new(status_line(state)).style(styles::status_style()),
        status_area,
    );
}

fn border_style(active: bool) -> Style {
    if active {
        styles::active_panel_border_style()
    } else {
        styles::inactive_panel_border_style()
    }
}

fn panel(title: String, active: bool) -> Block<'static> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style(active))
}

fn render_placeholder(frame: &mut Frame<'_>, area: Rect, title: String, text: &str, active: bool) {
    frame.render_widget(
        Paragraph::new(text.to_owned()).block(panel(title, active)),
        area,
    );
}

// =============================================================================
// Live view
// =============================================================================

fn render_live_view(frame: &mut Frame<'_>, area: Rect, state: &mut ShellState) {
    let [chats_area, right_area] = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .areas(area);

    // 3 lines for input: 1 border + 1 text + 1 border
    let [messages_area, input_area] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .areas(right_area);

    let active_pane = state.active_pane();
    render_chat_list_panel(frame, chats_area, state, active_pane == ActivePane::ChatList);
    render_messages_panel(frame, messages_area, state, active_pane == ActivePane::Messages);
    render_message_input(frame, input_area, state.message_input(), active_pane);
}

fn render_chat_list_panel(frame: &mut Frame<'_>, area: Rect, state: &ShellState, active: bool) {
    let chat_list = state.chat_list();
    let stale = if chat_list.is_stale() { STALE_SUFFIX } else { "" };

    match chat_list.ui_state() {
        ChatListUiState::Loading => render_placeholder(
            frame,
            area,
            "Active chats".to_owned(),
            "Loading chats...",
            active,
        ),
        ChatListUiState::Empty => render_placeholder(
            frame,
            area,
            format!("Active chats{stale}"),
            "No active chats right now.",
            active,
        ),
        ChatListUiState::Error => render_placeholder(
            frame,
            area,
            "Active chats".to_owned(),
            "Failed to load chats. Press r to retry.",
            active,
        ),
        ChatListUiState::Ready => {
            let chats = chat_list.chats();
            let inner_width = area.width.saturating_sub(2) as usize;
            let items: Vec<ListItem<'static>> = chats
                .iter()
                .map(|chat| ListItem::new(chat_list_item_line(chat, inner_width)))
                .collect();

            let list = List::new(items)
                .block(panel(format!("Active chats ({}){stale}", chats.len()), active))
                .highlight_style(styles::highlight_style());

            let mut list_state = ListState::default();
            list_state.select(chat_list.selected_index());
            frame.render_stateful_widget(list, area, &mut list_state);
        }
    }
}

fn chat_list_item_line(chat: &ActiveChat, width: usize) -> Line<'static> {
    let timestamp = format_list_timestamp(chat.last_activity_ms);
    let bot_badge = if chat.is_bot_active { " [bot]" } else { "" };

    // timestamp (5) + " | " (3)
    let fixed = 5 + 3;
    let name = truncate_to_width(chat.display_name(), width.saturating_sub(fixed + bot_badge.len()));
    let used = fixed + name.width() + bot_badge.len();
    let domain = truncate_to_width(&chat.domain, width.saturating_sub(used + 1));

    let mut spans = vec![
        Span::styled(format!("{timestamp:>5}"), styles::timestamp_style()),
        Span::styled(" | ", styles::separator_style()),
        Span::styled(name, styles::chat_name_style()),
    ];
    if !domain.is_empty() {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(domain, styles::chat_preview_style()));
    }
    if !bot_badge.is_empty() {
        spans.push(Span::styled(bot_badge.to_owned(), styles::bot_badge_style()));
    }

    Line::from(spans)
}

fn render_messages_panel(frame: &mut Frame<'_>, area: Rect, state: &mut ShellState, active: bool) {
    let open_chat = state.open_chat();
    let title = open_chat_title(open_chat);

    let text = match open_chat.ui_state() {
        OpenChatUiState::Empty => Some("Select a chat to take it over"),
        OpenChatUiState::Loading => Some("Loading messages..."),
        OpenChatUiState::Error => Some("Failed to load messages. Retrying..."),
        OpenChatUiState::Ready if open_chat.message_count() == 0 => Some("No messages in this chat"),
        OpenChatUiState::Ready => None,
    };
    if let Some(text) = text {
        return render_placeholder(frame, area, title, text, active);
    }

    let elements = build_message_list_elements(open_chat.messages().map(MessageView::from));
    let items: Vec<ListItem<'static>> = elements.iter().map(element_to_list_item).collect();
    let viewport_height = area.height.saturating_sub(2) as usize;
    let element_index = open_chat
        .selected_index()
        .and_then(|index| message_index_to_element_index(&elements, index));

    if let Some(index) = element_index {
        state
            .open_chat_mut()
            .update_scroll_offset(index, viewport_height);
    }

    let list = List::new(items)
        .block(panel(title, active))
        .highlight_style(styles::highlight_style());

    let mut list_state = ListState::default();
    list_state.select(element_index);
    *list_state.offset_mut() = state.open_chat().scroll_offset();
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn open_chat_title(open_chat: &OpenChatState) -> String {
    if !open_chat.is_open() {
        return "Messages".to_owned();
    }

    let stale = if open_chat.is_stale() { STALE_SUFFIX } else { "" };
    format!("Messages: {}{stale}", open_chat.chat_title())
}

// =============================================================================
// History view
// =============================================================================

fn render_history_view(frame: &mut Frame<'_>, area: Rect, state: &ShellState) {
    let [list_area, detail_area] = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .areas(area);

    let conversations = state.conversations();
    let active_pane = state.active_pane();
    render_conversation_list(
        frame,
        list_area,
        conversations,
        active_pane == ActivePane::Conversations,
    );
    render_conversation_detail(
        frame,
        detail_area,
        conversations,
        active_pane == ActivePane::ConversationDetail,
    );
}

fn render_conversation_list(
    frame: &mut Frame<'_>,
    area: Rect,
    conversations: &ConversationListState,
    active: bool,
) {
    let stale = if conversations.is_stale() { STALE_SUFFIX } else { "" };

    let text = match conversations.ui_state() {
        ConversationListUiState::NoSelection => {
            Some("No website selected. Run `livedesk websites select <id>`.")
        }
        ConversationListUiState::Loading => Some("Loading conversations..."),
        ConversationListUiState::Empty => Some("No conversations yet."),
        ConversationListUiState::Error => Some("Failed to load conversations. Press r to retry."),
        ConversationListUiState::Ready => None,
    };
    if let Some(text) = text {
        return render_placeholder(frame, area, format!("Conversations{stale}"), text, active);
    }

    let inner_width = area.width.saturating_sub(2) as usize;
    let items: Vec<ListItem<'static>> = conversations
        .conversations()
        .iter()
        .map(|conversation| ListItem::new(conversation_item_line(conversation, inner_width)))
        .collect();

    let title = format!(
        "Conversations ({}, {} unread){stale}",
        conversations.conversations().len(),
        conversations.total_unread()
    );
    let list = List::new(items)
        .block(panel(title, active))
        .highlight_style(styles::highlight_style());

    let mut list_state = ListState::default();
    list_state.select(conversations.selected_index());
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn conversation_item_line(conversation: &Conversation, width: usize) -> Line<'static> {
    let timestamp = timestamp_millis(&conversation.last_message_time)
        .map(format_list_timestamp)
        .unwrap_or_else(|| "     ".to_owned());
    let unread = if conversation.unread_count > 0 {
        format!(" [{}]", conversation.unread_count)
    } else {
        String::new()
    };
    let stars = conversation.rating.map(rating_stars).unwrap_or_default();
    let suffix_width = unread.width() + if stars.is_empty() { 0 } else { stars.width() + 1 };

    let fixed = 5 + 3;
    let name = truncate_to_width(
        &single_line(&conversation.customer_name),
        width.saturating_sub(fixed + suffix_width),
    );

    let mut spans = vec![
        Span::styled(format!("{timestamp:>5}"), styles::timestamp_style()),
        Span::styled(" | ", styles::separator_style()),
        Span::styled(name, styles::chat_name_style()),
    ];
    if !unread.is_empty() {
        spans.push(Span::styled(unread, styles::unread_count_style()));
    }
    if !stars.is_empty() {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(stars, styles::rating_style()));
    }

    Line::from(spans)
}

fn render_conversation_detail(
    frame: &mut Frame<'_>,
    area: Rect,
    conversations: &ConversationListState,
    active: bool,
) {
    let Some(conversation) = conversations.open_conversation() else {
        return render_placeholder(
            frame,
            area,
            "Conversation".to_owned(),
            "Press Enter on a conversation to read it",
            active,
        );
    };

    let elements =
        build_message_list_elements(conversation.messages.iter().map(MessageView::from));
    let items: Vec<ListItem<'static>> = elements.iter().map(element_to_list_item).collect();
    let offset = message_index_to_element_index(&elements, conversations.detail_scroll())
        .map(|index| index.saturating_sub(1))
        .unwrap_or(0);

    let title = format!(
        "Conversation: {} ({})",
        truncate_to_width(&single_line(&conversation.customer_name), 40),
        conversation.domain
    );
    let list = List::new(items).block(panel(title, active));

    let mut list_state = ListState::default();
    *list_state.offset_mut() = offset;
    frame.render_stateful_widget(list, area, &mut list_state);
}

// =============================================================================
// Notices and status
// =============================================================================

fn notice_line(state: &ShellState) -> Line<'static> {
    match state.notices().latest() {
        Some(notice) => {
            let more = state.notices().len().saturating_sub(1);
            let mut text = notice.text.clone();
            if more > 0 {
                text.push_str(&format!(" (+{more})"));
            }
            Line::from(Span::styled(text, styles::notice_style(notice.level)))
        }
        None => Line::default(),
    }
}

fn status_line(state: &ShellState) -> String {
    let site = state.website_label().unwrap_or("no website");
    let view = match state.view() {
        View::Live => "live",
        View::History => "history",
    };
    let nav_hint = match state.active_pane() {
        ActivePane::ChatList => {
            "j/k: navigate | l/Enter: take over | r: refresh | Tab: history | q: quit"
        }
        ActivePane::Messages => {
            "j/k: navigate | i: reply | R: retry | d: dismiss | ^O: open page | h/Esc: back"
        }
        ActivePane::MessageInput => "Enter: send | Esc: cancel",
        ActivePane::Conversations => {
            "j/k: navigate | Enter: read | r: refresh | Tab: live | q: quit"
        }
        ActivePane::ConversationDetail => "j/k: scroll | h/Esc: back",
    };
    format!("site: {site} | view: {view} | {nav_hint}")
}

// =============================================================================
// Formatting helpers
// =============================================================================

fn format_list_timestamp(timestamp_ms: i64) -> String {
    let datetime = match Local.timestamp_millis_opt(timestamp_ms) {
        chrono::LocalResult::Single(dt) => dt,
        chrono::LocalResult::Ambiguous(dt, _) => dt,
        chrono::LocalResult::None => return "     ".to_owned(),
    };

    if datetime.date_naive() == Local::now().date_naive() {
        datetime.format("%H:%M").to_string()
    } else {
        datetime.format("%d.%m").to_string()
    }
}

fn rating_stars(rating: i32) -> String {
    let filled = rating.clamp(0, 5) as usize;
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cuts `text` to at most `width` terminal columns, ending in "…" when cut.
fn truncate_to_width(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_owned();
    }
    if width == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if used + ch_width > width - 1 {
            break;
        }
        out.push(ch);
        used += ch_width;
    }
    out.push('…');
    out
}

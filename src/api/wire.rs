//! JSON shapes of the backend, and their mapping onto domain types.
//!
//! The backend is loose with types: ids arrive as numbers or strings, ratings
//! as `"4"`, `4` or `null`, flags as `true` or `"true"`. Everything is read
//! leniently here so the domain only sees one representation.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::domain::{
    account::{AccountRole, AccountTotals, AccountsPage, AdminAccount, AdminProfile},
    active_chat::ActiveChat,
    message::{timestamp_millis, ChatMessage, DeliveryState, RawMessage, Sender},
    website::{DailyCount, SiteStats, WidgetAvatar, WidgetSettings, Website},
};

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(value) => Ok(value),
        Value::Number(value) => Ok(value.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

fn optional_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(value) => Ok(Some(value)),
        Value::Number(value) => Ok(Some(value.to_string())),
        other => Err(de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Bool(value) => Ok(value),
        Value::String(value) => Ok(value.eq_ignore_ascii_case("true") || value == "1"),
        Value::Number(value) => Ok(value.as_i64() == Some(1)),
        Value::Null => Ok(false),
        other => Err(de::Error::custom(format!("expected boolean, got {other}"))),
    }
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(value) => Ok(value
            .as_u64()
            .or_else(|| value.as_f64().map(|float| float.max(0.0) as u64))
            .unwrap_or(0)),
        Value::String(value) => value
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("expected count, got {value:?}"))),
        Value::Null => Ok(0),
        other => Err(de::Error::custom(format!("expected count, got {other}"))),
    }
}

/// Epoch millis, numeric or as an ISO timestamp.
fn lenient_millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(value) => Ok(value
            .as_i64()
            .or_else(|| value.as_f64().map(|float| float as i64))
            .unwrap_or(0)),
        Value::String(value) => Ok(value
            .trim()
            .parse()
            .ok()
            .or_else(|| timestamp_millis(&value))
            .unwrap_or(0)),
        Value::Null => Ok(0),
        other => Err(de::Error::custom(format!("expected timestamp, got {other}"))),
    }
}

fn default_true() -> bool {
    true
}

/// Numeric ids go back as numbers, anything else as a string.
fn id_as_sent<S: Serializer>(id: &str, serializer: S) -> Result<S::Ok, S::Error> {
    match id.parse::<i64>() {
        Ok(number) => serializer.serialize_i64(number),
        Err(_) => serializer.serialize_str(id),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireActiveChat {
    chat_id: String,
    #[serde(default)]
    domain: String,
    #[serde(default, rename = "chat_session_id", deserialize_with = "string_or_number")]
    session_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    avatar: Option<String>,
    #[serde(default, deserialize_with = "lenient_millis")]
    last_activity: i64,
    #[serde(default, deserialize_with = "lenient_bool")]
    is_bot_active: bool,
}

impl From<WireActiveChat> for ActiveChat {
    fn from(wire: WireActiveChat) -> Self {
        Self {
            chat_id: wire.chat_id,
            domain: wire.domain,
            session_id: wire.session_id,
            name: wire.name.unwrap_or_default(),
            avatar: wire.avatar.filter(|avatar| !avatar.trim().is_empty()),
            last_activity_ms: wire.last_activity,
            is_bot_active: wire.is_bot_active,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveChatsPayload {
    #[serde(default)]
    pub active_chats: Vec<WireActiveChat>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireLiveMessage {
    #[serde(default, deserialize_with = "string_or_number")]
    id: String,
    sender: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    timestamp: String,
    #[serde(default = "default_true", deserialize_with = "lenient_bool")]
    is_read: bool,
}

impl From<WireLiveMessage> for ChatMessage {
    fn from(wire: WireLiveMessage) -> Self {
        let text = wire
            .message
            .filter(|text| !text.is_empty())
            .or(wire.content)
            .unwrap_or_default();

        Self {
            id: wire.id,
            sender: Sender::from_wire(&wire.sender),
            text,
            timestamp: wire.timestamp,
            is_read: wire.is_read,
            delivery: DeliveryState::Confirmed,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LiveMessagesPayload {
    #[serde(default)]
    pub messages: Vec<WireLiveMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireHistoryMessage {
    #[serde(deserialize_with = "string_or_number")]
    session_id: String,
    timestamp: String,
    #[serde(default)]
    message: String,
    sender: String,
    #[serde(default)]
    domain: String,
    #[serde(default, deserialize_with = "optional_string_or_number")]
    rating: Option<String>,
    #[serde(default = "default_true", deserialize_with = "lenient_bool")]
    is_read: bool,
}

impl From<WireHistoryMessage> for RawMessage {
    fn from(wire: WireHistoryMessage) -> Self {
        Self {
            session_id: wire.session_id,
            timestamp: wire.timestamp,
            sender: Sender::from_wire(&wire.sender),
            text: wire.message,
            domain: wire.domain,
            rating: wire.rating,
            is_read: wire.is_read,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryPayload {
    #[serde(default)]
    pub messages: Vec<WireHistoryMessage>,
}

#[derive(Debug, Deserialize)]
pub struct WireWebsite {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    #[serde(deserialize_with = "string_or_number")]
    config_id: String,
    #[serde(default, alias = "name")]
    name_website: Option<String>,
    #[serde(default)]
    domain: Option<String>,
}

impl From<WireWebsite> for Website {
    fn from(wire: WireWebsite) -> Self {
        Self {
            id: wire.id,
            config_id: wire.config_id,
            name: wire.name_website.unwrap_or_default(),
            domain: wire.domain.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WebsitesPayload {
    #[serde(default)]
    pub websites: Vec<WireWebsite>,
}

#[derive(Debug, Deserialize)]
pub struct WireDailyCount {
    #[serde(default)]
    date: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    count: u64,
}

impl From<WireDailyCount> for DailyCount {
    fn from(wire: WireDailyCount) -> Self {
        Self {
            date: wire.date,
            count: wire.count,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireStats {
    #[serde(deserialize_with = "lenient_u64")]
    visitors_today: u64,
    #[serde(deserialize_with = "lenient_u64")]
    visitors_this_month: u64,
    #[serde(deserialize_with = "lenient_u64")]
    page_views_today: u64,
    #[serde(deserialize_with = "lenient_u64")]
    page_views_this_month: u64,
    #[serde(deserialize_with = "lenient_u64")]
    conversations_answered: u64,
    #[serde(deserialize_with = "lenient_u64")]
    conversations_missed: u64,
    #[serde(rename = "visitorsLast7Days", deserialize_with = "lenient_u64")]
    visitors_last_7_days: u64,
    #[serde(rename = "pageViewsLast7Days", deserialize_with = "lenient_u64")]
    page_views_last_7_days: u64,
    daily_visitors: Vec<WireDailyCount>,
    daily_conversations: Vec<WireDailyCount>,
}

impl From<WireStats> for SiteStats {
    fn from(wire: WireStats) -> Self {
        Self {
            visitors_today: wire.visitors_today,
            visitors_this_month: wire.visitors_this_month,
            page_views_today: wire.page_views_today,
            page_views_this_month: wire.page_views_this_month,
            conversations_answered: wire.conversations_answered,
            conversations_missed: wire.conversations_missed,
            visitors_last_7_days: wire.visitors_last_7_days,
            page_views_last_7_days: wire.page_views_last_7_days,
            daily_visitors: wire.daily_visitors.into_iter().map(Into::into).collect(),
            daily_conversations: wire.daily_conversations.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatsPayload {
    #[serde(default)]
    pub stats: WireStats,
}

/// Stored widget configuration. `get-config-by-id` returns it without an
/// envelope and leaves unset fields out.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireWidgetConfig {
    theme_color: Option<String>,
    text_color: Option<String>,
    title: Option<String>,
    welcome_message: Option<String>,
    avatar: Option<String>,
    position: Option<String>,
    #[serde(deserialize_with = "lenient_bool")]
    history_enabled: bool,
    server_url: Option<String>,
    webhook_url: Option<String>,
    link_contact: Option<String>,
}

impl WireWidgetConfig {
    /// Uploaded avatars are served from `/uploads/...` on the backend origin.
    pub fn into_settings(self, origin: &str) -> WidgetSettings {
        let avatar = match self.avatar.filter(|avatar| !avatar.trim().is_empty()) {
            Some(path) if path.starts_with("/uploads") => {
                WidgetAvatar::Url(format!("{}{}", origin.trim_end_matches('/'), path))
            }
            Some(url) => WidgetAvatar::Url(url),
            None => WidgetAvatar::None,
        };

        WidgetSettings {
            theme_color: self.theme_color.unwrap_or_default(),
            text_color: self.text_color.unwrap_or_default(),
            title: self.title.unwrap_or_default(),
            welcome_message: self.welcome_message.unwrap_or_default(),
            position: self.position.unwrap_or_default(),
            history_enabled: self.history_enabled,
            server_url: self.server_url.unwrap_or_default(),
            webhook_url: self.webhook_url.unwrap_or_default(),
            link_contact: self.link_contact.unwrap_or_default(),
            avatar,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireAdminProfile {
    email: Option<String>,
    phone_number: Option<String>,
}

impl From<WireAdminProfile> for AdminProfile {
    fn from(wire: WireAdminProfile) -> Self {
        Self {
            email: wire.email.filter(|email| !email.is_empty()),
            phone: wire.phone_number.filter(|phone| !phone.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AdminInfoPayload {
    #[serde(default)]
    pub admin: WireAdminProfile,
}

#[derive(Debug, Deserialize)]
pub struct WireAccount {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    #[serde(default)]
    name_customer: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    phone: String,
    #[serde(default)]
    role: String,
    #[serde(default, deserialize_with = "string_or_number")]
    created_at: String,
    #[serde(default, deserialize_with = "string_or_number")]
    expire_at: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    is_ban: bool,
}

impl From<WireAccount> for AdminAccount {
    fn from(wire: WireAccount) -> Self {
        Self {
            id: wire.id,
            name: wire.name_customer.unwrap_or_default(),
            phone: wire.phone,
            role: AccountRole::from_wire(&wire.role).unwrap_or(AccountRole::User),
            created_at: wire.created_at,
            expire_at: wire.expire_at,
            is_banned: wire.is_ban,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WireAccountsResult {
    accounts: Vec<WireAccount>,
    #[serde(deserialize_with = "lenient_u64")]
    total_accounts: u64,
    #[serde(deserialize_with = "lenient_u64")]
    total_admin: u64,
    #[serde(deserialize_with = "lenient_u64")]
    total_user: u64,
    #[serde(deserialize_with = "lenient_u64")]
    total_banned: u64,
}

impl From<WireAccountsResult> for AccountsPage {
    fn from(wire: WireAccountsResult) -> Self {
        Self {
            accounts: wire.accounts.into_iter().map(Into::into).collect(),
            totals: AccountTotals {
                accounts: wire.total_accounts,
                admins: wire.total_admin,
                users: wire.total_user,
                banned: wire.total_banned,
            },
        }
    }
}

/// `admin-info` answers `[{ "result": { ... } }]`.
#[derive(Debug, Deserialize)]
pub struct WireAccountsItem {
    pub result: WireAccountsResult,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageBody<'a> {
    pub chat_id: &'a str,
    pub message: &'a str,
    pub sender: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadBody<'a> {
    pub session_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginBody<'a> {
    pub phone_number: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddWebsiteBody<'a> {
    pub website_url: &'a str,
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWebsiteBody<'a> {
    #[serde(serialize_with = "id_as_sent")]
    pub website_id: &'a str,
    pub name: &'a str,
    pub domain: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteWebsiteBody<'a> {
    #[serde(serialize_with = "id_as_sent")]
    pub website_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SetRoleBody<'a> {
    #[serde(serialize_with = "id_as_sent")]
    pub id: &'a str,
    pub role: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ExtendExpiryBody<'a> {
    #[serde(serialize_with = "id_as_sent")]
    pub id: &'a str,
    pub label: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SetBanBody<'a> {
    #[serde(serialize_with = "id_as_sent")]
    pub id: &'a str,
    pub is_ban: bool,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn history_message_accepts_loose_types() {
        let wire: WireHistoryMessage = serde_json::from_value(json!({
            "sessionId": 42,
            "timestamp": "2024-01-14T10:00:00Z",
            "message": "hi",
            "sender": "user",
            "domain": "shop.com",
            "rating": 5,
        }))
        .expect("decode");

        let message = RawMessage::from(wire);
        assert_eq!(message.session_id, "42");
        assert_eq!(message.rating.as_deref(), Some("5"));
        assert_eq!(message.sender, Sender::Customer);
        assert!(message.is_read, "missing isRead means read");
    }

    #[test]
    fn null_rating_is_absent() {
        let wire: WireHistoryMessage = serde_json::from_value(json!({
            "sessionId": "s",
            "timestamp": "t",
            "sender": "bot",
            "rating": null,
            "isRead": false,
        }))
        .expect("decode");

        let message = RawMessage::from(wire);
        assert_eq!(message.rating, None);
        assert!(!message.is_read);
    }

    #[test]
    fn blank_rating_is_kept_as_given() {
        let wire: WireHistoryMessage = serde_json::from_value(json!({
            "sessionId": "s",
            "timestamp": "t",
            "sender": "user",
            "rating": "",
        }))
        .expect("decode");

        assert_eq!(RawMessage::from(wire).rating.as_deref(), Some(""));
    }

    #[test]
    fn blank_latest_rating_hides_earlier_one() {
        let payload: HistoryPayload = serde_json::from_value(json!({
            "messages": [
                {"sessionId": "s1", "timestamp": "2024-01-14T10:00:00Z", "sender": "user", "message": "a", "rating": "4"},
                {"sessionId": "s1", "timestamp": "2024-01-14T10:01:00Z", "sender": "user", "message": "b", "rating": ""},
            ]
        }))
        .expect("decode");
        let raw: Vec<RawMessage> = payload.messages.into_iter().map(Into::into).collect();

        let conversations = crate::domain::conversation::group_into_conversations(&raw);

        assert_eq!(conversations[0].rating, None);
    }

    #[test]
    fn history_message_without_session_is_rejected() {
        let result = serde_json::from_value::<WireHistoryMessage>(json!({
            "timestamp": "t",
            "sender": "user",
        }));

        assert!(result.is_err());
    }

    #[test]
    fn live_message_falls_back_to_content() {
        let wire: WireLiveMessage = serde_json::from_value(json!({
            "id": 7,
            "sender": "admin",
            "message": "",
            "content": "image caption",
            "timestamp": "2024-01-14T10:00:00Z",
            "type": "text",
        }))
        .expect("decode");

        let message = ChatMessage::from(wire);
        assert_eq!(message.id, "7");
        assert_eq!(message.text, "image caption");
        assert_eq!(message.sender, Sender::Agent);
        assert_eq!(message.delivery, DeliveryState::Confirmed);
    }

    #[test]
    fn active_chat_maps_session_and_activity() {
        let wire: WireActiveChat = serde_json::from_value(json!({
            "chatId": "t9z0@127.0.0.1/testLib.html",
            "domain": "127.0.0.1",
            "chat_session_id": "abc",
            "name": "Khách",
            "avatar": "",
            "lastActivity": 1705226400000i64,
            "isBotActive": "true",
        }))
        .expect("decode");

        let chat = ActiveChat::from(wire);
        assert_eq!(chat.session_id, "abc");
        assert_eq!(chat.last_activity_ms, 1_705_226_400_000);
        assert!(chat.is_bot_active);
        assert_eq!(chat.avatar, None);
    }

    #[test]
    fn account_ban_flag_accepts_strings_and_bools() {
        for (flag, expected) in [(json!("true"), true), (json!(false), false), (json!("false"), false)] {
            let wire: WireAccount = serde_json::from_value(json!({
                "id": 3,
                "name_customer": "Lan",
                "phone": "0912345678",
                "role": "admin",
                "created_at": "2024-01-01",
                "expire_at": "0",
                "is_ban": flag,
            }))
            .expect("decode");

            let account = AdminAccount::from(wire);
            assert_eq!(account.is_banned, expected);
            assert_eq!(account.role, AccountRole::Admin);
        }
    }

    #[test]
    fn stats_tolerate_missing_and_string_counts() {
        let payload: StatsPayload = serde_json::from_value(json!({
            "stats": {
                "visitorsToday": "12",
                "conversationsAnswered": 4,
                "visitorsLast7Days": 80,
                "dailyVisitors": [{"date": "2024-01-14", "count": 12}],
            }
        }))
        .expect("decode");

        let stats = SiteStats::from(payload.stats);
        assert_eq!(stats.visitors_today, 12);
        assert_eq!(stats.conversations_answered, 4);
        assert_eq!(stats.visitors_last_7_days, 80);
        assert_eq!(stats.page_views_today, 0);
        assert_eq!(stats.daily_visitors[0].count, 12);
    }

    #[test]
    fn uploaded_avatar_is_resolved_against_origin() {
        let wire: WireWidgetConfig = serde_json::from_value(json!({
            "title": "Support",
            "avatar": "/uploads/a.png",
            "historyEnabled": "true",
        }))
        .expect("decode");

        let settings = wire.into_settings("https://n8n.vazo.vn/");
        assert_eq!(
            settings.avatar,
            WidgetAvatar::Url("https://n8n.vazo.vn/uploads/a.png".to_owned())
        );
        assert!(settings.history_enabled);
        assert_eq!(settings.theme_color, "");
    }

    #[test]
    fn numeric_ids_are_sent_as_numbers() {
        let numeric = serde_json::to_value(DeleteWebsiteBody { website_id: "15" }).expect("encode");
        let textual =
            serde_json::to_value(DeleteWebsiteBody { website_id: "ab-1" }).expect("encode");

        assert_eq!(numeric, json!({"websiteId": 15}));
        assert_eq!(textual, json!({"websiteId": "ab-1"}));
    }

    #[test]
    fn send_body_uses_backend_field_names() {
        let body = serde_json::to_value(SendMessageBody {
            chat_id: "v1@shop.com",
            message: "hi",
            sender: "admin",
        })
        .expect("encode");

        assert_eq!(body, json!({"chatId": "v1@shop.com", "message": "hi", "sender": "admin"}));
    }
}

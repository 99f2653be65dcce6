/// A registered site and the widget configuration bound to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Website {
    pub id: String,
    pub config_id: String,
    pub name: String,
    pub domain: String,
}

impl Website {
    pub fn label(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.domain
        } else {
            &self.name
        }
    }
}

/// Normalizes a user-typed site address to an absolute URL.
pub fn normalize_website_url(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Some(trimmed.to_owned())
    } else {
        Some(format!("https://{trimmed}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyCount {
    pub date: String,
    pub count: u64,
}

/// Usage counters for one widget configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SiteStats {
    pub visitors_today: u64,
    pub visitors_this_month: u64,
    pub page_views_today: u64,
    pub page_views_this_month: u64,
    pub conversations_answered: u64,
    pub conversations_missed: u64,
    pub visitors_last_7_days: u64,
    pub page_views_last_7_days: u64,
    pub daily_visitors: Vec<DailyCount>,
    pub daily_conversations: Vec<DailyCount>,
}

impl SiteStats {
    /// Share of conversations that got an answer, in whole percent.
    pub fn answer_rate_percent(&self) -> Option<u64> {
        let total = self.conversations_answered + self.conversations_missed;
        if total == 0 {
            return None;
        }

        Some((self.conversations_answered * 100 + total / 2) / total)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetAvatar {
    None,
    Url(String),
    /// Local image uploaded as a multipart file part.
    Upload { file_name: String, bytes: Vec<u8> },
}

/// Appearance and behaviour of the embeddable chat widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetSettings {
    pub theme_color: String,
    pub text_color: String,
    pub title: String,
    pub welcome_message: String,
    pub position: String,
    pub history_enabled: bool,
    pub server_url: String,
    pub webhook_url: String,
    pub link_contact: String,
    pub avatar: WidgetAvatar,
}

pub const DEFAULT_THEME_COLOR: &str = "#0abfbc";
pub const DEFAULT_TEXT_COLOR: &str = "#ffffff";
pub const DEFAULT_TITLE: &str = "Trợ lý AI";
pub const DEFAULT_WELCOME_MESSAGE: &str =
    "Xin chào! Tôi là trợ lý AI. Tôi có thể giúp gì cho bạn?";
pub const DEFAULT_POSITION: &str = "bottom-right";
pub const DEFAULT_WEBHOOK_URL: &str = "https://wf.mkt04.vawayai.com/webhook/ai-assistant";

impl WidgetSettings {
    pub fn defaults(server_url: &str) -> Self {
        Self {
            theme_color: DEFAULT_THEME_COLOR.to_owned(),
            text_color: DEFAULT_TEXT_COLOR.to_owned(),
            title: DEFAULT_TITLE.to_owned(),
            welcome_message: DEFAULT_WELCOME_MESSAGE.to_owned(),
            position: DEFAULT_POSITION.to_owned(),
            history_enabled: true,
            server_url: server_url.to_owned(),
            webhook_url: DEFAULT_WEBHOOK_URL.to_owned(),
            link_contact: String::new(),
            avatar: WidgetAvatar::None,
        }
    }

    /// Fills blank fields from the defaults, the way the backend's stored
    /// configs are shown when a field was never set.
    pub fn with_defaults_for_blanks(mut self, server_url: &str) -> Self {
        let defaults = Self::defaults(server_url);
        fill_blank(&mut self.theme_color, defaults.theme_color);
        fill_blank(&mut self.text_color, defaults.text_color);
        fill_blank(&mut self.title, defaults.title);
        fill_blank(&mut self.welcome_message, defaults.welcome_message);
        fill_blank(&mut self.position, defaults.position);
        fill_blank(&mut self.server_url, defaults.server_url);
        fill_blank(&mut self.webhook_url, defaults.webhook_url);
        self
    }
}

fn fill_blank(field: &mut String, fallback: String) {
    if field.trim().is_empty() {
        *field = fallback;
    }
}

/// The `<script>` tag a site owner pastes into their pages.
pub fn embed_snippet(script_url: &str, server_url: &str, config_id: &str) -> String {
    format!(
        "<script src=\"{script_url}\" data-server-url=\"{server_url}\" data-id-config=\"{config_id}\" defer></script>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn website_url_gets_https_when_scheme_missing() {
        assert_eq!(
            normalize_website_url(" shop.example.com "),
            Some("https://shop.example.com".to_owned())
        );
        assert_eq!(
            normalize_website_url("http://legacy.example.com"),
            Some("http://legacy.example.com".to_owned())
        );
        assert_eq!(normalize_website_url("   "), None);
    }

    #[test]
    fn website_label_prefers_name() {
        let mut site = Website {
            id: "1".to_owned(),
            config_id: "cfg".to_owned(),
            name: String::new(),
            domain: "a.com".to_owned(),
        };
        assert_eq!(site.label(), "a.com");

        site.name = "Shop".to_owned();
        assert_eq!(site.label(), "Shop");
    }

    #[test]
    fn answer_rate_rounds_to_nearest_percent() {
        let stats = SiteStats {
            conversations_answered: 2,
            conversations_missed: 1,
            ..SiteStats::default()
        };

        assert_eq!(stats.answer_rate_percent(), Some(67));
        assert_eq!(SiteStats::default().answer_rate_percent(), None);
    }

    #[test]
    fn blank_widget_fields_are_filled_from_defaults() {
        let stored = WidgetSettings {
            theme_color: "#123456".to_owned(),
            text_color: String::new(),
            title: " ".to_owned(),
            welcome_message: "Hello".to_owned(),
            position: String::new(),
            history_enabled: false,
            server_url: String::new(),
            webhook_url: String::new(),
            link_contact: String::new(),
            avatar: WidgetAvatar::None,
        };

        let settings = stored.with_defaults_for_blanks("https://api.example.com/api");

        assert_eq!(settings.theme_color, "#123456");
        assert_eq!(settings.text_color, DEFAULT_TEXT_COLOR);
        assert_eq!(settings.title, DEFAULT_TITLE);
        assert_eq!(settings.welcome_message, "Hello");
        assert_eq!(settings.server_url, "https://api.example.com/api");
        assert!(!settings.history_enabled);
    }

    #[test]
    fn embed_snippet_carries_config_id() {
        let snippet = embed_snippet("https://cdn/x.js", "https://api/api", "cfg-9");

        assert_eq!(
            snippet,
            "<script src=\"https://cdn/x.js\" data-server-url=\"https://api/api\" data-id-config=\"cfg-9\" defer></script>"
        );
    }
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AppConfig {
    pub logging: LogConfig,
    pub api: ApiConfig,
    pub polling: PollingConfig,
    pub send: SendConfig,
    pub widget: WidgetConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiConfig {
    /// Backend origin; endpoint paths are joined under `api/`.
    pub base_url: String,
    pub request_timeout_ms: u64,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://n8n.vazo.vn/".to_owned(),
            request_timeout_ms: 15_000,
            user_agent: concat!("livedesk/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollingConfig {
    pub interval_ms: u64,
    pub max_backoff_ms: u64,
    pub history_limit: usize,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5_000,
            max_backoff_ms: 60_000,
            history_limit: 1_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendConfig {
    /// How long an acknowledged reply stays visible while history catches up.
    pub reconcile_grace_ms: u64,
}

impl Default for SendConfig {
    fn default() -> Self {
        Self {
            reconcile_grace_ms: 15_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WidgetConfig {
    pub script_url: String,
    pub server_url: String,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            script_url: "https://cdn.jsdelivr.net/gh/boyhaimai/model_admin_just_chat_v19@main/dist/model_admin_just_chat.js".to_owned(),
            server_url: "https://n8n.vazo.vn/api".to_owned(),
        }
    }
}

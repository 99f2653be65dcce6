use serde::Deserialize;

use crate::infra::config::{
    ApiConfig, AppConfig, LogConfig, PollingConfig, SendConfig, WidgetConfig,
};

#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub logging: Option<FileLogConfig>,
    pub api: Option<FileApiConfig>,
    pub polling: Option<FilePollingConfig>,
    pub send: Option<FileSendConfig>,
    pub widget: Option<FileWidgetConfig>,
}

impl FileConfig {
    pub fn merge_into(self, config: &mut AppConfig) {
        if let Some(logging) = self.logging {
            logging.merge_into(&mut config.logging);
        }

        if let Some(api) = self.api {
            api.merge_into(&mut config.api);
        }

        if let Some(polling) = self.polling {
            polling.merge_into(&mut config.polling);
        }

        if let Some(send) = self.send {
            send.merge_into(&mut config.send);
        }

        if let Some(widget) = self.widget {
            widget.merge_into(&mut config.widget);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileLogConfig {
    pub level: Option<String>,
}

impl FileLogConfig {
    fn merge_into(self, config: &mut LogConfig) {
        if let Some(level) = self.level {
            config.level = level;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileApiConfig {
    pub base_url: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub user_agent: Option<String>,
}

impl FileApiConfig {
    fn merge_into(self, config: &mut ApiConfig) {
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }

        if let Some(timeout_ms) = self.request_timeout_ms {
            config.request_timeout_ms = timeout_ms;
        }

        if let Some(user_agent) = self.user_agent {
            config.user_agent = user_agent;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FilePollingConfig {
    pub interval_ms: Option<u64>,
    pub max_backoff_ms: Option<u64>,
    pub history_limit: Option<usize>,
}

impl FilePollingConfig {
    fn merge_into(self, config: &mut PollingConfig) {
        if let Some(interval_ms) = self.interval_ms {
            config.interval_ms = interval_ms.max(1);
        }

        if let Some(max_backoff_ms) = self.max_backoff_ms {
            config.max_backoff_ms = max_backoff_ms;
        }

        if let Some(history_limit) = self.history_limit {
            config.history_limit = history_limit;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileSendConfig {
    pub reconcile_grace_ms: Option<u64>,
}

impl FileSendConfig {
    fn merge_into(self, config: &mut SendConfig) {
        if let Some(grace_ms) = self.reconcile_grace_ms {
            config.reconcile_grace_ms = grace_ms;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileWidgetConfig {
    pub script_url: Option<String>,
    pub server_url: Option<String>,
}

impl FileWidgetConfig {
    fn merge_into(self, config: &mut WidgetConfig) {
        if let Some(script_url) = self.script_url {
            config.script_url = script_url;
        }

        if let Some(server_url) = self.server_url {
            config.server_url = server_url;
        }
    }
}

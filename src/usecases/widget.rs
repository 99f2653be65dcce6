//! Widget appearance: show, edit, reset, embed.

use async_trait::async_trait;
use tracing::info;

use crate::{
    domain::{
        failure::SourceError,
        website::{embed_snippet, WidgetAvatar, WidgetSettings},
    },
    usecases::command_error::CommandError,
};

const POSITIONS: [&str; 2] = ["bottom-right", "bottom-left"];

#[async_trait]
pub trait WidgetSource: Send + Sync {
    async fn widget_settings(&self, config_id: &str) -> Result<WidgetSettings, SourceError>;
    async fn save_widget_settings(
        &self,
        config_id: &str,
        settings: &WidgetSettings,
    ) -> Result<Option<String>, SourceError>;
}

/// Stored settings with never-set fields shown as their defaults.
pub async fn show_widget(
    source: &(dyn WidgetSource + '_),
    config_id: &str,
    default_server_url: &str,
) -> Result<WidgetSettings, CommandError> {
    let settings = source.widget_settings(config_id).await?;
    Ok(settings.with_defaults_for_blanks(default_server_url))
}

/// Edits requested on the command line. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WidgetChanges {
    pub theme_color: Option<String>,
    pub text_color: Option<String>,
    pub title: Option<String>,
    pub welcome_message: Option<String>,
    pub position: Option<String>,
    pub history_enabled: Option<bool>,
    pub server_url: Option<String>,
    pub webhook_url: Option<String>,
    pub link_contact: Option<String>,
    pub avatar: Option<WidgetAvatar>,
}

impl WidgetChanges {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply(self, mut settings: WidgetSettings) -> Result<WidgetSettings, CommandError> {
        if let Some(color) = self.theme_color {
            settings.theme_color = validate_color("theme color", &color)?;
        }
        if let Some(color) = self.text_color {
            settings.text_color = validate_color("text color", &color)?;
        }
        if let Some(title) = self.title {
            settings.title = require_text("title", title)?;
        }
        if let Some(welcome) = self.welcome_message {
            settings.welcome_message = require_text("welcome message", welcome)?;
        }
        if let Some(position) = self.position {
            let position = position.trim().to_ascii_lowercase();
            if !POSITIONS.contains(&position.as_str()) {
                return Err(CommandError::invalid(format!(
                    "position must be one of: {}",
                    POSITIONS.join(", ")
                )));
            }
            settings.position = position;
        }
        if let Some(enabled) = self.history_enabled {
            settings.history_enabled = enabled;
        }
        if let Some(url) = self.server_url {
            settings.server_url = require_text("server url", url)?;
        }
        if let Some(url) = self.webhook_url {
            settings.webhook_url = require_text("webhook url", url)?;
        }
        if let Some(link) = self.link_contact {
            settings.link_contact = link.trim().to_owned();
        }
        if let Some(avatar) = self.avatar {
            settings.avatar = avatar;
        }
        Ok(settings)
    }
}

/// Accepts `#rgb` and `#rrggbb`; stored lowercase.
pub fn validate_color(field: &str, value: &str) -> Result<String, CommandError> {
    let value = value.trim();
    let hex = value.strip_prefix('#').unwrap_or_default();
    let valid = matches!(hex.len(), 3 | 6) && hex.chars().all(|ch| ch.is_ascii_hexdigit());

    if valid {
        Ok(value.to_ascii_lowercase())
    } else {
        Err(CommandError::invalid(format!(
            "{field} must look like #0abfbc, got `{value}`"
        )))
    }
}

fn require_text(field: &str, value: String) -> Result<String, CommandError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CommandError::invalid(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_owned())
}

pub async fn save_widget(
    source: &(dyn WidgetSource + '_),
    config_id: &str,
    default_server_url: &str,
    changes: WidgetChanges,
) -> Result<(WidgetSettings, Option<String>), CommandError> {
    if changes.is_empty() {
        return Err(CommandError::invalid("nothing to change; pass at least one option"));
    }

    let current = show_widget(source, config_id, default_server_url).await?;
    let updated = changes.apply(current)?;
    let message = source.save_widget_settings(config_id, &updated).await?;

    info!(code = "WIDGET_SAVED", config_id = %config_id, "widget settings saved");
    Ok((updated, message))
}

/// Overwrites every field with the product defaults.
pub async fn reset_widget(
    source: &(dyn WidgetSource + '_),
    config_id: &str,
    default_server_url: &str,
) -> Result<(WidgetSettings, Option<String>), CommandError> {
    let defaults = WidgetSettings::defaults(default_server_url);
    let message = source.save_widget_settings(config_id, &defaults).await?;

    info!(code = "WIDGET_RESET", config_id = %config_id, "widget settings reset");
    Ok((defaults, message))
}

pub fn embed_code(script_url: &str, server_url: &str, config_id: &str) -> String {
    embed_snippet(script_url, server_url, config_id)
}

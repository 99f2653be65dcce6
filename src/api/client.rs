//! HTTP adapter implementing every backend source trait.

use std::{path::PathBuf, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{
    cookie::Jar,
    multipart::{Form, Part},
    Client, RequestBuilder,
};
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::{
    api::{
        cookies::{load_jar, persist_jar},
        envelope::{decode_ack, decode_bare, decode_envelope, decode_status, RawResponse},
        error::ApiError,
        wire::{
            ActiveChatsPayload, AddWebsiteBody, AdminInfoPayload, DeleteWebsiteBody,
            ExtendExpiryBody, HistoryPayload, LiveMessagesPayload, LoginBody, LoginPayload,
            MarkReadBody, SendMessageBody, SetBanBody, SetRoleBody, StatsPayload,
            UpdateWebsiteBody, WebsitesPayload, WireAccountsItem, WireWidgetConfig,
        },
    },
    domain::{
        account::{AccountRole, AccountsPage, AdminProfile, ExtendTerm},
        active_chat::{ActiveChat, ChatAddress},
        failure::SourceError,
        message::{ChatMessage, RawMessage, Sender},
        website::{SiteStats, WidgetAvatar, WidgetSettings, Website},
    },
    infra::config::ApiConfig,
    usecases::{
        accounts::{AccountsQuery, AccountsSource},
        conversations::{AdminHistorySource, HistoryQuery},
        list_active_chats::ActiveChatsSource,
        load_history::ChatHistorySource,
        send_message::MessageSender,
        session::{AuthSource, LoginGrant},
        stats::StatsSource,
        websites::WebsitesSource,
        widget::WidgetSource,
    },
};

const ACTIVE_CHATS: &str = "api/get-active-chats";
const CHAT_HISTORY: &str = "api/get-history";
const ADMIN_HISTORY: &str = "api/get-history-admin";
const SEND_MESSAGE: &str = "api/send-message-to-user";
const MARK_READ: &str = "api/mark-messages-read";
const LOGIN: &str = "api/login-admin";
const LOGOUT: &str = "api/logout";
const ADMIN_INFO: &str = "api/get-admin-info";
const WEBSITES: &str = "api/get-websites";
const ADD_WEBSITE: &str = "api/add-website";
const UPDATE_WEBSITE: &str = "api/update-website";
const DELETE_WEBSITE: &str = "api/delete-website";
const STATS: &str = "api/get-stats";
const WIDGET_CONFIG: &str = "api/get-config-by-id";
const SAVE_WIDGET: &str = "api/save-config";
const ACCOUNTS: &str = "api/admin/admin-info";
// The backend mounts these under a doubled prefix.
const SET_ROLE: &str = "api/api/admin/set-role";
const EXTEND_EXPIRY: &str = "api/api/admin/extend-expire";
const SET_BAN: &str = "api/api/admin/set-ban";
const DELETE_ACCOUNT: &str = "api/admin/delete-account";

pub struct ApiClient {
    http: Client,
    jar: Arc<Jar>,
    base: Url,
    jar_path: PathBuf,
}

impl ApiClient {
    /// Builds a client carrying the session saved at `jar_path`, if any.
    pub fn new(config: &ApiConfig, jar_path: PathBuf) -> Result<Self, ApiError> {
        let base = parse_base_url(&config.base_url)?;
        let jar = load_jar(&base, &jar_path)?;
        let http = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()
            .map_err(ApiError::ClientBuild)?;

        Ok(Self {
            http,
            jar,
            base,
            jar_path,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn persist_session(&self) -> Result<bool, ApiError> {
        persist_jar(&self.jar, &self.base, &self.jar_path)
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, ApiError> {
        endpoint_url(&self.base, path, query)
    }

    async fn execute(&self, path: &str, request: RequestBuilder) -> Result<RawResponse, ApiError> {
        debug!(code = "API_REQUEST", endpoint = path, "sending request");

        let transport = |source| ApiError::Transport {
            endpoint: path.to_owned(),
            source,
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport)?;

        debug!(code = "API_RESPONSE", endpoint = path, status, "response received");
        Ok(RawResponse::new(path, status, body))
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<RawResponse, ApiError> {
        let url = self.endpoint(path, query)?;
        self.execute(path, self.http.get(url)).await
    }

    async fn post_json<B: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<RawResponse, ApiError> {
        let url = self.endpoint(path, &[])?;
        self.execute(path, self.http.post(url).json(body)).await
    }

    async fn post_empty(&self, path: &str) -> Result<RawResponse, ApiError> {
        let url = self.endpoint(path, &[])?;
        self.execute(path, self.http.post(url)).await
    }

    async fn post_form(&self, path: &str, form: Form) -> Result<RawResponse, ApiError> {
        let url = self.endpoint(path, &[])?;
        self.execute(path, self.http.post(url).multipart(form)).await
    }

    async fn delete_resource(&self, path: &str, id: &str) -> Result<RawResponse, ApiError> {
        let url = resource_url(&self.base, path, id)?;
        self.execute(path, self.http.delete(url)).await
    }
}

/// Accepts the origin with or without a trailing slash.
pub fn parse_base_url(raw: &str) -> Result<Url, ApiError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_owned()
    } else {
        format!("{trimmed}/")
    };

    Url::parse(&with_slash).map_err(|source| ApiError::InvalidEndpoint {
        url: raw.to_owned(),
        source,
    })
}

pub fn endpoint_url(base: &Url, path: &str, query: &[(&str, &str)]) -> Result<Url, ApiError> {
    let mut url = base.join(path).map_err(|source| ApiError::InvalidEndpoint {
        url: format!("{base}{path}"),
        source,
    })?;

    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

/// `path/id`, with the id percent-encoded as one segment.
pub fn resource_url(base: &Url, path: &str, id: &str) -> Result<Url, ApiError> {
    let mut url = endpoint_url(base, path, &[])?;
    let shown = url.to_string();
    url.path_segments_mut()
        .map_err(|()| ApiError::InvalidEndpoint {
            url: shown,
            source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
        })?
        .push(id);
    Ok(url)
}

/// Text fields of `save-config`, in the order the backend form uses.
pub fn widget_form_fields(config_id: &str, settings: &WidgetSettings) -> Vec<(&'static str, String)> {
    vec![
        ("id_config", config_id.to_owned()),
        ("themeColor", settings.theme_color.clone()),
        ("textColor", settings.text_color.clone()),
        ("title", settings.title.clone()),
        ("welcomeMessage", settings.welcome_message.clone()),
        ("position", settings.position.clone()),
        ("historyEnabled", settings.history_enabled.to_string()),
        ("serverUrl", settings.server_url.clone()),
        ("webhookUrl", settings.webhook_url.clone()),
        ("linkContact", settings.link_contact.clone()),
    ]
}

fn image_mime(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

fn widget_form(config_id: &str, settings: &WidgetSettings) -> Result<Form, ApiError> {
    let mut form = widget_form_fields(config_id, settings)
        .into_iter()
        .fold(Form::new(), |form, (name, value)| form.text(name, value));

    form = match &settings.avatar {
        WidgetAvatar::None => form.text("avatar", ""),
        WidgetAvatar::Url(url) => form.text("avatar", url.clone()),
        WidgetAvatar::Upload { file_name, bytes } => {
            let part = Part::bytes(bytes.clone())
                .file_name(file_name.clone())
                .mime_str(image_mime(file_name))
                .map_err(|source| ApiError::Transport {
                    endpoint: SAVE_WIDGET.to_owned(),
                    source,
                })?;
            form.part("avatar", part)
        }
    };

    Ok(form)
}

#[async_trait]
impl ActiveChatsSource for ApiClient {
    async fn list_active_chats(&self) -> Result<Vec<ActiveChat>, SourceError> {
        let response = self.get(ACTIVE_CHATS, &[]).await?;
        let payload: ActiveChatsPayload = decode_envelope(&response)?;
        Ok(payload.active_chats.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl ChatHistorySource for ApiClient {
    async fn chat_history(&self, address: &ChatAddress) -> Result<Vec<ChatMessage>, SourceError> {
        let query = [
            ("userId", address.local_part.as_str()),
            ("domain", address.domain.as_str()),
        ];
        let response = self.get(CHAT_HISTORY, &query).await?;
        let payload: LiveMessagesPayload = decode_envelope(&response)?;
        Ok(payload.messages.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl MessageSender for ApiClient {
    async fn send_agent_message(&self, address: &ChatAddress, text: &str) -> Result<(), SourceError> {
        let chat_id = address.chat_id();
        let body = SendMessageBody {
            chat_id: &chat_id,
            message: text,
            sender: Sender::Agent.as_wire(),
        };
        let response = self.post_json(SEND_MESSAGE, &body).await?;
        decode_ack(&response)?;
        Ok(())
    }
}

#[async_trait]
impl AdminHistorySource for ApiClient {
    async fn admin_history(&self, query: &HistoryQuery) -> Result<Vec<RawMessage>, SourceError> {
        let limit = query.limit.to_string();
        let mut params = vec![("id_config", query.config_id.as_str()), ("limit", limit.as_str())];
        if let Some(search) = query.search.as_deref() {
            params.push(("search", search));
        }

        let response = self.get(ADMIN_HISTORY, &params).await?;
        let payload: HistoryPayload = decode_envelope(&response)?;
        Ok(payload.messages.into_iter().map(Into::into).collect())
    }

    async fn mark_read(&self, session_id: &str) -> Result<(), SourceError> {
        let response = self
            .post_json(MARK_READ, &MarkReadBody { session_id })
            .await?;
        decode_ack(&response)?;
        Ok(())
    }
}

#[async_trait]
impl AuthSource for ApiClient {
    async fn login(&self, phone: &str, password: &str) -> Result<LoginGrant, SourceError> {
        let body = LoginBody {
            phone_number: phone,
            password,
        };
        let response = self.post_json(LOGIN, &body).await?;
        let payload: LoginPayload = decode_envelope(&response)?;

        if !self.persist_session()? {
            warn!(code = "API_LOGIN_NO_COOKIE", "login succeeded but no session cookie was set");
        }

        Ok(LoginGrant {
            role: payload.role.as_deref().and_then(AccountRole::from_wire),
            message: payload.message,
        })
    }

    async fn logout(&self) -> Result<(), SourceError> {
        let response = self.post_empty(LOGOUT).await?;
        decode_status(&response)?;
        Ok(())
    }

    async fn current_admin(&self) -> Result<AdminProfile, SourceError> {
        let response = self.get(ADMIN_INFO, &[]).await?;
        let payload: AdminInfoPayload = decode_envelope(&response)?;
        Ok(payload.admin.into())
    }
}

#[async_trait]
impl WebsitesSource for ApiClient {
    async fn list_websites(&self) -> Result<Vec<Website>, SourceError> {
        let response = self.get(WEBSITES, &[]).await?;
        let payload: WebsitesPayload = decode_envelope(&response)?;
        Ok(payload.websites.into_iter().map(Into::into).collect())
    }

    async fn add_website(&self, url: &str, name: &str) -> Result<Option<String>, SourceError> {
        let body = AddWebsiteBody {
            website_url: url,
            name,
        };
        let response = self.post_json(ADD_WEBSITE, &body).await?;
        Ok(decode_ack(&response)?)
    }

    async fn update_website(
        &self,
        website_id: &str,
        name: &str,
        domain: &str,
    ) -> Result<Option<String>, SourceError> {
        let body = UpdateWebsiteBody {
            website_id,
            name,
            domain,
        };
        let response = self.post_json(UPDATE_WEBSITE, &body).await?;
        Ok(decode_ack(&response)?)
    }

    async fn delete_website(&self, website_id: &str) -> Result<Option<String>, SourceError> {
        let response = self
            .post_json(DELETE_WEBSITE, &DeleteWebsiteBody { website_id })
            .await?;
        Ok(decode_ack(&response)?)
    }
}

#[async_trait]
impl StatsSource for ApiClient {
    async fn site_stats(&self, config_id: &str) -> Result<SiteStats, SourceError> {
        let response = self.get(STATS, &[("config_id", config_id)]).await?;
        let payload: StatsPayload = decode_envelope(&response)?;
        Ok(payload.stats.into())
    }
}

#[async_trait]
impl WidgetSource for ApiClient {
    async fn widget_settings(&self, config_id: &str) -> Result<WidgetSettings, SourceError> {
        let response = self.get(WIDGET_CONFIG, &[("id_config", config_id)]).await?;
        let config: WireWidgetConfig = decode_bare(&response)?;
        Ok(config.into_settings(self.base.as_str()))
    }

    async fn save_widget_settings(
        &self,
        config_id: &str,
        settings: &WidgetSettings,
    ) -> Result<Option<String>, SourceError> {
        let form = widget_form(config_id, settings)?;
        let response = self.post_form(SAVE_WIDGET, form).await?;
        Ok(decode_ack(&response)?)
    }
}

#[async_trait]
impl AccountsSource for ApiClient {
    async fn list_accounts(&self, query: &AccountsQuery) -> Result<AccountsPage, SourceError> {
        let page = query.page.to_string();
        let limit = query.limit.to_string();
        let params = [
            ("page", page.as_str()),
            ("limit", limit.as_str()),
            ("search", query.search.as_str()),
        ];

        let response = self.get(ACCOUNTS, &params).await?;
        let items: Vec<WireAccountsItem> = decode_bare(&response)?;
        Ok(items
            .into_iter()
            .next()
            .map(|item| item.result.into())
            .unwrap_or_default())
    }

    async fn set_role(&self, id: &str, role: AccountRole) -> Result<Option<String>, SourceError> {
        let body = SetRoleBody {
            id,
            role: role.as_wire(),
        };
        let response = self.post_json(SET_ROLE, &body).await?;
        Ok(decode_status(&response)?)
    }

    async fn set_banned(&self, id: &str, banned: bool) -> Result<Option<String>, SourceError> {
        let body = SetBanBody { id, is_ban: banned };
        let response = self.post_json(SET_BAN, &body).await?;
        Ok(decode_status(&response)?)
    }

    async fn extend_expiry(
        &self,
        id: &str,
        term: ExtendTerm,
    ) -> Result<Option<String>, SourceError> {
        let body = ExtendExpiryBody {
            id,
            label: term.wire_label(),
        };
        let response = self.post_json(EXTEND_EXPIRY, &body).await?;
        Ok(decode_status(&response)?)
    }

    async fn delete_account(&self, id: &str) -> Result<Option<String>, SourceError> {
        let response = self.delete_resource(DELETE_ACCOUNT, id).await?;
        Ok(decode_status(&response)?)
    }
}

//! Login, logout and the local traces a session leaves behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::{
    api::cookies::remove_jar,
    domain::{
        account::{AccountRole, AdminProfile},
        failure::SourceError,
        workspace::Workspace,
    },
    infra::contracts::WorkspaceStore,
    usecases::{command_error::CommandError, contracts::SessionExpiry},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginGrant {
    pub role: Option<AccountRole>,
    pub message: Option<String>,
}

#[async_trait]
pub trait AuthSource: Send + Sync {
    /// On success the session cookie is already stored for later runs.
    async fn login(&self, phone: &str, password: &str) -> Result<LoginGrant, SourceError>;
    async fn logout(&self) -> Result<(), SourceError>;
    async fn current_admin(&self) -> Result<AdminProfile, SourceError>;
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub phone: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("phone", &crate::infra::secrets::mask_phone(&self.phone))
            .field("password", &"<redacted>")
            .finish()
    }
}

pub async fn login(
    source: &(dyn AuthSource + '_),
    store: &dyn WorkspaceStore,
    credentials: &Credentials,
) -> Result<LoginGrant, CommandError> {
    let phone = credentials.phone.trim();
    if phone.is_empty() {
        return Err(CommandError::invalid("phone number must not be empty"));
    }
    if credentials.password.is_empty() {
        return Err(CommandError::invalid("password must not be empty"));
    }

    let grant = source.login(phone, &credentials.password).await?;

    let mut workspace = store.load()?;
    workspace.set_role(grant.role);
    store.save(&workspace)?;

    info!(
        code = "SESSION_LOGIN_OK",
        role = grant.role.map(AccountRole::as_wire).unwrap_or("unknown"),
        "logged in"
    );
    Ok(grant)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhoAmI {
    pub profile: AdminProfile,
    pub workspace: Workspace,
}

pub async fn who_am_i(
    source: &(dyn AuthSource + '_),
    store: &dyn WorkspaceStore,
) -> Result<WhoAmI, CommandError> {
    let profile = source.current_admin().await?;
    let workspace = store.load()?;
    Ok(WhoAmI { profile, workspace })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutOutcome {
    /// False when the backend could not be told; local state is cleared anyway.
    pub remote_acknowledged: bool,
    pub session_removed: bool,
    pub workspace_cleared: bool,
}

pub async fn logout(
    source: &(dyn AuthSource + '_),
    cookie_file: &Path,
    store: &dyn WorkspaceStore,
) -> Result<LogoutOutcome, CommandError> {
    let remote_acknowledged = match source.logout().await {
        Ok(()) | Err(SourceError::Unauthorized) => true,
        Err(error) => {
            warn!(code = error.code(), error = %error, "remote logout failed");
            false
        }
    };

    let (session_removed, workspace_cleared) = clear_local_session(cookie_file, store)?;

    Ok(LogoutOutcome {
        remote_acknowledged,
        session_removed,
        workspace_cleared,
    })
}

/// Removes the cookie jar and the workspace file. Safe to call repeatedly.
pub fn clear_local_session(
    cookie_file: &Path,
    store: &dyn WorkspaceStore,
) -> anyhow::Result<(bool, bool)> {
    let session_removed = remove_jar(cookie_file)?;
    let workspace_cleared = store.clear()?;
    Ok((session_removed, workspace_cleared))
}

/// Clears local session state when the backend answers 401.
pub struct LocalSessionReset<S: WorkspaceStore> {
    cookie_file: PathBuf,
    store: S,
    expired: bool,
}

impl<S: WorkspaceStore> LocalSessionReset<S> {
    pub fn new(cookie_file: PathBuf, store: S) -> Self {
        Self {
            cookie_file,
            store,
            expired: false,
        }
    }

    pub fn expired(&self) -> bool {
        self.expired
    }
}

impl<S: WorkspaceStore> SessionExpiry for LocalSessionReset<S> {
    fn session_expired(&mut self) {
        self.expired = true;
        match clear_local_session(&self.cookie_file, &self.store) {
            Ok(_) => info!(code = "SESSION_EXPIRED_CLEARED", "local session cleared"),
            Err(error) => warn!(
                code = "SESSION_EXPIRED_CLEAR_FAILED",
                error = %error,
                "failed to clear local session"
            ),
        }
    }
}

//! Operator account administration. Admin-only on the backend; refused
//! locally when the recorded role is `user`.

use async_trait::async_trait;
use tracing::info;

use crate::{
    domain::{
        account::{AccountRole, AccountsPage, ExtendTerm},
        failure::SourceError,
        workspace::Workspace,
    },
    usecases::command_error::CommandError,
};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountsQuery {
    pub page: u32,
    pub limit: u32,
    pub search: String,
}

impl Default for AccountsQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            search: String::new(),
        }
    }
}

impl AccountsQuery {
    fn normalized(&self) -> Self {
        Self {
            page: self.page.max(1),
            limit: self.limit.clamp(1, MAX_PAGE_SIZE),
            search: self.search.trim().to_owned(),
        }
    }
}

#[async_trait]
pub trait AccountsSource: Send + Sync {
    async fn list_accounts(&self, query: &AccountsQuery) -> Result<AccountsPage, SourceError>;
    async fn set_role(&self, id: &str, role: AccountRole) -> Result<Option<String>, SourceError>;
    async fn set_banned(&self, id: &str, banned: bool) -> Result<Option<String>, SourceError>;
    async fn extend_expiry(&self, id: &str, term: ExtendTerm)
        -> Result<Option<String>, SourceError>;
    async fn delete_account(&self, id: &str) -> Result<Option<String>, SourceError>;
}

/// Unknown roles are let through; the backend has the final word.
fn require_admin(workspace: &Workspace) -> Result<(), CommandError> {
    match workspace.role() {
        Some(AccountRole::User) => Err(CommandError::AdminRequired),
        _ => Ok(()),
    }
}

fn require_id(id: &str) -> Result<&str, CommandError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(CommandError::invalid("account id must not be empty"));
    }
    Ok(id)
}

pub async fn list_accounts(
    source: &(dyn AccountsSource + '_),
    workspace: &Workspace,
    query: &AccountsQuery,
) -> Result<AccountsPage, CommandError> {
    require_admin(workspace)?;
    Ok(source.list_accounts(&query.normalized()).await?)
}

pub async fn set_role(
    source: &(dyn AccountsSource + '_),
    workspace: &Workspace,
    id: &str,
    role: AccountRole,
) -> Result<Option<String>, CommandError> {
    require_admin(workspace)?;
    let id = require_id(id)?;
    let message = source.set_role(id, role).await?;
    info!(code = "ACCOUNT_ROLE_SET", account_id = %id, role = role.as_wire(), "role changed");
    Ok(message)
}

pub async fn set_banned(
    source: &(dyn AccountsSource + '_),
    workspace: &Workspace,
    id: &str,
    banned: bool,
) -> Result<Option<String>, CommandError> {
    require_admin(workspace)?;
    let id = require_id(id)?;
    let message = source.set_banned(id, banned).await?;
    info!(code = "ACCOUNT_BAN_SET", account_id = %id, banned, "ban flag changed");
    Ok(message)
}

pub async fn extend_expiry(
    source: &(dyn AccountsSource + '_),
    workspace: &Workspace,
    id: &str,
    months: u32,
) -> Result<Option<String>, CommandError> {
    require_admin(workspace)?;
    let id = require_id(id)?;
    let term = ExtendTerm::from_months(months)
        .ok_or_else(|| CommandError::invalid("extension must be 1, 3, 6 or 12 months"))?;
    let message = source.extend_expiry(id, term).await?;
    info!(code = "ACCOUNT_EXTENDED", account_id = %id, months, "expiry extended");
    Ok(message)
}

pub async fn delete_account(
    source: &(dyn AccountsSource + '_),
    workspace: &Workspace,
    id: &str,
) -> Result<Option<String>, CommandError> {
    require_admin(workspace)?;
    let id = require_id(id)?;
    let message = source.delete_account(id).await?;
    info!(code = "ACCOUNT_DELETED", account_id = %id, "account deleted");
    Ok(message)
}

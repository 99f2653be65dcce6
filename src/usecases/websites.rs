//! Website registry management.

use async_trait::async_trait;
use tracing::info;

use crate::{
    domain::{
        failure::SourceError,
        website::{normalize_website_url, Website},
    },
    infra::contracts::WorkspaceStore,
    usecases::command_error::CommandError,
};

#[async_trait]
pub trait WebsitesSource: Send + Sync {
    async fn list_websites(&self) -> Result<Vec<Website>, SourceError>;
    async fn add_website(&self, url: &str, name: &str) -> Result<Option<String>, SourceError>;
    async fn update_website(
        &self,
        website_id: &str,
        name: &str,
        domain: &str,
    ) -> Result<Option<String>, SourceError>;
    async fn delete_website(&self, website_id: &str) -> Result<Option<String>, SourceError>;
}

/// A site is addressed by its id, its config id or its domain.
pub fn find_website<'a>(websites: &'a [Website], key: &str) -> Option<&'a Website> {
    let key = key.trim();
    websites
        .iter()
        .find(|site| site.id == key || site.config_id == key)
        .or_else(|| {
            websites
                .iter()
                .find(|site| site.domain.eq_ignore_ascii_case(key))
        })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWebsite {
    pub url: String,
    pub name: String,
}

pub async fn add_website(
    source: &(dyn WebsitesSource + '_),
    request: &NewWebsite,
) -> Result<Option<String>, CommandError> {
    let url = normalize_website_url(&request.url)
        .ok_or_else(|| CommandError::invalid("website url must not be empty"))?;
    let name = request.name.trim();
    if name.is_empty() {
        return Err(CommandError::invalid("website name must not be empty"));
    }

    let message = source.add_website(&url, name).await?;
    info!(code = "WEBSITE_ADDED", url = %url, "website added");
    Ok(message)
}

/// Fields left as `None` keep their current value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebsiteUpdate {
    pub key: String,
    pub name: Option<String>,
    pub domain: Option<String>,
}

pub async fn update_website(
    source: &(dyn WebsitesSource + '_),
    update: &WebsiteUpdate,
) -> Result<Option<String>, CommandError> {
    if update.name.is_none() && update.domain.is_none() {
        return Err(CommandError::invalid("nothing to update; pass --name or --domain"));
    }

    let websites = source.list_websites().await?;
    let current = find_website(&websites, &update.key)
        .ok_or_else(|| CommandError::UnknownWebsite(update.key.clone()))?;

    let name = update
        .name
        .as_deref()
        .map(str::trim)
        .unwrap_or(current.name.as_str());
    let domain = update
        .domain
        .as_deref()
        .map(str::trim)
        .unwrap_or(current.domain.as_str());
    if name.is_empty() || domain.is_empty() {
        return Err(CommandError::invalid("website name and domain must not be empty"));
    }

    Ok(source.update_website(&current.id, name, domain).await?)
}

/// Deletes a site; when it was the selected one the selection is dropped.
pub async fn delete_website(
    source: &(dyn WebsitesSource + '_),
    store: &dyn WorkspaceStore,
    key: &str,
) -> Result<Website, CommandError> {
    let websites = source.list_websites().await?;
    let target = find_website(&websites, key)
        .cloned()
        .ok_or_else(|| CommandError::UnknownWebsite(key.to_owned()))?;

    source.delete_website(&target.id).await?;
    info!(code = "WEBSITE_DELETED", config_id = %target.config_id, "website deleted");

    let mut workspace = store.load()?;
    if workspace.selected_config_id() == Some(target.config_id.as_str()) {
        workspace.select_website(None);
        store.save(&workspace)?;
    }

    Ok(target)
}

//! The selected website, kept consistent with the backend's site list.

use tracing::debug;

use crate::{
    domain::website::Website,
    infra::contracts::WorkspaceStore,
    usecases::{
        command_error::CommandError,
        websites::{find_website, WebsitesSource},
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebsiteListing {
    pub websites: Vec<Website>,
    pub selected_config_id: Option<String>,
}

/// Lists sites and re-resolves the stored selection against them.
pub async fn list_websites(
    source: &(dyn WebsitesSource + '_),
    store: &dyn WorkspaceStore,
) -> Result<WebsiteListing, CommandError> {
    let websites = source.list_websites().await?;
    let selected = resolve_and_store(&websites, store)?.map(|site| site.config_id.clone());

    Ok(WebsiteListing {
        websites,
        selected_config_id: selected,
    })
}

/// The site the console works on, if any.
pub async fn refresh_selection(
    source: &(dyn WebsitesSource + '_),
    store: &dyn WorkspaceStore,
) -> Result<Option<Website>, CommandError> {
    let websites = source.list_websites().await?;
    Ok(resolve_and_store(&websites, store)?.cloned())
}

pub async fn require_selected_site(
    source: &(dyn WebsitesSource + '_),
    store: &dyn WorkspaceStore,
) -> Result<Website, CommandError> {
    refresh_selection(source, store)
        .await?
        .ok_or(CommandError::NoWebsiteSelected)
}

pub async fn select_website(
    source: &(dyn WebsitesSource + '_),
    store: &dyn WorkspaceStore,
    key: &str,
) -> Result<Website, CommandError> {
    let websites = source.list_websites().await?;
    let site = find_website(&websites, key)
        .cloned()
        .ok_or_else(|| CommandError::UnknownWebsite(key.to_owned()))?;

    let mut workspace = store.load()?;
    workspace.select_website(Some(site.config_id.clone()));
    store.save(&workspace)?;

    Ok(site)
}

fn resolve_and_store<'a>(
    websites: &'a [Website],
    store: &dyn WorkspaceStore,
) -> Result<Option<&'a Website>, CommandError> {
    let mut workspace = store.load()?;
    let previous = workspace.selected_config_id().map(str::to_owned);
    let resolved = workspace.resolve_selection(websites);

    if workspace.selected_config_id() != previous.as_deref() {
        debug!(
            code = "WORKSPACE_SELECTION_RESOLVED",
            config_id = workspace.selected_config_id().unwrap_or("none"),
            "selected website changed"
        );
        store.save(&workspace)?;
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{failure::SourceError, workspace::Workspace},
        infra::stubs::MemoryWorkspaceStore,
        usecases::websites::tests::{site, StubWebsites},
    };

    fn two_sites() -> StubWebsites {
        StubWebsites {
            websites: vec![site("1", "cfg-a", "a.com"), site("2", "cfg-b", "b.com")],
            ..StubWebsites::default()
        }
    }

    #[tokio::test]
    async fn first_site_is_selected_when_nothing_is_stored() {
        let source = two_sites();
        let store = MemoryWorkspaceStore::default();

        let listing = list_websites(&source, &store).await.expect("list");

        assert_eq!(listing.selected_config_id.as_deref(), Some("cfg-a"));
        assert_eq!(store.current().expect("saved").selected_config_id(), Some("cfg-a"));
    }

    #[tokio::test]
    async fn valid_stored_selection_is_not_rewritten() {
        let source = two_sites();
        let store = MemoryWorkspaceStore::with(Workspace::new(Some("cfg-b".to_owned()), None));

        let selected = refresh_selection(&source, &store).await.expect("refresh");

        assert_eq!(selected.map(|site| site.id), Some("2".to_owned()));
        assert_eq!(*store.saves.borrow(), 0);
    }

    #[tokio::test]
    async fn no_sites_means_no_selection() {
        let source = StubWebsites::default();
        let store = MemoryWorkspaceStore::with(Workspace::new(Some("gone".to_owned()), None));

        let result = require_selected_site(&source, &store).await;

        assert!(matches!(result, Err(CommandError::NoWebsiteSelected)));
        assert_eq!(store.current().expect("saved").selected_config_id(), None);
    }

    #[tokio::test]
    async fn select_persists_chosen_site() {
        let source = two_sites();
        let store = MemoryWorkspaceStore::default();

        let chosen = select_website(&source, &store, "b.com").await.expect("select");

        assert_eq!(chosen.config_id, "cfg-b");
        assert_eq!(store.current().expect("saved").selected_config_id(), Some("cfg-b"));
    }

    #[tokio::test]
    async fn backend_failure_is_reported() {
        let source = StubWebsites {
            fail_with: Some(SourceError::Unauthorized),
            ..StubWebsites::default()
        };
        let store = MemoryWorkspaceStore::default();

        let result = list_websites(&source, &store).await;

        assert!(result.as_ref().is_err_and(CommandError::is_unauthorized));
    }
}

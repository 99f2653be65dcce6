//! In-memory adapters for tests.

use std::cell::RefCell;

use anyhow::Result;

use crate::{
    domain::workspace::Workspace,
    infra::{
        config::AppConfig,
        contracts::{ConfigAdapter, WorkspaceStore},
    },
};

#[derive(Debug, Clone, Default)]
pub struct StubConfigAdapter;

impl ConfigAdapter for StubConfigAdapter {
    fn load(&self) -> Result<AppConfig> {
        Ok(AppConfig::default())
    }
}

#[derive(Debug, Default)]
pub struct MemoryWorkspaceStore {
    pub stored: RefCell<Option<Workspace>>,
    pub saves: RefCell<usize>,
}

impl MemoryWorkspaceStore {
    pub fn with(workspace: Workspace) -> Self {
        Self {
            stored: RefCell::new(Some(workspace)),
            saves: RefCell::new(0),
        }
    }

    pub fn current(&self) -> Option<Workspace> {
        self.stored.borrow().clone()
    }
}

impl WorkspaceStore for MemoryWorkspaceStore {
    fn load(&self) -> Result<Workspace> {
        Ok(self.stored.borrow().clone().unwrap_or_default())
    }

    fn save(&self, workspace: &Workspace) -> Result<()> {
        *self.stored.borrow_mut() = Some(workspace.clone());
        *self.saves.borrow_mut() += 1;
        Ok(())
    }

    fn clear(&self) -> Result<bool> {
        Ok(self.stored.borrow_mut().take().is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_config_returns_defaults() {
        let adapter = StubConfigAdapter;
        let config = adapter.load().expect("stub config must load");

        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn memory_store_round_trips_and_clears() {
        let store = MemoryWorkspaceStore::default();
        let workspace = Workspace::new(Some("cfg".to_owned()), None);

        store.save(&workspace).expect("save");
        assert_eq!(store.load().expect("load"), workspace);
        assert!(store.clear().expect("clear"));
        assert_eq!(store.load().expect("load"), Workspace::default());
    }
}

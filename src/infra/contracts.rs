use anyhow::Result;

use crate::{domain::workspace::Workspace, infra::config::AppConfig};

pub trait ConfigAdapter {
    fn load(&self) -> Result<AppConfig>;
}

/// Persistence of the selected website and role between runs.
pub trait WorkspaceStore {
    fn load(&self) -> Result<Workspace>;
    fn save(&self, workspace: &Workspace) -> Result<()>;
    fn clear(&self) -> Result<bool>;
}

pub trait ExternalOpener {
    fn open(&self, target: &str) -> Result<()>;
}

pub trait ClipboardWriter {
    fn copy_text(&mut self, text: &str) -> Result<()>;
}

pub trait Clock {
    fn now_ms(&self) -> i64;
}

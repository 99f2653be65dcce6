use std::{fs, io::ErrorKind, path::PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{
    domain::{account::AccountRole, workspace::Workspace},
    infra::{contracts::WorkspaceStore, error::AppError},
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct WorkspaceFile {
    selected_config_id: Option<String>,
    role: Option<String>,
}

/// Keeps the workspace as a small TOML file under the state directory.
#[derive(Debug, Clone)]
pub struct TomlWorkspaceStore {
    path: PathBuf,
}

impl TomlWorkspaceStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl WorkspaceStore for TomlWorkspaceStore {
    fn load(&self) -> Result<Workspace> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == ErrorKind::NotFound => {
                return Ok(Workspace::default())
            }
            Err(source) => {
                return Err(AppError::WorkspaceRead {
                    path: self.path.clone(),
                    source,
                }
                .into())
            }
        };

        let file: WorkspaceFile =
            toml::from_str(&raw).map_err(|source| AppError::WorkspaceParse {
                path: self.path.clone(),
                source,
            })?;

        Ok(Workspace::new(
            file.selected_config_id.filter(|id| !id.trim().is_empty()),
            file.role.as_deref().and_then(AccountRole::from_wire),
        ))
    }

    fn save(&self, workspace: &Workspace) -> Result<()> {
        let file = WorkspaceFile {
            selected_config_id: workspace.selected_config_id().map(str::to_owned),
            role: workspace.role().map(|role| role.as_wire().to_owned()),
        };
        let raw = toml::to_string(&file)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| AppError::StorageDirCreate {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&self.path, raw).map_err(|source| AppError::WorkspaceWrite {
            path: self.path.clone(),
            source,
        })?;

        Ok(())
    }

    fn clear(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(source) if source.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(AppError::WorkspaceWrite {
                path: self.path.clone(),
                source,
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_empty_workspace() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = TomlWorkspaceStore::new(dir.path().join("workspace.toml"));

        let workspace = store.load().expect("load should succeed");

        assert_eq!(workspace, Workspace::default());
    }

    #[test]
    fn saved_workspace_loads_back() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = TomlWorkspaceStore::new(dir.path().join("state").join("workspace.toml"));
        let workspace = Workspace::new(Some("cfg-7".to_owned()), Some(AccountRole::Admin));

        store.save(&workspace).expect("save should succeed");

        assert_eq!(store.load().expect("load should succeed"), workspace);
    }

    #[test]
    fn unknown_role_is_dropped_on_load() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("workspace.toml");
        fs::write(&path, "selected_config_id = \"cfg\"\nrole = \"owner\"\n").expect("write");

        let workspace = TomlWorkspaceStore::new(path).load().expect("load");

        assert_eq!(workspace.selected_config_id(), Some("cfg"));
        assert_eq!(workspace.role(), None);
    }

    #[test]
    fn corrupt_file_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("workspace.toml");
        fs::write(&path, "selected_config_id = [").expect("write");

        let error = TomlWorkspaceStore::new(path).load().expect_err("must fail");

        assert!(matches!(
            error.downcast_ref::<AppError>(),
            Some(AppError::WorkspaceParse { .. })
        ));
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = TomlWorkspaceStore::new(dir.path().join("workspace.toml"));
        store.save(&Workspace::default()).expect("save");

        assert!(store.clear().expect("first clear"));
        assert!(!store.clear().expect("second clear"));
    }
}

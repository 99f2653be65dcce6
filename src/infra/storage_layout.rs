use std::{env, fs, path::PathBuf};

use crate::infra::error::AppError;

const APP_DIR_NAME: &str = "livedesk";

/// On-disk locations of everything livedesk keeps between runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    pub config_dir: PathBuf,
    pub session_dir: PathBuf,
    pub state_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl StorageLayout {
    pub fn resolve() -> Result<Self, AppError> {
        let config_base = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(dirs::config_dir)
            .ok_or_else(|| AppError::StoragePathResolution {
                details: "unable to resolve config base directory (XDG_CONFIG_HOME/HOME)".into(),
            })?;

        Ok(Self::under(config_base.join(APP_DIR_NAME)))
    }

    pub fn under(config_dir: PathBuf) -> Self {
        Self {
            session_dir: config_dir.join("session"),
            state_dir: config_dir.join("state"),
            logs_dir: config_dir.join("logs"),
            config_dir,
        }
    }

    pub fn ensure_dirs(&self) -> Result<(), AppError> {
        for dir in [
            &self.config_dir,
            &self.session_dir,
            &self.state_dir,
            &self.logs_dir,
        ] {
            fs::create_dir_all(dir).map_err(|source| AppError::StorageDirCreate {
                path: dir.clone(),
                source,
            })?;
        }

        Ok(())
    }

    pub fn cookie_jar_file(&self) -> PathBuf {
        self.session_dir.join("cookies.txt")
    }

    pub fn session_lock_file(&self) -> PathBuf {
        self.session_dir.join("console.lock")
    }

    pub fn workspace_file(&self) -> PathBuf {
        self.state_dir.join("workspace.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::env_lock;

    #[test]
    fn session_state_and_logs_are_under_config_dir() {
        let layout = StorageLayout::under(PathBuf::from("/tmp/livedesk"));

        assert!(layout.session_dir.starts_with(&layout.config_dir));
        assert!(layout.state_dir.starts_with(&layout.config_dir));
        assert!(layout.logs_dir.starts_with(&layout.config_dir));
        assert!(layout.cookie_jar_file().starts_with(&layout.session_dir));
        assert!(layout.workspace_file().starts_with(&layout.state_dir));
    }

    #[test]
    fn resolves_under_xdg_config_home() {
        let _guard = env_lock();
        let dir = tempfile::tempdir().expect("temp dir");
        let previous = env::var_os("XDG_CONFIG_HOME");
        // SAFETY: env mutation is serialized by env_lock.
        unsafe { env::set_var("XDG_CONFIG_HOME", dir.path()) };

        let layout = StorageLayout::resolve().expect("layout should resolve");
        layout.ensure_dirs().expect("dirs should be created");

        match previous {
            // SAFETY: restoring process env under env_lock.
            Some(value) => unsafe { env::set_var("XDG_CONFIG_HOME", value) },
            // SAFETY: restoring process env under env_lock.
            None => unsafe { env::remove_var("XDG_CONFIG_HOME") },
        }

        assert_eq!(layout.config_dir, dir.path().join("livedesk"));
        assert!(layout.logs_dir.is_dir());
    }
}

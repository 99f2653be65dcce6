use std::{
    fs::{File, OpenOptions},
    io::ErrorKind,
    path::{Path, PathBuf},
};

use fs2::FileExt;

use crate::infra::{error::AppError, storage_layout::StorageLayout};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupFlowState {
    LaunchTui,
    NeedsLogin,
}

/// Exclusive lock on the session directory, held while the console runs.
#[derive(Debug)]
pub struct SessionLockGuard {
    file: File,
    path: PathBuf,
}

impl SessionLockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SessionLockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

pub struct StartupPlan {
    pub lock_guard: SessionLockGuard,
    pub state: StartupFlowState,
}

pub fn plan_startup(layout: &StorageLayout) -> Result<StartupPlan, AppError> {
    layout.ensure_dirs()?;

    let lock_guard = acquire_session_lock(layout.session_lock_file())?;

    let state = if layout.cookie_jar_file().exists() {
        StartupFlowState::LaunchTui
    } else {
        StartupFlowState::NeedsLogin
    };

    Ok(StartupPlan { lock_guard, state })
}

fn acquire_session_lock(path: PathBuf) -> Result<SessionLockGuard, AppError> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&path)
        .map_err(|source| AppError::SessionLock {
            path: path.clone(),
            source,
        })?;

    match file.try_lock_exclusive() {
        Ok(()) => Ok(SessionLockGuard { file, path }),
        Err(source) if source.kind() == ErrorKind::WouldBlock => {
            Err(AppError::SessionStoreBusy { path })
        }
        Err(source) if source.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
            Err(AppError::SessionStoreBusy { path })
        }
        Err(source) => Err(AppError::SessionLock { path, source }),
    }
}

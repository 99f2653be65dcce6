use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to read config file at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to initialize logging: {0}")]
    LoggingInit(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
    #[error("failed to resolve storage path: {details}")]
    StoragePathResolution { details: String },
    #[error("failed to create storage directory {path}: {source}")]
    StorageDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read workspace file at {path}: {source}")]
    WorkspaceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse workspace file at {path}: {source}")]
    WorkspaceParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to write workspace file at {path}: {source}")]
    WorkspaceWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("another livedesk console is already running (lock: {path})")]
    SessionStoreBusy { path: PathBuf },
    #[error("failed to lock session store at {path}: {source}")]
    SessionLock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

//! Cookie session persisted between runs.
//!
//! The file holds the `Cookie` header value for the backend origin, the same
//! `name=value; name2=value2` text the server would receive.

use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use reqwest::cookie::{CookieStore, Jar};
use url::Url;

use crate::api::error::ApiError;

/// A fresh jar, preloaded from `path` when a saved session exists.
pub fn load_jar(origin: &Url, path: &Path) -> Result<Arc<Jar>, ApiError> {
    let jar = Arc::new(Jar::default());

    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(source) if source.kind() == io::ErrorKind::NotFound => return Ok(jar),
        Err(source) => return Err(jar_error(path, source)),
    };

    for entry in contents.split(';') {
        let cookie = entry.trim();
        if !cookie.is_empty() {
            jar.add_cookie_str(cookie, origin);
        }
    }

    Ok(jar)
}

/// Writes the cookies the jar holds for `origin`. Returns false when there
/// is nothing to save.
pub fn persist_jar(jar: &Jar, origin: &Url, path: &Path) -> Result<bool, ApiError> {
    let Some(header) = jar.cookies(origin) else {
        return Ok(false);
    };
    let value = header
        .to_str()
        .map_err(|error| jar_error(path, io::Error::new(io::ErrorKind::InvalidData, error)))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| jar_error(parent, source))?;
    }

    let mut file = open_private(path).map_err(|source| jar_error(path, source))?;
    file.write_all(value.as_bytes())
        .map_err(|source| jar_error(path, source))?;

    Ok(true)
}

/// Truncates or creates `path` readable by the owner only.
#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation; an older file may be wider.
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

/// Deletes the saved session. Missing files are not an error.
pub fn remove_jar(path: &Path) -> Result<bool, ApiError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(source) if source.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(jar_error(path, source)),
    }
}

fn jar_error(path: &Path, source: io::Error) -> ApiError {
    ApiError::CookieJar {
        path: PathBuf::from(path),
        source,
    }
}

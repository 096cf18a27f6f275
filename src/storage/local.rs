//! Local filesystem primitives shared by every store.
//!
//! ## Storage Layout
//!
//! ```text
//! {data_dir}/
//! ├── common/                     # Shared by every run on this machine
//! │   ├── address-validity.json
//! │   ├── approximate-addresses.json
//! │   ├── commute-summaries.json
//! │   ├── google-maps-api-key
//! │   └── kijiji-rss-url
//! └── {run_name}/                 # Private to one configured run
//!     ├── seen-listings.json
//!     └── config-search-params.json
//! ```

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};

/// Which directory a relative store path resolves under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// Specific to one configured run
    #[default]
    Private,
    /// Shared across all runs on the machine
    Common,
}

/// Resolved private and common data directories.
#[derive(Debug, Clone)]
pub struct StorageDirs {
    pub private: PathBuf,
    pub common: PathBuf,
}

impl StorageDirs {
    /// Private stores go under `{data_dir}/{run_name}`, common ones under
    /// `{data_dir}/common`.
    pub fn new(data_dir: impl Into<PathBuf>, run_name: &str) -> Self {
        let data_dir = data_dir.into();
        Self {
            private: data_dir.join(run_name),
            common: data_dir.join("common"),
        }
    }

    /// Resolve a store path. Absolute paths bypass scoping.
    pub fn resolve(&self, path: impl AsRef<Path>, scope: Scope) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match scope {
            Scope::Private => self.private.join(path),
            Scope::Common => self.common.join(path),
        }
    }
}

/// Ensure parent directory exists.
async fn ensure_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

/// Write bytes atomically (write to temp, then rename).
pub async fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    ensure_dir(path).await?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Read a UTF-8 file, returning None if it doesn't exist.
pub async fn read_text(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::Io(e)),
    }
}

/// Remove a file, ignoring one that is already gone.
pub async fn remove(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AppError::Io(e)),
    }
}

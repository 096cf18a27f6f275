// src/pipeline/change.rs

//! Search-parameter change detection.
//!
//! The last applied search parameters are kept as pretty JSON in a snapshot
//! file. When the live parameters differ, derived state is rebuilt by a
//! callback and the snapshot is replaced afterwards.

use std::future::Future;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::SearchParams;
use crate::storage::{Scope, StorageDirs, local};

pub const SNAPSHOT_FILE: &str = "config-search-params.json";

#[derive(Debug, Clone)]
pub struct ConfigChangeDetector {
    path: PathBuf,
}

impl ConfigChangeDetector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Detector using the default snapshot file of a run.
    pub fn for_run(dirs: &StorageDirs) -> Self {
        Self::new(dirs.resolve(SNAPSHOT_FILE, Scope::Private))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn render(params: &SearchParams) -> Result<String> {
        Ok(serde_json::to_string_pretty(params)?)
    }

    /// Whether `params` differ from the snapshot. No snapshot counts as changed.
    pub async fn has_changed(&self, params: &SearchParams) -> Result<bool> {
        let current = Self::render(params)?;
        let previous = local::read_text(&self.path).await?;
        Ok(previous.as_deref() != Some(current.as_str()))
    }

    /// Run `callback` if the parameters changed, then record them.
    ///
    /// The snapshot is written only after the callback succeeds; an error
    /// from the callback is returned and the next run sees the change again.
    pub async fn on_change<F, Fut>(&self, params: &SearchParams, callback: F) -> Result<bool>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let current = Self::render(params)?;
        let previous = local::read_text(&self.path).await?;

        match previous {
            Some(previous) if previous == current => {
                log::info!("No change in search parameters since last run");
                return Ok(false);
            }
            Some(_) => log::info!("Change in search parameters detected"),
            None => log::info!("No previous search found"),
        }

        callback().await?;
        local::write_bytes(&self.path, current.as_bytes()).await?;
        Ok(true)
    }

    /// Drop the snapshot so the next run treats the parameters as new.
    pub async fn reset(&self) -> Result<()> {
        local::remove(&self.path).await
    }
}

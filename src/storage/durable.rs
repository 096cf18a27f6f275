//! Durable single-value stores.
//!
//! A [`DurableStore`] is one named value persisted to one file. Reads prefer
//! memory, then disk. An environment variable can seed the file on first
//! run; once seeded the file wins and the variable is never read again.
//! Writes can be gated by an async [`Validator`] and replace the whole file
//! atomically, so a rejected or failed write leaves the previous value intact.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::EnvSource;
use crate::error::{AppError, Result};
use crate::storage::local::{self, Scope, StorageDirs};

/// Read and write transforms between a value and its file contents.
pub trait Codec<T>: Send + Sync {
    /// `Ok(None)` means the raw text holds no value.
    fn decode(&self, raw: &str) -> Result<Option<T>>;
    fn encode(&self, value: &T) -> Result<String>;
}

/// Compact JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<T: Serialize + DeserializeOwned> Codec<T> for JsonCodec {
    fn decode(&self, raw: &str) -> Result<Option<T>> {
        if raw.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(raw)?))
    }

    fn encode(&self, value: &T) -> Result<String> {
        Ok(serde_json::to_string(value)?)
    }
}

/// Identity transform for tokens, IDs and URLs, except that trailing line
/// endings left by editors are dropped. Blank text is no value.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl Codec<String> for TextCodec {
    fn decode(&self, raw: &str) -> Result<Option<String>> {
        if raw.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(raw.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn encode(&self, value: &String) -> Result<String> {
        Ok(value.clone())
    }
}

/// Decides whether a value may be stored or returned.
#[async_trait]
pub trait Validator<T>: Send + Sync {
    async fn validate(&self, value: &T) -> Result<bool>;
}

/// Adapter turning a plain predicate into a [`Validator`].
pub struct FnValidator<F>(pub F);

#[async_trait]
impl<T, F> Validator<T> for FnValidator<F>
where
    T: Sync,
    F: Fn(&T) -> bool + Send + Sync,
{
    async fn validate(&self, value: &T) -> Result<bool> {
        Ok((self.0)(value))
    }
}

/// Options for [`DurableStore::write_value`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    pub skip_validate: bool,
    pub skip_log: bool,
}

impl WriteOptions {
    pub fn quiet() -> Self {
        Self {
            skip_log: true,
            ..Self::default()
        }
    }
}

/// Builder returned by [`DurableStore::builder`] and [`DurableStore::text`].
pub struct StoreBuilder<T> {
    label: String,
    path: PathBuf,
    env_var: Option<String>,
    scope: Scope,
    codec: Arc<dyn Codec<T>>,
    validator: Option<Arc<dyn Validator<T>>>,
}

impl<T> StoreBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn new(label: &str, path: impl Into<PathBuf>, codec: Arc<dyn Codec<T>>) -> Self {
        Self {
            label: label.to_string(),
            path: path.into(),
            env_var: None,
            scope: Scope::Private,
            codec,
            validator: None,
        }
    }

    /// Seed from this environment variable when no file exists.
    pub fn env_var(mut self, name: impl Into<String>) -> Self {
        self.env_var = Some(name.into());
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Shorthand for `scope(Scope::Common)`.
    pub fn common(self) -> Self {
        self.scope(Scope::Common)
    }

    pub fn validator(mut self, validator: impl Validator<T> + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Resolve the path and run env seeding. The file itself is read lazily.
    pub async fn open(self, dirs: &StorageDirs, env: &dyn EnvSource) -> Result<DurableStore<T>> {
        let mut store = DurableStore {
            path: dirs.resolve(&self.path, self.scope),
            label: self.label,
            env_var: self.env_var,
            codec: self.codec,
            validator: self.validator,
            loaded: None,
        };
        store.seed_from_env(env).await?;
        Ok(store)
    }
}

/// A named value persisted to a single file.
pub struct DurableStore<T> {
    label: String,
    path: PathBuf,
    env_var: Option<String>,
    codec: Arc<dyn Codec<T>>,
    validator: Option<Arc<dyn Validator<T>>>,
    loaded: Option<T>,
}

impl<T> DurableStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// JSON-encoded store.
    pub fn builder(label: &str, path: impl Into<PathBuf>) -> StoreBuilder<T> {
        StoreBuilder::new(label, path, Arc::new(JsonCodec))
    }
}

impl DurableStore<String> {
    /// Plain-text store for opaque strings.
    pub fn text(label: &str, path: impl Into<PathBuf>) -> StoreBuilder<String> {
        StoreBuilder::new(label, path, Arc::new(TextCodec))
    }
}

impl<T> DurableStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn env_var(&self) -> Option<&str> {
        self.env_var.as_deref()
    }

    async fn read_disk(&self) -> Result<Option<T>> {
        match local::read_text(&self.path).await? {
            Some(raw) => self.codec.decode(&raw),
            None => Ok(None),
        }
    }

    async fn seed_from_env(&mut self, env: &dyn EnvSource) -> Result<()> {
        let Some(name) = self.env_var.clone() else {
            return Ok(());
        };
        if self.read_disk().await?.is_some() {
            return Ok(());
        }
        let Some(raw) = env.var(&name) else {
            return Ok(());
        };
        match self.codec.decode(&raw)? {
            Some(value) => {
                log::info!("Seeding {} from ${}", self.label, name);
                if !self.write_value(value, WriteOptions::default()).await? {
                    log::warn!("Value of ${} was rejected for {}", name, self.label);
                }
            }
            None => log::debug!("${} is set but empty; not seeding {}", name, self.label),
        }
        Ok(())
    }

    async fn passes(&self, value: &T) -> Result<bool> {
        match &self.validator {
            Some(validator) => validator.validate(value).await,
            None => Ok(true),
        }
    }

    /// Borrowing variant of [`value`](Self::value).
    pub async fn value_ref(&mut self) -> Result<Option<&T>> {
        if self.loaded.is_none() {
            let Some(value) = self.read_disk().await? else {
                return Ok(None);
            };
            if !self.passes(&value).await? {
                log::debug!("Stored value for {} failed validation", self.label);
                return Ok(None);
            }
            self.loaded = Some(value);
        }
        Ok(self.loaded.as_ref())
    }

    /// Current value from memory or disk. Absent or invalid yields `None`.
    pub async fn value(&mut self) -> Result<Option<T>> {
        Ok(self.value_ref().await?.cloned())
    }

    /// Current value, or [`AppError::MissingRequiredValue`].
    ///
    /// `on_missing` is an operator instruction; callers that see it on the
    /// error print it and shut down cleanly.
    pub async fn require_value(&mut self, on_missing: Option<&str>) -> Result<T> {
        if let Some(value) = self.value().await? {
            return Ok(value);
        }
        Err(AppError::MissingRequiredValue {
            label: self.label.clone(),
            env_var: self.env_var.clone(),
            instruction: on_missing.map(str::to_string),
        })
    }

    /// Validate, persist, then cache `value`.
    ///
    /// Returns `Ok(false)` when the validator rejects it; memory and disk
    /// keep the previous value.
    pub async fn write_value(&mut self, value: T, options: WriteOptions) -> Result<bool> {
        if !options.skip_validate && !self.passes(&value).await? {
            log::warn!(
                "{}",
                AppError::StoreValidation {
                    label: self.label.clone()
                }
            );
            return Ok(false);
        }

        let encoded = self.codec.encode(&value)?;
        if !options.skip_log {
            log::debug!("Writing new value for {}", self.label);
        }
        local::write_bytes(&self.path, encoded.as_bytes()).await?;
        self.loaded = Some(value);
        Ok(true)
    }

    /// Forget the value in memory and on disk.
    pub async fn clear(&mut self) -> Result<()> {
        log::info!("Clearing {}", self.label);
        self.loaded = None;
        local::remove(&self.path).await
    }
}

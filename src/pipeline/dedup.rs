// src/pipeline/dedup.rs

//! Cross-run listing deduplication.
//!
//! Each listing is handed downstream at most once per successful run. Keys
//! are persisted only after the downstream callback succeeds, so a crash or
//! error re-delivers the same batch next time.

use std::collections::{BTreeMap, HashSet};
use std::future::Future;

use crate::config::EnvSource;
use crate::error::Result;
use crate::models::Listing;
use crate::storage::{DurableStore, StorageDirs, WriteOptions};

pub const SEEN_LISTINGS_FILE: &str = "seen-listings.json";

/// `{seenKey: 1}`
pub type SeenTable = BTreeMap<String, u8>;

/// Persistent set of listing keys already handed downstream.
pub struct SeenListings {
    store: DurableStore<SeenTable>,
}

impl SeenListings {
    pub async fn open(dirs: &StorageDirs, env: &dyn EnvSource) -> Result<Self> {
        let store = DurableStore::builder("seen listings", SEEN_LISTINGS_FILE)
            .open(dirs, env)
            .await?;
        Ok(Self { store })
    }

    /// Run `f` on the listings not seen before, then remember them.
    ///
    /// Listings repeated within the batch count as seen after their first
    /// occurrence. The seen set is persisted only if `f` returns `Ok`.
    pub async fn with_unseen<F, Fut, T>(&mut self, listings: Vec<Listing>, f: F) -> Result<T>
    where
        F: FnOnce(Vec<Listing>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut working = self.store.value().await?.unwrap_or_default();
        let total = listings.len();

        let mut batch_keys = HashSet::new();
        let unseen: Vec<Listing> = listings
            .into_iter()
            .filter(|l| {
                let key = l.seen_key();
                !working.contains_key(&key) && batch_keys.insert(key)
            })
            .collect();

        log::info!(
            "{} unseen listing{} out of {total}",
            unseen.len(),
            if unseen.len() == 1 { "" } else { "s" }
        );
        for l in &unseen {
            log::trace!("Unseen: {}", l.url);
        }

        working.extend(batch_keys.into_iter().map(|key| (key, 1)));

        let result = f(unseen).await?;
        self.store
            .write_value(working, WriteOptions::quiet())
            .await?;
        Ok(result)
    }

    pub async fn is_seen(&mut self, key: &str) -> Result<bool> {
        Ok(self
            .store
            .value_ref()
            .await?
            .is_some_and(|table| table.contains_key(key)))
    }

    pub async fn len(&mut self) -> Result<usize> {
        Ok(self.store.value_ref().await?.map_or(0, |table| table.len()))
    }

    pub async fn is_empty(&mut self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Forget every seen key.
    pub async fn clear(&mut self) -> Result<()> {
        self.store.clear().await
    }
}

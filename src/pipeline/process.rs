// src/pipeline/process.rs

//! Batch processing: area filter, dedup, rules, enrichment, presentation.

use async_trait::async_trait;
use url::Url;

use crate::config::EnvSource;
use crate::error::{AppError, Result};
use crate::geo::{GeoEnrichmentCache, GeoProvider};
use crate::models::{Config, Listing, Platform};
use crate::pipeline::area::AreaFilter;
use crate::pipeline::change::ConfigChangeDetector;
use crate::pipeline::dedup::SeenListings;
use crate::pipeline::validate::ValidationEngine;
use crate::storage::{DurableStore, FnValidator, StorageDirs};

pub const KIJIJI_FEED_FILE: &str = "kijiji-rss-url";

/// Produces freshly scraped listings.
#[async_trait]
pub trait ListingSource: Send + Sync {
    fn platform(&self) -> Platform;

    async fn fetch(&self) -> Result<Vec<Listing>>;
}

/// Receives the valid listings of a batch.
///
/// An error leaves the batch unseen so it is delivered again next run.
#[async_trait]
pub trait Presenter: Send + Sync {
    async fn present(&self, listings: &[Listing]) -> Result<()>;
}

/// Counts for one processed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub received: usize,
    pub outside_area: usize,
    pub unseen: usize,
    pub valid: usize,
    pub invalid: usize,
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// Open the cached feed URL store. Anything that is not an http(s) URL is
/// rejected.
pub async fn feed_url_store(dirs: &StorageDirs, env: &dyn EnvSource) -> Result<DurableStore<String>> {
    DurableStore::text("Kijiji RSS feed URL", KIJIJI_FEED_FILE)
        .common()
        .validator(FnValidator(|value: &String| {
            Url::parse(value).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
        }))
        .open(dirs, env)
        .await
}

/// Everything a run needs, built once at startup.
pub struct PipelineContext<P> {
    pub config: Config,
    pub rules: ValidationEngine,
    pub area: AreaFilter,
    pub seen: SeenListings,
    pub geo: Option<GeoEnrichmentCache<P>>,
    pub feed_url: DurableStore<String>,
    pub change: ConfigChangeDetector,
}

impl<P: GeoProvider> PipelineContext<P> {
    /// Compile rules, decode the search area and open every store.
    ///
    /// `provider` is ignored when Google Maps features are disabled.
    pub async fn build(
        config: Config,
        dirs: &StorageDirs,
        env: &dyn EnvSource,
        provider: Option<P>,
    ) -> Result<Self> {
        let rules = ValidationEngine::from_search(&config.search)?;
        let area = AreaFilter::new(config.search.location.search_area()?);
        log::debug!("Search area: {} circle(s)", area.circles().len());

        let geo = match provider {
            Some(provider) if !config.options.disable_google_maps_features => {
                Some(GeoEnrichmentCache::open(provider, dirs, env).await?)
            }
            _ => None,
        };

        Ok(Self {
            rules,
            area,
            seen: SeenListings::open(dirs, env).await?,
            geo,
            feed_url: feed_url_store(dirs, env).await?,
            change: ConfigChangeDetector::for_run(dirs),
            config,
        })
    }

    /// Startup checks: commute destinations must geocode, and changed search
    /// parameters invalidate the cached feed URL.
    pub async fn startup(&mut self) -> Result<()> {
        if let Some(geo) = self.geo.as_mut() {
            let invalid = geo
                .validate_commute_destinations(&self.config.options.commute_destinations)
                .await?;
            if let Some(address) = invalid.first() {
                return Err(AppError::config(format!(
                    "Invalid address in options.commute_destinations: {address}"
                )));
            }
        }

        let feed_url = &mut self.feed_url;
        self.change
            .on_change(&self.config.search.params, || async move { feed_url.clear().await })
            .await?;
        Ok(())
    }

    /// Run one batch through the pipeline and hand the survivors to `presenter`.
    pub async fn process_batch(
        &mut self,
        listings: Vec<Listing>,
        presenter: &dyn Presenter,
    ) -> Result<BatchStats> {
        let received = listings.len();
        let (inside, outside) = self.area.partition(listings);

        let Self {
            config,
            rules,
            seen,
            geo,
            ..
        } = self;
        let destinations = &config.options.commute_destinations;

        let stats = seen
            .with_unseen(inside, |unseen| async move {
                let mut stats = BatchStats {
                    received,
                    outside_area: outside.len(),
                    unseen: unseen.len(),
                    ..BatchStats::default()
                };

                let mut valid = Vec::new();
                let mut invalid = Vec::new();
                for mut listing in unseen {
                    if rules.apply(&mut listing) {
                        if let Some(geo) = geo.as_mut() {
                            geo.enrich(&mut listing, destinations).await?;
                        }
                        valid.push(listing);
                    } else {
                        invalid.push(listing);
                    }
                }
                stats.valid = valid.len();
                stats.invalid = invalid.len();

                log::info!("{} new valid result{}", valid.len(), plural(valid.len()));
                for listing in &valid {
                    log::debug!("  + {}", listing.url);
                }
                if !invalid.is_empty() {
                    log::info!("{} invalid result{}", invalid.len(), plural(invalid.len()));
                    for listing in &invalid {
                        log::debug!("  - {}: {}", listing.url, listing.reasons_summary());
                    }
                }

                if !valid.is_empty() {
                    presenter.present(&valid).await?;
                }
                Ok::<_, AppError>(stats)
            })
            .await?;

        Ok(stats)
    }

    /// Fetch from `source` and process the result as one batch.
    pub async fn run_source(
        &mut self,
        source: &dyn ListingSource,
        presenter: &dyn Presenter,
    ) -> Result<BatchStats> {
        let listings = source.fetch().await?;
        log::info!(
            "Fetched {} listing{} from {}",
            listings.len(),
            plural(listings.len()),
            source.platform()
        );
        self.process_batch(listings, presenter).await
    }
}

// src/geo/enrich.rs

//! Persistent cache in front of a [`GeoProvider`].
//!
//! Every lookup result is stored in a common-scope table so it survives
//! restarts and is shared between runs. Confirmed answers are cached,
//! including confirmed empty ones; transport failures are not, so the
//! next run retries them.

use std::collections::BTreeMap;

use futures::future::join_all;

use crate::config::EnvSource;
use crate::error::Result;
use crate::geo::provider::GeoProvider;
use crate::models::{CommuteSummary, Coordinate, Listing, LocationLink, TravelMode, UNAVAILABLE};
use crate::storage::{DurableStore, StorageDirs, WriteOptions};
use crate::utils::url::{directions_url, map_search_url};

pub const ADDRESS_VALIDITY_FILE: &str = "address-validity.json";
pub const APPROXIMATE_ADDRESSES_FILE: &str = "approximate-addresses.json";
pub const COMMUTE_SUMMARIES_FILE: &str = "commute-summaries.json";

/// `{address: valid}`
pub type AddressValidity = BTreeMap<String, bool>;

/// `{"lat,lon": (display, full)}`, or `null` when nothing was found there.
pub type ApproximateAddresses = BTreeMap<String, Option<(String, String)>>;

/// `{origin: {destination: summary}}`
pub type CommuteSummaries = BTreeMap<String, BTreeMap<String, CommuteSummary>>;

/// Cache tables that can be wiped by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoTable {
    AddressValidity,
    ApproximateAddresses,
    CommuteSummaries,
}

pub struct GeoEnrichmentCache<P> {
    provider: P,
    address_validity: DurableStore<AddressValidity>,
    approximate_addresses: DurableStore<ApproximateAddresses>,
    commute_summaries: DurableStore<CommuteSummaries>,
}

impl<P: GeoProvider> GeoEnrichmentCache<P> {
    /// Open the cache tables under the common data directory.
    pub async fn open(provider: P, dirs: &StorageDirs, env: &dyn EnvSource) -> Result<Self> {
        Ok(Self {
            provider,
            address_validity: DurableStore::builder("address validity", ADDRESS_VALIDITY_FILE)
                .common()
                .open(dirs, env)
                .await?,
            approximate_addresses: DurableStore::builder(
                "approximate addresses",
                APPROXIMATE_ADDRESSES_FILE,
            )
            .common()
            .open(dirs, env)
            .await?,
            commute_summaries: DurableStore::builder("commute summaries", COMMUTE_SUMMARIES_FILE)
                .common()
                .open(dirs, env)
                .await?,
        })
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Whether the geocoder can place `address`.
    ///
    /// A failed lookup reads as invalid for this call only.
    pub async fn is_valid_address(&mut self, address: &str) -> Result<bool> {
        let cached = self
            .address_validity
            .value_ref()
            .await?
            .and_then(|table| table.get(address).copied());
        if let Some(valid) = cached {
            log::debug!("Address found in cache: {address}");
            return Ok(valid);
        }

        let valid = match self.provider.geocode(address).await {
            Ok(found) => found.is_some(),
            Err(e) => {
                log::warn!("Error validating address {address}: {e}");
                return Ok(false);
            }
        };

        let mut table = self.address_validity.value().await?.unwrap_or_default();
        table.insert(address.to_string(), valid);
        self.address_validity
            .write_value(table, WriteOptions::quiet())
            .await?;

        log::debug!(
            "Address is {}: {address}",
            if valid { "valid" } else { "invalid" }
        );
        Ok(valid)
    }

    /// Approximate street address for a point, as a map search link.
    pub async fn approx_location_link(&mut self, point: Coordinate) -> Result<Option<LocationLink>> {
        let key = point.cache_key();
        let cached = self
            .approximate_addresses
            .value_ref()
            .await?
            .and_then(|table| table.get(&key).cloned());
        if let Some(entry) = cached {
            return Ok(entry.map(|(text, full)| LocationLink {
                text,
                url: map_search_url(&full),
            }));
        }

        let found = match self.provider.reverse_geocode(point).await {
            Ok(found) => found,
            Err(e) => {
                log::warn!("Error reverse geocoding {point}: {e}");
                return Ok(None);
            }
        };
        let entry = found.and_then(|found| {
            let full = found.formatted_address.clone();
            let text = found
                .display_address()
                .or_else(|| (!full.is_empty()).then(|| full.clone()))?;
            let query = if full.is_empty() { text.clone() } else { full };
            Some((text, query))
        });
        if entry.is_none() {
            log::debug!("No address found near {point}");
        }

        let mut table = self
            .approximate_addresses
            .value()
            .await?
            .unwrap_or_default();
        table.insert(key, entry.clone());
        self.approximate_addresses
            .write_value(table, WriteOptions::quiet())
            .await?;

        Ok(entry.map(|(text, query)| LocationLink {
            text,
            url: map_search_url(&query),
        }))
    }

    /// Travel time per mode between two places.
    ///
    /// All four modes are requested concurrently. Modes that fail or have no
    /// route read as `"unavailable"`. When no mode resolves the result is
    /// `None`; it is cached only if every mode answered without error.
    pub async fn commute_summary(
        &mut self,
        origin: &str,
        destination: &str,
    ) -> Result<Option<CommuteSummary>> {
        let cached = self
            .commute_summaries
            .value_ref()
            .await?
            .and_then(|table| table.get(origin))
            .and_then(|by_dest| by_dest.get(destination))
            .cloned();
        if let Some(summary) = cached {
            log::debug!("Commute summary found in cache: {origin} -> {destination}");
            return Ok((summary.available_count() > 0).then_some(summary));
        }

        let provider = &self.provider;
        let lookups = TravelMode::ALL.map(|mode| async move {
            match provider.travel_duration(origin, destination, mode).await {
                Ok(Some(text)) => (mode, text, false),
                Ok(None) => (mode, UNAVAILABLE.to_string(), false),
                Err(e) => {
                    log::debug!("{mode} lookup failed for {origin} -> {destination}: {e}");
                    (mode, UNAVAILABLE.to_string(), true)
                }
            }
        });
        let results = join_all(lookups).await;
        let failed = results.iter().any(|(_, _, failed)| *failed);
        let summary = CommuteSummary(
            results
                .into_iter()
                .map(|(mode, text, _)| (mode, text))
                .collect(),
        );

        if summary.available_count() == 0 && failed {
            log::warn!("No commute data for {origin} -> {destination}");
            return Ok(None);
        }

        let mut table = self.commute_summaries.value().await?.unwrap_or_default();
        table
            .entry(origin.to_string())
            .or_default()
            .insert(destination.to_string(), summary.clone());
        self.commute_summaries
            .write_value(table, WriteOptions::quiet())
            .await?;

        if summary.available_count() == 0 {
            log::info!("No route by any mode: {origin} -> {destination}");
            return Ok(None);
        }
        log::debug!(
            "Commute summary computed: {origin} -> {destination}: {} ({})",
            summary.one_line(),
            directions_url(origin, destination, None)
        );
        Ok(Some(summary))
    }

    /// Attach an approximate location link and commute summaries.
    pub async fn enrich(&mut self, listing: &mut Listing, destinations: &[String]) -> Result<()> {
        if let Some(coords) = listing.coords {
            listing.computed.location_link = self.approx_location_link(coords).await?;
        }

        let Some(origin) = listing.commute_origin() else {
            log::debug!("No location for {}; skipping commutes", listing.seen_key());
            return Ok(());
        };
        for destination in destinations {
            if let Some(summary) = self.commute_summary(&origin, destination).await? {
                listing
                    .computed
                    .distance_to
                    .insert(destination.clone(), summary);
            }
        }
        Ok(())
    }

    /// Destinations the geocoder cannot place.
    pub async fn validate_commute_destinations(
        &mut self,
        destinations: &[String],
    ) -> Result<Vec<String>> {
        let mut invalid = Vec::new();
        for destination in destinations {
            if !self.is_valid_address(destination).await? {
                invalid.push(destination.clone());
            }
        }
        Ok(invalid)
    }

    pub async fn clear(&mut self, table: GeoTable) -> Result<()> {
        match table {
            GeoTable::AddressValidity => self.address_validity.clear().await,
            GeoTable::ApproximateAddresses => self.approximate_addresses.clear().await,
            GeoTable::CommuteSummaries => self.commute_summaries.clear().await,
        }
    }
}

//! Listing data structure.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{CommuteSummary, Coordinate};

/// Marketplace a listing was scraped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Kijiji,
    #[serde(rename = "fb")]
    Facebook,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Kijiji => "kijiji",
            Platform::Facebook => "fb",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a listing was excluded. Each stage writes its own kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonKind {
    Blacklisted,
    OutsideSearchArea,
}

/// Map link for an approximate address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationLink {
    pub text: String,
    pub url: String,
}

/// Annotations added by the enrichment stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Computed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_link: Option<LocationLink>,

    /// Commute summary per destination
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub distance_to: BTreeMap<String, CommuteSummary>,
}

/// A rental listing flowing through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub platform: Platform,

    /// Unique within a platform
    pub id: String,

    pub url: String,

    pub title: String,

    #[serde(default)]
    pub price: Option<f64>,

    #[serde(default)]
    pub long_description: Option<String>,

    #[serde(default)]
    pub short_address: Option<String>,

    #[serde(default)]
    pub long_address: Option<String>,

    #[serde(default)]
    pub coords: Option<Coordinate>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_urls: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub invalid_reasons: BTreeMap<ReasonKind, String>,

    #[serde(default)]
    pub computed: Computed,
}

impl Listing {
    /// Minimal listing, the rest is filled in by the scraper.
    pub fn new(
        platform: Platform,
        id: impl Into<String>,
        url: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            id: id.into(),
            url: url.into(),
            title: title.into(),
            price: None,
            long_description: None,
            short_address: None,
            long_address: None,
            coords: None,
            image_urls: Vec::new(),
            invalid_reasons: BTreeMap::new(),
            computed: Computed::default(),
        }
    }

    /// Dedup key: `platform-id`.
    pub fn seen_key(&self) -> String {
        seen_key(self.platform, &self.id)
    }

    /// A listing is valid while no stage has recorded a reason against it.
    pub fn is_valid(&self) -> bool {
        self.invalid_reasons.is_empty()
    }

    /// Record a reason without touching reasons of other kinds.
    pub fn mark_invalid(&mut self, kind: ReasonKind, reason: impl Into<String>) {
        self.invalid_reasons.insert(kind, reason.into());
    }

    /// Best available address text.
    pub fn address(&self) -> Option<&str> {
        self.long_address
            .as_deref()
            .filter(|a| !a.is_empty())
            .or(self.short_address.as_deref().filter(|a| !a.is_empty()))
    }

    /// Commute origin: raw coordinates when known, otherwise the address.
    pub fn commute_origin(&self) -> Option<String> {
        self.coords
            .map(|c| c.cache_key())
            .or_else(|| self.address().map(str::to_string))
    }

    /// Reasons rendered as `kind: reason` pairs for logs.
    pub fn reasons_summary(&self) -> String {
        if self.invalid_reasons.is_empty() {
            return "unknown".to_string();
        }
        self.invalid_reasons
            .iter()
            .map(|(kind, reason)| format!("{kind:?}: {reason}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Dedup key for a platform and listing ID.
pub fn seen_key(platform: Platform, id: &str) -> String {
    format!("{}-{}", platform.as_str(), id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_listing() -> Listing {
        let mut listing = Listing::new(
            Platform::Kijiji,
            "1690000001",
            "https://www.kijiji.ca/v-apartments-condos/1690000001",
            "Bright 4 1/2 near metro",
        );
        listing.short_address = Some("Plateau".to_string());
        listing
    }

    #[test]
    fn test_seen_key() {
        assert_eq!(sample_listing().seen_key(), "kijiji-1690000001");
        assert_eq!(seen_key(Platform::Facebook, "42"), "fb-42");
    }

    #[test]
    fn test_reasons_do_not_clobber_each_other() {
        let mut listing = sample_listing();
        assert!(listing.is_valid());
        listing.mark_invalid(ReasonKind::OutsideSearchArea, "outside");
        listing.mark_invalid(ReasonKind::Blacklisted, "'sublet' in title");
        assert_eq!(listing.invalid_reasons.len(), 2);
        assert!(!listing.is_valid());
    }

    #[test]
    fn test_commute_origin_prefers_coords() {
        let mut listing = sample_listing();
        assert_eq!(listing.commute_origin().as_deref(), Some("Plateau"));
        listing.long_address = Some("123 Rue Rachel E, Montréal".to_string());
        assert_eq!(
            listing.commute_origin().as_deref(),
            Some("123 Rue Rachel E, Montréal")
        );
        listing.coords = Some(Coordinate::new(45.52, -73.58));
        assert_eq!(listing.commute_origin().as_deref(), Some("45.52,-73.58"));
    }

    #[test]
    fn test_deserialize_scraped_shape() {
        let json = r#"{
            "platform": "fb",
            "id": "99",
            "url": "https://facebook.com/marketplace/item/99",
            "title": "Studio",
            "coords": {"lat": 45.5, "lon": -73.6}
        }"#;
        let listing: Listing = serde_json::from_str(json).unwrap();
        assert_eq!(listing.platform, Platform::Facebook);
        assert!(listing.is_valid());
        assert_eq!(listing.coords, Some(Coordinate::new(45.5, -73.6)));
    }
}

// src/geo/provider.rs

//! External geo lookups.
//!
//! [`GeoProvider`] is the seam the enrichment cache talks to;
//! [`GoogleMapsProvider`] implements it against the Google geocoding and
//! distance-matrix JSON APIs.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::config::EnvSource;
use crate::error::{AppError, Result};
use crate::models::{Coordinate, TravelMode};
use crate::storage::{DurableStore, StorageDirs};
use crate::utils::http::get_json;

/// Environment variable seeding the API key store.
pub const API_KEY_ENV: &str = "GOOGLE_MAPS_API_KEY";

/// Common-scope file holding the API key.
pub const API_KEY_FILE: &str = "google-maps-api-key";

pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/";

/// One component of a reverse-geocoded address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AddressComponent {
    #[serde(default)]
    pub long_name: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

/// Best reverse-geocoding match for a coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReverseGeocode {
    pub components: Vec<AddressComponent>,
    pub formatted_address: String,
}

impl ReverseGeocode {
    fn short_name(&self, kind: &str) -> Option<&str> {
        self.components
            .iter()
            .find(|c| c.types.iter().any(|t| t == kind))
            .map(|c| c.short_name.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Short display form: `"<number> <route>, <neighborhood>"`, with the
    /// sublocality standing in for a missing neighborhood.
    pub fn display_address(&self) -> Option<String> {
        let street = [self.short_name("street_number"), self.short_name("route")]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        let area = self
            .short_name("neighborhood")
            .or_else(|| self.short_name("sublocality"));

        let parts: Vec<&str> = [Some(street.as_str()), area]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(", "))
    }
}

/// Geocoding and travel-time lookups.
#[async_trait]
pub trait GeoProvider: Send + Sync {
    /// Forward geocode. `Ok(None)` means the service found nothing.
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>>;

    async fn reverse_geocode(&self, point: Coordinate) -> Result<Option<ReverseGeocode>>;

    /// Duration text such as `"25 mins"`, or `Ok(None)` when no route exists.
    async fn travel_duration(
        &self,
        origin: &str,
        destination: &str,
        mode: TravelMode,
    ) -> Result<Option<String>>;
}

// --- Wire types ---

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    geometry: Option<Geometry>,
    #[serde(default)]
    formatted_address: String,
    #[serde(default)]
    address_components: Vec<AddressComponent>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    #[serde(default)]
    duration: Option<TextValue>,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    text: String,
}

/// Map an API status to "has results", "nothing found" or an error.
fn check_status(context: &str, status: &str, error_message: Option<&str>) -> Result<bool> {
    match status {
        "OK" => Ok(true),
        "ZERO_RESULTS" | "NOT_FOUND" => Ok(false),
        other => Err(AppError::lookup(
            context,
            match error_message {
                Some(message) => format!("{other}: {message}"),
                None => other.to_string(),
            },
        )),
    }
}

/// Google Maps Platform client.
#[derive(Debug, Clone)]
pub struct GoogleMapsProvider {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl GoogleMapsProvider {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(client, api_key, DEFAULT_BASE_URL)
    }

    /// Point the provider at another host, e.g. a mock server in tests.
    pub fn with_base_url(
        client: reqwest::Client,
        api_key: impl Into<String>,
        base_url: &str,
    ) -> Result<Self> {
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Ok(Self {
            client,
            base_url: Url::parse(&base)?,
            api_key: api_key.into(),
        })
    }

    /// Open the common API key store, seeding it from the environment.
    pub async fn api_key_store(
        dirs: &StorageDirs,
        env: &dyn EnvSource,
    ) -> Result<DurableStore<String>> {
        DurableStore::text("Google Maps API key", API_KEY_FILE)
            .env_var(API_KEY_ENV)
            .common()
            .open(dirs, env)
            .await
    }

    /// Build a provider from the key store; a missing key is a
    /// [`AppError::MissingRequiredValue`].
    pub async fn from_store(
        client: reqwest::Client,
        store: &mut DurableStore<String>,
    ) -> Result<Self> {
        let api_key = store.require_value(None).await?;
        Self::new(client, api_key)
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.base_url.join(path)?;
        url.query_pairs_mut()
            .extend_pairs(params)
            .append_pair("key", &self.api_key);
        Ok(url)
    }

    async fn geocode_request(&self, context: &str, params: &[(&str, &str)]) -> Result<Vec<GeocodeResult>> {
        let url = self.endpoint("geocode/json", params)?;
        let response: GeocodeResponse = get_json(&self.client, url).await?;
        if check_status(context, &response.status, response.error_message.as_deref())? {
            Ok(response.results)
        } else {
            Ok(Vec::new())
        }
    }
}

#[async_trait]
impl GeoProvider for GoogleMapsProvider {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>> {
        let results = self
            .geocode_request(address, &[("address", address)])
            .await?;
        Ok(results
            .into_iter()
            .next()
            .and_then(|r| r.geometry)
            .map(|g| Coordinate::new(g.location.lat, g.location.lng)))
    }

    async fn reverse_geocode(&self, point: Coordinate) -> Result<Option<ReverseGeocode>> {
        let latlng = point.cache_key();
        let results = self
            .geocode_request(&latlng, &[("latlng", latlng.as_str())])
            .await?;
        Ok(results.into_iter().next().map(|r| ReverseGeocode {
            components: r.address_components,
            formatted_address: r.formatted_address,
        }))
    }

    async fn travel_duration(
        &self,
        origin: &str,
        destination: &str,
        mode: TravelMode,
    ) -> Result<Option<String>> {
        let url = self.endpoint(
            "distancematrix/json",
            &[
                ("units", "metric"),
                ("origins", origin),
                ("destinations", destination),
                ("mode", mode.as_str()),
            ],
        )?;
        let context = format!("{origin} -> {destination} ({mode})");
        let response: DistanceMatrixResponse = get_json(&self.client, url).await?;
        if !check_status(&context, &response.status, response.error_message.as_deref())? {
            return Ok(None);
        }

        Ok(response
            .rows
            .into_iter()
            .next()
            .and_then(|row| row.elements.into_iter().next())
            .filter(|element| element.status == "OK")
            .and_then(|element| element.duration)
            .map(|duration| duration.text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(short: &str, types: &[&str]) -> AddressComponent {
        AddressComponent {
            long_name: short.to_string(),
            short_name: short.to_string(),
            types: types.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_display_address_full() {
        let r = ReverseGeocode {
            components: vec![
                component("4521", &["street_number"]),
                component("Rue Saint-Denis", &["route"]),
                component("Le Plateau-Mont-Royal", &["neighborhood", "political"]),
                component("Montréal", &["locality", "political"]),
            ],
            formatted_address: "4521 Rue Saint-Denis, Montréal, QC H2J 2L4, Canada".into(),
        };
        assert_eq!(
            r.display_address().as_deref(),
            Some("4521 Rue Saint-Denis, Le Plateau-Mont-Royal")
        );
    }

    #[test]
    fn test_display_address_falls_back_to_sublocality() {
        let r = ReverseGeocode {
            components: vec![
                component("Rue Wellington", &["route"]),
                component("Verdun", &["sublocality_level_1", "sublocality"]),
            ],
            formatted_address: String::new(),
        };
        assert_eq!(r.display_address().as_deref(), Some("Rue Wellington, Verdun"));
    }

    #[test]
    fn test_display_address_empty() {
        let r = ReverseGeocode {
            components: vec![component("Canada", &["country"])],
            formatted_address: "Canada".into(),
        };
        assert!(r.display_address().is_none());
    }

    #[test]
    fn test_check_status() {
        assert!(check_status("x", "OK", None).unwrap());
        assert!(!check_status("x", "ZERO_RESULTS", None).unwrap());
        let err = check_status("x", "REQUEST_DENIED", Some("bad key")).unwrap_err();
        assert!(err.to_string().contains("REQUEST_DENIED: bad key"));
    }

    #[test]
    fn test_endpoint_encodes_params() {
        let provider = GoogleMapsProvider::with_base_url(
            reqwest::Client::new(),
            "k3y",
            "http://localhost:1234/maps/api",
        )
        .unwrap();
        let url = provider
            .endpoint("geocode/json", &[("address", "1 Rue Sainte-Catherine, Montréal")])
            .unwrap();
        assert_eq!(url.path(), "/maps/api/geocode/json");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("address".into(), "1 Rue Sainte-Catherine, Montréal".into()),
                ("key".into(), "k3y".into()),
            ]
        );
    }
}

//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::geo::geofence;
use crate::models::Circle;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// What to look for and what to reject
    #[serde(default)]
    pub search: SearchConfig,

    /// Optional features
    #[serde(default)]
    pub options: OptionsConfig,

    /// Where durable stores live
    #[serde(default)]
    pub storage: StorageConfig,

    /// Geocoding client settings
    #[serde(default)]
    pub geo: GeoConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values.
    ///
    /// Rejects anything that would otherwise fail later in the run: a bad
    /// price range, a search area with no decodable circle, or a blacklist
    /// regex that does not compile.
    pub fn validate(&self) -> Result<()> {
        let price = &self.search.params.price;
        if price.min > price.max {
            return Err(AppError::validation("min price is greater than max price"));
        }
        if self.geo.timeout_secs == 0 {
            return Err(AppError::validation("geo.timeout_secs must be > 0"));
        }
        let run_name = self.storage.run_name.trim();
        if run_name.is_empty() {
            return Err(AppError::validation("storage.run_name is empty"));
        }
        // Must name a single directory beside `common/`.
        if matches!(run_name, "common" | "." | "..") || run_name.contains(['/', '\\']) {
            return Err(AppError::validation(format!(
                "storage.run_name is not a usable directory name: {run_name:?}"
            )));
        }
        self.search.location.search_area()?;
        crate::pipeline::RuleSet::compile(&self.search)?;
        Ok(())
    }
}

/// Search criteria.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub params: SearchParams,

    #[serde(default)]
    pub location: LocationConfig,

    /// Case-insensitive substrings that invalidate a listing
    #[serde(default)]
    pub blacklist: Vec<String>,

    /// Case-insensitive regular expressions that invalidate a listing
    #[serde(default)]
    pub blacklist_regex: Vec<String>,
}

/// Search parameters. Changes here invalidate derived search state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub pets: PetParams,

    #[serde(default)]
    pub exclude: ExcludeParams,

    #[serde(default)]
    pub min_bedrooms: u32,

    #[serde(default)]
    pub price: PriceRange,
}

/// Pets the user has. Each enabled pet pulls in its exclusion phrases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetParams {
    #[serde(default)]
    pub cat: bool,
    #[serde(default)]
    pub dog: bool,
    #[serde(default)]
    pub other: bool,
}

/// Listing categories to reject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludeParams {
    #[serde(default)]
    pub basements: bool,
    #[serde(default)]
    pub shared: bool,
    #[serde(default)]
    pub swaps: bool,
    #[serde(default)]
    pub sublets: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    #[serde(default)]
    pub min: u32,
    #[serde(default = "defaults::max_price")]
    pub max: u32,
}

impl Default for PriceRange {
    fn default() -> Self {
        Self {
            min: 0,
            max: defaults::max_price(),
        }
    }
}

/// Where to search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default)]
    pub city: String,

    #[serde(default)]
    pub region: String,

    /// Share URL of a drawn search area; carries the `circles=` parameter
    #[serde(default)]
    pub map_developers_url: String,
}

impl LocationConfig {
    /// Decode the configured search area.
    pub fn search_area(&self) -> Result<Vec<Circle>> {
        geofence::decode_url(&self.map_developers_url)
    }
}

/// Optional features.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptionsConfig {
    /// Addresses to compute commute summaries to
    #[serde(default)]
    pub commute_destinations: Vec<String>,

    /// Skip every geocoding and distance-matrix call
    #[serde(default)]
    pub disable_google_maps_features: bool,
}

/// Durable store locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root data directory. `None` defers to the environment or default.
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Name of this run; namespaces private stores
    #[serde(default = "defaults::run_name")]
    pub run_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            run_name: defaults::run_name(),
        }
    }
}

/// Geocoding HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoConfig {
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `None` defers to the environment or default
    #[serde(default)]
    pub level: Option<String>,
}

mod defaults {
    pub fn max_price() -> u32 {
        u32::MAX
    }
    pub fn run_name() -> String {
        "default".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; roomscout/0.1)".into()
    }
    pub fn timeout() -> u64 {
        15
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AREA_URL: &str = "https://www.mapdevelopers.com/draw-circle-tool.php?circles=%5B%5B5000%2C%2245.5%22%2C%22-73.6%22%5D%5D";

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.search.location.map_developers_url = AREA_URL.to_string();
        config
    }

    #[test]
    fn validate_accepts_minimal_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_inverted_price_range() {
        let mut config = valid_config();
        config.search.params.price = PriceRange { min: 2000, max: 1000 };
        assert!(matches!(config.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn validate_rejects_missing_search_area() {
        let config = Config::default();
        assert!(matches!(
            config.validate(),
            Err(AppError::MalformedGeofence(_))
        ));
    }

    #[test]
    fn validate_rejects_run_name_outside_private_scope() {
        for name in ["common", "..", "../elsewhere", "a/b", "a\\b", " "] {
            let mut config = valid_config();
            config.storage.run_name = name.to_string();
            assert!(
                matches!(config.validate(), Err(AppError::Validation(_))),
                "accepted {name:?}"
            );
        }

        let mut config = valid_config();
        config.storage.run_name = "plateau-2br".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_regex() {
        let mut config = valid_config();
        config.search.blacklist_regex = vec!["(basement".to_string()];
        match config.validate() {
            Err(AppError::InvalidRegex { pattern, .. }) => assert_eq!(pattern, "(basement"),
            other => panic!("expected InvalidRegex, got {other:?}"),
        }
    }

    #[test]
    fn parses_toml_with_defaults() {
        let toml = r#"
            [search]
            blacklist = ["Basement"]

            [search.params]
            pets = { cat = true }
            exclude = { shared = true }
            price = { min = 900, max = 1800 }

            [search.location]
            city = "Montréal"
            region = "QC"
            map_developers_url = "https://www.mapdevelopers.com/draw-circle-tool.php?circles=%5B%5B2000%2C%2245.6%22%2C%22-73.5%22%5D%5D"

            [options]
            commute_destinations = ["McGill University"]
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.search.params.pets.cat);
        assert!(!config.search.params.pets.dog);
        assert!(config.search.params.exclude.shared);
        assert_eq!(config.search.params.price.max, 1800);
        assert_eq!(config.storage.run_name, "default");
        assert_eq!(config.geo.timeout_secs, 15);
        assert!(config.validate().is_ok());
    }
}

//! Coordinate and search-area circle value types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A WGS84 point.
///
/// Equality is exact on both fields, which is what cache keys need.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Raw `"lat,lon"` form used as a cache key and as a commute origin.
    pub fn cache_key(&self) -> String {
        format!("{},{}", self.lat, self.lon)
    }

    /// Parse the raw `"lat,lon"` form.
    pub fn parse(raw: &str) -> Option<Self> {
        let (lat, lon) = raw.split_once(',')?;
        let lat = lat.trim().parse::<f64>().ok()?;
        let lon = lon.trim().parse::<f64>().ok()?;
        (lat.is_finite() && lon.is_finite()).then(|| Self::new(lat, lon))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.lat, self.lon)
    }
}

/// One disk of a search area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Coordinate,
    pub radius_km: f64,
}

impl Circle {
    pub fn new(lat: f64, lon: f64, radius_km: f64) -> Self {
        Self {
            center: Coordinate::new(lat, lon),
            radius_km,
        }
    }
}

impl fmt::Display for Circle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.3},{:.3},{:.3}km",
            self.center.lat, self.center.lon, self.radius_km
        )
    }
}

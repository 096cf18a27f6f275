//! Geographic helpers: search-area geometry, external lookups, and the
//! persistent lookup cache.

pub mod enrich;
pub mod geofence;
pub mod provider;

pub use enrich::{GeoEnrichmentCache, GeoTable};
pub use geofence::{contains, decode_param, decode_url, haversine_km};
pub use provider::{GeoProvider, GoogleMapsProvider, ReverseGeocode};

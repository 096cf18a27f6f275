// src/models/mod.rs

//! Domain models for the listing pipeline.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod commute;
mod config;
mod geo;
mod listing;

// Re-export all public types
pub use commute::{CommuteSummary, TravelMode, UNAVAILABLE, abbreviate_duration};
pub use config::{
    Config, ExcludeParams, GeoConfig, LocationConfig, LoggingConfig, OptionsConfig, PetParams,
    PriceRange, SearchConfig, SearchParams, StorageConfig,
};
pub use geo::{Circle, Coordinate};
pub use listing::{Computed, Listing, LocationLink, Platform, ReasonKind, seen_key};

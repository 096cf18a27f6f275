//! Utility functions and helpers.

pub mod http;
pub mod url;

pub use http::create_client;
pub use url::{directions_url, map_search_url};

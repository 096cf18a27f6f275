// src/utils/url.rs

//! Map link builders.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::models::TravelMode;

const MAP_SEARCH_BASE: &str = "https://www.google.com/maps/search/?api=1&query=";
const DIRECTIONS_BASE: &str = "https://www.google.com/maps/dir/?api=1";

/// Characters left as-is, matching `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a single query component.
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Map search link for an address or `"lat,lon"` query.
pub fn map_search_url(query: &str) -> String {
    format!("{MAP_SEARCH_BASE}{}", encode_component(query))
}

/// Directions link between two places.
pub fn directions_url(origin: &str, destination: &str, mode: Option<TravelMode>) -> String {
    let mut url = format!(
        "{DIRECTIONS_BASE}&origin={}&destination={}",
        encode_component(origin),
        encode_component(destination)
    );
    if let Some(mode) = mode {
        url.push_str("&travelmode=");
        url.push_str(mode.as_str());
    }
    url
}

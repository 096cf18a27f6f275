//! Search-area codec.
//!
//! A search area is drawn in an external map tool and shared as a URL whose
//! `circles` query parameter holds a percent-encoded JSON array of
//! `[radiusMeters, lat, lon]` tuples (the numbers are usually strings).
//! Membership is the union of the decoded disks.

use percent_encoding::percent_decode_str;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{Circle, Coordinate};

/// Mean Earth radius used by the haversine formula.
const EARTH_RADIUS_KM: f64 = 6371.0;

const CIRCLES_PARAM: &str = "circles";

/// Extract and decode the `circles` parameter of a share URL.
pub fn decode_url(share_url: &str) -> Result<Vec<Circle>> {
    let query = share_url
        .split_once('?')
        .map(|(_, q)| q.split('#').next().unwrap_or(q))
        .unwrap_or("");

    let raw = query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == CIRCLES_PARAM)
        .map(|(_, value)| value)
        .ok_or_else(|| {
            AppError::malformed_geofence(format!("no '{CIRCLES_PARAM}' parameter in URL"))
        })?;

    decode_param(raw)
}

/// Decode a raw `circles` parameter value into circles with radii in km.
///
/// Tuples that do not parse are dropped with a warning; the call only fails
/// when nothing usable remains.
pub fn decode_param(encoded: &str) -> Result<Vec<Circle>> {
    if encoded.trim().is_empty() {
        return Err(AppError::malformed_geofence("empty parameter"));
    }

    let decoded = percent_decode_str(encoded)
        .decode_utf8()
        .map_err(|e| AppError::malformed_geofence(format!("not UTF-8 after decoding: {e}")))?;

    let tuples: Vec<Value> = serde_json::from_str(&decoded)
        .map_err(|e| AppError::malformed_geofence(format!("not a JSON array: {e}")))?;

    let total = tuples.len();
    let circles: Vec<Circle> = tuples
        .iter()
        .enumerate()
        .filter_map(|(i, tuple)| match parse_tuple(tuple) {
            Some(circle) => Some(circle),
            None => {
                log::warn!("Dropping unparseable circle #{i}: {tuple}");
                None
            }
        })
        .collect();

    if circles.is_empty() {
        return Err(AppError::malformed_geofence(format!(
            "none of {total} circle(s) could be parsed"
        )));
    }

    Ok(circles)
}

fn parse_tuple(tuple: &Value) -> Option<Circle> {
    // Share URLs may append style fields after the three numbers.
    let [radius, lat, lon, ..] = tuple.as_array()?.as_slice() else {
        return None;
    };
    let radius_m = number(radius)?;
    let lat = number(lat)?;
    let lon = number(lon)?;
    if radius_m < 0.0 || !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return None;
    }
    Some(Circle::new(lat, lon, radius_m / 1000.0))
}

fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Great-circle distance in kilometers.
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// First circle containing the point, if any.
pub fn contains(circles: &[Circle], point: Coordinate) -> Option<&Circle> {
    let hit = circles
        .iter()
        .find(|c| haversine_km(c.center, point) <= c.radius_km);

    log::trace!(
        "{point} is {}",
        match hit {
            Some(c) => format!("within {c}"),
            None => format!("not within any of {} circle(s)", circles.len()),
        }
    );
    hit
}

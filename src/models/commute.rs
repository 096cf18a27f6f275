//! Travel modes and per-mode commute summaries.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Placeholder stored for a mode whose lookup failed.
pub const UNAVAILABLE: &str = "unavailable";

/// Travel modes queried for every (origin, destination) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Transit,
    Bicycling,
    Driving,
    Walking,
}

impl TravelMode {
    pub const ALL: [TravelMode; 4] = [
        TravelMode::Transit,
        TravelMode::Bicycling,
        TravelMode::Driving,
        TravelMode::Walking,
    ];

    /// Value of the distance-matrix `mode` parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Transit => "transit",
            TravelMode::Bicycling => "bicycling",
            TravelMode::Driving => "driving",
            TravelMode::Walking => "walking",
        }
    }

    fn short(&self) -> &'static str {
        match self {
            TravelMode::Transit => "transit",
            TravelMode::Bicycling => "bike",
            TravelMode::Driving => "car",
            TravelMode::Walking => "walk",
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Duration text per travel mode. A complete summary has every mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommuteSummary(pub BTreeMap<TravelMode, String>);

impl CommuteSummary {
    pub fn get(&self, mode: TravelMode) -> Option<&str> {
        self.0.get(&mode).map(String::as_str)
    }

    /// True when every mode has an entry.
    pub fn is_complete(&self) -> bool {
        TravelMode::ALL.iter().all(|m| self.0.contains_key(m))
    }

    /// Modes that resolved to an actual duration.
    pub fn available_count(&self) -> usize {
        self.0.values().filter(|v| v.as_str() != UNAVAILABLE).count()
    }

    /// One-line form, e.g. `transit 25m  bike 18m  car 9m  walk 1h2m`.
    pub fn one_line(&self) -> String {
        TravelMode::ALL
            .iter()
            .map(|mode| {
                let text = self.get(*mode).unwrap_or(UNAVAILABLE);
                format!("{} {}", mode.short(), abbreviate_duration(text))
            })
            .collect::<Vec<_>>()
            .join("  ")
    }
}

/// Compress distance-matrix duration text: `"1 hour 5 mins"` becomes `"1h5m"`.
pub fn abbreviate_duration(input: &str) -> String {
    let compact: String = input.split_whitespace().collect();
    let mut out = String::with_capacity(compact.len());
    let lower = compact.to_lowercase();
    let mut rest = lower.as_str();

    while let Some(ch) = rest.chars().next() {
        if ch.is_ascii_alphabetic() {
            let word_len = rest
                .find(|c: char| !c.is_ascii_alphabetic())
                .unwrap_or(rest.len());
            let word = &rest[..word_len];
            out.push_str(match word {
                "hour" | "hours" | "h" => "h",
                "minute" | "minutes" | "min" | "mins" | "m" => "m",
                "second" | "seconds" | "sec" | "secs" | "s" => "s",
                other => other,
            });
            rest = &rest[word_len..];
        } else {
            out.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
    }
    out
}

// src/pipeline/area.rs

//! Search-area filter.

use crate::geo::geofence;
use crate::models::{Circle, Listing, ReasonKind};

/// Decoded search area applied to incoming listings.
#[derive(Debug, Clone)]
pub struct AreaFilter {
    circles: Vec<Circle>,
}

impl AreaFilter {
    pub fn new(circles: Vec<Circle>) -> Self {
        Self { circles }
    }

    pub fn circles(&self) -> &[Circle] {
        &self.circles
    }

    /// Whether a listing is inside the area. Listings without coordinates
    /// cannot be placed and are kept.
    pub fn admits(&self, listing: &Listing) -> bool {
        listing
            .coords
            .is_none_or(|point| geofence::contains(&self.circles, point).is_some())
    }

    /// Split off listings outside the area, tagging them with a reason.
    pub fn partition(&self, listings: Vec<Listing>) -> (Vec<Listing>, Vec<Listing>) {
        let (inside, mut outside): (Vec<_>, Vec<_>) =
            listings.into_iter().partition(|l| self.admits(l));

        for listing in &mut outside {
            log::info!("Listing {} is outside of the search area", listing.seen_key());
            if let Some(point) = listing.coords {
                let reason = format!(
                    "{point} is not within any of {} circle(s)",
                    self.circles.len()
                );
                listing.mark_invalid(ReasonKind::OutsideSearchArea, reason);
            }
        }
        (inside, outside)
    }
}

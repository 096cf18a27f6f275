//! Listing pipeline stages.
//!
//! - `area`: drop listings outside the search area
//! - `dedup`: hand each listing downstream once
//! - `validate`: blacklist rules
//! - `change`: rebuild derived state when search parameters change
//! - `process`: wire the stages together for one batch

pub mod area;
pub mod change;
pub mod dedup;
pub mod process;
pub mod validate;

pub use area::AreaFilter;
pub use change::ConfigChangeDetector;
pub use dedup::SeenListings;
pub use process::{BatchStats, ListingSource, PipelineContext, Presenter};
pub use validate::{Rule, RuleSet, RuleSource, ValidationEngine};

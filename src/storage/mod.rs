//! Durable persistence for configuration, dedup sets and API caches.
//!
//! - [`local`]: atomic whole-file writes and scoped data directories
//! - [`durable`]: lazily loaded, env-seeded, validated single-value stores

pub mod durable;
pub mod local;

// Re-export for convenience
pub use durable::{
    Codec, DurableStore, FnValidator, JsonCodec, StoreBuilder, TextCodec, Validator, WriteOptions,
};
pub use local::{Scope, StorageDirs};

// src/lib.rs

//! roomscout: rental listing filtering, deduplication and enrichment.

pub mod config;
pub mod error;
pub mod geo;
pub mod models;
pub mod pipeline;
pub mod storage;
pub mod utils;

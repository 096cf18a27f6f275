// src/error.rs

//! Unified error handling for the listing pipeline.

use std::fmt;

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// The search area parameter could not be turned into any circle
    #[error("Malformed geofence: {0}")]
    MalformedGeofence(String),

    /// A user-supplied blacklist pattern does not compile
    #[error("Invalid blacklist regex '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    /// A durable store write was rejected by its validator
    #[error("Invalid value for {label}")]
    StoreValidation { label: String },

    /// Nothing found in memory, on disk, or in the environment
    #[error("No value found: {label}.{}", env_instruction(.env_var))]
    MissingRequiredValue {
        label: String,
        env_var: Option<String>,
        /// Operator instruction; when present the process shuts down cleanly.
        instruction: Option<String>,
    },

    /// Geocoding or distance-matrix call failed
    #[error("Lookup error for {context}: {message}")]
    ExternalLookup { context: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

fn env_instruction(env_var: &Option<String>) -> String {
    match env_var {
        Some(name) => format!(
            " Paste the value into a .env file at the project root like so:\n{name}=_____________"
        ),
        None => String::new(),
    }
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a malformed geofence error.
    pub fn malformed_geofence(message: impl Into<String>) -> Self {
        Self::MalformedGeofence(message.into())
    }

    /// Create an invalid regex error.
    pub fn invalid_regex(pattern: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::InvalidRegex {
            pattern: pattern.into(),
            message: message.to_string(),
        }
    }

    /// Create an external lookup error with context.
    pub fn lookup(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::ExternalLookup {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Operator instruction attached to a missing value, if any.
    ///
    /// Callers print it and exit cleanly instead of treating the error as fatal.
    pub fn shutdown_instruction(&self) -> Option<&str> {
        match self {
            Self::MissingRequiredValue {
                instruction: Some(message),
                ..
            } => Some(message),
            _ => None,
        }
    }
}

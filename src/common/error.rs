//! Error types for the karma client
//!
//! There is no retry anywhere in this crate: fetch and protocol errors
//! propagate to whoever drives the client loop. Only the explicit
//! framework error-report path turns a failure into a server-visible
//! message.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the karma client
#[derive(Error, Debug)]
pub enum Error {
    // === Construction Errors ===
    #[error("Failed to parse endpoint URL '{0}'")]
    MalformedEndpoint(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Run Errors ===
    #[error("Failed to fetch manifest from {url}: {reason}")]
    ManifestFetch { url: String, reason: String },

    #[error("Failed to fetch asset {url}: {reason}")]
    AssetFetch { url: String, reason: String },

    #[error("Failed to execute asset {url}: {reason}")]
    AssetExecution { url: String, reason: String },

    #[error(
        "No test framework adapter installed. The start() hook must be \
         provided by a framework adapter (e.g. a jasmine or mocha bridge)"
    )]
    AdapterNotImplemented,

    // === Transport Errors ===
    #[error("Transport error: {0}")]
    Transport(String),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a manifest fetch error
    pub fn manifest_fetch(url: &str, reason: impl ToString) -> Self {
        Self::ManifestFetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an asset fetch error
    pub fn asset_fetch(url: &str, reason: impl ToString) -> Self {
        Self::AssetFetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an asset execution error
    pub fn asset_execution(url: &str, reason: impl ToString) -> Self {
        Self::AssetExecution {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

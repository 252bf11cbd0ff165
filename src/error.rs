//! Error types for glesys-ddns.

use thiserror::Error;

/// Result type alias for glesys-ddns.
pub type Result<T> = std::result::Result<T, DdnsError>;

/// DDNS error types.
#[derive(Error, Debug)]
pub enum DdnsError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The address to publish could not be determined.
    #[error("IP resolution failed: {0}")]
    Resolution(String),

    /// Network/HTTP error.
    #[error("Network error: {0}")]
    Network(String),

    /// The provider API answered with a non-OK status.
    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    /// The provider call budget for this run is spent.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Listing the records of a domain failed.
    #[error("Failed to list records for domain {domain}: {message}")]
    ProviderList { domain: String, message: String },

    /// Updating a single record failed.
    #[error("Failed to update record {record_id}: {message}")]
    ProviderUpdate { record_id: u64, message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for DdnsError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DdnsError::Timeout(e.to_string())
        } else {
            DdnsError::Network(e.to_string())
        }
    }
}

impl From<serde_yaml::Error> for DdnsError {
    fn from(e: serde_yaml::Error) -> Self {
        DdnsError::Config(e.to_string())
    }
}

impl From<toml::de::Error> for DdnsError {
    fn from(e: toml::de::Error) -> Self {
        DdnsError::Config(e.to_string())
    }
}

impl From<serde_json::Error> for DdnsError {
    fn from(e: serde_json::Error) -> Self {
        DdnsError::Serialization(e.to_string())
    }
}

//! Repo-Sync: keeps a catalog of bank-repossessed real-estate listings in sync
//!
//! This crate discovers listing links on several bank websites, reconciles them
//! against a persistent link registry, scrapes the detail pages that have not
//! been captured yet in bounded concurrent batches, and periodically re-validates
//! listings that the registry has flagged as stale.

pub mod config;
pub mod crawler;
pub mod model;
pub mod output;
pub mod registry;
pub mod sites;

use thiserror::Error;

/// Main error type for Repo-Sync operations
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Registry error: {0}")]
    Registry(#[from] registry::RegistryError),

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Worker task failed: {0}")]
    Task(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Unknown source id: {0}")]
    UnknownSource(String),
}

/// Result type alias for Repo-Sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{Image, LinkTarget, Record, ScrapeOutcome, SourceId, StaleLink};
pub use registry::{Registry, RegistryError};

//! Configuration module for Repo-Sync
//!
//! Loads, parses and validates the TOML file that describes the registry
//! connection, scraper tuning, request identity and the enabled sources.
//!
//! # Example
//!
//! ```no_run
//! use repo_sync::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("repo-sync.toml")).unwrap();
//! println!("Scraping in batches of {}", config.scraper.batch_size);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, HttpConfig, RegistryConfig, ScraperConfig, SourceEntry};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

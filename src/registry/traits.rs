//! Registry trait and error types
//!
//! The registry is the persistent store for links, records and images. The
//! pipeline only talks to it through this trait so the Directus client can be
//! swapped for the in-memory implementation in tests and dry runs.

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{LinkTarget, Record, SourceId, StaleLink};

/// Errors that can occur during registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{operation} failed with HTTP {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("Failed to decode registry response: {0}")]
    Decode(String),

    #[error("Registry unavailable: {0}")]
    Unavailable(String),
}

impl RegistryError {
    /// Whether a failed write may succeed if attempted again
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500,
            Self::Transport(_) | Self::Unavailable(_) => true,
            Self::GraphQl(_) | Self::Decode(_) => false,
        }
    }
}

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Trait for registry backend implementations
///
/// Reads that the pipeline needs an accurate view from (existing links,
/// unscraped links, stale links) return errors. Per-item writes report a
/// boolean instead so one failed item never aborts the run.
#[async_trait]
pub trait Registry: Send + Sync {
    // ===== Link Reconciliation =====

    /// Returns every link URL already registered for `source`
    async fn existing_links(&self, source: SourceId) -> RegistryResult<HashSet<String>>;

    /// Registers new links for `source` as unscraped
    ///
    /// # Arguments
    ///
    /// * `urls` - Links to register; an empty slice issues no request
    /// * `source` - Source the links were discovered on
    async fn add_links(&self, urls: &[String], source: SourceId) -> RegistryResult<()>;

    /// Returns registered links of `source` that have not been scraped yet
    async fn unscraped_links(&self, source: SourceId) -> RegistryResult<Vec<LinkTarget>>;

    // ===== Record Persistence =====

    /// Inserts a record and its images
    ///
    /// # Returns
    ///
    /// `true` when the record itself was stored. Image write failures are
    /// logged and do not change the result.
    async fn save_record(&self, record: &Record) -> bool;

    /// Flags a link as scraped
    async fn mark_scraped(&self, link_id: &str) -> bool;

    // ===== Stale Reprocessing =====

    /// Returns every link flagged stale, with its persisted record id and image URLs
    async fn stale_links(&self) -> RegistryResult<Vec<StaleLink>>;

    /// Clears the stale flag of a link
    async fn mark_fresh(&self, link_id: &str) -> bool;

    /// Updates a persisted record in place
    ///
    /// # Arguments
    ///
    /// * `record_id` - Id of the persisted record to overwrite
    /// * `record` - Freshly extracted data
    /// * `existing_image_urls` - Image URLs already stored; only images outside
    ///   this set are inserted, and nothing is deleted
    async fn update_record(
        &self,
        record_id: &str,
        record: &Record,
        existing_image_urls: &[String],
    ) -> bool;
}

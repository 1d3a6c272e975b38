//! Crawler module for the sync pipeline
//!
//! This module contains the pipeline stages, including:
//! - HTTP fetching with per-call timeouts and per-source cookies
//! - Link extraction helpers shared by the site parsers
//! - Catalog link discovery with pagination
//! - Reconciliation against the registry
//! - Bounded-concurrency batch scraping
//! - Stale-link reprocessing
//! - Overall run coordination

mod batch;
mod coordinator;
mod discovery;
mod extractor;
mod fetcher;
mod parser;
mod reconcile;
mod stale;

pub use batch::BatchRunner;
pub use coordinator::{stale_run_label, sync_run_label, Coordinator};
pub use discovery::{dedup_preserving_order, discover};
pub use extractor::{Extractor, ExtractorSet, SiteExtractor};
pub use fetcher::{build_http_client, cookie_header, fetch_page, FetchResult};
pub use parser::{extract_links, extract_next_link, resolve_link};
pub use reconcile::{reconcile, register_new_links};
pub use stale::StaleReprocessor;

//! Domain model shared by the pipeline
//!
//! # Components
//!
//! - `SourceId`: which bank website a listing belongs to
//! - `LinkTarget` / `StaleLink`: links handed out by the registry
//! - `Record`, `Image`, `Amenities`, `GeoPoint`: normalized listing data
//! - `ScrapeOutcome`: per-item result inside a scrape batch

mod link;
mod record;
mod source;

pub use link::{LinkTarget, ScrapeOutcome, StaleLink};
pub use record::{
    dedup_images, image_caption, new_images, truncate_chars, Amenities, GeoPoint, Image, Record,
    ACTIVE_STATUS, MAX_TEXT_LEN,
};
pub use source::SourceId;

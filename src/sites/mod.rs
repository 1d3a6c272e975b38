//! Per-source site strategies
//!
//! Every bank website differs in where its catalog lives, how it paginates and
//! how its detail pages are laid out, but the pipeline that drives them is the
//! same. A `Site` captures only the differences:
//!
//! - `entry_points`: catalog URLs to start discovery from
//! - `pagination`: how page N of an entry point is addressed
//! - `parse_catalog`: candidate links plus end-of-catalog markers for one page
//! - `parse_detail`: one detail page into a `Record`
//!
//! Network access never happens here; the crawler fetches and hands over HTML.

mod banco_general;
mod banco_nacional;
mod banesco;
mod caja_de_ahorros;
mod global_bank;
pub mod normalize;
mod scotiabank;

use std::sync::Arc;

use url::Url;

use crate::model::{LinkTarget, Record, SourceId};
use crate::Result;

pub use banco_general::BancoGeneral;
pub use banco_nacional::BancoNacional;
pub use banesco::Banesco;
pub use caja_de_ahorros::CajaDeAhorros;
pub use global_bank::GlobalBank;
pub use scotiabank::Scotiabank;

/// How consecutive catalog pages of one entry point are addressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    /// The entry point is the whole catalog
    Single,

    /// Page N lives at `{entry}page/{N}/`
    PathSegment,

    /// Page N adds `?{param}=N` to the entry point
    QueryParam(&'static str),

    /// Each page links to the next through a `rel="next"` control
    NextLink,
}

impl Pagination {
    /// Builds the URL of page `page` (1-based) for `entry`
    ///
    /// Page 1 is always the entry point itself. Returns None when the page
    /// cannot be addressed directly (single-page catalogs and next-link
    /// pagination beyond page 1).
    pub fn page_url(&self, entry: &Url, page: u32) -> Option<Url> {
        if page <= 1 {
            return Some(entry.clone());
        }

        match self {
            Self::Single | Self::NextLink => None,
            Self::PathSegment => entry.join(&format!("page/{}/", page)).ok(),
            Self::QueryParam(param) => {
                let mut url = entry.clone();
                url.query_pairs_mut().append_pair(param, &page.to_string());
                Some(url)
            }
        }
    }
}

/// What one catalog page yielded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogPage {
    /// Candidate detail links in document order
    pub links: Vec<String>,

    /// The site explicitly reported that there are no (more) results
    pub no_results: bool,

    /// Target of the "next page" control, for next-link pagination
    pub next_url: Option<String>,
}

/// Source-specific knowledge needed to discover and extract listings
pub trait Site: Send + Sync {
    /// Source this site feeds
    fn source(&self) -> SourceId;

    /// Catalog URLs discovery starts from, in order
    fn entry_points(&self) -> Vec<Url>;

    fn pagination(&self) -> Pagination;

    /// Parses one catalog page fetched from `page_url`
    fn parse_catalog(&self, html: &str, page_url: &Url) -> CatalogPage;

    /// Parses a detail page into a record owned by `target`
    ///
    /// Returns None when the page has no usable listing data.
    fn parse_detail(&self, _html: &str, _target: &LinkTarget) -> Option<Record> {
        None
    }

    /// Whether `parse_detail` is implemented for this source
    fn has_detail_extractor(&self) -> bool {
        true
    }
}

/// Builds the site strategy for `source`
///
/// # Arguments
///
/// * `source` - Source to build
/// * `base_override` - Replacement origin for the site (from `base-url` in the config)
///
/// # Returns
///
/// * `Ok(Arc<dyn Site>)` - The strategy
/// * `Err(SyncError::UrlParse)` - The base URL is not a valid URL
pub fn site_for(source: SourceId, base_override: Option<&str>) -> Result<Arc<dyn Site>> {
    let base = |default: &str| -> Result<Url> { Ok(Url::parse(base_override.unwrap_or(default))?) };

    let site: Arc<dyn Site> = match source {
        SourceId::Banesco => Arc::new(Banesco::new(base(banesco::DEFAULT_BASE)?)),
        SourceId::BancoGeneral => Arc::new(BancoGeneral::new(base(banco_general::DEFAULT_BASE)?)),
        SourceId::BancoNacional => Arc::new(BancoNacional::new(base(banco_nacional::DEFAULT_BASE)?)),
        SourceId::CajaDeAhorros => Arc::new(CajaDeAhorros::new(base(caja_de_ahorros::DEFAULT_BASE)?)),
        SourceId::Scotiabank => Arc::new(Scotiabank::new(base(scotiabank::DEFAULT_BASE)?)),
        SourceId::GlobalBank => Arc::new(GlobalBank::new(base(global_bank::DEFAULT_BASE)?)),
    };

    Ok(site)
}

/// Joins a catalog path onto a site origin, tolerating a missing trailing slash
pub(crate) fn join_path(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.set_path(path);
    url
}

/// Link-level types passed between the registry and the pipeline
use crate::model::Record;

/// A registered link that still needs its detail page scraped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    /// Registry id of the link
    pub id: String,

    /// Detail page URL
    pub url: String,
}

impl LinkTarget {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }
}

/// A previously scraped link the registry has flagged for re-validation
///
/// Fields come straight from the registry and may be missing; the stale loop
/// validates them per item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaleLink {
    pub link_id: Option<String>,
    pub url: Option<String>,

    /// Source tag as stored by the registry
    pub source: String,

    /// Id of the record persisted for this link, if any
    pub record_id: Option<String>,

    /// Image URLs already stored for the record
    pub image_urls: Vec<String>,
}

/// Result of one scrape attempt inside a batch
#[derive(Debug, Clone)]
pub enum ScrapeOutcome {
    /// The extractor produced a record
    Success(Record),

    /// The page was fetched but yielded no usable data
    Empty,

    /// The attempt failed; the message is logged and the link stays unscraped
    Failure(String),
}

impl ScrapeOutcome {
    /// Converts an extractor result into an outcome
    pub fn from_result(result: crate::Result<Option<Record>>) -> Self {
        match result {
            Ok(Some(record)) => Self::Success(record),
            Ok(None) => Self::Empty,
            Err(e) => Self::Failure(e.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Differential reconciliation of discovered links against the registry
use std::collections::HashSet;

use crate::model::SourceId;
use crate::registry::Registry;
use crate::Result;

/// Returns the discovered links that are not registered yet
///
/// Discovery order is kept and repeats are dropped, so the result is exactly
/// `discovered - existing`.
pub fn reconcile(discovered: &[String], existing: &HashSet<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    discovered
        .iter()
        .filter(|link| !existing.contains(*link) && seen.insert(link.as_str()))
        .cloned()
        .collect()
}

/// Registers the links of `source` the registry does not know yet
///
/// A failed existing-links lookup aborts the sync for this source: without an
/// accurate existing set nothing can safely be registered. When every link is
/// known no write is issued.
///
/// # Returns
///
/// The newly registered links
pub async fn register_new_links(
    registry: &dyn Registry,
    source: SourceId,
    discovered: &[String],
) -> Result<Vec<String>> {
    let existing = registry.existing_links(source).await?;
    let new_links = reconcile(discovered, &existing);

    tracing::info!(
        "{}: {} discovered, {} already registered, {} new",
        source,
        discovered.len(),
        existing.len(),
        new_links.len()
    );

    if !new_links.is_empty() {
        registry.add_links(&new_links, source).await?;
    }

    Ok(new_links)
}

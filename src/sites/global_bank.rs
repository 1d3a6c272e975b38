/// Global Bank (catalog with rel="next" pagination, discovery only)
use scraper::Html;
use url::Url;

use crate::crawler::{extract_links, extract_next_link};
use crate::model::SourceId;
use crate::sites::normalize::root;
use crate::sites::{join_path, CatalogPage, Pagination, Site};

pub(crate) const DEFAULT_BASE: &str = "https://www.globalbank.com.pa";

const CATALOG_PATH: &str = "/bienes-reposeidos/inmueble/catalogo";

pub struct GlobalBank {
    base: Url,
}

impl GlobalBank {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    fn catalog_url(&self) -> Url {
        join_path(&self.base, CATALOG_PATH)
    }
}

impl Site for GlobalBank {
    fn source(&self) -> SourceId {
        SourceId::GlobalBank
    }

    fn entry_points(&self) -> Vec<Url> {
        vec![self.catalog_url()]
    }

    fn pagination(&self) -> Pagination {
        Pagination::NextLink
    }

    fn parse_catalog(&self, html: &str, page_url: &Url) -> CatalogPage {
        let document = Html::parse_document(html);
        let scope = root(&document);

        let listing_prefix = format!("{}/", CATALOG_PATH);
        let links = extract_links(scope, "a[href]", page_url)
            .into_iter()
            .filter(|link| {
                Url::parse(link)
                    .map(|url| url.path().starts_with(&listing_prefix))
                    .unwrap_or(false)
            })
            .collect();

        // The next control carries only a query string, relative to the catalog itself
        let next_url = extract_next_link(scope, &self.catalog_url());

        CatalogPage {
            links,
            no_results: false,
            next_url,
        }
    }

    fn has_detail_extractor(&self) -> bool {
        false
    }
}

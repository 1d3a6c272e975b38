/// Banesco Panamá (WooCommerce catalog)
use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;
use url::Url;

use crate::crawler::extract_links;
use crate::model::{GeoPoint, LinkTarget, Record, SourceId};
use crate::sites::normalize::{
    attr, element_text, parse_amount, parse_coordinate, parse_first_number,
    parse_hectares_and_m2, parse_int, root, select_all, select_first, select_text,
};
use crate::sites::{join_path, CatalogPage, Pagination, Site};

pub(crate) const DEFAULT_BASE: &str = "https://www.banesco.com.pa";

static LATLNG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"new google\.maps\.LatLng\(([^)]+)\)").expect("LATLNG_RE: hardcoded regex is valid")
});

static NEGATIVE_SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*?),\s*(-.*)$").expect("NEGATIVE_SPLIT_RE: hardcoded regex is valid")
});

pub struct Banesco {
    base: Url,
}

impl Banesco {
    pub fn new(base: Url) -> Self {
        Self { base }
    }
}

impl Site for Banesco {
    fn source(&self) -> SourceId {
        SourceId::Banesco
    }

    fn entry_points(&self) -> Vec<Url> {
        vec![join_path(&self.base, "/banesco-bienes/")]
    }

    fn pagination(&self) -> Pagination {
        Pagination::PathSegment
    }

    fn parse_catalog(&self, html: &str, page_url: &Url) -> CatalogPage {
        let document = Html::parse_document(html);
        let scope = root(&document);

        if select_first(scope, ".error-404").is_some() {
            return CatalogPage {
                no_results: true,
                ..CatalogPage::default()
            };
        }

        CatalogPage {
            links: extract_links(scope, "li.product a.woocommerce-LoopProduct-link", page_url),
            ..CatalogPage::default()
        }
    }

    fn parse_detail(&self, html: &str, target: &LinkTarget) -> Option<Record> {
        let document = Html::parse_document(html);
        let scope = root(&document);
        let mut record = Record::new(target.id.clone());

        record.title = select_text(scope, "h1.product_title.entry-title");

        if let Some(price) = select_text(scope, "p.price .woocommerce-Price-amount.amount")
            .as_deref()
            .and_then(parse_amount)
        {
            record.price = Some(price);
            record.currency = Some("PAB".to_string());
        }

        record.property_id = select_text(scope, ".sku_wrapper .sku");
        record.property_type = select_text(scope, ".posted_in a");
        if let Some(address) = select_text(scope, ".item-location-oneline") {
            record.set_address(&address);
        }

        let description: Vec<String> = [
            "#tab-custom_tab_item_benefits",
            "#tab-custom_tab_property_location",
        ]
        .iter()
        .filter_map(|css| select_text(scope, css))
        .collect();
        if !description.is_empty() {
            record.description = Some(description.join(", "));
        }

        for item in select_all(scope, ".item-metadata span") {
            let Some(icon) = select_first(item, "i") else {
                continue;
            };
            let classes: Vec<&str> = icon.value().classes().collect();
            let text = element_text(item);

            if classes.contains(&"fa-ruler-combined") {
                if text.to_lowercase().contains("has") {
                    let (hectares, total) = parse_hectares_and_m2(&text);
                    record.hectares = hectares;
                    if total.is_some() {
                        record.area_m2 = total;
                    }
                } else {
                    record.built_area = parse_first_number(&text);
                }
            } else if classes.contains(&"fa-arrows-up-down-left-right") {
                record.area_m2 = parse_first_number(&text);
            } else if classes.contains(&"fa-bed") {
                record.bedrooms = parse_int(&text);
            } else if classes.contains(&"fa-bath") {
                record.bathrooms = parse_int(&text);
            } else if classes.contains(&"fa-square-parking") {
                record.parking = parse_int(&text);
            }
        }

        record.location = select_all(scope, "script")
            .into_iter()
            .map(|script| script.text().collect::<String>())
            .find_map(|content| parse_latlng(&content));
        if let Some(point) = record.location {
            if !point.within_panama() {
                tracing::warn!(
                    "Coordinates ({}, {}) for {} are outside Panama, dropping them",
                    point.latitude,
                    point.longitude,
                    target.url
                );
                record.location = None;
            }
        }

        for anchor in select_all(scope, ".wpgs-for .woocommerce-product-gallery__image a") {
            if let Some(href) = attr(anchor, "href") {
                record.push_image(href);
            }
        }

        if record.is_blank() {
            None
        } else {
            Some(record)
        }
    }
}

/// Parses the `new google.maps.LatLng(lat, lon)` call embedded in the map script
///
/// Some listings write decimal commas (`8,98, -79,52`), so the pair is split at
/// the comma that precedes the negative longitude first.
fn parse_latlng(script: &str) -> Option<GeoPoint> {
    let args = LATLNG_RE.captures(script)?.get(1)?.as_str();

    let (lat, lon) = match NEGATIVE_SPLIT_RE.captures(args) {
        Some(caps) => (caps.get(1)?.as_str(), caps.get(2)?.as_str()),
        None => {
            let mut parts = args.split(',');
            let pair = (parts.next()?, parts.next()?);
            if parts.next().is_some() {
                return None;
            }
            pair
        }
    };

    Some(GeoPoint::new(parse_coordinate(lat)?, parse_coordinate(lon)?))
}

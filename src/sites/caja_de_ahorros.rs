/// Caja de Ahorros (single catalog page backed by an inline JSON array)
use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;
use serde::Deserialize;
use url::Url;

use crate::crawler::resolve_link;
use crate::model::{GeoPoint, LinkTarget, Record, SourceId};
use crate::sites::normalize::{
    attr, element_text, fold_accents, parse_amount, parse_first_number, parse_rounded_int, root,
    select_all, select_first, select_text,
};
use crate::sites::{join_path, CatalogPage, Pagination, Site};

pub(crate) const DEFAULT_BASE: &str = "https://www.cajadeahorros.com.pa";

static ALL_PROPERTIES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)var allProperties = (\[.*?\]);")
        .expect("ALL_PROPERTIES_RE: hardcoded regex is valid")
});

static PROPERTY_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^F\.\s*(\d+)").expect("PROPERTY_ID_RE: hardcoded regex is valid")
});

static MAP_COORDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"q=([-\d.]+),([-\d.]+)").expect("MAP_COORDS_RE: hardcoded regex is valid")
});

/// Amenity keyword (accent-folded) to amenity column; parking is a count, handled apart
const AMENITIES: &[(&str, &str)] = &[
    ("terraza", "terrace"),
    ("lavanderia", "laundry"),
    ("area social", "social_area"),
    ("seguridad", "security"),
    ("balcon", "balcony"),
    ("piscina", "swimming_pool"),
];

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    url: Option<String>,
}

pub struct CajaDeAhorros {
    base: Url,
}

impl CajaDeAhorros {
    pub fn new(base: Url) -> Self {
        Self { base }
    }
}

impl Site for CajaDeAhorros {
    fn source(&self) -> SourceId {
        SourceId::CajaDeAhorros
    }

    fn entry_points(&self) -> Vec<Url> {
        vec![join_path(&self.base, "/propiedades/bienes-reposeidos/")]
    }

    fn pagination(&self) -> Pagination {
        Pagination::Single
    }

    fn parse_catalog(&self, html: &str, page_url: &Url) -> CatalogPage {
        let document = Html::parse_document(html);

        let Some(json) = select_all(root(&document), "script")
            .into_iter()
            .map(|script| script.text().collect::<String>())
            .find_map(|content| {
                ALL_PROPERTIES_RE
                    .captures(&content)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().to_string())
            })
        else {
            tracing::warn!("No allProperties array found on {}", page_url);
            return CatalogPage::default();
        };

        let entries: Vec<CatalogEntry> = match serde_json::from_str(&json) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("Failed to parse allProperties JSON on {}: {}", page_url, e);
                return CatalogPage::default();
            }
        };

        CatalogPage {
            links: entries
                .into_iter()
                .filter_map(|entry| entry.url)
                .filter_map(|url| resolve_link(&url, page_url))
                .collect(),
            ..CatalogPage::default()
        }
    }

    fn parse_detail(&self, html: &str, target: &LinkTarget) -> Option<Record> {
        let document = Html::parse_document(html);
        let scope = root(&document);
        let mut record = Record::new(target.id.clone());

        if let Some(title) = select_text(scope, ".property-title h1.semibold") {
            record.property_id = PROPERTY_ID_RE
                .captures(&title)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string());
            record.title = Some(title);
        }

        if let Some(address) = select_text(scope, ".entry-content p") {
            record.set_address(&address);
        }

        if let Some(price) = select_text(scope, ".property-price")
            .as_deref()
            .and_then(parse_amount)
        {
            record.price = Some(price);
            record.currency = Some("PAB".to_string());
        }

        for item in select_all(scope, ".property-info ul li") {
            let text = element_text(item);
            if let Some((label, value)) = text.split_once(':') {
                let value = value.trim();
                if !value.is_empty() {
                    record
                        .additional_attrs
                        .insert(fold_accents(label.trim()), value.to_string());
                }
            } else if !text.is_empty() {
                record.additional_attrs.insert(text.clone(), "true".to_string());
            }
        }

        let details = &record.additional_attrs;
        let property_type = details.get("tipo de propiedad").cloned();
        let built_area = details.get("area de construccion").and_then(|v| parse_first_number(v));
        let area_m2 = details.get("metros del terreno").and_then(|v| parse_first_number(v));
        let hectares = details.get("hectareas").and_then(|v| parse_first_number(v));
        let bedrooms = details.get("habitaciones").and_then(|v| v.trim().parse().ok());
        let bathrooms = details.get("banos").and_then(|v| parse_rounded_int(v));
        record.property_type = property_type;
        record.built_area = built_area;
        record.area_m2 = area_m2;
        record.hectares = hectares;
        record.bedrooms = bedrooms;
        record.bathrooms = bathrooms;

        record.location = select_first(scope, ".property-map iframe")
            .and_then(|iframe| attr(iframe, "src"))
            .and_then(|src| {
                let caps = MAP_COORDS_RE.captures(&src)?;
                let lat = caps.get(1)?.as_str().parse().ok()?;
                let lon = caps.get(2)?.as_str().parse().ok()?;
                Some(GeoPoint::new(lat, lon))
            });

        let amenities = amenity_items(scope);
        for amenity in &amenities {
            let folded = fold_accents(amenity);
            for (keyword, column) in AMENITIES {
                if folded.contains(keyword) {
                    record.amenities.set(column);
                }
            }
            if folded.contains("estacionamiento") {
                record.parking = Some(1);
            }
            if let Some((label, value)) = amenity.split_once(':') {
                let value = value.trim();
                if !value.is_empty() {
                    record
                        .additional_attrs
                        .insert(label.trim().to_string(), value.to_string());
                }
            }
        }
        record
            .additional_attrs
            .insert("Amenidades".to_string(), amenities.join(", "));

        for img in select_all(scope, ".image-gallery img") {
            if let Some(src) = attr(img, "src") {
                record.push_image(src);
            }
        }

        if record.title.is_none() && record.address.is_none() && record.price.is_none() {
            None
        } else {
            Some(record)
        }
    }
}

/// Items of the list that follows the "Amenidades" heading
fn amenity_items(scope: scraper::ElementRef<'_>) -> Vec<String> {
    let Some(heading) = select_all(scope, "h3")
        .into_iter()
        .find(|h3| element_text(*h3).contains("Amenidades"))
    else {
        return Vec::new();
    };

    heading
        .next_siblings()
        .filter_map(scraper::ElementRef::wrap)
        .next()
        .filter(|sibling| sibling.value().name() == "ul")
        .map(|list| {
            select_all(list, "li")
                .into_iter()
                .map(element_text)
                .filter(|text| !text.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

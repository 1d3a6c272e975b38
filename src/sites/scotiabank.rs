/// Scotiabank Panamá (three category pages, AEM detail pages)
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};
use serde::Deserialize;
use url::Url;

use crate::crawler::{extract_links, resolve_link};
use crate::model::{LinkTarget, Record, SourceId};
use crate::sites::normalize::{
    attr, element_text, fold_accents, parse_amount, root, select_all, select_first, select_text,
};
use crate::sites::{join_path, CatalogPage, Pagination, Site};

pub(crate) const DEFAULT_BASE: &str = "https://pa.scotiabank.com";

const CATEGORY_PATHS: &[&str] = &[
    "/es/banca-personal/prestamos/propiedades-en-venta/apartamentos-stock.html",
    "/es/banca-personal/prestamos/propiedades-en-venta/casas-y-residencias.html",
    "/es/banca-personal/prestamos/propiedades-en-venta/lotes-y-fincas.html",
];

/// Description keyword (accent-folded) to amenity column
const AMENITIES: &[(&str, &str)] = &[
    ("sala", "living_room"),
    ("comedor", "dining_room"),
    ("cocina", "kitchen"),
    ("lavanderia", "laundry"),
    ("terraza", "terrace"),
    ("balcon", "balcony"),
    ("deposito", "deposit"),
    ("cuarto de servicio", "utility_room"),
    ("estudio", "studio"),
];

static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$[\d,]+\.?\d*").expect("PRICE_RE: hardcoded regex is valid")
});

static DESCRIPTION_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)descripci(ó|o)n\s*:").expect("DESCRIPTION_LABEL_RE: hardcoded regex is valid")
});

static ADDRESS_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)direcci(ó|o)n:").expect("ADDRESS_LABEL_RE: hardcoded regex is valid")
});

#[derive(Debug, Deserialize)]
struct GalleryData {
    #[serde(default)]
    images: Vec<GalleryImage>,
}

#[derive(Debug, Deserialize)]
struct GalleryImage {
    #[serde(rename = "imagePath", default)]
    image_path: Option<String>,
}

pub struct Scotiabank {
    base: Url,
}

impl Scotiabank {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    fn gallery_images(&self, scope: ElementRef<'_>) -> Vec<String> {
        let from_json: Vec<String> = select_first(scope, ".bns-image-gallery")
            .and_then(|gallery| attr(gallery, "data-bns-json-data"))
            .and_then(|json| serde_json::from_str::<GalleryData>(&json).ok())
            .map(|data| {
                data.images
                    .into_iter()
                    .filter_map(|image| image.image_path)
                    .filter_map(|path| resolve_link(&path, &self.base))
                    .collect()
            })
            .unwrap_or_default();

        if !from_json.is_empty() {
            return from_json;
        }

        select_all(scope, ".image-gallery img.gallery-image-item")
            .into_iter()
            .filter_map(|img| attr(img, "src"))
            .filter_map(|src| resolve_link(&src, &self.base))
            .collect()
    }
}

impl Site for Scotiabank {
    fn source(&self) -> SourceId {
        SourceId::Scotiabank
    }

    fn entry_points(&self) -> Vec<Url> {
        CATEGORY_PATHS
            .iter()
            .map(|path| join_path(&self.base, path))
            .collect()
    }

    fn pagination(&self) -> Pagination {
        Pagination::Single
    }

    fn parse_catalog(&self, html: &str, page_url: &Url) -> CatalogPage {
        let document = Html::parse_document(html);
        CatalogPage {
            links: extract_links(
                root(&document),
                r#"a.standalone-link.button_color_blue[href*="/propiedades-en-venta/"]"#,
                page_url,
            ),
            ..CatalogPage::default()
        }
    }

    fn parse_detail(&self, html: &str, target: &LinkTarget) -> Option<Record> {
        let document = Html::parse_document(html);
        let scope = root(&document);
        let mut record = Record::new(target.id.clone());

        let title = select_text(scope, ".bns--title.title--h1 h1");
        record.title = title.clone();
        record.property_id = select_text(scope, ".sub-heading p");

        record.price = select_text(scope, ".bns--title.title--h2 h2")
            .and_then(|text| PRICE_RE.find(&text).map(|m| m.as_str().to_string()))
            .and_then(|price| parse_amount(&price));

        record.description = labelled_text(scope, &DESCRIPTION_LABEL_RE, true);

        if let Some(address) = labelled_text(scope, &ADDRESS_LABEL_RE, false).or_else(|| title.clone()) {
            record.set_address(&address);
        }

        for cell in select_all(scope, "._row .col-md-4.col-lg-2") {
            let Some(paragraph) = select_first(cell, ".cmp-text p") else {
                continue;
            };
            let Some(value) = select_text(paragraph, "b") else {
                continue;
            };
            let label = element_text(paragraph);
            let number = value.replace(',', "");

            if label.contains("Recámaras:") {
                record.bedrooms = number.parse().ok();
            } else if label.contains("Baños:") {
                record.bathrooms = number.parse().ok();
            } else if label.contains("Parqueo:") {
                record.parking = number.parse().ok();
            } else if label.contains("Terreno M") {
                record.area_m2 = number.parse().ok();
            } else if label.contains("Construcción M") {
                record.built_area = number.parse().ok();
            }
        }

        if let Some(description) = &record.description {
            let folded = fold_accents(description);
            for (keyword, column) in AMENITIES {
                if folded.contains(keyword) {
                    record.amenities.set(column);
                }
            }
        }

        for image in self.gallery_images(scope) {
            record.push_image(image);
        }

        record.property_type = Some(property_type_from_url(&target.url).to_string());

        if let Some(title) = title {
            record.additional_attrs.insert("title".to_string(), title);
        }
        if let Some(rate) = select_text(scope, ".bns--title.title--h3 h3") {
            if rate.contains("Tasa desde:") {
                record
                    .additional_attrs
                    .insert("financing_rate".to_string(), rate);
            }
        }

        if record.title.is_none() && record.price.is_none() && record.images.is_empty() {
            None
        } else {
            Some(record)
        }
    }
}

/// Finds a `<b>` label matching `label` and returns the text it introduces
///
/// The text is either inline after the colon (when `inline_ok` and the label
/// element carries more than the label itself) or the next `<p>` sibling of the
/// paragraph holding the label.
fn labelled_text(scope: ElementRef<'_>, label: &Regex, inline_ok: bool) -> Option<String> {
    let bold = select_all(scope, "b")
        .into_iter()
        .find(|b| label.is_match(&element_text(*b)))?;

    let own_text = element_text(bold);
    if inline_ok && own_text.chars().count() > 15 {
        if let Some((_, rest)) = own_text.split_once(':') {
            let rest = rest.trim();
            if !rest.is_empty() {
                return Some(rest.to_string());
            }
        }
    }

    let paragraph = bold
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "p")?;

    paragraph
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "p")
        .map(element_text)
        .filter(|text| !text.is_empty())
}

/// Property type implied by the category segment of a detail URL
fn property_type_from_url(url: &str) -> &'static str {
    if url.contains("apartamentos") {
        "apartamento"
    } else if url.contains("casas") {
        "casa"
    } else if url.contains("lotes") {
        "terreno"
    } else {
        "otro"
    }
}

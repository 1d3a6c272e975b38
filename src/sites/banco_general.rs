/// Banco General (classified listings, two categories)
use std::collections::BTreeMap;

use scraper::Html;
use url::Url;

use crate::crawler::extract_links;
use crate::model::{GeoPoint, LinkTarget, Record, SourceId};
use crate::sites::normalize::{
    attr, element_text, fold_accents, parse_amount, parse_area, parse_coordinate,
    parse_rounded_int, root, select_all, select_first, select_text,
};
use crate::sites::{join_path, CatalogPage, Pagination, Site};

pub(crate) const DEFAULT_BASE: &str = "https://www.bgeneral.com";

const NO_RESULTS_TEXT: &str = "No se encontraron propiedades";

/// Feature label (accent-folded, lowercase) to amenity column
const FEATURES: &[(&str, &str)] = &[
    ("sala-comedor", "living_room"),
    ("sala-comedor", "dining_room"),
    ("cocina", "kitchen"),
    ("lavanderia", "laundry"),
    ("area social", "social_area"),
    ("seguridad 24 horas", "security"),
    ("balcon", "balcony"),
    ("elevadores", "elevator"),
    ("piscina", "swimming_pool"),
    ("terraza", "terrace"),
    ("estudio", "studio"),
    ("deposito", "deposit"),
    ("cuarto de servicio", "utility_room"),
];

pub struct BancoGeneral {
    base: Url,
}

impl BancoGeneral {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    fn is_property_link(link: &str) -> bool {
        Url::parse(link)
            .map(|url| url.path().starts_with("/property/"))
            .unwrap_or(false)
    }
}

impl Site for BancoGeneral {
    fn source(&self) -> SourceId {
        SourceId::BancoGeneral
    }

    fn entry_points(&self) -> Vec<Url> {
        vec![
            join_path(&self.base, "/clasificados-bg/viviendas-reposeidas/"),
            join_path(&self.base, "/clasificados-bg/comerciales/"),
        ]
    }

    fn pagination(&self) -> Pagination {
        Pagination::PathSegment
    }

    fn parse_catalog(&self, html: &str, page_url: &Url) -> CatalogPage {
        let document = Html::parse_document(html);
        let scope = root(&document);

        let no_results = select_first(scope, ".searched-properties")
            .map(|el| element_text(el).contains(NO_RESULTS_TEXT))
            .unwrap_or(false);
        if no_results {
            return CatalogPage {
                no_results: true,
                ..CatalogPage::default()
            };
        }

        let mut links: Vec<String> =
            extract_links(scope, ".propery-style-6 a[target='_blank']", page_url)
                .into_iter()
                .filter(|link| Self::is_property_link(link))
                .collect();

        if links.is_empty() {
            tracing::debug!("Primary selector found nothing on {}, trying fallback", page_url);
            links = extract_links(scope, "a[href*='/property/']", page_url)
                .into_iter()
                .filter(|link| Self::is_property_link(link))
                .collect();
        }

        CatalogPage {
            links,
            ..CatalogPage::default()
        }
    }

    fn parse_detail(&self, html: &str, target: &LinkTarget) -> Option<Record> {
        let document = Html::parse_document(html);
        let scope = root(&document);
        let mut record = Record::new(target.id.clone());

        record.title = select_text(scope, ".fusion-page-title-captions h1.entry-title");

        if let Some(price) = select_text(scope, ".large-price .rem-price-amount")
            .as_deref()
            .and_then(parse_amount)
        {
            record.price = Some(price);
            record.currency = Some("PAB".to_string());
        }

        let mut details = BTreeMap::new();
        for row in select_all(scope, ".details.tab-general_settings .row .detail") {
            let label = select_text(row, ".rem-single-field-title");
            let value = select_text(row, ".rem-single-field-value");
            if let (Some(label), Some(value)) = (label, value) {
                details.insert(label.replace(':', "").trim().to_string(), value);
            }
        }

        for (label, value) in &details {
            match label.as_str() {
                "Finca #" => record.property_id = Some(value.clone()),
                "Tipo de propiedad" => record.property_type = Some(value.clone()),
                "Área de construcción" => record.built_area = parse_area(value),
                "Área de terreno" => record.area_m2 = parse_area(value),
                "Habitaciones" => record.bedrooms = value.trim().parse().ok(),
                "Baños" => record.bathrooms = value.trim().parse().ok(),
                "Estacionamientos" => record.parking = parse_rounded_int(value),
                _ => {}
            }
        }

        // "Dirección" wins over "Ubicación" when both are present
        if let Some(address) = details.get("Dirección").or_else(|| details.get("Ubicación")) {
            record.set_address(address);
        }

        let lat = select_text(scope, ".wrap_property_latitude .rem-single-field-value");
        let lon = select_text(scope, ".wrap_property_longitude .rem-single-field-value");
        if let (Some(lat), Some(lon)) = (lat, lon) {
            if let (Some(lat), Some(lon)) = (parse_coordinate(&lat), parse_coordinate(&lon)) {
                record.location = Some(GeoPoint::new(lat, lon));
            }
        }

        let features: Vec<String> = select_all(scope, ".details.tab-property_details span.detail")
            .into_iter()
            .map(element_text)
            .filter(|text| !text.is_empty())
            .collect();

        for feature in &features {
            let folded = fold_accents(feature);
            for (keyword, column) in FEATURES {
                if folded.contains(keyword) {
                    record.amenities.set(column);
                }
            }
        }

        for img in select_all(scope, ".fotorama-custom img.skip-lazy.rem-slider-image") {
            if let Some(src) = attr(img, "src") {
                record.push_image(src);
            }
        }

        record.additional_attrs = details;
        for feature in features {
            record.additional_attrs.insert(feature, "true".to_string());
        }

        if record.is_blank() {
            None
        } else {
            Some(record)
        }
    }
}

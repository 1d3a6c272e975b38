/// Banco Nacional de Panamá (WooCommerce catalog with query-string pagination)
use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;
use url::Url;

use crate::crawler::extract_links;
use crate::model::{LinkTarget, Record, SourceId};
use crate::sites::normalize::{
    attr, element_text, parse_amount, root, select_all, select_first, select_text,
};
use crate::sites::{join_path, CatalogPage, Pagination, Site};

pub(crate) const DEFAULT_BASE: &str = "https://www.banconal.com.pa";

static ROOMS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\((\d+)R,\s*(\d+)B\)").expect("ROOMS_RE: hardcoded regex is valid")
});

static HECTARES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([\d,]+(?:\.\d+)?)\s*HAS").expect("HECTARES_RE: hardcoded regex is valid")
});

static SQUARE_METERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([\d,]+(?:\.\d+)?)\s*M[²2]").expect("SQUARE_METERS_RE: hardcoded regex is valid")
});

pub struct BancoNacional {
    base: Url,
}

impl BancoNacional {
    pub fn new(base: Url) -> Self {
        Self { base }
    }
}

impl Site for BancoNacional {
    fn source(&self) -> SourceId {
        SourceId::BancoNacional
    }

    fn entry_points(&self) -> Vec<Url> {
        vec![join_path(&self.base, "/bienes/bienes-adquiridos/")]
    }

    fn pagination(&self) -> Pagination {
        Pagination::QueryParam("product-page")
    }

    fn parse_catalog(&self, html: &str, page_url: &Url) -> CatalogPage {
        let document = Html::parse_document(html);
        let links = extract_links(root(&document), "a.woocommerce-LoopProduct-link", page_url)
            .into_iter()
            .filter(|link| {
                Url::parse(link)
                    .map(|url| url.path().starts_with("/product/"))
                    .unwrap_or(false)
            })
            .collect();

        CatalogPage {
            links,
            ..CatalogPage::default()
        }
    }

    fn parse_detail(&self, html: &str, target: &LinkTarget) -> Option<Record> {
        let document = Html::parse_document(html);
        let scope = root(&document);
        let mut record = Record::new(target.id.clone());
        record.currency = Some("PAB".to_string());

        let title = select_text(scope, ".product_title.entry-title");
        record.title = title.clone();

        record.property_id = select_text(
            scope,
            "tr.woocommerce-product-attributes-item--attribute_pa_finca td.woocommerce-product-attributes-item__value p",
        )
        .or_else(|| select_text(scope, ".sku_wrapper .sku"));

        record.price = select_text(scope, ".summary .price .woocommerce-Price-amount.amount")
            .as_deref()
            .and_then(parse_amount);

        let accordion = select_first(scope, "#accordion-description").map(|accordion| {
            let items: Vec<String> = select_all(accordion, "ul.list-group li.list-group-item")
                .into_iter()
                .map(element_text)
                .collect();
            if items.is_empty() {
                select_all(accordion, "p")
                    .into_iter()
                    .map(element_text)
                    .collect::<Vec<_>>()
                    .join(" ")
            } else {
                items.join(" ")
            }
        });
        let accordion = accordion.filter(|text| !text.is_empty());

        if let Some(short) = select_text(scope, ".woocommerce-product-details__short-description p") {
            record.set_address(&address_from_summary(&short));

            if let Some(caps) = ROOMS_RE.captures(&short) {
                record.bedrooms = caps.get(1).and_then(|m| m.as_str().parse().ok());
                record.bathrooms = caps.get(2).and_then(|m| m.as_str().parse().ok());
            }
            record.description = Some(short);
        }

        if record.address.is_none() {
            if let Some((_, rest)) = accordion.as_deref().and_then(|text| text.split_once("Ubicación:")) {
                record.set_address(rest.split('.').next().unwrap_or_default());
            }
        }

        for row in select_all(scope, ".woocommerce-product-attributes.shop_attributes tr") {
            let label = select_first(row, "th").map(element_text);
            let value = select_text(row, "td p");
            let (Some(label), Some(value)) = (label, value) else {
                continue;
            };
            let label = label.to_lowercase();

            if label.contains("tipo de bien") {
                record.property_type = Some(value.clone());
            } else if label.contains("superficie") {
                let upper = value.to_uppercase();
                if upper.contains("HAS") {
                    record.hectares = capture_number(&HECTARES_RE, &upper);
                }
                if let Some(m2) = capture_number(&SQUARE_METERS_RE, &upper) {
                    record.area_m2 = Some(m2);
                }
            }

            record.additional_attrs.insert(label, value);
        }

        for anchor in select_all(scope, ".woocommerce-product-gallery__wrapper a") {
            if let Some(href) = attr(anchor, "href") {
                record.push_image(href);
            }
        }

        if let Some(meta) = select_first(scope, ".product_meta") {
            if let Some(sku) = select_text(meta, ".sku_wrapper .sku") {
                record.additional_attrs.insert("sku".to_string(), sku);
            }
            if let Some(category) = select_text(meta, ".posted_in a") {
                record.additional_attrs.insert("category".to_string(), category);
            }
            let brands: Vec<String> = select_all(meta, "span.posted_in a[href*='/marca/']")
                .into_iter()
                .map(element_text)
                .collect();
            if !brands.is_empty() {
                record.additional_attrs.insert("marcas".to_string(), brands.join(", "));
            }
        }

        if let Some(title) = title {
            record.additional_attrs.insert("title".to_string(), title);
        }

        if let Some(extra) = accordion {
            record.description = Some(match record.description.take() {
                Some(short) => format!("{} {}", short, extra),
                None => extra.clone(),
            });
            record
                .additional_attrs
                .insert("additional_description".to_string(), extra);
        }

        if record.is_blank() {
            None
        } else {
            Some(record)
        }
    }
}

/// Pulls the address out of a summary like `"Ubicación: Chitré, Herrera (2R, 1B)"`
///
/// Without the label the text before the first parenthesis is used.
fn address_from_summary(summary: &str) -> String {
    let located = summary
        .split_once("Ubicación:")
        .map(|(_, rest)| rest)
        .unwrap_or(summary);
    located.split('(').next().unwrap_or_default().trim().to_string()
}

fn capture_number(re: &Regex, text: &str) -> Option<f64> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
}

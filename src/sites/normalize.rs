//! Numeric and locale normalization shared by the site extractors
//!
//! Listing pages write prices, areas and counts in many shapes
//! (`B/. 125,000.00`, `1.250,5 m²`, `3has + 5,178.15 m2`, `2 Recámaras`).
//! These helpers turn that text into typed values and never fail loudly:
//! anything unparseable becomes `None`.
//!
//! The DOM helpers wrap `scraper` so extractors can use literal CSS strings.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// Collapses all whitespace runs in an element's text into single spaces
pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Collapses whitespace runs into single spaces and trims the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Selects every element under `scope` matching `css`
///
/// An invalid selector matches nothing.
pub fn select_all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => scope.select(&selector).collect(),
        Err(_) => {
            tracing::debug!("Invalid selector: {}", css);
            Vec::new()
        }
    }
}

/// Selects the first element under `scope` matching `css`
pub fn select_first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    scope.select(&selector).next()
}

/// Returns the collapsed, non-empty text of the first element matching `css`
pub fn select_text(scope: ElementRef<'_>, css: &str) -> Option<String> {
    select_first(scope, css)
        .map(element_text)
        .filter(|text| !text.is_empty())
}

/// Returns the trimmed, non-empty value of attribute `name`
pub fn attr(element: ElementRef<'_>, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Root element of a parsed document, used as the scope for the select helpers
pub fn root(document: &Html) -> ElementRef<'_> {
    document.root_element()
}

/// Parses a money amount by dropping everything except digits and dots
///
/// `"B/. 125,000.50"` becomes `125000.5`.
pub fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned.trim_matches('.').parse().ok()
}

/// Parses an area in square meters
///
/// Unit suffixes are removed first. A comma followed by one to three trailing
/// digits is read as a decimal comma (`"85,5 m²"` is 85.5); any other comma is a
/// thousands separator.
pub fn parse_area(text: &str) -> Option<f64> {
    let lowered = text.to_lowercase();
    let mut unit_free = lowered
        .replace("m²", "")
        .replace("m2", "")
        .replace("sqm", "")
        .replace('m', "")
        .trim()
        .to_string();

    if unit_free.contains(',') {
        if DECIMAL_COMMA_RE.is_match(&unit_free) {
            unit_free = unit_free.replacen(',', ".", 1);
        } else {
            unit_free = unit_free.replace(',', "");
        }
    }

    parse_amount(&unit_free)
}

/// Parses a combined land measure such as `"3has + 5,178.15 m2"`
///
/// Returns the hectares (if present) and the total area in square meters
/// (hectares converted plus the explicit m² part), or `None` when both are zero.
pub fn parse_hectares_and_m2(text: &str) -> (Option<f64>, Option<f64>) {
    let hectares = HECTARES_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().replace(',', "").parse::<f64>().ok());

    let m2 = SQUARE_METERS_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().replace(',', "").parse::<f64>().ok());

    let total = hectares.unwrap_or(0.0) * 10_000.0 + m2.unwrap_or(0.0);
    (hectares, if total > 0.0 { Some(total) } else { None })
}

/// Parses the first number-like run in `text`, dropping thousands commas
pub fn parse_first_number(text: &str) -> Option<f64> {
    FIRST_NUMBER_RE
        .find(text)
        .map(|m| m.as_str().replace(',', ""))
        .and_then(|value| value.trim_matches('.').parse().ok())
}

/// Parses an integer by keeping only the digits of `text`
///
/// `"3 Recámaras"` becomes `3`.
pub fn parse_int(text: &str) -> Option<u32> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Parses a possibly fractional count and rounds it (`"2.0"` becomes `2`)
pub fn parse_rounded_int(text: &str) -> Option<u32> {
    let value: f64 = text.trim().parse().ok()?;
    if value.is_finite() && value >= 0.0 {
        Some(value.round() as u32)
    } else {
        None
    }
}

/// Lowercases `text` and strips Spanish diacritics for label matching
///
/// `"Área de Construcción"` becomes `"area de construccion"`.
pub fn fold_accents(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

/// Parses a coordinate written with either a decimal point or a decimal comma
pub fn parse_coordinate(text: &str) -> Option<f64> {
    text.trim().replace(',', ".").parse().ok()
}

static DECIMAL_COMMA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r",\d{1,3}$").expect("DECIMAL_COMMA_RE: hardcoded regex is valid")
});

static HECTARES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+[\d,.]*)\s*has").expect("HECTARES_RE: hardcoded regex is valid")
});

static SQUARE_METERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+[\d,.]*)\s*m(?:2|²)").expect("SQUARE_METERS_RE: hardcoded regex is valid")
});

static FIRST_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d[\d,.]*").expect("FIRST_NUMBER_RE: hardcoded regex is valid")
});

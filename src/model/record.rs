/// Normalized property records and their images
///
/// A `Record` is what an extractor produces from one detail page. Everything
/// except the owning link id is optional because listing pages vary a lot in
/// completeness. Raw label/value pairs with no typed home are preserved in
/// `additional_attrs`.
use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

/// Maximum length of free-text columns that the registry stores as varchar(255)
pub const MAX_TEXT_LEN: usize = 255;

/// Status given to every freshly extracted record
pub const ACTIVE_STATUS: &str = "active";

/// Latitude/longitude pair extracted from a listing
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns true if the point falls inside the Panama bounding box
    pub fn within_panama(&self) -> bool {
        self.latitude > 7.0 && self.latitude < 10.0 && self.longitude > -83.0 && self.longitude < -77.0
    }

    /// Renders the point as a GeoJSON geometry (longitude first)
    pub fn to_geojson(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "Point",
            "coordinates": [self.longitude, self.latitude],
        })
    }
}

/// Amenity flags a listing may advertise
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Amenities {
    pub living_room: bool,
    pub dining_room: bool,
    pub kitchen: bool,
    pub laundry: bool,
    pub social_area: bool,
    pub security: bool,
    pub balcony: bool,
    pub elevator: bool,
    pub swimming_pool: bool,
    pub terrace: bool,
    pub studio: bool,
    pub deposit: bool,
    pub utility_room: bool,
}

impl Amenities {
    /// Sets the flag whose registry column is `field`
    ///
    /// Returns false if `field` is not a known amenity column.
    pub fn set(&mut self, field: &str) -> bool {
        let flag = match field {
            "living_room" => &mut self.living_room,
            "dining_room" => &mut self.dining_room,
            "kitchen" => &mut self.kitchen,
            "laundry" => &mut self.laundry,
            "social_area" => &mut self.social_area,
            "security" => &mut self.security,
            "balcony" => &mut self.balcony,
            "elevator" => &mut self.elevator,
            "swimming_pool" => &mut self.swimming_pool,
            "terrace" => &mut self.terrace,
            "studio" => &mut self.studio,
            "deposit" => &mut self.deposit,
            "utility_room" => &mut self.utility_room,
            _ => return false,
        };
        *flag = true;
        true
    }

    /// Number of flags that are set
    pub fn count(&self) -> usize {
        [
            self.living_room,
            self.dining_room,
            self.kitchen,
            self.laundry,
            self.social_area,
            self.security,
            self.balcony,
            self.elevator,
            self.swimming_pool,
            self.terrace,
            self.studio,
            self.deposit,
            self.utility_room,
        ]
        .iter()
        .filter(|flag| **flag)
        .count()
    }
}

/// One photo reference belonging to a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image {
    /// Absolute image URL, also the dedup key
    pub source_url: String,

    /// Human caption, at most 255 characters
    pub title: String,
}

impl Image {
    pub fn new(source_url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            title: truncate_chars(&title.into(), MAX_TEXT_LEN),
        }
    }
}

/// Normalized property data extracted from one detail page
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub link_id: String,
    pub status: String,
    pub title: Option<String>,
    pub property_id: Option<String>,
    pub property_type: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub built_area: Option<f64>,
    pub area_m2: Option<f64>,
    pub hectares: Option<f64>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub parking: Option<u32>,
    pub location: Option<GeoPoint>,
    pub amenities: Amenities,
    pub additional_attrs: BTreeMap<String, String>,
    pub images: Vec<Image>,
}

impl Record {
    /// Creates an empty active record owned by `link_id`
    pub fn new(link_id: impl Into<String>) -> Self {
        Self {
            link_id: link_id.into(),
            status: ACTIVE_STATUS.to_string(),
            title: None,
            property_id: None,
            property_type: None,
            address: None,
            description: None,
            price: None,
            currency: None,
            built_area: None,
            area_m2: None,
            hectares: None,
            bedrooms: None,
            bathrooms: None,
            parking: None,
            location: None,
            amenities: Amenities::default(),
            additional_attrs: BTreeMap::new(),
            images: Vec::new(),
        }
    }

    /// Stores the address, truncated to the registry column width
    pub fn set_address(&mut self, address: &str) {
        let address = address.trim();
        if !address.is_empty() {
            self.address = Some(truncate_chars(address, MAX_TEXT_LEN));
        }
    }

    /// Appends an image, captioning it with its 1-based position, the address and the price
    ///
    /// Call this after address and price are known so the caption carries them.
    pub fn push_image(&mut self, source_url: impl Into<String>) {
        let caption = image_caption(self.images.len() + 1, self.address.as_deref(), self.price);
        self.images.push(Image::new(source_url, caption));
    }

    /// Returns true if the extractor found nothing beyond the link id
    pub fn is_blank(&self) -> bool {
        self.title.is_none()
            && self.property_id.is_none()
            && self.address.is_none()
            && self.price.is_none()
            && self.images.is_empty()
            && self.additional_attrs.is_empty()
    }
}

/// Builds the caption stored with every image
pub fn image_caption(index: usize, address: Option<&str>, price: Option<f64>) -> String {
    let address = address.unwrap_or("N/A");
    let price = price.map(|p| p.to_string()).unwrap_or_else(|| "N/A".to_string());
    truncate_chars(
        &format!(
            "Imagen #{} de bien en venta ubicado en {} con el precio {}",
            index, address, price
        ),
        MAX_TEXT_LEN,
    )
}

/// Truncates `text` to at most `max` characters without splitting a code point
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

/// Collapses images with a repeated `source_url` to their first occurrence
///
/// Order of the surviving images is preserved.
pub fn dedup_images(images: &[Image]) -> Vec<Image> {
    let mut seen = HashSet::new();
    images
        .iter()
        .filter(|image| seen.insert(image.source_url.as_str()))
        .cloned()
        .collect()
}

/// Returns the deduplicated images whose URL is not already in `existing`
///
/// Used when updating a record in place: known images are never re-inserted.
pub fn new_images(images: &[Image], existing: &[String]) -> Vec<Image> {
    let known: HashSet<&str> = existing.iter().map(String::as_str).collect();
    dedup_images(images)
        .into_iter()
        .filter(|image| !known.contains(image.source_url.as_str()))
        .collect()
}

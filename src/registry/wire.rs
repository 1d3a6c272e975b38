//! JSON shapes exchanged with the Directus API
use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::model::{Image, LinkTarget, Record, SourceId, StaleLink};

pub const LINKS_COLLECTION: &str = "repossessed_assets_links";
pub const DATA_COLLECTION: &str = "repossessed_assets_data";
pub const IMAGES_COLLECTION: &str = "repossessed_assets_images";

pub const STALE_LINKS_QUERY: &str = r#"
query GetStaleRepossessedAssetsLinks {
  repossessed_assets_links(filter: { is_stale: { _eq: true } }) {
    company
    id
    link
    scrape_data {
      id
    }
    scraped_images {
      id
      source_url
    }
  }
}
"#;

/// REST envelope: every item endpoint answers `{"data": ...}`
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct LinkRow {
    pub link: String,
}

#[derive(Debug, Deserialize)]
pub struct UnscrapedRow {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub link: String,
}

impl From<UnscrapedRow> for LinkTarget {
    fn from(row: UnscrapedRow) -> Self {
        LinkTarget::new(row.id, row.link)
    }
}

#[derive(Debug, Serialize)]
pub struct NewLink<'a> {
    pub link: &'a str,
    pub is_scraped: bool,
    pub company: &'static str,
}

impl<'a> NewLink<'a> {
    pub fn unscraped(link: &'a str, source: SourceId) -> Self {
        Self {
            link,
            is_scraped: false,
            company: source.as_tag(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScrapedFlag {
    pub is_scraped: bool,
}

#[derive(Debug, Serialize)]
pub struct StaleFlag {
    pub is_stale: bool,
}

#[derive(Debug, Serialize)]
pub struct ImageRow<'a> {
    pub link_id: &'a str,
    pub source_url: &'a str,
    pub title: &'a str,
}

/// Builds the image rows for `images`, all owned by `link_id`
pub fn image_rows<'a>(link_id: &'a str, images: &'a [Image]) -> Vec<ImageRow<'a>> {
    images
        .iter()
        .map(|image| ImageRow {
            link_id,
            source_url: &image.source_url,
            title: &image.title,
        })
        .collect()
}

/// Record columns of `repossessed_assets_data`
///
/// Images are stored in their own collection and are not part of this payload.
/// Coordinates are stored both as strings and as a GeoJSON point.
#[derive(Debug, Serialize)]
pub struct RecordPayload<'a> {
    pub link_id: &'a str,
    pub status: &'a str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub built_area: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_m2: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hectares: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parking: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geog: Option<Value>,

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

    pub additional_attrs: &'a BTreeMap<String, String>,
}

impl<'a> From<&'a Record> for RecordPayload<'a> {
    fn from(record: &'a Record) -> Self {
        let amenities = &record.amenities;
        Self {
            link_id: &record.link_id,
            status: &record.status,
            title: record.title.as_deref(),
            property_id: record.property_id.as_deref(),
            property_type: record.property_type.as_deref(),
            address: record.address.as_deref(),
            description: record.description.as_deref(),
            price: record.price,
            currency: record.currency.as_deref(),
            built_area: record.built_area,
            area_m2: record.area_m2,
            hectares: record.hectares,
            bedrooms: record.bedrooms,
            bathrooms: record.bathrooms,
            parking: record.parking,
            latitude: record.location.map(|point| point.latitude.to_string()),
            longitude: record.location.map(|point| point.longitude.to_string()),
            geog: record.location.map(|point| point.to_geojson()),
            living_room: amenities.living_room,
            dining_room: amenities.dining_room,
            kitchen: amenities.kitchen,
            laundry: amenities.laundry,
            social_area: amenities.social_area,
            security: amenities.security,
            balcony: amenities.balcony,
            elevator: amenities.elevator,
            swimming_pool: amenities.swimming_pool,
            terrace: amenities.terrace,
            studio: amenities.studio,
            deposit: amenities.deposit,
            utility_room: amenities.utility_room,
            additional_attrs: &record.additional_attrs,
        }
    }
}

// ===== GraphQL =====

#[derive(Debug, Serialize)]
pub struct GraphQlRequest<'a> {
    pub query: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct StaleLinksData {
    pub repossessed_assets_links: Vec<StaleLinkRow>,
}

#[derive(Debug, Deserialize)]
pub struct StaleLinkRow {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default, deserialize_with = "opt_id_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub scrape_data: Option<Vec<IdRow>>,
    #[serde(default)]
    pub scraped_images: Option<Vec<ImageRef>>,
}

#[derive(Debug, Deserialize)]
pub struct IdRow {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct ImageRef {
    #[serde(default)]
    pub source_url: Option<String>,
}

impl From<StaleLinkRow> for StaleLink {
    fn from(row: StaleLinkRow) -> Self {
        StaleLink {
            link_id: row.id.filter(|id| !id.is_empty()),
            url: row.link.filter(|link| !link.is_empty()),
            source: row.company.unwrap_or_default(),
            record_id: row
                .scrape_data
                .and_then(|rows| rows.into_iter().next())
                .map(|row| row.id),
            image_urls: row
                .scraped_images
                .unwrap_or_default()
                .into_iter()
                .filter_map(|image| image.source_url)
                .collect(),
        }
    }
}

/// Directus returns numeric primary keys as numbers and UUIDs as strings
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(id) => Ok(id),
        Value::Number(id) => Ok(id.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

fn opt_id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(id)) => Ok(Some(id)),
        Some(Value::Number(id)) => Ok(Some(id.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

pub(crate) mod catalog;

pub use catalog::{CatalogError, PlaceCatalog};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::text::slugify_identifier;

pub const DEFAULT_PROVINCE: &str = "สมุทรสงคราม";
pub const MAIN_ATTRACTION: &str = "main_attraction";
pub const TRIP_PLAN: &str = "trip_plan";

lazy_static! {
    static ref DISTRICT: Regex = Regex::new(r"(อำเภอ|อ\.)\s*([^\s,]+)").unwrap();
    static ref IMAGE_SPLIT: Regex = Regex::new(r"[,;|\n]+").unwrap();
}

// One row of the places export, loosely typed like the table it came from
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PlaceRecord {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub latitude: Option<Value>,
    #[serde(default)]
    pub longitude: Option<Value>,
    #[serde(default)]
    pub opening_hours: Option<String>,
    #[serde(default)]
    pub price_range: Option<String>,
    #[serde(default)]
    pub image_url: Option<Value>,
    #[serde(default)]
    pub attraction_type: Option<String>,
    #[serde(default)]
    pub google_maps_link: Option<String>,
    #[serde(default)]
    pub best_time: Option<String>,
    #[serde(default)]
    pub tips: Option<Value>,
    #[serde(default)]
    pub highlights: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PlaceInformation {
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

// Chatbot-facing place, also the `structured_data` wire shape
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Place {
    pub id: String,
    pub name: String,
    pub place_name: String,
    pub description: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub opening_hours: Option<String>,
    pub price_range: Option<String>,
    pub city: String,
    pub province: String,
    #[serde(rename = "type")]
    pub types: Vec<String>,
    pub category: Option<String>,
    pub rating: Option<f64>,
    pub highlights: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_time: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tips: Vec<String>,
    pub place_information: PlaceInformation,
    pub images: Vec<String>,
    pub attraction_type: Option<String>,
    pub source: String,
    pub google_maps_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_open: Option<bool>,
}

impl Place {
    /// Build the chatbot view of a raw row. Rows without a name are dropped.
    pub fn from_record(record: PlaceRecord) -> Option<Place> {
        let name = non_empty(record.name)?;

        let city = record
            .address
            .as_deref()
            .and_then(|address| DISTRICT.captures(address))
            .and_then(|caps| caps.get(2))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        let types: Vec<String> = [record.attraction_type.as_deref(), record.category.as_deref()]
            .into_iter()
            .flatten()
            .filter(|v| !v.trim().is_empty())
            .map(str::to_string)
            .collect();

        let latitude = record.latitude.as_ref().and_then(to_float);
        let longitude = record.longitude.as_ref().and_then(to_float);
        let google_maps_link = non_empty(record.google_maps_link).or_else(|| match (latitude, longitude) {
            (Some(lat), Some(lng)) if lat != 0.0 && lng != 0.0 => Some(format!(
                "https://www.google.com/maps/search/?api=1&query={},{}",
                lat, lng
            )),
            _ => None,
        });

        let description = record.description.unwrap_or_default();
        let highlights = match record.highlights.as_ref().map(string_list) {
            Some(list) if !list.is_empty() => list,
            _ => types.clone(),
        };
        let category_description = record
            .category
            .clone()
            .filter(|c| !c.is_empty())
            .or_else(|| types.first().cloned());

        let id = match record.id {
            Some(Value::String(s)) if !s.trim().is_empty() => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => slugify_identifier(&name),
        };

        Some(Place {
            id,
            place_name: name.clone(),
            name,
            place_information: PlaceInformation {
                detail: description.clone(),
                category_description,
                source: None,
            },
            description,
            address: record.address,
            latitude,
            longitude,
            opening_hours: non_empty(record.opening_hours),
            price_range: non_empty(record.price_range),
            city,
            province: DEFAULT_PROVINCE.to_string(),
            highlights,
            types,
            category: record.category,
            rating: None,
            best_time: non_empty(record.best_time),
            tips: record.tips.as_ref().map(string_list).unwrap_or_default(),
            images: record.image_url.as_ref().map(parse_images).unwrap_or_default(),
            attraction_type: non_empty(record.attraction_type),
            source: "database".to_string(),
            google_maps_link,
            is_open: None,
        })
    }

    /// Area shown to users: the city, else nothing.
    pub fn area(&self) -> Option<&str> {
        Some(self.city.as_str()).filter(|c| !c.is_empty())
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { &self.place_name } else { &self.name }
    }

    pub fn is_external(&self) -> bool {
        self.source == "google_search"
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

/// Image urls arrive as a JSON list, a JSON-encoded list, or a delimited string.
pub fn parse_images(raw: &Value) -> Vec<String> {
    let mut urls = match raw {
        Value::Array(_) => string_list(raw),
        Value::String(s) => {
            let stripped = s.trim();
            let mut parsed = Vec::new();
            if stripped.starts_with('[') {
                if let Ok(value @ Value::Array(_)) = serde_json::from_str::<Value>(stripped) {
                    parsed = string_list(&value);
                }
            }
            if parsed.is_empty() {
                parsed = IMAGE_SPLIT
                    .split(stripped)
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            parsed
        }
        _ => Vec::new(),
    };
    let mut seen = std::collections::HashSet::new();
    urls.retain(|u| seen.insert(u.clone()));
    urls
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> PlaceRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn converts_database_row() {
        let place = Place::from_record(record(json!({
            "id": 7,
            "name": "ตลาดน้ำอัมพวา",
            "category": "market",
            "attraction_type": "main_attraction",
            "address": "ตำบลอัมพวา อำเภออัมพวา สมุทรสงคราม",
            "latitude": "13.4254",
            "longitude": 99.9553,
            "image_url": "a.jpg, b.jpg;a.jpg"
        })))
        .unwrap();

        assert_eq!(place.id, "7");
        assert_eq!(place.city, "อัมพวา");
        assert_eq!(place.types, vec!["main_attraction", "market"]);
        assert_eq!(place.highlights, place.types);
        assert_eq!(place.images, vec!["a.jpg", "b.jpg"]);
        assert_eq!(place.latitude, Some(13.4254));
        assert!(place.google_maps_link.unwrap().contains("13.4254,99.9553"));
        assert_eq!(place.province, DEFAULT_PROVINCE);
        assert_eq!(place.place_information.category_description.as_deref(), Some("market"));
    }

    #[test]
    fn rows_without_name_are_dropped() {
        assert!(Place::from_record(record(json!({"id": 1, "name": "  "}))).is_none());
    }

    #[test]
    fn string_ids_are_kept_and_missing_ids_slugged() {
        let guide = Place::from_record(record(json!({"id": "9temples", "name": "ไหว้พระ 9 วัด"}))).unwrap();
        assert_eq!(guide.id, "9temples");
        let unnamed = Place::from_record(record(json!({"name": "Don Hoi Lot"}))).unwrap();
        assert_eq!(unnamed.id, "don-hoi-lot");
    }

    #[test]
    fn parses_json_encoded_image_list() {
        assert_eq!(
            parse_images(&json!("[\"x.png\", \"y.png\", \"x.png\"]")),
            vec!["x.png", "y.png"]
        );
        assert!(parse_images(&json!(null)).is_empty());
    }
}

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::places::{DEFAULT_PROVINCE, Place, PlaceInformation};
use crate::text::short_hash;

const NEARBY_URL: &str = "https://maps.googleapis.com/maps/api/place/nearbysearch/json";
const PHOTO_URL: &str = "https://maps.googleapis.com/maps/api/place/photo";
const CENTER: (f64, f64) = (13.4549, 100.7588);
const RADIUS_METERS: u32 = 50_000;
pub const SEARCH_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum MapsError {
    #[error("Google Maps request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Google Maps returned status {0}")]
    Status(String),
}

#[derive(Debug, Deserialize)]
struct NearbyResponse {
    #[serde(default)]
    results: Vec<NearbyResult>,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct NearbyResult {
    place_id: Option<String>,
    name: Option<String>,
    vicinity: Option<String>,
    geometry: Option<Geometry>,
    rating: Option<f64>,
    #[serde(default)]
    types: Vec<String>,
    opening_hours: Option<OpeningHours>,
    #[serde(default)]
    photos: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Option<LatLng>,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct OpeningHours {
    open_now: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    photo_reference: Option<String>,
}

// Google Places fallback for local questions the catalog cannot answer
pub struct MapsClient {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl MapsClient {
    pub fn new(api_key: String) -> Result<Self, MapsError> {
        Self::with_endpoint(api_key, NEARBY_URL)
    }

    pub fn with_endpoint(api_key: String, endpoint: &str) -> Result<Self, MapsError> {
        let client = reqwest::Client::builder().timeout(SEARCH_TIMEOUT).build()?;
        Ok(Self { client, api_key, endpoint: endpoint.to_string() })
    }

    async fn nearby(&self, query: &str) -> Result<Vec<NearbyResult>, MapsError> {
        let keyword = format!("{} Samut Songkhram Thailand", query);
        let location = format!("{},{}", CENTER.0, CENTER.1);
        let radius = RADIUS_METERS.to_string();
        let body: NearbyResponse = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("location", location.as_str()),
                ("radius", radius.as_str()),
                ("keyword", keyword.as_str()),
                ("language", "th"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        match body.status.as_str() {
            "OK" | "ZERO_RESULTS" | "" => Ok(body.results),
            other => Err(MapsError::Status(other.to_string())),
        }
    }

    /// Up to `limit` places near the province. Failures log and return nothing.
    pub async fn search(&self, query: &str, limit: usize) -> Vec<Place> {
        tracing::info!("Google Maps fallback search: {}", query);
        let results = match tokio::time::timeout(SEARCH_TIMEOUT, self.nearby(query)).await {
            Ok(Ok(results)) => results,
            Ok(Err(e)) => {
                tracing::warn!("Google Maps search failed: {}", e);
                return Vec::new();
            }
            Err(_) => {
                tracing::warn!("Google Maps search timed out after {} seconds", SEARCH_TIMEOUT.as_secs());
                return Vec::new();
            }
        };
        let places: Vec<Place> = results
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(idx, result)| self.to_place(idx, result))
            .collect();
        if places.is_empty() {
            tracing::info!("Google fallback found no results");
        } else {
            tracing::info!("Google Maps fallback found {} results", places.len());
        }
        places
    }

    fn to_place(&self, idx: usize, result: NearbyResult) -> Place {
        let place_id = result.place_id.unwrap_or_else(|| format!("gmaps_{}", idx));
        let name = result.name.unwrap_or_else(|| "Unknown Place".to_string());
        let address = result
            .vicinity
            .unwrap_or_else(|| "Samut Songkhram, Thailand".to_string());
        let location = result.geometry.and_then(|g| g.location);
        let description = match result.rating {
            Some(rating) => format!("Location: {}. Rating: {}/5", address, rating),
            None => format!("Location: {}", address),
        };
        let images = result
            .photos
            .iter()
            .take(1)
            .filter_map(|p| p.photo_reference.as_deref())
            .filter(|r| !r.is_empty())
            .map(|r| format!("{}?maxwidth=400&photo_reference={}&key={}", PHOTO_URL, r, self.api_key))
            .collect();

        Place {
            id: format!("gmaps_{}", short_hash(&place_id)),
            name: name.clone(),
            place_name: name,
            description,
            address: Some(address.clone()),
            latitude: location.as_ref().map(|l| l.lat),
            longitude: location.as_ref().map(|l| l.lng),
            city: DEFAULT_PROVINCE.to_string(),
            province: DEFAULT_PROVINCE.to_string(),
            highlights: result.types.clone(),
            types: result.types,
            category: Some("From Google Maps".to_string()),
            rating: result.rating,
            place_information: PlaceInformation {
                detail: address,
                category_description: Some("Tourism location from Google Maps".to_string()),
                source: Some("Google Maps Places API".to_string()),
            },
            images,
            source: "google_search".to_string(),
            google_maps_link: Some(format!("https://www.google.com/maps/place/?q=place_id:{}", place_id)),
            is_open: result.opening_hours.and_then(|h| h.open_now),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nearby_result_becomes_external_place() {
        let client = MapsClient::new("key".into()).unwrap();
        let result: NearbyResult = serde_json::from_value(json!({
            "place_id": "abc",
            "name": "ร้านกาแฟริมน้ำ",
            "vicinity": "อัมพวา",
            "geometry": {"location": {"lat": 13.42, "lng": 99.95}},
            "rating": 4.5,
            "types": ["cafe"],
            "opening_hours": {"open_now": true},
            "photos": [{"photo_reference": "ref1"}, {"photo_reference": "ref2"}]
        }))
        .unwrap();
        let place = client.to_place(0, result);
        assert_eq!(place.id, format!("gmaps_{}", short_hash("abc")));
        assert!(place.is_external());
        assert_eq!(place.description, "Location: อัมพวา. Rating: 4.5/5");
        assert_eq!(place.images.len(), 1);
        assert!(place.images[0].contains("photo_reference=ref1"));
        assert_eq!(place.is_open, Some(true));
        assert_eq!(place.latitude, Some(13.42));
    }

    #[tokio::test]
    async fn unreachable_endpoint_gives_no_places() {
        let client = MapsClient::with_endpoint("key".into(), "http://127.0.0.1:9/nearby").unwrap();
        assert!(client.search("market", 3).await.is_empty());
    }
}

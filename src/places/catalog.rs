use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use thiserror::Error;

use super::{MAIN_ATTRACTION, Place, PlaceRecord, TRIP_PLAN};
use crate::text::slugify_identifier;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

struct Snapshot {
    places: Arc<Vec<Place>>,
    loaded_at: Option<Instant>,
}

/// In-memory copy of the places export, reloaded once it is older than `ttl`.
pub struct PlaceCatalog {
    path: Option<PathBuf>,
    ttl: Duration,
    snapshot: RwLock<Snapshot>,
}

impl PlaceCatalog {
    pub fn open(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        let catalog = Self {
            path: Some(path.into()),
            ttl,
            snapshot: RwLock::new(Snapshot { places: Arc::new(Vec::new()), loaded_at: None }),
        };
        catalog.reload_blocking();
        catalog
    }

    /// Fixed catalog that never touches the filesystem.
    pub fn from_places(places: Vec<Place>) -> Self {
        Self {
            path: None,
            ttl: Duration::MAX,
            snapshot: RwLock::new(Snapshot {
                places: Arc::new(deduplicate(places)),
                loaded_at: Some(Instant::now()),
            }),
        }
    }

    pub fn load_file(path: &Path) -> Result<Vec<Place>, CatalogError> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path)
            .map_err(|source| CatalogError::Io { path: display.clone(), source })?;
        let records: Vec<PlaceRecord> = serde_json::from_str(&raw)
            .map_err(|source| CatalogError::Parse { path: display, source })?;
        Ok(deduplicate(records.into_iter().filter_map(Place::from_record).collect()))
    }

    pub fn places(&self) -> Arc<Vec<Place>> {
        let snapshot = self.snapshot.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&snapshot.places)
    }

    fn is_stale(&self) -> bool {
        let snapshot = self.snapshot.read().unwrap_or_else(|e| e.into_inner());
        snapshot.loaded_at.is_none_or(|at| at.elapsed() >= self.ttl)
    }

    fn swap(&self, loaded: Result<Vec<Place>, CatalogError>, path: &Path) {
        let mut snapshot = self.snapshot.write().unwrap_or_else(|e| e.into_inner());
        match loaded {
            Ok(places) => {
                tracing::info!("Loaded {} places from {}", places.len(), path.display());
                snapshot.places = Arc::new(places);
            }
            Err(e) => {
                tracing::warn!("Places unavailable, keeping {} cached: {}", snapshot.places.len(), e);
            }
        }
        snapshot.loaded_at = Some(Instant::now());
    }

    // startup only, handlers never touch the file
    fn reload_blocking(&self) {
        if let Some(path) = &self.path {
            self.swap(Self::load_file(path), path);
        }
    }

    /// Re-read the file on the blocking pool once the snapshot is older than
    /// `ttl`. Readers keep the old snapshot until the swap.
    pub async fn refresh(&self) {
        let Some(path) = self.path.clone() else {
            return;
        };
        if !self.is_stale() {
            return;
        }
        let read_path = path.clone();
        let loaded = match tokio::task::spawn_blocking(move || Self::load_file(&read_path)).await {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::warn!("Places reload task failed: {}", e);
                return;
            }
        };
        self.swap(loaded, &path);
    }

    pub fn len(&self) -> usize {
        self.places().len()
    }

    pub fn is_empty(&self) -> bool {
        self.places().is_empty()
    }

    /// Case-insensitive substring search over name, category, address,
    /// description and attraction type, ordered by id.
    pub fn search(&self, keyword: &str, limit: usize, attraction_type: Option<&str>) -> Vec<Place> {
        let needle = keyword.to_lowercase();
        let places = self.places();
        let mut results: Vec<&Place> = places
            .iter()
            .filter(|p| attraction_type.is_none_or(|t| p.attraction_type.as_deref() == Some(t)))
            .filter(|p| {
                [
                    Some(p.name.as_str()),
                    p.category.as_deref(),
                    p.address.as_deref(),
                    Some(p.description.as_str()),
                    p.attraction_type.as_deref(),
                ]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&needle))
            })
            .collect();
        results.sort_by_key(|p| id_order(&p.id));
        results.into_iter().take(limit).cloned().collect()
    }

    pub fn search_main_attractions(&self, keyword: &str, limit: usize) -> Vec<Place> {
        self.search(keyword, limit, Some(MAIN_ATTRACTION))
    }

    /// Every place whose category contains `category`, sorted by name.
    pub fn by_category(&self, category: &str, limit: usize) -> Vec<Place> {
        let needle = category.to_lowercase();
        let places = self.places();
        let mut results: Vec<&Place> = places
            .iter()
            .filter(|p| {
                p.category
                    .as_deref()
                    .is_some_and(|c| c.to_lowercase().contains(&needle))
            })
            .collect();
        results.sort_by(|a, b| a.name.cmp(&b.name));
        results.into_iter().take(limit).cloned().collect()
    }

    pub fn trip_guides(&self) -> HashMap<String, Place> {
        self.places()
            .iter()
            .filter(|p| p.category.as_deref() == Some(TRIP_PLAN))
            .map(|p| (p.id.clone(), p.clone()))
            .collect()
    }

    /// Short listing handed to the model so it can name matching places.
    pub fn dataset_summary(&self) -> String {
        self.places()
            .iter()
            .take(50)
            .map(|p| {
                let kind = if p.types.is_empty() {
                    p.category.clone().unwrap_or_default()
                } else {
                    p.types.join(", ")
                };
                format!("- {} | city: {} | type: {}", p.display_name(), p.city, kind)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Lowercased terms that mark a question as being about this province.
    pub fn local_reference_terms(&self, base_terms: &[String]) -> Vec<String> {
        let mut terms: HashSet<String> = base_terms.iter().map(|t| t.to_lowercase()).collect();
        for place in self.places().iter() {
            for value in [
                Some(place.name.as_str()),
                Some(place.place_name.as_str()),
                Some(place.city.as_str()),
                place.category.as_deref(),
            ]
            .into_iter()
            .flatten()
            {
                if !value.is_empty() {
                    terms.insert(value.to_lowercase());
                }
            }
        }
        let mut terms: Vec<String> = terms.into_iter().collect();
        terms.sort();
        terms
    }
}

// numeric ids first in numeric order, then the rest alphabetically
fn id_order(id: &str) -> (u8, u64, String) {
    match id.parse::<u64>() {
        Ok(n) => (0, n, String::new()),
        Err(_) => (1, 0, id.to_string()),
    }
}

fn deduplicate(places: Vec<Place>) -> Vec<Place> {
    let mut seen = HashSet::new();
    places
        .into_iter()
        .filter_map(|mut place| {
            if place.id.is_empty() {
                place.id = slugify_identifier(&place.place_name);
            }
            seen.insert(place.id.clone()).then_some(place)
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::places::PlaceRecord;
    use serde_json::json;
    use std::io::Write;

    pub fn sample_places() -> Vec<Place> {
        let rows = json!([
            {"id": 1, "name": "ตลาดน้ำอัมพวา", "category": "market", "attraction_type": "main_attraction",
             "address": "อำเภออัมพวา", "description": "ตลาดน้ำยามเย็น เปิดศุกร์ถึงอาทิตย์"},
            {"id": 2, "name": "Don Hoi Lot", "category": "nature", "attraction_type": "secondary_attraction",
             "address": "อ.เมือง", "description": "Razor clam sandbar at the river mouth"},
            {"id": 3, "name": "วัดบางกุ้ง", "category": "temple", "attraction_type": "main_attraction",
             "address": "อำเภอบางคนที", "description": "โบสถ์ปรกโพธิ์ in a banyan tree"},
            {"id": 10, "name": "Baan Rim Nam Cafe", "category": "cafe", "attraction_type": "cafe",
             "address": "อำเภออัมพวา", "description": "Riverside coffee"},
            {"id": "9temples", "name": "ไหว้พระ 9 วัด", "category": "trip_plan",
             "description": "One day temple route"},
            {"id": 1, "name": "duplicate row"}
        ]);
        let records: Vec<PlaceRecord> = serde_json::from_value(rows).unwrap();
        records.into_iter().filter_map(Place::from_record).collect()
    }

    pub fn sample_catalog() -> PlaceCatalog {
        PlaceCatalog::from_places(sample_places())
    }

    #[test]
    fn deduplicates_on_id() {
        let catalog = sample_catalog();
        assert_eq!(catalog.len(), 5);
        assert!(catalog.places().iter().all(|p| p.name != "duplicate row"));
    }

    #[test]
    fn search_matches_any_field_case_insensitively() {
        let catalog = sample_catalog();
        let hits = catalog.search("RAZOR", 10, None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Don Hoi Lot");

        let everything = catalog.search("", 10, None);
        let ids: Vec<&str> = everything.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "10", "9temples"]);
    }

    #[test]
    fn main_attraction_filter_is_exact() {
        let catalog = sample_catalog();
        let hits = catalog.search_main_attractions("", 10);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|p| p.attraction_type.as_deref() == Some(MAIN_ATTRACTION)));
    }

    #[test]
    fn category_listing_sorted_by_name() {
        let catalog = sample_catalog();
        let cafes = catalog.by_category("CAFE", 5);
        assert_eq!(cafes.len(), 1);
        assert_eq!(cafes[0].id, "10");
    }

    #[test]
    fn trip_guides_and_summary() {
        let catalog = sample_catalog();
        assert!(catalog.trip_guides().contains_key("9temples"));
        let summary = catalog.dataset_summary();
        assert!(summary.starts_with("- ตลาดน้ำอัมพวา | city: อัมพวา | type: main_attraction, market"));
    }

    #[test]
    fn local_terms_include_base_and_places() {
        let catalog = sample_catalog();
        let terms = catalog.local_reference_terms(&["Samut Songkhram".to_string()]);
        assert!(terms.contains(&"samut songkhram".to_string()));
        assert!(terms.contains(&"don hoi lot".to_string()));
        assert!(terms.contains(&"อัมพวา".to_string()));
    }

    #[test]
    fn loads_file_and_survives_missing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"id": 5, "name": "Khlong Khon"}}]"#).unwrap();
        let catalog = PlaceCatalog::open(file.path(), Duration::from_secs(300));
        assert_eq!(catalog.len(), 1);

        let missing = PlaceCatalog::open("/nonexistent/places.json", Duration::from_secs(300));
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn refresh_swaps_in_new_file_only_when_stale() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"[{"id": 5, "name": "Khlong Khon"}]"#).unwrap();

        let fresh = PlaceCatalog::open(file.path(), Duration::from_secs(300));
        let stale = PlaceCatalog::open(file.path(), Duration::from_millis(1));

        std::fs::write(file.path(), r#"[{"id": 5, "name": "Khlong Khon"}, {"id": 6, "name": "Bang Noi"}]"#)
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        // reads never hit the file
        assert_eq!(stale.len(), 1);

        fresh.refresh().await;
        stale.refresh().await;
        assert_eq!(fresh.len(), 1);
        assert_eq!(stale.len(), 2);

        std::fs::write(file.path(), "not json").unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        stale.refresh().await;
        assert_eq!(stale.len(), 2);
    }
}

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};

use crate::places::Place;
use crate::text::{name_variations, normalize_name_token};

pub const DEFAULT_KEYWORD_LIMIT: usize = 6;

lazy_static! {
    static ref PROVINCE_MENTION: Regex = Regex::new(r"จังหวัด\s*([^\s,.;!?]+)").unwrap();
}

/// Place names, districts and then place types that appear in the query.
pub fn auto_detect_keywords(query: &str, places: &[Place], limit: usize) -> Vec<String> {
    if query.is_empty() || places.is_empty() {
        return Vec::new();
    }
    let normalized_query = normalize_name_token(query);
    let lowered_query = query.to_lowercase();
    let mut detected: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    let mut consider = |value: &str, detected: &mut Vec<String>| {
        if value.is_empty() || detected.len() >= limit {
            return;
        }
        for variant in name_variations(value) {
            let token = normalize_name_token(&variant);
            if token.is_empty() || seen.contains(&token) {
                continue;
            }
            if normalized_query.contains(&token) || lowered_query.contains(&variant.to_lowercase()) {
                seen.insert(token);
                detected.push(variant);
                break;
            }
        }
    };

    for place in places {
        consider(&place.place_name, &mut detected);
        consider(&place.name, &mut detected);
        consider(&place.city, &mut detected);
        if detected.len() >= limit {
            break;
        }
    }
    if detected.len() < limit {
        'types: for place in places {
            for kind in &place.types {
                consider(kind, &mut detected);
                if detected.len() >= limit {
                    break 'types;
                }
            }
        }
    }
    detected
}

/// Trimmed, non-empty, de-duplicated ignoring case, first spelling wins.
pub fn merge_keywords<I, S>(keywords: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    keywords
        .into_iter()
        .filter_map(|k| {
            let text = k.as_ref().trim();
            (!text.is_empty() && seen.insert(text.to_lowercase())).then(|| text.to_string())
        })
        .collect()
}

pub fn contains_local_reference(text: &str, terms: &[String]) -> bool {
    let lowered = text.to_lowercase();
    terms.iter().any(|term| !term.is_empty() && lowered.contains(term.as_str()))
}

/// The question names a province, or a model-extracted place, that is not
/// in Samut Songkhram.
pub fn mentions_other_province(query: &str, keyword_pool: &[String], places: &[String], terms: &[String]) -> bool {
    let normalized = query.to_lowercase();
    if let Some(name) = PROVINCE_MENTION.captures(&normalized).and_then(|c| c.get(1)) {
        if !contains_local_reference(name.as_str(), terms) {
            return true;
        }
    }
    if places
        .iter()
        .any(|p| !p.trim().is_empty() && !contains_local_reference(p, terms))
    {
        return true;
    }
    keyword_pool.iter().any(|k| {
        let lowered = k.to_lowercase();
        lowered.contains("จังหวัด") && !contains_local_reference(&lowered, terms)
    })
}

/// Curated trip plans the question asks for, skipping ones already matched.
pub fn select_trip_guides(query: &str, guides: &HashMap<String, Place>, existing: &[Place]) -> Vec<Place> {
    if guides.is_empty() {
        return Vec::new();
    }
    let normalized = query.to_lowercase();
    let mut seen_ids: HashSet<String> = existing.iter().map(|p| p.id.clone()).collect();
    let mut seen_titles: HashSet<String> = existing
        .iter()
        .map(|p| normalize_name_token(p.display_name()))
        .filter(|t| !t.is_empty())
        .collect();

    let wanted: [(&str, &[&str]); 3] = [
        ("9temples", &["9 วัด", "๙ วัด", "ไหว้พระ", "temple tour", "nine temples"]),
        ("2days1nighttrip", &["2 วัน", "สองวัน", "2-day", "2 day", "1 คืน", "ค้างคืน", "2d1n", "weekend"]),
        ("1daytrip", &["1 วัน", "วันเดียว", "ครึ่งวัน", "half day", "one day"]),
    ];

    let mut matches = Vec::new();
    for (slug, phrases) in wanted {
        if !phrases.iter().any(|p| normalized.contains(p)) {
            continue;
        }
        let Some(guide) = guides.get(slug) else {
            continue;
        };
        let title = normalize_name_token(guide.display_name());
        if seen_ids.contains(&guide.id) || (!title.is_empty() && seen_titles.contains(&title)) {
            continue;
        }
        seen_ids.insert(guide.id.clone());
        if !title.is_empty() {
            seen_titles.insert(title);
        }
        matches.push(guide.clone());
    }
    matches
}

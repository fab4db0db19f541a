use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;

const THAI_MIN: char = '\u{0E00}';
const THAI_MAX: char = '\u{0E7F}';

lazy_static! {
    static ref WORD: Regex = Regex::new(r"\w+").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Th,
    En,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::Th => "th",
            Language::En => "en",
        }
    }

    /// Pick the Thai or English variant.
    pub fn pick<'a>(self, th: &'a str, en: &'a str) -> &'a str {
        match self {
            Language::Th => th,
            Language::En => en,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

fn is_thai_char(c: char) -> bool {
    (THAI_MIN..=THAI_MAX).contains(&c)
}

/// Thai wins as soon as a single Thai character shows up.
pub fn detect_language(text: &str) -> Language {
    if text.is_empty() || is_thai_text(text) {
        Language::Th
    } else {
        Language::En
    }
}

pub fn is_thai_text(text: &str) -> bool {
    text.chars().any(is_thai_char)
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Char-based truncation, `suffix` included in `max_length`.
pub fn truncate_text(text: &str, max_length: usize, suffix: &str) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }
    let keep = max_length.saturating_sub(suffix.chars().count());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(suffix);
    out
}

pub fn extract_keywords(text: &str, min_length: usize) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut seen = HashSet::new();
    WORD.find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .filter(|w| w.chars().count() >= min_length)
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

/// Lowercase and keep only ASCII alphanumerics and Thai characters.
pub fn normalize_name_token(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || is_thai_char(*c))
        .collect()
}

pub fn slugify_identifier(text: &str) -> String {
    if text.is_empty() {
        return short_hash("default");
    }
    let lowered = text.trim().to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut pending_dash = false;
    for c in lowered.chars() {
        if c.is_ascii_alphanumeric() || is_thai_char(c) {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        short_hash(text)
    } else {
        slug
    }
}

/// First ten hex chars of the sha256 digest.
pub fn short_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..10].to_string()
}

/// "Wat Bang Kung (วัดบางกุ้ง)" -> whole value, the part before the
/// parenthesis, the part inside it; "a/b" adds each side.
pub fn name_variations(value: &str) -> Vec<String> {
    let mut variants: Vec<String> = Vec::new();
    let mut add = |text: &str| {
        let cleaned = text.trim();
        if !cleaned.is_empty() && !variants.iter().any(|v| v == cleaned) {
            variants.push(cleaned.to_string());
        }
    };

    add(value);
    if let Some((before, remainder)) = value.split_once('(') {
        add(before);
        let inner = remainder.split_once(')').map(|(i, _)| i).unwrap_or(remainder);
        add(inner);
    }
    if value.contains('/') {
        for part in value.split('/') {
            add(part);
        }
    }
    variants
}

pub fn normalized_query_key(text: &str) -> String {
    normalize_whitespace(text).to_lowercase()
}

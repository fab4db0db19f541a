use super::keywords::auto_detect_keywords;
use crate::places::Place;
use crate::text::normalize_name_token;

pub const SPECIFIC: &str = "specific";
pub const GENERAL: &str = "general";

const SPECIFIC_INDICATORS: &[&str] = &[
    "อยู่ที่ไหน", "where is", "อยู่ตรงไหน", "ที่อยู่",
    "เกี่ยวกับ", "about", "tell me about", "บอกเกี่ยวกับ",
    "คือ", "คืออะไร", "what is", "เป็นอย่างไร",
    "ไปยังไง", "how to get", "วิธีไป", "เดินทางไป",
];

const GENERAL_INDICATORS: &[&str] = &[
    "แนะนำ", "recommend", "suggestion", "มีอะไร", "what",
    "บ้าง", "some", "ไหนดี", "where should", "ควรไป",
    "อยากไป", "want to visit", "หา", "find", "looking for",
    "มี", "are there", "any", "list",
];

const MAIN_ATTRACTION_INDICATORS: &[&str] = &[
    "สถานที่ท่องเที่ยว", "ที่เที่ยวหลัก", "ที่เที่ยวสำคัญ", "แหล่งท่องเที่ยว",
    "จุดท่องเที่ยว", "อัตราคะแนนสูง", "มีชื่อเสียง", "ดังที่สุด", "หลัก",
    "main attractions", "primary attractions", "major attractions",
    "top attractions", "best attractions", "famous places",
    "must see", "must visit", "landmark",
];

const CATEGORY_WORDS: &[&str] = &[
    "ร้านอาหาร", "ที่กิน", "อาหาร", "restaurant", "food",
    "ที่พัก", "โรงแรม", "รีสอร์ท", "accommodation", "hotel",
    "วัด", "temple", "สถานที่", "แหล่ง", "place",
    "ตลาด", "market", "ทะเล", "sea", "beach",
    "ชุมชน", "community", "museum", "พิพิธภัณฑ์",
    "แนะนำ", "recommend", "suggest", "เที่ยว", "travel",
    "visit", "ไปไหน", "where", "ดี", "good", "น่าสนใจ",
    "interesting", "มีอะไร", "what", "บ้าง", "some",
];

const MULTIPLE_WORDS: &[&str] = &["บ้าง", "มีอะไร", "แนะนำ", "หลาย", "several", "some", "list", "ไหน"];

const GREETINGS_TH: &[&str] = &["สวัสดี", "หวัดดี", "ดีจ้า"];
const GREETINGS_EN: &[&str] = &["hello", "hi", "hey", "greetings"];

// only the first N places are scanned for a name mention
const NAME_SCAN_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct IntentClassification {
    pub intent_type: &'static str,
    pub keywords: Vec<String>,
    pub clean_question: String,
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// `specific` when a known place is named, or the question asks about one
/// thing without asking for suggestions. `general` otherwise.
pub fn classify_intent(query: &str, places: &[Place]) -> IntentClassification {
    let clean_question = query.trim().to_string();
    let normalized = clean_question.to_lowercase();
    let query_token = normalize_name_token(&normalized);

    let mut keywords = Vec::new();
    let named = places.iter().take(NAME_SCAN_LIMIT).find_map(|place| {
        [place.place_name.as_str(), place.name.as_str()]
            .into_iter()
            .filter(|name| name.chars().count() >= 3)
            .find(|name| {
                let token = normalize_name_token(name);
                !token.is_empty() && query_token.contains(&token)
            })
    });
    if let Some(name) = named {
        keywords.push(name.to_string());
    }

    let has_specific = contains_any(&normalized, SPECIFIC_INDICATORS);
    let has_general = contains_any(&normalized, GENERAL_INDICATORS);
    let intent_type = if named.is_some() || (has_specific && !has_general) { SPECIFIC } else { GENERAL };

    if keywords.is_empty() {
        keywords = auto_detect_keywords(query, places, 3);
    }

    IntentClassification { intent_type, keywords, clean_question }
}

/// Thai greetings match anywhere, English ones only as whole words so
/// "things" or "which" do not count.
pub fn is_greeting(query: &str) -> bool {
    let lowered = query.trim().to_lowercase();
    if lowered.is_empty() {
        return false;
    }
    if contains_any(&lowered, GREETINGS_TH) {
        return true;
    }
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| GREETINGS_EN.contains(&word))
}

pub fn is_main_attractions_query(query: &str) -> bool {
    contains_any(&query.to_lowercase(), MAIN_ATTRACTION_INDICATORS)
}

/// True when the top match is the one place the user named.
pub fn is_specific_place_query(query: &str, matched: &[Place]) -> bool {
    let Some(top) = matched.first() else {
        return false;
    };
    let normalized = query.to_lowercase();
    if contains_any(&normalized, CATEGORY_WORDS) && contains_any(&normalized, MULTIPLE_WORDS) {
        return false;
    }

    let query_token = normalize_name_token(&normalized);
    if query_token.is_empty() {
        return false;
    }
    let short_query = normalized.split_whitespace().count() <= 3;
    [top.place_name.as_str(), top.name.as_str()].into_iter().any(|name| {
        let token = normalize_name_token(name);
        !token.is_empty()
            && ((token.chars().count() >= 3 && query_token.contains(&token))
                || (short_query && token == query_token))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::places::catalog::tests::sample_places;

    #[test]
    fn named_place_is_specific() {
        let places = sample_places();
        let intent = classify_intent("  ตลาดน้ำอัมพวา เปิดกี่โมง ", &places);
        assert_eq!(intent.intent_type, SPECIFIC);
        assert_eq!(intent.keywords, vec!["ตลาดน้ำอัมพวา"]);
        assert_eq!(intent.clean_question, "ตลาดน้ำอัมพวา เปิดกี่โมง");
    }

    #[test]
    fn recommendation_request_is_general() {
        let places = sample_places();
        let intent = classify_intent("Can you recommend a cafe?", &places);
        assert_eq!(intent.intent_type, GENERAL);
        assert_eq!(intent.keywords, vec!["cafe"]);
    }

    #[test]
    fn specific_indicator_without_general_one() {
        let intent = classify_intent("Tell me about the floating market", &[]);
        assert_eq!(intent.intent_type, SPECIFIC);
        assert!(intent.keywords.is_empty());
    }

    #[test]
    fn greetings() {
        assert!(is_greeting("สวัสดีค่ะ"));
        assert!(is_greeting("Hi there"));
        assert!(!is_greeting("Things to do in Amphawa"));
        assert!(!is_greeting("   "));
    }

    #[test]
    fn main_attractions() {
        assert!(is_main_attractions_query("แนะนำสถานที่ท่องเที่ยวหน่อย"));
        assert!(is_main_attractions_query("What are the TOP ATTRACTIONS?"));
        assert!(!is_main_attractions_query("cafe near the river"));
    }

    #[test]
    fn specific_place_detection() {
        let places = sample_places();
        let amphawa = vec![places[0].clone(), places[1].clone()];
        assert!(is_specific_place_query("ตลาดน้ำอัมพวา", &amphawa));
        assert!(!is_specific_place_query("แนะนำตลาดบ้าง", &amphawa));
        assert!(!is_specific_place_query("Don Hoi Lot", &amphawa));
        assert!(!is_specific_place_query("anything", &[]));
    }
}

// question -> travel topic keyword table
struct Topic {
    name: &'static str,
    keywords: &'static [&'static str],
}

const TOPICS: &[Topic] = &[
    Topic {
        name: "amphawa",
        keywords: &["อัมพวา", "amphawa", "ตลาดน้ำ", "floating market", "หิ่งห้อย", "firefly"],
    },
    Topic {
        name: "bang_kung",
        keywords: &["บางกุ้ง", "bang kung", "โบสถ์ปรกโพธิ์", "banyan"],
    },
    Topic {
        name: "khlong_khon",
        keywords: &["คลองโคน", "khlong khon", "ป่าชายเลน", "mangrove", "ลิงแสม"],
    },
    Topic {
        name: "food",
        keywords: &["อาหาร", "ร้านอาหาร", "ที่กิน", "กิน", "food", "restaurant", "eat", "seafood", "อาหารทะเล", "คาเฟ่", "cafe"],
    },
    Topic {
        name: "accommodation",
        keywords: &["ที่พัก", "โรงแรม", "รีสอร์ท", "โฮมสเตย์", "hotel", "resort", "homestay", "accommodation", "stay"],
    },
    Topic {
        name: "transportation",
        keywords: &["เดินทาง", "รถ", "เรือ", "ไปยังไง", "how to get", "bus", "train", "boat", "transport"],
    },
    Topic {
        name: "general_travel",
        keywords: &["เที่ยว", "ท่องเที่ยว", "travel", "trip", "visit", "attraction", "ที่เที่ยว", "แนะนำ", "recommend"],
    },
];

const LOCAL_MARKERS: &[&str] = &[
    "สมุทรสงคราม",
    "samut songkhram",
    "samutsongkhram",
    "แม่กลอง",
    "maeklong",
    "mae klong",
    "อัมพวา",
    "amphawa",
    "บางคนที",
    "bang khonthi",
    "ดอนหอยหลอด",
    "don hoi lot",
];

#[derive(Debug, Clone, Default)]
pub struct TopicMatcher;

impl TopicMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Best topic and a confidence in `[0, 1]`. Any hit counts for at least 0.5.
    pub fn find_best_match(&self, query: &str) -> (Option<&'static str>, f64) {
        let lowered = query.to_lowercase();
        let mut best: Option<(&'static str, usize, usize)> = None;
        for topic in TOPICS {
            let hits = topic.keywords.iter().filter(|k| lowered.contains(*k)).count();
            if hits == 0 {
                continue;
            }
            if best.is_none_or(|(_, best_hits, _)| hits > best_hits) {
                best = Some((topic.name, hits, topic.keywords.len()));
            }
        }
        match best {
            Some((name, hits, total)) => {
                let ratio = hits as f64 / total as f64;
                (Some(name), ratio.max(0.5).min(1.0))
            }
            None => (None, 0.0),
        }
    }

    pub fn is_local(&self, query: &str) -> bool {
        let lowered = query.to_lowercase();
        LOCAL_MARKERS.iter().any(|m| lowered.contains(m))
    }

    pub fn topic_keywords(&self, topic: &str) -> Vec<String> {
        TOPICS
            .iter()
            .find(|t| t.name == topic)
            .map(|t| t.keywords.iter().map(|k| k.to_string()).collect())
            .unwrap_or_default()
    }
}

/// Coarse intent label for a matched topic.
pub fn intent_from_topic(topic: Option<&str>) -> &'static str {
    match topic {
        Some("general_travel" | "amphawa" | "bang_kung" | "khlong_khon") => "attractions",
        Some("food") => "restaurants",
        Some("accommodation") => "accommodation",
        Some("transportation") => "transportation",
        _ => "general",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_topic_with_most_hits() {
        let matcher = TopicMatcher::new();
        let (topic, confidence) = matcher.find_best_match("Where to eat seafood near the restaurant street?");
        assert_eq!(topic, Some("food"));
        assert!(confidence >= 0.5);
    }

    #[test]
    fn no_hit_means_no_topic() {
        let matcher = TopicMatcher::new();
        assert_eq!(matcher.find_best_match("xyz"), (None, 0.0));
    }

    #[test]
    fn locality_markers() {
        let matcher = TopicMatcher::new();
        assert!(matcher.is_local("ไปดอนหอยหลอดยังไง"));
        assert!(matcher.is_local("Things to do in Mae Klong"));
        assert!(!matcher.is_local("Things to do in Chiang Mai"));
    }

    #[test]
    fn topic_to_intent() {
        assert_eq!(intent_from_topic(Some("amphawa")), "attractions");
        assert_eq!(intent_from_topic(Some("food")), "restaurants");
        assert_eq!(intent_from_topic(None), "general");
        assert!(TopicMatcher::new().topic_keywords("food").contains(&"seafood".to_string()));
    }
}

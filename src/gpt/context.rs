use serde::Deserialize;

use super::AnswerRequest;
use crate::models::{ChatMessage, DataStatus, Role};
use crate::places::Place;
use crate::prompts::PromptBook;
use crate::text::{Language, detect_language, truncate_text};

const MAX_USER_MESSAGE_CHARS: usize = 8000;
const MAX_HISTORY_MESSAGES: usize = 10;

/// Render verified places for the model: detail cards for a specific
/// question, one-line summaries otherwise.
pub fn format_context_data(context: &[Place], data_type: &str, intent_type: Option<&str>) -> String {
    if context.is_empty() {
        return format!("No verified {} data available.", data_type);
    }

    let specific = intent_type == Some("specific");
    let max_items = if specific { 3 } else { 6 };

    let mut parts = vec![format!("=== VERIFIED DATA ({}) ===\n", data_type.to_uppercase())];
    for (idx, place) in context.iter().take(max_items).enumerate() {
        parts.push(format!("\n[Place {}]", idx + 1));
        parts.push(format!("Name: {}", place.display_name()));

        match place.area() {
            Some(district) => parts.push(format!("Location: {}, {}", district, place.province)),
            None if !place.province.is_empty() => parts.push(format!("Location: {}", place.province)),
            None => {}
        }

        let detail = place.place_information.detail.as_str();
        if specific {
            if !detail.is_empty() {
                parts.push(format!("Description: {}", detail));
            }
            if !place.description.is_empty() && place.description != detail {
                parts.push(format!("Summary: {}", place.description));
            }
            if let Some(hours) = &place.opening_hours {
                parts.push(format!("Opening Hours: {}", hours));
            }
            if let Some(category) = place
                .category
                .as_ref()
                .or(place.place_information.category_description.as_ref())
            {
                parts.push(format!("Category: {}", category));
            }
            if let Some(best_time) = &place.best_time {
                parts.push(format!("Best Time: {}", best_time));
            }
            if let Some(price) = &place.price_range {
                parts.push(format!("Cost: {}", price));
            }
            if !place.tips.is_empty() {
                parts.push(format!("Tips: {}", first_three(&place.tips)));
            }
            if !place.highlights.is_empty() {
                parts.push(format!("Highlights: {}", first_three(&place.highlights)));
            }
            if let (Some(lat), Some(lon)) = (place.latitude, place.longitude) {
                parts.push(format!("Coordinates: {}, {}", lat, lon));
            }
        } else {
            let summary = if detail.is_empty() { place.description.as_str() } else { detail };
            if !summary.is_empty() {
                parts.push(format!("Summary: {}", summary));
            }
        }
    }
    parts.push("\n=== END DATA ===".to_string());
    parts.join("\n")
}

fn first_three(items: &[String]) -> String {
    items.iter().take(3).cloned().collect::<Vec<_>>().join("; ")
}

pub fn status_note(prompts: &PromptBook, status: Option<&DataStatus>, has_data: bool) -> String {
    let Some(status) = status else {
        return String::new();
    };
    if status.success && !has_data {
        return prompts.search_context.no_data.clone();
    }
    if status.success {
        return String::new();
    }
    let reason = if status.message.is_empty() { "an unknown issue" } else { status.message.as_str() };
    prompts.search_context.error.replace("{reason}", reason)
}

pub fn preference_note(prompts: &PromptBook) -> String {
    let prefs = &prompts.preferences;
    let mut parts = Vec::new();
    if let Some(tone) = &prefs.tone {
        parts.push(format!("Respond with tone: {}", tone));
    }
    if let Some(style) = &prefs.response_style {
        parts.push(format!("Style: {}", style));
    }
    if let Some(format) = &prefs.format {
        parts.push(format!("Format focus: {}", format));
    }
    if let Some(cta) = &prefs.call_to_action {
        parts.push(cta.clone());
    }
    parts.join(" | ")
}

pub fn search_instruction(language: Language) -> &'static str {
    language.pick(
        "ให้ผสมผสานความรู้หรือการค้นหาของคุณกับข้อมูลยืนยันด้านล่างเกี่ยวกับการท่องเที่ยวสมุทรสงคราม \
         โดยยึดข้อมูลจากไฟล์เป็นหลัก และหากมีข้อมูลทั่วไปเพิ่มเติมให้ระบุให้ชัดเจน\n\
         เขียนคำตอบให้ยาวขึ้นและรายละเอียดมากขึ้น รวมถึงข้อมูลเกี่ยวกับวิธีการเดินทาง เวลาเปิด ค่าเข้า ตัวอย่าง และคำแนะนำปฏิบัติที่เป็นประโยชน์",
        "Combine any reliable knowledge you have with the verified Samut Songkhram dataset below, \
         favoring the dataset when conflicts arise and labelling additional insights as general knowledge. \
         Write detailed and comprehensive responses including transportation, hours, fees, examples, and practical tips.",
    )
}

pub fn context_guardrail(language: Language, context_count: usize) -> String {
    if context_count > 0 {
        return match language {
            Language::Th => format!(
                "คุณมีข้อมูลยืนยันแล้ว {} รายการจากฐานข้อมูลสมุทรสงคราม \
                 ให้อ้างอิงข้อมูลเหล่านี้เป็นหลัก จัดระเบียบคำแนะนำให้เกี่ยวข้องกับทุกจุด \
                 ให้รายละเอียดเต็มเปี่ยมเกี่ยวกับสถานที่นั้นๆ วิธีเดินทาง เวลา ค่าใช้จ่าย และข้อมูลปฏิบัติสำคัญ \
                 และหากต้องเพิ่มข้อมูลทั่วไปต้องระบุว่าเป็นข้อมูลเสริม",
                context_count
            ),
            Language::En => format!(
                "You have {} verified Samut Songkhram entries. \
                 Base recommendations on them, provide comprehensive details about each location including directions, hours, fees, and practical information, \
                 cover each entry clearly, and explicitly label any extra general-knowledge hints.",
                context_count
            ),
        };
    }
    language
        .pick(
            "ยังไม่มีข้อมูลยืนยันจากฐานข้อมูลให้ใช้อ้างอิง ให้แจ้งข้อจำกัดนี้กับผู้ใช้ \
             พร้อมตอบด้วยความรู้ทั่วไปที่เชื่อถือได้เท่านั้น ให้รายละเอียดและครอบคลุม และเชิญชวนให้ผู้ใช้ระบุรายละเอียดเพิ่มเติม",
            "No verified dataset is available for this turn. Make the limitation explicit, \
             answer with trusted general knowledge only with comprehensive details, and invite the user to share more specifics.",
        )
        .to_string()
}

pub fn fallback_response(prompts: &PromptBook, language: Language, query: &str) -> String {
    prompts
        .prompt(
            language,
            &["fallback"],
            "ขออภัยค่ะ ขณะนี้ระบบ AI ไม่พร้อมให้บริการ\n\nกรุณาลองใหม่อีกครั้งในภายหลัง และนี่คือคำถามของคุณ: {query}",
            "Sorry, the AI system is currently unavailable.\n\nPlease try again later. Here is your question for reference: {query}",
        )
        .replace("{query}", query)
}

pub fn user_message(prompts: &PromptBook, req: &AnswerRequest<'_>) -> String {
    let language = detect_language(req.query);
    let mut parts = vec![format!("User Query: {}", req.query)];
    if let Some(intent) = req.intent {
        parts.push(format!("Detected Intent: {}", intent));
    }
    if let Some(intent_type) = req.intent_type {
        let label = if intent_type == "specific" {
            "specific place query"
        } else {
            "general recommendations"
        };
        parts.push(format!("Intent Type: {} ({})", intent_type, label));
    }
    parts.push(status_note(prompts, req.status, !req.context.is_empty()));
    parts.push(preference_note(prompts));
    parts.push(search_instruction(language).to_string());
    parts.push(context_guardrail(language, req.context.len()));
    parts.push(format_context_data(req.context, req.data_type, req.intent_type));

    let joined = parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    truncate_text(&joined, MAX_USER_MESSAGE_CHARS, "")
}

/// System prompt, the last ten history turns, then the assembled question.
pub fn build_messages(prompts: &PromptBook, req: &AnswerRequest<'_>) -> Vec<ChatMessage> {
    let language = detect_language(req.query);
    let system = req
        .system_override
        .map(str::to_string)
        .unwrap_or_else(|| prompts.system_prompt(language).to_string());

    let mut messages = vec![ChatMessage::new(Role::System, system)];
    let skip = req.history.len().saturating_sub(MAX_HISTORY_MESSAGES);
    messages.extend(req.history.iter().skip(skip).cloned());
    messages.push(ChatMessage::new(Role::User, user_message(prompts, req)));
    messages
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QueryEntities {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub places: Vec<String>,
}

/// Take the outermost `{...}` of a model reply and read it as entities.
pub fn parse_entities(content: &str) -> QueryEntities {
    let (Some(start), Some(end)) = (content.find('{'), content.rfind('}')) else {
        return QueryEntities::default();
    };
    if end <= start {
        return QueryEntities::default();
    }
    serde_json::from_str(&content[start..=end]).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::places::PlaceInformation;

    fn place(name: &str, detail: &str) -> Place {
        Place {
            id: name.to_lowercase(),
            name: name.to_string(),
            place_name: name.to_string(),
            description: detail.to_string(),
            city: "อัมพวา".to_string(),
            province: "สมุทรสงคราม".to_string(),
            opening_hours: Some("16:00-21:00".to_string()),
            place_information: PlaceInformation { detail: detail.to_string(), ..Default::default() },
            ..Default::default()
        }
    }

    #[test]
    fn empty_context_has_placeholder() {
        assert_eq!(format_context_data(&[], "travel", None), "No verified travel data available.");
    }

    #[test]
    fn specific_context_shows_details() {
        let text = format_context_data(&[place("Amphawa", "Evening market")], "travel", Some("specific"));
        assert!(text.starts_with("=== VERIFIED DATA (TRAVEL) ==="));
        assert!(text.contains("Location: อัมพวา, สมุทรสงคราม"));
        assert!(text.contains("Description: Evening market"));
        assert!(text.contains("Opening Hours: 16:00-21:00"));
        assert!(text.ends_with("=== END DATA ==="));
    }

    #[test]
    fn general_context_is_capped_at_six() {
        let places: Vec<Place> = (0..8).map(|i| place(&format!("P{}", i), "x")).collect();
        let text = format_context_data(&places, "travel", Some("general"));
        assert!(text.contains("[Place 6]"));
        assert!(!text.contains("[Place 7]"));
        assert!(!text.contains("Opening Hours"));
    }

    #[test]
    fn status_note_variants() {
        let prompts = PromptBook::default();
        let ok = DataStatus { success: true, ..Default::default() };
        assert_eq!(status_note(&prompts, Some(&ok), true), "");
        assert!(status_note(&prompts, Some(&ok), false).contains("no verified local dataset"));
        let failed = DataStatus { success: false, message: "db down".into(), ..Default::default() };
        assert!(status_note(&prompts, Some(&failed), false).contains("due to db down"));
        assert_eq!(status_note(&prompts, None, false), "");
    }

    #[test]
    fn messages_keep_last_ten_history_turns() {
        let prompts = PromptBook::default();
        let history: Vec<ChatMessage> = (0..14)
            .map(|i| ChatMessage::new(if i % 2 == 0 { Role::User } else { Role::Assistant }, format!("m{}", i)))
            .collect();
        let req = AnswerRequest {
            query: "where to eat",
            history: &history,
            ..AnswerRequest::default()
        };
        let messages = build_messages(&prompts, &req);
        assert_eq!(messages.len(), 12);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, "m4");
        assert!(messages[11].content.starts_with("User Query: where to eat"));
    }

    #[test]
    fn fallback_embeds_query() {
        let prompts = PromptBook::default();
        let text = fallback_response(&prompts, Language::En, "boat tour?");
        assert!(text.ends_with("boat tour?"));
    }

    #[test]
    fn parses_entities_inside_prose() {
        let parsed = parse_entities("Sure! {\"keywords\": [\"market\"], \"places\": [\"Amphawa\"]} done");
        assert_eq!(parsed.keywords, vec!["market"]);
        assert_eq!(parsed.places, vec!["Amphawa"]);
        assert_eq!(parse_entities("no json"), QueryEntities::default());
        assert_eq!(parse_entities("} {"), QueryEntities::default());
    }
}

use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

use crate::text::Language;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LocalizedText {
    #[serde(default)]
    pub th: String,
    #[serde(default)]
    pub en: String,
}

impl LocalizedText {
    fn new(th: &str, en: &str) -> Self {
        Self { th: th.to_string(), en: en.to_string() }
    }

    pub fn get(&self, language: Language) -> &str {
        match language {
            Language::Th => &self.th,
            Language::En if self.en.is_empty() => &self.th,
            Language::En => &self.en,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CharacterProfile {
    pub name: String,
    pub characteristics: Vec<String>,
    pub knowledge_scope: Vec<String>,
    pub greeting: LocalizedText,
}

impl Default for CharacterProfile {
    fn default() -> Self {
        Self {
            name: "NongPlaToo".to_string(),
            characteristics: vec![
                "Friendly local guide".to_string(),
                "Warm and cheerful tone".to_string(),
            ],
            knowledge_scope: vec![
                "Samut Songkhram attractions".to_string(),
                "food".to_string(),
                "accommodation".to_string(),
                "transportation".to_string(),
            ],
            greeting: LocalizedText::new(
                "สวัสดีค่ะ! น้องปลาทูพร้อมช่วยแนะนำทริปในสมุทรสงครามให้เลยค่ะ",
                "Hello! I'm Nong Pla Too, happy to help plan your Samut Songkhram adventures!",
            ),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Preferences {
    pub tone: Option<String>,
    pub response_style: Option<String>,
    pub format: Option<String>,
    pub call_to_action: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchingLimits {
    pub max_matches: usize,
    pub max_display: usize,
}

impl Default for MatchingLimits {
    fn default() -> Self {
        Self { max_matches: 50, max_display: 6 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompletionParams {
    pub temperature: f32,
    pub max_completion_tokens: u32,
    pub top_p: f32,
    pub timeout_seconds: Option<u64>,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self { temperature: 0.8, max_completion_tokens: 600, top_p: 1.0, timeout_seconds: None }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    pub default_model: String,
    pub chat: CompletionParams,
    pub greeting: CompletionParams,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_string(),
            chat: CompletionParams::default(),
            greeting: CompletionParams { max_completion_tokens: 150, ..Default::default() },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchContextPrompts {
    pub no_data: String,
    pub error: String,
}

impl Default for SearchContextPrompts {
    fn default() -> Self {
        Self {
            no_data: "There is no verified local dataset available for this query. Respond with general knowledge.".to_string(),
            error: "Local travel data is unavailable due to {reason}. Provide a helpful response using general knowledge and mention the limitation.".to_string(),
        }
    }
}

// built-in defaults, a --prompts-file JSON overrides any subset
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptBook {
    pub system: LocalizedText,
    pub character: CharacterProfile,
    pub preferences: Preferences,
    pub matching: MatchingLimits,
    pub model: ModelParams,
    /// Free-form answer templates, looked up by path (`simple_response/intro`).
    pub answer: Value,
    pub search_context: SearchContextPrompts,
    pub local_terms: Vec<String>,
}

impl Default for PromptBook {
    fn default() -> Self {
        Self {
            system: LocalizedText::new(
                "คุณคือน้องปลาทู แอดมิน AI ผู้ช่วยแนะนำการท่องเที่ยวจังหวัดสมุทรสงคราม ตอบอย่างอบอุ่น เป็นมิตร และถูกต้องตามข้อมูล",
                "You are Nong Pla Too, a friendly AI travel assistant for Samut Songkhram province. Answer warmly and stay faithful to the provided data.",
            ),
            character: CharacterProfile::default(),
            preferences: Preferences::default(),
            matching: MatchingLimits::default(),
            model: ModelParams::default(),
            answer: Value::Null,
            search_context: SearchContextPrompts::default(),
            local_terms: vec!["สมุทรสงคราม".to_string(), "samut songkhram".to_string()],
        }
    }
}

impl PromptBook {
    pub fn load(path: &Path) -> Result<Self, String> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
        serde_json::from_str(&raw).map_err(|e| format!("cannot parse {}: {}", path.display(), e))
    }

    pub fn system_prompt(&self, language: Language) -> &str {
        self.system.get(language)
    }

    pub fn greeting(&self, language: Language) -> &str {
        self.character.greeting.get(language)
    }

    /// `Preferred tone: .. | Response style: .. | Format guide: .. | <cta>`
    pub fn preference_context(&self) -> String {
        let prefs = &self.preferences;
        let mut parts = Vec::new();
        if let Some(tone) = &prefs.tone {
            parts.push(format!("Preferred tone: {}", tone));
        }
        if let Some(style) = &prefs.response_style {
            parts.push(format!("Response style: {}", style));
        }
        if let Some(format) = &prefs.format {
            parts.push(format!("Format guide: {}", format));
        }
        if let Some(cta) = &prefs.call_to_action {
            parts.push(cta.clone());
        }
        parts.join(" | ")
    }

    pub fn character_context(&self) -> String {
        let profile = &self.character;
        let mut parts = Vec::new();
        if !profile.name.is_empty() {
            parts.push(format!("Character: {}", profile.name));
        }
        parts.extend(profile.characteristics.iter().cloned());
        if !profile.knowledge_scope.is_empty() {
            parts.push(format!("Knowledge scope: {}", profile.knowledge_scope.join(", ")));
        }
        parts.join(" | ")
    }

    /// Resolve `path` in the answer templates. A string node is used as is,
    /// a map node is indexed by language code, anything else falls back.
    pub fn prompt(&self, language: Language, path: &[&str], default_th: &str, default_en: &str) -> String {
        let fallback = language.pick(default_th, default_en);
        let mut node = &self.answer;
        for key in path {
            match node.get(key) {
                Some(next) => node = next,
                None => return fallback.to_string(),
            }
        }
        match node {
            Value::String(s) => s.clone(),
            Value::Object(map) => map
                .get(language.code())
                .and_then(Value::as_str)
                .unwrap_or(fallback)
                .to_string(),
            _ => fallback.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_cover_persona() {
        let book = PromptBook::default();
        assert_eq!(book.model.default_model, DEFAULT_MODEL);
        assert!(book.greeting(Language::Th).contains("น้องปลาทู"));
        assert_eq!(book.matching.max_display, 6);
        assert!(book.character_context().starts_with("Character: NongPlaToo"));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let book: PromptBook = serde_json::from_value(json!({
            "preferences": {"tone": "playful", "call_to_action": "Ask me more!"},
            "matching": {"max_display": 4}
        }))
        .unwrap();
        assert_eq!(book.preference_context(), "Preferred tone: playful | Ask me more!");
        assert_eq!(book.matching.max_display, 4);
        assert_eq!(book.matching.max_matches, 50);
        assert!(!book.system_prompt(Language::En).is_empty());
    }

    #[test]
    fn prompt_lookup_by_path() {
        let book: PromptBook = serde_json::from_value(json!({
            "answer": {
                "empty_query": "type something",
                "simple_response": {"intro": {"th": "มี {count} ที่", "en": "{count} spots"}}
            }
        }))
        .unwrap();
        assert_eq!(book.prompt(Language::En, &["empty_query"], "th", "en"), "type something");
        assert_eq!(book.prompt(Language::En, &["simple_response", "intro"], "", ""), "{count} spots");
        assert_eq!(book.prompt(Language::Th, &["simple_response", "outro"], "d-th", "d-en"), "d-th");
        assert_eq!(book.prompt(Language::En, &["missing"], "d-th", "d-en"), "d-en");
    }
}

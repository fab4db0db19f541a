mod intent;
mod keywords;
mod reply;

pub use intent::{GENERAL, SPECIFIC, classify_intent, is_greeting, is_specific_place_query};
pub use keywords::{merge_keywords, mentions_other_province};
pub use reply::create_simple_response;

use futures::{Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{ResponseCache, make_cache_key};
use crate::dedup::RecentRequests;
use crate::gpt::{AnswerRequest, GptService, QueryEntities};
use crate::maps::MapsClient;
use crate::matcher::{TopicMatcher, intent_from_topic};
use crate::models::{ChatMessage, ChatResult, DataStatus, MatchingSignals, StreamEvent};
use crate::places::{Place, PlaceCatalog};
use crate::prompts::PromptBook;
use crate::text::{Language, detect_language};

const GOOGLE_FALLBACK_LIMIT: usize = 3;
const STREAMED_PLACES: usize = 5;
const DATA_TYPE: &str = "travel";

// Everything learned about a question before matching
struct Analysis {
    intent_type: &'static str,
    clean_question: String,
    keyword_pool: Vec<String>,
    entity_places: Vec<String>,
    signals: MatchingSignals,
    auto_keywords_used: bool,
}

// one per process, shared behind an Arc
pub struct Chatbot {
    catalog: PlaceCatalog,
    prompts: Arc<PromptBook>,
    matcher: TopicMatcher,
    gpt: Option<GptService>,
    maps: Option<MapsClient>,
    cache: ResponseCache,
    recent: RecentRequests,
}

impl Chatbot {
    pub fn new(
        catalog: PlaceCatalog,
        prompts: Arc<PromptBook>,
        cache_ttl: Duration,
        duplicate_window: Duration,
    ) -> Self {
        Self {
            catalog,
            prompts,
            matcher: TopicMatcher::new(),
            gpt: None,
            maps: None,
            cache: ResponseCache::new(cache_ttl),
            recent: RecentRequests::new(duplicate_window),
        }
    }

    pub fn with_gpt(mut self, gpt: GptService) -> Self {
        self.gpt = Some(gpt);
        self
    }

    pub fn with_maps(mut self, maps: MapsClient) -> Self {
        self.maps = Some(maps);
        self
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    // expired answers out, places file re-read once stale
    pub async fn purge_expired(&self) -> usize {
        self.catalog.refresh().await;
        self.cache.purge_expired() + self.recent.purge_expired()
    }

    pub fn model(&self) -> &str {
        self.gpt
            .as_ref()
            .map(GptService::model)
            .unwrap_or(self.prompts.model.default_model.as_str())
    }

    fn local_terms(&self) -> Vec<String> {
        self.catalog.local_reference_terms(&self.prompts.local_terms)
    }

    fn data_status(&self, message: impl Into<String>, success: bool) -> DataStatus {
        DataStatus {
            success,
            message: message.into(),
            data_available: false,
            source: "local_json".to_string(),
            preference_note: self.prompts.preference_context(),
            character_note: self.prompts.character_context(),
            ..Default::default()
        }
    }

    fn greeting(&self, language: Language) -> ChatResult {
        ChatResult {
            response: self.prompts.greeting(language).to_string(),
            language,
            source: "greeting".to_string(),
            intent: Some("greeting".to_string()),
            data_status: Some(self.data_status("Greeting response", true)),
            ..Default::default()
        }
    }

    fn matcher_signals(&self, query: &str) -> MatchingSignals {
        if query.trim().is_empty() {
            return MatchingSignals::default();
        }
        let (topic, confidence) = self.matcher.find_best_match(query);
        MatchingSignals {
            topic: topic.map(str::to_string),
            topic_confidence: (confidence * 1000.0).round() / 1000.0,
            is_local: self.matcher.is_local(query),
            keywords: topic.map(|t| self.matcher.topic_keywords(t)).unwrap_or_default(),
        }
    }

    async fn query_entities(&self, query: &str) -> QueryEntities {
        let Some(gpt) = &self.gpt else {
            return QueryEntities::default();
        };
        let summary = self.catalog.dataset_summary();
        if query.trim().is_empty() || summary.is_empty() {
            return QueryEntities::default();
        }
        gpt.extract_query_entities(query, &summary).await
    }

    async fn analyze(&self, message: &str, places: &[Place]) -> Analysis {
        let intent = classify_intent(message, places);
        let (entities, mut signals) = tokio::join!(self.query_entities(&intent.clean_question), async {
            self.matcher_signals(&intent.clean_question)
        });

        let mut keyword_pool = merge_keywords(
            intent
                .keywords
                .iter()
                .chain(&entities.keywords)
                .chain(&entities.places)
                .chain(&signals.keywords),
        );
        let mut auto_keywords_used = false;
        if keyword_pool.is_empty() {
            let auto = keywords::auto_detect_keywords(message, places, keywords::DEFAULT_KEYWORD_LIMIT);
            if !auto.is_empty() {
                keyword_pool = merge_keywords(keyword_pool.iter().chain(&auto));
                auto_keywords_used = true;
            }
        }
        signals.keywords = keyword_pool.clone();

        Analysis {
            intent_type: intent.intent_type,
            clean_question: intent.clean_question,
            keyword_pool,
            entity_places: entities.places,
            signals,
            auto_keywords_used,
        }
    }

    /// Full-question search first, then two hits per keyword until `limit`.
    pub fn match_travel_data(&self, query: &str, keywords: &[String], limit: usize) -> Vec<Place> {
        let main_only = intent::is_main_attractions_query(query);
        let search = |keyword: &str, limit: usize| {
            if main_only {
                self.catalog.search_main_attractions(keyword, limit)
            } else {
                self.catalog.search(keyword, limit, None)
            }
        };

        let mut results = search(query, limit);
        for keyword in keywords {
            if results.len() >= limit {
                break;
            }
            for place in search(keyword, 2) {
                if !results.iter().any(|r| r.id == place.id) {
                    results.push(place);
                }
            }
        }
        results.truncate(limit);
        results
    }

    fn trim_structured_results(&self, places: Vec<Place>, is_specific_place: bool) -> Vec<Place> {
        let max = if is_specific_place { 1 } else { self.prompts.matching.max_display };
        let mut seen = std::collections::HashSet::new();
        places
            .into_iter()
            .filter(|p| seen.insert(p.id.clone()))
            .take(max)
            .collect()
    }

    fn finalize(&self, cache_key: Option<&str>, user_id: &str, query: &str, result: ChatResult) -> ChatResult {
        if let Some(key) = cache_key {
            self.recent.record(user_id, query, result.clone());
            self.cache.insert(key.to_string(), result.clone());
        }
        result
    }

    /// Answer one question, consulting the shared cache and the user's
    /// recent questions first.
    pub async fn get_response(&self, message: &str, user_id: &str, history: &[ChatMessage]) -> ChatResult {
        let language = detect_language(message);
        let trimmed = message.trim();
        let cache_key = (!trimmed.is_empty()).then(|| make_cache_key(trimmed));

        if let Some(key) = &cache_key {
            if let Some(hit) = self.cache.get(key) {
                return hit;
            }
            if let Some(mut replay) = self.recent.get(user_id, trimmed) {
                tracing::info!("Replaying duplicate question for user {}", user_id);
                replay.duplicate = true;
                replay.source = format!("{}_cached", replay.source);
                return replay;
            }
        }
        let key = cache_key.as_deref();

        if is_greeting(trimmed) {
            return self.finalize(key, user_id, trimmed, self.greeting(language));
        }

        let places = self.catalog.places();
        let mut analysis = self.analyze(message, &places).await;
        let limit = self.prompts.matching.max_matches;

        let mut matched = self.match_travel_data(message, &analysis.keyword_pool, limit);
        if matched.is_empty() && !analysis.auto_keywords_used {
            let auto = keywords::auto_detect_keywords(message, &places, keywords::DEFAULT_KEYWORD_LIMIT);
            if !auto.is_empty() {
                analysis.keyword_pool = merge_keywords(analysis.keyword_pool.iter().chain(&auto));
                analysis.signals.keywords = analysis.keyword_pool.clone();
                matched = self.match_travel_data(message, &analysis.keyword_pool, limit);
            }
        }

        let guides = self.catalog.trip_guides();
        let trips = keywords::select_trip_guides(message, &guides, &matched);
        matched.extend(trips);
        let is_specific_place = is_specific_place_query(message, &matched);
        matched = self.trim_structured_results(matched, is_specific_place);

        let terms = self.local_terms();
        let includes_local_term = keywords::contains_local_reference(message, &terms)
            || analysis
                .keyword_pool
                .iter()
                .any(|k| keywords::contains_local_reference(k, &terms))
            || analysis.signals.is_local;

        if matched.is_empty() && includes_local_term {
            if let Some(maps) = &self.maps {
                tracing::info!("No catalog results for query, trying Google Maps: {}", message);
                matched = maps.search(message, GOOGLE_FALLBACK_LIMIT).await;
            }
        }

        let other_province = !includes_local_term
            && mentions_other_province(message, &analysis.keyword_pool, &analysis.entity_places, &terms);

        let from_google = matched.first().is_some_and(Place::is_external);
        let status_message = if matched.is_empty() {
            format!(
                "No Samut Songkhram entries matched for keywords: {}",
                analysis.keyword_pool.join(", ")
            )
        } else if from_google {
            format!("Matched {} entries from web search", matched.len())
        } else {
            format!(
                "Matched {} entries using keywords: {}",
                matched.len(),
                analysis.keyword_pool.join(", ")
            )
        };
        let mut data_status = self.data_status(status_message, !matched.is_empty());
        data_status.intent_type = Some(analysis.intent_type.to_string());
        data_status.data_available = !matched.is_empty();
        if from_google {
            data_status.source = "google_search_fallback".to_string();
        }
        data_status.matching_signals = Some(analysis.signals.clone());

        if other_province {
            tracing::info!("Question is outside Samut Songkhram, declining");
            let mut status = data_status;
            status.message = "Out of supported province scope".to_string();
            status.data_available = false;
            return self.finalize(
                key,
                user_id,
                trimmed,
                ChatResult {
                    response: reply::OUT_OF_SCOPE.to_string(),
                    language,
                    source: "out_of_scope".to_string(),
                    intent: Some(GENERAL.to_string()),
                    data_status: Some(status),
                    ..Default::default()
                },
            );
        }

        if trimmed.is_empty() {
            return self.finalize(
                key,
                user_id,
                trimmed,
                ChatResult {
                    response: reply::empty_query(&self.prompts, language),
                    language,
                    source: "empty_query".to_string(),
                    data_status: Some(data_status),
                    ..Default::default()
                },
            );
        }

        let intent_label = analysis.intent_type.to_string();
        let result = match &self.gpt {
            Some(gpt) => {
                let answer = gpt
                    .generate_response(AnswerRequest {
                        query: &analysis.clean_question,
                        context: &matched,
                        data_type: DATA_TYPE,
                        intent: Some(analysis.intent_type),
                        intent_type: Some(analysis.intent_type),
                        status: Some(&data_status),
                        system_override: None,
                        history,
                    })
                    .await;
                match answer.error {
                    None => ChatResult {
                        response: answer.response,
                        structured_data: matched,
                        language,
                        source: answer.source,
                        intent: Some(intent_label),
                        tokens_used: answer.tokens_used,
                        character_note: Some(data_status.character_note.clone()),
                        data_status: Some(data_status),
                        ..Default::default()
                    },
                    Some(error) => ChatResult {
                        response: create_simple_response(&self.prompts, &matched, language, is_specific_place),
                        structured_data: matched,
                        language,
                        source: "simple_fallback".to_string(),
                        intent: Some(intent_label),
                        gpt_error: Some(error),
                        data_status: Some(data_status),
                        ..Default::default()
                    },
                }
            }
            None => ChatResult {
                response: create_simple_response(&self.prompts, &matched, language, is_specific_place),
                structured_data: matched,
                language,
                source: "simple".to_string(),
                intent: Some(intent_label),
                data_status: Some(data_status),
                ..Default::default()
            },
        };
        self.finalize(key, user_id, trimmed, result)
    }

    // persona-only answer when there is no place data at all
    async fn pure_gpt_response(&self, message: &str, language: Language) -> ChatResult {
        let mut status = self.data_status("Database unavailable; pure GPT persona response", false);
        status.source = "none".to_string();

        if let Some(gpt) = &self.gpt {
            let answer = gpt
                .generate_response(AnswerRequest {
                    query: message,
                    data_type: DATA_TYPE,
                    intent: Some(GENERAL),
                    status: Some(&status),
                    system_override: Some(reply::PERSONA_SYSTEM_HINT),
                    ..Default::default()
                })
                .await;
            if answer.error.is_none() {
                status.message = "Pure GPT fallback".to_string();
                return ChatResult {
                    response: answer.response,
                    language,
                    source: "gpt_fallback".to_string(),
                    intent: Some(GENERAL.to_string()),
                    tokens_used: answer.tokens_used,
                    data_status: Some(status),
                    ..Default::default()
                };
            }
        }

        status.message = "Static persona fallback".to_string();
        ChatResult {
            response: reply::static_persona(language).to_string(),
            language,
            source: "static_persona_fallback".to_string(),
            intent: Some(GENERAL.to_string()),
            data_status: Some(status),
            ..Default::default()
        }
    }

    /// The `/api/query` flow: falls back to the persona when the catalog is
    /// empty and tags the answer with the model and character.
    pub async fn get_chat_response(&self, message: &str, user_id: &str, history: &[ChatMessage]) -> ChatResult {
        let has_data = !self.catalog.is_empty();
        let mut result = if has_data {
            self.get_response(message, user_id, history).await
        } else {
            tracing::warn!("Place catalog is empty, answering from persona only");
            self.pure_gpt_response(message, detect_language(message)).await
        };

        result.model = Some(self.model().to_string());
        result.character = Some(self.prompts.character.name.clone());

        if !has_data && result.source.contains("fallback") {
            result.source.push_str("_no_db");
        } else if has_data && self.gpt.is_some() && result.source == self.model() {
            result.source = "data+ai".to_string();
        } else if has_data && result.source == "simple" {
            result.source = "data+simple".to_string();
        }
        result
    }

    /// Streamed answer: `intent`, `structured_data`, then model chunks and
    /// `done`. Without a model the templated answer is sent as one `text`.
    pub fn stream_response(
        self: Arc<Self>,
        message: String,
        history: Vec<ChatMessage>,
    ) -> impl Stream<Item = StreamEvent> + Send + 'static {
        async_stream::stream! {
            let language = detect_language(&message);
            let trimmed = message.trim().to_string();

            if is_greeting(&trimmed) {
                yield StreamEvent::text(self.prompts.greeting(language));
                yield StreamEvent::Done {
                    language,
                    source: "greeting".to_string(),
                    intent: Some("greeting".to_string()),
                    intent_type: None,
                    structured_data: Vec::new(),
                    cached: false,
                };
                return;
            }

            let places = self.catalog.places();
            let analysis = self.analyze(&message, &places).await;
            yield StreamEvent::Intent { intent_type: analysis.intent_type.to_string() };

            let matched = self.match_travel_data(&message, &analysis.keyword_pool, self.prompts.matching.max_matches);
            if !matched.is_empty() {
                yield StreamEvent::StructuredData {
                    data: matched.iter().take(STREAMED_PLACES).cloned().collect(),
                };
            }

            if trimmed.is_empty() {
                yield StreamEvent::text(reply::empty_query(&self.prompts, language));
                yield StreamEvent::Done {
                    language,
                    source: "empty_query".to_string(),
                    intent: None,
                    intent_type: None,
                    structured_data: Vec::new(),
                    cached: false,
                };
                return;
            }

            let Some(gpt) = &self.gpt else {
                let is_specific = analysis.intent_type == SPECIFIC;
                yield StreamEvent::text(create_simple_response(&self.prompts, &matched, language, is_specific));
                yield StreamEvent::Done {
                    language,
                    source: "simple".to_string(),
                    intent: Some(analysis.intent_type.to_string()),
                    intent_type: Some(analysis.intent_type.to_string()),
                    structured_data: matched,
                    cached: false,
                };
                return;
            };

            let mut status = self.data_status(
                if matched.is_empty() {
                    "No matches found".to_string()
                } else {
                    format!("Matched {} entries", matched.len())
                },
                !matched.is_empty(),
            );
            status.intent_type = Some(analysis.intent_type.to_string());
            status.data_available = !matched.is_empty();

            let request = AnswerRequest {
                query: &analysis.clean_question,
                context: &matched,
                data_type: DATA_TYPE,
                intent: Some(intent_from_topic(analysis.signals.topic.as_deref())),
                intent_type: Some(analysis.intent_type),
                status: Some(&status),
                system_override: None,
                history: &history,
            };
            let mut chunks = match gpt.generate_response_stream(request).await {
                Ok(chunks) => chunks,
                Err(e) => {
                    tracing::error!("GPT streaming failed: {}", e);
                    yield StreamEvent::Error { message: e.to_string(), timeout: e.is_timeout() };
                    return;
                }
            };
            while let Some(chunk) = chunks.next().await {
                match chunk {
                    Ok(chunk) => {
                        yield StreamEvent::Chunk {
                            chunk,
                            language,
                            source: gpt.model().to_string(),
                        };
                    }
                    Err(e) => {
                        tracing::error!("GPT streaming failed: {}", e);
                        yield StreamEvent::Error { message: e.to_string(), timeout: e.is_timeout() };
                        return;
                    }
                }
            }
            yield StreamEvent::Done {
                language,
                source: gpt.model().to_string(),
                intent: Some(analysis.intent_type.to_string()),
                intent_type: Some(analysis.intent_type.to_string()),
                structured_data: matched,
                cached: false,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::places::catalog::tests::sample_catalog;

    fn bot() -> Chatbot {
        Chatbot::new(
            sample_catalog(),
            Arc::new(PromptBook::default()),
            Duration::from_secs(30),
            Duration::from_secs(15),
        )
    }

    #[tokio::test]
    async fn greeting_short_circuits() {
        let result = bot().get_response("สวัสดีค่ะ", "u", &[]).await;
        assert_eq!(result.source, "greeting");
        assert_eq!(result.intent.as_deref(), Some("greeting"));
        assert!(result.structured_data.is_empty());
    }

    #[tokio::test]
    async fn named_place_gets_single_card() {
        let result = bot().get_response("ตลาดน้ำอัมพวา", "u", &[]).await;
        assert_eq!(result.source, "simple");
        assert_eq!(result.structured_data.len(), 1);
        assert_eq!(result.structured_data[0].id, "1");
        assert!(result.response.contains("🌟 **ตลาดน้ำอัมพวา**"));
        let status = result.data_status.unwrap();
        assert_eq!(status.intent_type.as_deref(), Some(SPECIFIC));
        assert!(status.data_available);
    }

    #[tokio::test]
    async fn repeated_question_hits_shared_cache() {
        let bot = bot();
        let first = bot.get_response("recommend a cafe", "a", &[]).await;
        assert_eq!(bot.cache().len(), 1);
        let second = bot.get_response("  Recommend a CAFE ", "b", &[]).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn purge_drops_expired_answers_and_replays() {
        let bot = Chatbot::new(
            sample_catalog(),
            Arc::new(PromptBook::default()),
            Duration::from_millis(1),
            Duration::from_millis(1),
        );
        bot.get_response("recommend a cafe", "a", &[]).await;
        bot.get_response("วัดบางกุ้ง", "b", &[]).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(bot.purge_expired().await, 4);
        assert!(bot.cache().is_empty());
        assert_eq!(bot.purge_expired().await, 0);
    }

    #[tokio::test]
    async fn user_replay_marks_duplicate() {
        let bot = Chatbot::new(
            sample_catalog(),
            Arc::new(PromptBook::default()),
            Duration::from_millis(1),
            Duration::from_secs(15),
        );
        bot.get_response("recommend a cafe", "a", &[]).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let replay = bot.get_response("recommend a cafe", "a", &[]).await;
        assert!(replay.duplicate);
        assert_eq!(replay.source, "simple_cached");
    }

    #[tokio::test]
    async fn other_province_is_declined() {
        let result = bot().get_response("เที่ยวจังหวัดเชียงใหม่", "u", &[]).await;
        assert_eq!(result.source, "out_of_scope");
        assert!(result.structured_data.is_empty());
    }

    #[tokio::test]
    async fn empty_question_asks_for_input() {
        let result = bot().get_response("   ", "u", &[]).await;
        assert_eq!(result.source, "empty_query");
    }

    #[tokio::test]
    async fn chat_response_is_tagged() {
        let result = bot().get_chat_response("ตลาดน้ำอัมพวา", "u", &[]).await;
        assert_eq!(result.source, "data+simple");
        assert_eq!(result.model.as_deref(), Some(crate::prompts::DEFAULT_MODEL));
        assert_eq!(result.character.as_deref(), Some("NongPlaToo"));
    }

    #[tokio::test]
    async fn empty_catalog_uses_static_persona() {
        let bot = Chatbot::new(
            PlaceCatalog::from_places(Vec::new()),
            Arc::new(PromptBook::default()),
            Duration::from_secs(30),
            Duration::from_secs(15),
        );
        let result = bot.get_chat_response("where to eat", "u", &[]).await;
        assert_eq!(result.source, "static_persona_fallback_no_db");
        assert_eq!(result.language, Language::En);
    }

    #[test]
    fn match_respects_limit_and_dedups() {
        let bot = bot();
        let keywords = vec!["อัมพวา".to_string(), "temple".to_string(), "market".to_string()];
        let matched = bot.match_travel_data("zzz", &keywords, 10);
        let ids: Vec<&str> = matched.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "10", "3", "9temples"]);
        assert_eq!(bot.match_travel_data("zzz", &keywords, 1).len(), 1);
    }

    #[tokio::test]
    async fn stream_without_model_sends_text_then_done() {
        let bot = Arc::new(bot());
        let events: Vec<StreamEvent> = bot.stream_response("ตลาดน้ำอัมพวา".into(), Vec::new()).collect().await;
        let kinds: Vec<&str> = events.iter().map(|e| e.event_type()).collect();
        assert_eq!(kinds, vec!["intent", "structured_data", "text", "done"]);
        assert!(events.last().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn stream_greeting() {
        let bot = Arc::new(bot());
        let events: Vec<StreamEvent> = bot.stream_response("hello".into(), Vec::new()).collect().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], StreamEvent::text(PromptBook::default().greeting(Language::En)));
    }
}

mod context;

pub use context::QueryEntities;
use context::{build_messages, fallback_response, parse_entities};

use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::models::{ChatMessage, DataStatus, Role};
use crate::places::Place;
use crate::prompts::{CompletionParams, PromptBook};
use crate::text::{Language, detect_language};

#[derive(Debug, Error)]
pub enum GptError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("API error: {0}")]
    Api(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Parse Error: {0}")]
    Decode(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),
}

impl GptError {
    pub fn is_timeout(&self) -> bool {
        match self {
            GptError::Timeout(_) => true,
            GptError::Http(e) => e.is_timeout(),
            _ => false,
        }
    }
}

// Chat completions request body
#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: Option<u64>,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
}

#[derive(Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub total_tokens: Option<u64>,
}

// Everything the model needs to answer one travel question
#[derive(Debug, Clone, Default)]
pub struct AnswerRequest<'a> {
    pub query: &'a str,
    pub context: &'a [Place],
    pub data_type: &'a str,
    pub intent: Option<&'a str>,
    pub intent_type: Option<&'a str>,
    pub status: Option<&'a DataStatus>,
    pub system_override: Option<&'a str>,
    pub history: &'a [ChatMessage],
}

#[derive(Debug, Clone)]
pub struct GptAnswer {
    pub response: String,
    pub language: Language,
    pub source: String,
    pub tokens_used: Option<u64>,
    pub error: Option<String>,
}

pub type TextStream = std::pin::Pin<Box<dyn Stream<Item = Result<String, GptError>> + Send>>;

/// Client for an OpenAI compatible chat completions endpoint.
pub struct GptService {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout: Duration,
    prompts: Arc<PromptBook>,
}

impl GptService {
    pub fn new(
        api_key: String,
        base_url: &str,
        model_override: Option<String>,
        prompts: Arc<PromptBook>,
        timeout: Duration,
    ) -> Result<Self, GptError> {
        let timeout = prompts
            .model
            .chat
            .timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(timeout);
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .read_timeout(timeout)
            .build()?;
        let model = model_override.unwrap_or_else(|| prompts.model.default_model.clone());
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            model,
            timeout,
            prompts,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
        stream: bool,
    ) -> Result<reqwest::Response, GptError> {
        let body = CompletionRequest {
            model: &self.model,
            messages,
            temperature: params.temperature,
            top_p: params.top_p,
            max_tokens: params.max_completion_tokens,
            stream,
        };
        let mut request = self.client.post(&self.endpoint).bearer_auth(&self.api_key).json(&body);
        if !stream {
            request = request.timeout(self.timeout);
        }
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() { GptError::Timeout(self.timeout.as_secs()) } else { GptError::Http(e) }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GptError::Status { status: status.as_u16(), body });
        }
        Ok(response)
    }

    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> Result<Completion, GptError> {
        tracing::debug!("[GPT] completion request, {} messages", messages.len());
        let response = self.send(messages, params, false).await?;
        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| GptError::Decode(e.to_string()))?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default()
            .trim()
            .to_string();
        Ok(Completion {
            content,
            total_tokens: body.usage.and_then(|u| u.total_tokens),
        })
    }

    /// Content deltas of a streamed completion, ending at `[DONE]`.
    pub async fn stream(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> Result<TextStream, GptError> {
        let response = self.send(messages, params, true).await?;
        let mut events = response.bytes_stream().eventsource();

        let stream = async_stream::stream! {
            let mut chunk_count = 0usize;
            while let Some(event) = events.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!("[GPT] stream error: {}", e);
                        yield Err(GptError::Stream(e.to_string()));
                        return;
                    }
                };
                let raw = event.data.trim();
                if raw.is_empty() {
                    continue;
                }
                if raw == "[DONE]" {
                    break;
                }
                let value: serde_json::Value = match serde_json::from_str(raw) {
                    Ok(value) => value,
                    Err(e) => {
                        yield Err(GptError::Decode(format!("{}, data: {}", e, raw)));
                        return;
                    }
                };
                if let Some(error) = value.get("error") {
                    let message = error
                        .get("message")
                        .and_then(|m| m.as_str())
                        .or_else(|| error.as_str())
                        .unwrap_or("An error occurred during streaming")
                        .to_string();
                    yield Err(GptError::Api(message));
                    return;
                }
                let chunk: StreamChunk = match serde_json::from_value(value) {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(GptError::Decode(e.to_string()));
                        return;
                    }
                };
                let text = chunk
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.delta)
                    .and_then(|d| d.content)
                    .unwrap_or_default();
                if !text.is_empty() {
                    chunk_count += 1;
                    yield Ok(text);
                }
            }
            tracing::info!("[GPT] Streaming completed successfully ({} chunks)", chunk_count);
        };
        Ok(Box::pin(stream))
    }

    /// Answer a travel question. Upstream failures turn into the fallback
    /// template instead of an error.
    pub async fn generate_response(&self, req: AnswerRequest<'_>) -> GptAnswer {
        let language = detect_language(req.query);
        let messages = build_messages(&self.prompts, &req);
        match self.complete(&messages, &self.prompts.model.chat).await {
            Ok(completion) => {
                let response = if completion.content.is_empty() {
                    fallback_response(&self.prompts, language, req.query)
                } else {
                    completion.content
                };
                GptAnswer {
                    response,
                    language,
                    source: self.model.clone(),
                    tokens_used: completion.total_tokens,
                    error: None,
                }
            }
            Err(e) => {
                tracing::error!("[GPT] generation failed: {}", e);
                GptAnswer {
                    response: fallback_response(&self.prompts, language, req.query),
                    language,
                    source: "fallback_error".to_string(),
                    tokens_used: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub async fn generate_response_stream(&self, req: AnswerRequest<'_>) -> Result<TextStream, GptError> {
        let messages = build_messages(&self.prompts, &req);
        tracing::info!(
            "[GPT] Starting streaming request with timeout={}s, history_messages={}",
            self.timeout.as_secs(),
            messages.len().saturating_sub(2)
        );
        self.stream(&messages, &self.prompts.model.chat).await
    }

    /// Ask the model which dataset names and keywords the question refers to.
    pub async fn extract_query_entities(&self, query: &str, dataset_summary: &str) -> QueryEntities {
        let profile = &self.prompts.character;
        let character_hint = format!("You are {}. {}", profile.name, profile.characteristics.join(" "));
        let prompt = format!(
            "{}\n\nYou are a travel data matcher for Samut Songkhram.\nDataset entries:\n{}\n\n\
             Analyze the user's question and return JSON with two arrays:\n\
             - keywords: important search words or synonyms\n\
             - places: names from the dataset that likely match\n\
             Respond with JSON only.",
            character_hint, dataset_summary
        );
        let messages = [
            ChatMessage::new(Role::System, "Extract concise travel keywords from the user query."),
            ChatMessage::new(Role::User, format!("{}\n\nUser query:\n{}", prompt, query)),
        ];
        let params = CompletionParams {
            temperature: 0.0,
            max_completion_tokens: 200,
            top_p: 1.0,
            timeout_seconds: None,
        };
        match self.complete(&messages, &params).await {
            Ok(completion) => parse_entities(&completion.content),
            Err(e) => {
                tracing::warn!("[GPT] keyword extraction failed: {}", e);
                QueryEntities::default()
            }
        }
    }
}

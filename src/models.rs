use serde::{Deserialize, Serialize};

use crate::places::Place;
use crate::text::Language;

pub const DEFAULT_USER_ID: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

// One turn of a conversation, same shape as the chat completions API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

// /api/query and /api/chat body
#[derive(Debug, Deserialize, Default)]
pub struct QueryRequest {
    pub message: Option<String>,
    pub user_id: Option<String>,
}

// /api/messages/stream body
#[derive(Debug, Deserialize, Default)]
pub struct StreamRequest {
    pub text: Option<String>,
    pub user_id: Option<String>,
    pub request_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ClearRequest {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    #[serde(default = "default_user")]
    pub user_id: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_user() -> String {
    DEFAULT_USER_ID.to_string()
}

fn default_limit() -> usize {
    20
}

#[derive(Debug, Deserialize, Default)]
pub struct VisitRequest {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MatchingSignals {
    pub topic: Option<String>,
    pub topic_confidence: f64,
    pub is_local: bool,
    pub keywords: Vec<String>,
}

// What the chatbot knew when it answered
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DataStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent_type: Option<String>,
    pub success: bool,
    pub message: String,
    pub data_available: bool,
    pub source: String,
    pub preference_note: String,
    pub character_note: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matching_signals: Option<MatchingSignals>,
}

// Full chatbot answer, cached and replayed as a unit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ChatResult {
    pub response: String,
    pub structured_data: Vec<Place>,
    pub language: Language,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_status: Option<DataStatus>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub duplicate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpt_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character: Option<String>,
}

// Server-sent event payloads, the `type` tag doubles as the SSE event name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Intent {
        intent_type: String,
    },
    StructuredData {
        data: Vec<Place>,
    },
    Text {
        text: String,
    },
    Chunk {
        chunk: String,
        language: Language,
        source: String,
    },
    Heartbeat {
        ts: String,
    },
    Done {
        language: Language,
        source: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        intent: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        intent_type: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        structured_data: Vec<Place>,
        #[serde(default)]
        cached: bool,
    },
    Error {
        message: String,
        #[serde(default)]
        timeout: bool,
    },
}

impl StreamEvent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { message: message.into(), timeout: false }
    }

    pub fn heartbeat() -> Self {
        Self::Heartbeat { ts: chrono::Utc::now().to_rfc3339() }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Intent { .. } => "intent",
            Self::StructuredData { .. } => "structured_data",
            Self::Text { .. } => "text",
            Self::Chunk { .. } => "chunk",
            Self::Heartbeat { .. } => "heartbeat",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }

    pub fn to_sse_data(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

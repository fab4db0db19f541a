use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::chatbot::Chatbot;
use crate::config::Args;
use crate::dedup::RequestTracker;
use crate::gpt::{GptError, GptService};
use crate::maps::{MapsClient, MapsError};
use crate::memory::ConversationMemory;
use crate::places::PlaceCatalog;
use crate::prompts::PromptBook;
use crate::rate_limit::RateLimiter;
use crate::visits::VisitCounter;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("prompt book: {0}")]
    Prompts(String),
    #[error("GPT client: {0}")]
    Gpt(#[from] GptError),
    #[error("Google Maps client: {0}")]
    Maps(#[from] MapsError),
}

// app's shared state
pub struct AppState {
    pub chatbot: Arc<Chatbot>,
    pub tracker: RequestTracker,
    pub memory: ConversationMemory,
    pub visits: VisitCounter,
    pub rate_limiter: RateLimiter,
    pub heartbeat_interval: Duration,
}

impl AppState {
    pub async fn purge_expired(&self) -> usize {
        self.chatbot.purge_expired().await + self.rate_limiter.purge_expired()
    }

    pub fn new(args: &Args, chatbot: Arc<Chatbot>) -> Self {
        Self {
            chatbot,
            tracker: RequestTracker::new(args.cache_ttl()),
            memory: ConversationMemory::new(args.memory_max_messages, args.memory_ttl()),
            visits: VisitCounter::new(&args.visits_file),
            rate_limiter: RateLimiter::new(args.rate_limit, args.rate_window()),
            heartbeat_interval: args.heartbeat_interval(),
        }
    }
}

/// Build the one chatbot the process serves from.
pub fn build_chatbot(args: &Args) -> Result<Chatbot, StartupError> {
    args.validate().map_err(StartupError::Config)?;

    let prompts = match &args.prompts_file {
        Some(path) => PromptBook::load(path).map_err(StartupError::Prompts)?,
        None => PromptBook::default(),
    };
    let prompts = Arc::new(prompts);

    let catalog = PlaceCatalog::open(&args.places_file, args.places_ttl());
    if catalog.is_empty() {
        tracing::warn!("No places loaded from {}, answers will use the persona only", args.places_file.display());
    }

    let mut chatbot = Chatbot::new(catalog, Arc::clone(&prompts), args.cache_ttl(), args.duplicate_window());

    match &args.openai_api_key {
        Some(key) if !key.trim().is_empty() => {
            let gpt = GptService::new(
                key.clone(),
                &args.openai_base_url,
                args.openai_model.clone(),
                prompts,
                args.request_timeout(),
            )?;
            tracing::info!("GPT service initialized with model {}", gpt.model());
            chatbot = chatbot.with_gpt(gpt);
        }
        _ => tracing::warn!("OPENAI_API_KEY not set, GPT answers disabled"),
    }

    match &args.google_maps_api_key {
        Some(key) if !key.trim().is_empty() => {
            chatbot = chatbot.with_maps(MapsClient::new(key.clone())?);
        }
        _ => tracing::info!("GOOGLE_MAPS_API_KEY not set, maps fallback disabled"),
    }

    Ok(chatbot)
}

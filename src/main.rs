use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use platoo_chat::build_router;
use platoo_chat::config::{Args, mask_url};
use platoo_chat::state::{AppState, build_chatbot};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("platoo_chat=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();

    // one chatbot for the whole process, shared by every handler
    let chatbot = Arc::new(build_chatbot(&args).context("failed to initialize chatbot")?);
    tracing::info!("Chatbot singleton initialized");

    let state = Arc::new(AppState::new(&args, chatbot));

    // cache, replay and rate limit maps only shrink here, the catalog reloads here too
    let purge_every = args
        .cache_ttl()
        .min(args.places_ttl())
        .min(args.rate_window())
        .max(Duration::from_secs(1));
    let purge_state = Arc::clone(&state);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(purge_every);
        loop {
            ticker.tick().await;
            let removed = purge_state.purge_expired().await;
            if removed > 0 {
                tracing::debug!("Purged {} expired entries", removed);
            }
        }
    });

    let app = build_router(state);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!("Chat service running on http://{}", addr);
    tracing::info!("Model endpoint: {}", mask_url(&args.openai_base_url));
    tracing::info!("Cache TTL: {} seconds", args.cache_ttl);
    tracing::info!(
        "Rate limit: {} requests per {} seconds",
        args.rate_limit,
        args.rate_window
    );
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

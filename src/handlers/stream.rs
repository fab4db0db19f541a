use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use futures::{Stream, StreamExt, stream};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use super::{parse_json, required};
use crate::dedup::{Begin, RequestGuard};
use crate::error::ApiError;
use crate::heartbeat::with_heartbeat;
use crate::metrics::{ACTIVE_STREAMS, REQUEST_LATENCY, REQUEST_TOTAL};
use crate::models::{ChatResult, Role, StreamEvent, StreamRequest};
use crate::rate_limit::client_key;
use crate::state::AppState;

pub async fn stream_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<StreamRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let req = parse_json(payload)?;
    let text = required(req.text, "text")?;
    let user_id = required(req.user_id, "user_id")?;
    let request_id = required(req.request_id, "request_id")?;

    if !state.rate_limiter.check(&client_key(&headers)) {
        return Err(ApiError::RateLimited);
    }
    REQUEST_TOTAL.inc();

    let guard = match state.tracker.begin(&request_id) {
        Begin::Fresh(guard) => guard,
        Begin::InFlight => return Err(ApiError::DuplicateRequest(request_id)),
        Begin::Replay(result) => return Ok(into_sse(stream::iter(replay(result))).into_response()),
    };

    let history = state.memory.get_history(&user_id, None);
    tracing::info!("Streaming answer for user {} (request {})", user_id, request_id);

    let events = Arc::clone(&state.chatbot).stream_response(text.clone(), history);
    let recorded = record(events, Arc::clone(&state), user_id, text, guard);
    let events = with_heartbeat(recorded, state.heartbeat_interval);
    Ok(into_sse(events).into_response())
}

fn into_sse<S>(events: S) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    S: Stream<Item = StreamEvent> + Send + 'static,
{
    Sse::new(events.map(|event| {
        Ok(Event::default()
            .event(event.event_type())
            .data(event.to_sse_data()))
    }))
}

fn replay(result: ChatResult) -> Vec<StreamEvent> {
    vec![
        StreamEvent::text(result.response),
        StreamEvent::Done {
            language: result.language,
            source: result.source,
            intent: result.intent.clone(),
            intent_type: result.intent,
            structured_data: result.structured_data,
            cached: true,
        },
    ]
}

// gauge of open streams, decremented however the stream ends
struct OpenStream;

impl OpenStream {
    fn new() -> Self {
        ACTIVE_STREAMS.inc();
        OpenStream
    }
}

impl Drop for OpenStream {
    fn drop(&mut self) {
        ACTIVE_STREAMS.dec();
    }
}

/// Pass events through, collecting the answer text. Only a stream that
/// reaches `done` lands in the user's history, question and answer together,
/// and under the request id for replays.
fn record<S>(
    events: S,
    state: Arc<AppState>,
    user_id: String,
    question: String,
    guard: RequestGuard,
) -> impl Stream<Item = StreamEvent> + Send + 'static
where
    S: Stream<Item = StreamEvent> + Send + 'static,
{
    async_stream::stream! {
        let _open = OpenStream::new();
        let start = Instant::now();
        let mut events = Box::pin(events);
        let mut guard = Some(guard);
        let mut answer = String::new();

        while let Some(event) = events.next().await {
            match &event {
                StreamEvent::Text { text } => answer.push_str(text),
                StreamEvent::Chunk { chunk, .. } => answer.push_str(chunk),
                StreamEvent::Done { language, source, intent, structured_data, .. } => {
                    state.memory.add_message(&user_id, Role::User, &question);
                    state.memory.add_message(&user_id, Role::Assistant, &answer);
                    if let Some(guard) = guard.take() {
                        guard.complete(ChatResult {
                            response: answer.clone(),
                            structured_data: structured_data.clone(),
                            language: *language,
                            source: source.clone(),
                            intent: intent.clone(),
                            ..Default::default()
                        });
                    }
                    REQUEST_LATENCY.observe(start.elapsed().as_secs_f64());
                }
                StreamEvent::Error { message, .. } => {
                    tracing::warn!("Stream for user {} ended with error: {}", user_id, message);
                }
                _ => {}
            }
            yield event;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replay_marks_done_as_cached() {
        let result = ChatResult {
            response: "hello".into(),
            source: "simple".into(),
            intent: Some("general".into()),
            ..Default::default()
        };
        let events = replay(result);
        assert_eq!(events[0], StreamEvent::text("hello"));
        match &events[1] {
            StreamEvent::Done { cached, source, intent_type, .. } => {
                assert!(*cached);
                assert_eq!(source, "simple");
                assert_eq!(intent_type.as_deref(), Some("general"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}

use futures::{Stream, StreamExt};
use std::time::Duration;
use tokio::time::{Instant, sleep_until};

use crate::metrics::HEARTBEATS_SENT;
use crate::models::StreamEvent;

/// Interleave heartbeat events while `events` is idle for `interval`.
/// Ends when `events` ends.
pub fn with_heartbeat<S>(events: S, interval: Duration) -> impl Stream<Item = StreamEvent> + Send
where
    S: Stream<Item = StreamEvent> + Send + 'static,
{
    async_stream::stream! {
        let mut events = Box::pin(events);
        let mut deadline = Instant::now() + interval;
        loop {
            let next = tokio::select! {
                next = events.next() => match next {
                    Some(event) => event,
                    None => break,
                },
                _ = sleep_until(deadline) => {
                    HEARTBEATS_SENT.inc();
                    StreamEvent::heartbeat()
                }
            };
            deadline = Instant::now() + interval;
            yield next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn heartbeats_fill_idle_gaps() {
        let inner = async_stream::stream! {
            yield StreamEvent::text("first");
            tokio::time::sleep(Duration::from_secs(25)).await;
            yield StreamEvent::text("second");
        };
        let events: Vec<StreamEvent> = with_heartbeat(inner, Duration::from_secs(10)).collect().await;
        let kinds: Vec<&str> = events.iter().map(|e| e.event_type()).collect();
        assert_eq!(kinds, vec!["text", "heartbeat", "heartbeat", "text"]);
    }

    #[tokio::test(start_paused = true)]
    async fn no_heartbeat_for_fast_streams() {
        let inner = futures::stream::iter(vec![StreamEvent::text("a"), StreamEvent::text("b")]);
        let events: Vec<StreamEvent> = with_heartbeat(inner, Duration::from_secs(10)).collect().await;
        assert_eq!(events.len(), 2);
    }
}

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::metrics::{CACHE_HITS, DUPLICATES_BLOCKED};
use crate::models::ChatResult;
use crate::text::normalized_query_key;

enum Slot {
    InFlight,
    Done { result: ChatResult, at: Instant },
}

pub enum Begin {
    Fresh(RequestGuard),
    InFlight,
    Replay(ChatResult),
}

// dedup by the client supplied request_id
#[derive(Clone)]
pub struct RequestTracker {
    slots: Arc<DashMap<String, Slot>>,
    ttl: Duration,
}

impl RequestTracker {
    pub fn new(ttl: Duration) -> Self {
        Self { slots: Arc::new(DashMap::new()), ttl }
    }

    pub fn begin(&self, request_id: &str) -> Begin {
        self.prune();
        match self.slots.entry(request_id.to_string()) {
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::InFlight);
                Begin::Fresh(RequestGuard {
                    slots: Arc::clone(&self.slots),
                    request_id: request_id.to_string(),
                    completed: false,
                })
            }
            Entry::Occupied(occupied) => match occupied.get() {
                Slot::InFlight => {
                    DUPLICATES_BLOCKED.inc();
                    tracing::warn!("Duplicate request blocked: {}", request_id);
                    Begin::InFlight
                }
                Slot::Done { result, .. } => {
                    CACHE_HITS.inc();
                    tracing::info!("Cache HIT for request_id {}", request_id);
                    Begin::Replay(result.clone())
                }
            },
        }
    }

    fn prune(&self) {
        self.slots.retain(|_, slot| match slot {
            Slot::InFlight => true,
            Slot::Done { at, .. } => at.elapsed() < self.ttl,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

// holds a request_id in flight until completed or dropped
pub struct RequestGuard {
    slots: Arc<DashMap<String, Slot>>,
    request_id: String,
    completed: bool,
}

impl RequestGuard {
    pub fn complete(mut self, result: ChatResult) {
        self.slots
            .insert(self.request_id.clone(), Slot::Done { result, at: Instant::now() });
        self.completed = true;
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        if !self.completed {
            // aborted stream, let the client retry
            self.slots
                .remove_if(&self.request_id, |_, slot| matches!(slot, Slot::InFlight));
        }
    }
}

struct Recent {
    query_key: String,
    at: Instant,
    result: ChatResult,
}

// last answer per user, replayed when the same question comes back quickly
pub struct RecentRequests {
    entries: DashMap<String, Recent>,
    window: Duration,
}

impl RecentRequests {
    pub fn new(window: Duration) -> Self {
        Self { entries: DashMap::new(), window }
    }

    pub fn get(&self, user_id: &str, query: &str) -> Option<ChatResult> {
        let key = normalized_query_key(query);
        let entry = self.entries.get(user_id)?;
        (entry.query_key == key && entry.at.elapsed() < self.window).then(|| entry.result.clone())
    }

    pub fn record(&self, user_id: &str, query: &str, result: ChatResult) {
        self.entries.insert(
            user_id.to_string(),
            Recent { query_key: normalized_query_key(query), at: Instant::now(), result },
        );
    }

    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.at.elapsed() < self.window);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};

use crate::metrics::{CACHE_HITS, CACHE_MISSES, CACHE_SIZE};
use crate::models::ChatResult;
use crate::text::normalized_query_key;

// Cache entry with timestamp
#[derive(Clone)]
pub struct CacheEntry {
    pub result: ChatResult,
    pub created_at: Instant,
}

// Create a cache key (hash of the normalized question)
pub fn make_cache_key(query: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized_query_key(query));
    format!("{:x}", hasher.finalize())
}

/// Answers shared across users for `ttl`, keyed by question.
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self { entries: DashMap::new(), ttl }
    }

    pub fn get(&self, key: &str) -> Option<ChatResult> {
        if let Some(entry) = self.entries.get(key) {
            if entry.created_at.elapsed() < self.ttl {
                CACHE_HITS.inc();
                tracing::info!("[Cache] Cache HIT");
                return Some(entry.result.clone());
            }
        }
        // drop an expired entry, if any, outside the read guard
        if self.entries.remove_if(key, |_, e| e.created_at.elapsed() >= self.ttl).is_some() {
            CACHE_SIZE.set(self.entries.len() as f64);
        }
        CACHE_MISSES.inc();
        tracing::debug!("[Cache] Cache MISS");
        None
    }

    pub fn insert(&self, key: String, result: ChatResult) {
        self.entries.insert(key, CacheEntry { result, created_at: Instant::now() });
        CACHE_SIZE.set(self.entries.len() as f64);
    }

    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.created_at.elapsed() < self.ttl);
        let after = self.entries.len();
        CACHE_SIZE.set(after as f64);
        before.saturating_sub(after)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

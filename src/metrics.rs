use lazy_static::lazy_static;
use prometheus::{
    Counter, Encoder, Gauge, Histogram, TextEncoder, register_counter, register_gauge,
    register_histogram,
};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("platoo_requests_total", "Total number of chat requests").unwrap();
    pub static ref CACHE_HITS: Counter =
        register_counter!("platoo_cache_hits_total", "Total cache hits").unwrap();
    pub static ref CACHE_MISSES: Counter =
        register_counter!("platoo_cache_misses_total", "Total cache misses").unwrap();
    pub static ref DUPLICATES_BLOCKED: Counter = register_counter!(
        "platoo_duplicate_requests_total",
        "Requests blocked because the same request_id was in flight"
    )
    .unwrap();
    pub static ref HEARTBEATS_SENT: Counter =
        register_counter!("platoo_heartbeats_total", "Heartbeat events sent to clients").unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "platoo_request_latency_seconds",
        "Chat request latency in seconds"
    )
    .unwrap();
    pub static ref CACHE_SIZE: Gauge =
        register_gauge!("platoo_cache_size", "Current number of items in cache").unwrap();
    pub static ref ACTIVE_STREAMS: Gauge =
        register_gauge!("platoo_active_streams", "Streams currently open").unwrap();
}

/// Text exposition of every registered metric.
pub fn render() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("Encode error: {}", e))?;
    String::from_utf8(buffer).map_err(|e| format!("Encode error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_registered_counters() {
        REQUEST_TOTAL.inc();
        let text = render().unwrap();
        assert!(text.contains("platoo_requests_total"));
    }
}

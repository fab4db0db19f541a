use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "platoo-chat")]
#[command(about = "Samut Songkhram travel assistant chat service")]
pub struct Args {
    // Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    // OpenAI compatible API key, GPT answers are disabled without it
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    // OpenAI compatible base url
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,

    // Model override, the prompt book default is used otherwise
    #[arg(long, env = "OPENAI_MODEL")]
    pub openai_model: Option<String>,

    // Google Maps key for the places fallback
    #[arg(long, env = "GOOGLE_MAPS_API_KEY", hide_env_values = true)]
    pub google_maps_api_key: Option<String>,

    // Places export (JSON array)
    #[arg(long, env = "PLACES_FILE", default_value = "data/places.json")]
    pub places_file: PathBuf,

    // Persona and prompt overrides (JSON)
    #[arg(long, env = "PROMPTS_FILE")]
    pub prompts_file: Option<PathBuf>,

    // Page visit counter storage
    #[arg(long, env = "VISITS_FILE", default_value = "data/visit_counts.json")]
    pub visits_file: PathBuf,

    // Result cache TTL in seconds, also the request_id replay window
    #[arg(short, long, default_value_t = 30)]
    pub cache_ttl: u64,

    // Same user + same question replay window in seconds
    #[arg(long, default_value_t = 15)]
    pub duplicate_window: u64,

    // How long the places file stays loaded before a reload
    #[arg(long, default_value_t = 300)]
    pub places_ttl: u64,

    // Seconds between heartbeat events on an idle stream
    #[arg(long, default_value_t = 10)]
    pub heartbeat_interval: u64,

    // Upstream request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub request_timeout: u64,

    // Rate limit max requests per window
    #[arg(long, default_value_t = 30)]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, default_value_t = 60)]
    pub rate_window: u64,

    // Exchanges kept per user (user + assistant = 2 messages each)
    #[arg(long, default_value_t = 10)]
    pub memory_max_messages: usize,

    // Idle conversation lifetime in seconds
    #[arg(long, default_value_t = 1800)]
    pub memory_ttl: u64,
}

impl Args {
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("port must be non-zero".to_string());
        }
        for (name, value) in [
            ("cache-ttl", self.cache_ttl),
            ("duplicate-window", self.duplicate_window),
            ("places-ttl", self.places_ttl),
            ("heartbeat-interval", self.heartbeat_interval),
            ("rate-window", self.rate_window),
            ("request-timeout", self.request_timeout),
        ] {
            if value == 0 {
                return Err(format!("{} must be greater than zero", name));
            }
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    pub fn duplicate_window(&self) -> Duration {
        Duration::from_secs(self.duplicate_window)
    }

    pub fn places_ttl(&self) -> Duration {
        Duration::from_secs(self.places_ttl)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window)
    }

    pub fn memory_ttl(&self) -> Duration {
        Duration::from_secs(self.memory_ttl)
    }
}

/// Hide credentials embedded in a url before it reaches the logs.
pub fn mask_url(url: &str) -> String {
    match url.split_once('@') {
        Some((head, tail)) => {
            let scheme = head.split("://").next().unwrap_or("http");
            format!("{}://****:****@{}", scheme, tail)
        }
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_runbook() {
        let args = Args::parse_from(["platoo-chat", "--port", "5000"]);
        assert_eq!(args.cache_ttl, 30);
        assert_eq!(args.duplicate_window, 15);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn zero_heartbeat_is_rejected() {
        let args = Args::parse_from(["platoo-chat", "--heartbeat-interval", "0"]);
        let err = args.validate().unwrap_err();
        assert!(err.contains("heartbeat-interval"));
    }

    #[test]
    fn masks_credentials() {
        assert_eq!(
            mask_url("postgres://user:secret@db:5432/app"),
            "postgres://****:****@db:5432/app"
        );
        assert_eq!(mask_url("https://api.openai.com/v1"), "https://api.openai.com/v1");
    }
}

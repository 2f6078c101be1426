// File: streamwatch-core/src/config.rs

use std::env;

/// Runtime options for the monitoring core, loaded from the environment with
/// sensible defaults. Everything here is read once at startup.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Minutes between poll cycles.
    pub poll_interval_minutes: u64,
    /// Delay before the warm-up check after the monitor starts.
    pub warmup_delay_secs: u64,

    /// Attempts per scrape call before giving up for the cycle.
    pub max_scrape_retries: u32,
    /// Envelope applied to every external call (HTTP, rendered fetch).
    pub call_timeout_ms: u64,
    /// Accounts checked concurrently per scrape batch.
    pub scrape_batch_size: usize,
    /// Pause between scrape batches.
    pub batch_pause_ms: u64,
    /// Linear backoff base between retry attempts.
    pub retry_base_ms: u64,

    pub enable_kick: bool,
    pub enable_tiktok: bool,

    pub twitch_client_id: Option<String>,
    pub twitch_client_secret: Option<String>,
    pub youtube_api_key: Option<String>,

    /// Headless-browser service used for rendered-page fetches.
    pub render_endpoint: String,
    pub render_token: Option<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_minutes: 5,
            warmup_delay_secs: 5,
            max_scrape_retries: 3,
            call_timeout_ms: 30_000,
            scrape_batch_size: 3,
            batch_pause_ms: 1_000,
            retry_base_ms: 2_000,
            enable_kick: true,
            enable_tiktok: true,
            twitch_client_id: None,
            twitch_client_secret: None,
            youtube_api_key: None,
            render_endpoint: "http://localhost:3000".to_string(),
            render_token: None,
        }
    }
}

impl WatchConfig {
    /// The slice of these options the scrape orchestrator cares about.
    pub fn scrape_config(&self) -> crate::scrape::ScrapeConfig {
        crate::scrape::ScrapeConfig {
            enable_kick: self.enable_kick,
            enable_tiktok: self.enable_tiktok,
            max_retries: self.max_scrape_retries,
            timeout_ms: self.call_timeout_ms,
            batch_size: self.scrape_batch_size,
            batch_pause_ms: self.batch_pause_ms,
            retry_base_ms: self.retry_base_ms,
        }
    }

    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        let defaults = Self::default();
        Self {
            poll_interval_minutes: env_parse("STREAM_CHECK_INTERVAL", defaults.poll_interval_minutes),
            warmup_delay_secs: env_parse("STREAM_WARMUP_DELAY_SECS", defaults.warmup_delay_secs),
            max_scrape_retries: env_parse("SCRAPE_MAX_RETRIES", defaults.max_scrape_retries),
            call_timeout_ms: env_parse("SCRAPE_TIMEOUT_MS", defaults.call_timeout_ms),
            scrape_batch_size: env_parse("SCRAPE_BATCH_SIZE", defaults.scrape_batch_size),
            batch_pause_ms: env_parse("SCRAPE_BATCH_PAUSE_MS", defaults.batch_pause_ms),
            retry_base_ms: env_parse("SCRAPE_RETRY_BASE_MS", defaults.retry_base_ms),
            enable_kick: env_flag("ENABLE_KICK", defaults.enable_kick),
            enable_tiktok: env_flag("ENABLE_TIKTOK", defaults.enable_tiktok),
            twitch_client_id: env::var("TWITCH_CLIENT_ID").ok(),
            twitch_client_secret: env::var("TWITCH_CLIENT_SECRET").ok(),
            youtube_api_key: env::var("YOUTUBE_API_KEY").ok(),
            render_endpoint: env::var("BROWSERLESS_URL").unwrap_or(defaults.render_endpoint),
            render_token: env::var("BROWSERLESS_TOKEN").ok(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

// File: src/scrape/orchestrator.rs

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use streamwatch_common::models::{Platform, StatusSnapshot};

use crate::http::{DefaultHttpClient, HttpClient};
use crate::platforms::kick::KickScraper;
use crate::platforms::tiktok::TikTokScraper;
use crate::platforms::ScrapePlatform;
use crate::scrape::RenderedPageClient;
use crate::Error;

/// Synthetic handle for the liveness probe. The probe only proves the
/// strategy pipeline runs end to end; the answer for this handle is noise.
const HEALTH_PROBE_HANDLE: &str = "health_probe";

#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub enable_kick: bool,
    pub enable_tiktok: bool,
    /// Attempts per call before giving up for the cycle.
    pub max_retries: u32,
    /// Envelope around each strategy call, both techniques included.
    pub timeout_ms: u64,
    pub batch_size: usize,
    pub batch_pause_ms: u64,
    pub retry_base_ms: u64,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            enable_kick: true,
            enable_tiktok: true,
            max_retries: 3,
            timeout_ms: 30_000,
            batch_size: 3,
            batch_pause_ms: 1_000,
            retry_base_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScrapeHealth {
    pub kick: bool,
    pub tiktok: bool,
    pub overall: bool,
}

/// Single entry point for "what is this scrape-only account doing right
/// now". Owns the per-platform strategies and hides retry, timeout and
/// batching policy from the presence monitor.
///
/// Exhausted retries come back as `None`: "no information this cycle",
/// which the monitor must never confuse with "offline".
pub struct ScrapeOrchestrator {
    strategies: HashMap<Platform, Arc<dyn ScrapePlatform>>,
    config: ScrapeConfig,
    browser: Arc<RenderedPageClient>,
    running: AtomicBool,
}

impl ScrapeOrchestrator {
    pub fn new(config: ScrapeConfig, browser: Arc<RenderedPageClient>) -> Self {
        let http: Arc<dyn HttpClient<Error = Error>> = Arc::new(DefaultHttpClient::new());
        let mut strategies: HashMap<Platform, Arc<dyn ScrapePlatform>> = HashMap::new();
        if config.enable_kick {
            strategies.insert(
                Platform::Kick,
                Arc::new(KickScraper::new(http.clone(), browser.clone())),
            );
        }
        if config.enable_tiktok {
            strategies.insert(
                Platform::TikTok,
                Arc::new(TikTokScraper::new(http.clone(), browser.clone())),
            );
        }
        Self {
            strategies,
            config,
            browser,
            running: AtomicBool::new(false),
        }
    }

    /// Same orchestrator with caller-provided strategies. Used by tests and
    /// by anything that needs to stub a platform out.
    pub fn with_strategies(
        config: ScrapeConfig,
        browser: Arc<RenderedPageClient>,
        list: Vec<Arc<dyn ScrapePlatform>>,
    ) -> Self {
        let strategies = list.into_iter().map(|s| (s.platform(), s)).collect();
        Self {
            strategies,
            config,
            browser,
            running: AtomicBool::new(false),
        }
    }

    pub async fn init(&self) {
        for platform in self.strategies.keys() {
            info!("{platform} scraper initialized");
        }
        self.running.store(true, Ordering::SeqCst);
        info!("scrape orchestrator initialized");
    }

    pub async fn close(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.browser.close().await;
        info!("scrape orchestrator closed");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Check one account, retrying with linear backoff. `None` on
    /// exhaustion or when the platform is disabled.
    pub async fn check_status(&self, platform: Platform, handle: &str) -> Option<StatusSnapshot> {
        if !self.is_running() {
            warn!("scrape orchestrator is not running");
            return None;
        }
        let Some(strategy) = self.strategies.get(&platform) else {
            warn!("{platform} scraping is disabled");
            return None;
        };

        let max = self.config.max_retries.max(1);
        for attempt in 1..=max {
            let call = strategy.fetch_status(handle);
            match timeout(Duration::from_millis(self.config.timeout_ms), call).await {
                Ok(Ok(snap)) => {
                    debug!(
                        "stream check for {platform}/{handle}: {}",
                        if snap.is_live { "LIVE" } else { "OFFLINE" }
                    );
                    return Some(snap);
                }
                Ok(Err(e)) => {
                    error!("error checking {platform}/{handle} (attempt {attempt}/{max}): {e}");
                }
                Err(_) => {
                    error!("timed out checking {platform}/{handle} (attempt {attempt}/{max})");
                }
            }
            if attempt < max {
                sleep(Duration::from_millis(
                    self.config.retry_base_ms * attempt as u64,
                ))
                .await;
            }
        }

        error!("max retries reached for {platform}/{handle}");
        None
    }

    /// Check many accounts in fixed-size groups: everything inside a group
    /// runs concurrently, groups run one after another with a pause in
    /// between, so no platform ever sees more than `batch_size` of our
    /// requests at once. Results keep the input order.
    pub async fn check_many(
        &self,
        targets: &[(Platform, String)],
    ) -> Vec<Option<StatusSnapshot>> {
        let batch = self.config.batch_size.max(1);
        let mut results = Vec::with_capacity(targets.len());
        for (i, group) in targets.chunks(batch).enumerate() {
            if i > 0 {
                sleep(Duration::from_millis(self.config.batch_pause_ms)).await;
            }
            let checks = group.iter().map(|(p, h)| self.check_status(*p, h));
            results.extend(join_all(checks).await);
        }
        results
    }

    /// Liveness, not correctness: each enabled strategy must run its
    /// pipeline without erroring and tag the snapshot with its own
    /// platform. Disabled strategies count as healthy.
    pub async fn health_check(&self) -> ScrapeHealth {
        let kick = self.probe(Platform::Kick).await;
        let tiktok = self.probe(Platform::TikTok).await;
        ScrapeHealth {
            kick,
            tiktok,
            overall: kick && tiktok && self.is_running(),
        }
    }

    async fn probe(&self, platform: Platform) -> bool {
        let Some(strategy) = self.strategies.get(&platform) else {
            return true;
        };
        let call = strategy.fetch_status(HEALTH_PROBE_HANDLE);
        match timeout(Duration::from_millis(self.config.timeout_ms), call).await {
            Ok(Ok(snap)) => snap.platform == platform,
            _ => false,
        }
    }
}

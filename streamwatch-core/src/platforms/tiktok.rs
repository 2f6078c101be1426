// File: src/platforms/tiktok.rs

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use streamwatch_common::models::{Platform, StatusSnapshot};

use crate::http::HttpClient;
use crate::platforms::{LiveProbe, ScrapePlatform};
use crate::scrape::markup;
use crate::scrape::RenderedPageClient;
use crate::Error;

/// The mobile site serves the lightweight probe; it renders more of the live
/// state without script execution than the desktop page does.
const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 14_7_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.2 Mobile/15E148 Safari/604.1";

/// TikTok hydrates the live room late; give it longer than most.
const RENDER_SETTLE_MS: u64 = 5_000;

const LIVE_TEXT_MARKERS: [&str; 3] = ["live", "streaming", "on air"];
const NEGATING_MARKERS: [&str; 2] = ["not live", "offline"];

static LIVE_BADGE_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [r#"[data-e2e="live-badge"]"#, ".live-badge", ".live-indicator"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

static VIDEO_SELECTOR: Lazy<Vec<Selector>> =
    Lazy::new(|| vec![Selector::parse("video").unwrap()]);

static TITLE_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [r#"[data-e2e="live-title"]"#, ".live-title", "h1", "title"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

static VIEWER_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        r#"[data-e2e="live-viewer-count"]"#,
        ".viewer-count",
        ".live-viewer-count",
    ]
    .iter()
    .map(|s| Selector::parse(s).unwrap())
    .collect()
});

pub struct TikTokScraper {
    http: Arc<dyn HttpClient<Error = Error>>,
    browser: Arc<RenderedPageClient>,
}

impl TikTokScraper {
    pub fn new(http: Arc<dyn HttpClient<Error = Error>>, browser: Arc<RenderedPageClient>) -> Self {
        Self { http, browser }
    }

    async fn probe_page(&self, handle: &str) -> LiveProbe {
        let url = format!("https://m.tiktok.com/@{handle}/live");
        let body = match self.http.get(url, page_headers()).await {
            Ok(body) => body,
            Err(e) => {
                warn!("TikTok mobile fetch failed for {handle}: {e}");
                return LiveProbe::Inconclusive;
            }
        };

        match read_page(handle, &body) {
            Some(snap) => LiveProbe::Live(snap),
            None => LiveProbe::Offline,
        }
    }

    async fn probe_rendered(&self, handle: &str) -> Result<StatusSnapshot, Error> {
        let url = Platform::TikTok.channel_url(handle);
        let html = self.browser.content(&url, RENDER_SETTLE_MS).await?;
        Ok(read_page(handle, &html).unwrap_or_else(|| offline_snapshot(handle)))
    }
}

#[async_trait]
impl ScrapePlatform for TikTokScraper {
    fn platform(&self) -> Platform {
        Platform::TikTok
    }

    async fn fetch_status(&self, handle: &str) -> Result<StatusSnapshot, Error> {
        match self.probe_page(handle).await {
            LiveProbe::Live(snap) => {
                debug!("TikTok mobile check for {handle}: LIVE");
                Ok(snap)
            }
            LiveProbe::Offline => {
                debug!("TikTok mobile check for {handle}: OFFLINE");
                Ok(offline_snapshot(handle))
            }
            LiveProbe::Inconclusive => {
                debug!("TikTok mobile check for {handle} inconclusive, rendering");
                self.probe_rendered(handle).await
            }
        }
    }
}

fn page_headers() -> HashMap<String, String> {
    HashMap::from([
        ("User-Agent".to_string(), MOBILE_USER_AGENT.to_string()),
        (
            "Accept".to_string(),
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8".to_string(),
        ),
        ("Accept-Language".to_string(), "en-US,en;q=0.5".to_string()),
        ("Referer".to_string(), "https://m.tiktok.com/".to_string()),
    ])
}

fn read_page(handle: &str, html: &str) -> Option<StatusSnapshot> {
    let doc = Html::parse_document(html);

    let has_badge = markup::any_match(&doc, &LIVE_BADGE_SELECTORS);
    let text = markup::page_text(&doc);
    let negated = NEGATING_MARKERS.iter().any(|m| text.contains(m));
    let has_live_text = !negated && LIVE_TEXT_MARKERS.iter().any(|m| text.contains(m));
    let has_video = markup::any_match(&doc, &VIDEO_SELECTOR);

    if !(has_badge || (has_video && has_live_text)) {
        return None;
    }

    let mut snap = StatusSnapshot::live(Platform::TikTok);
    snap.platform_id = Some(handle.to_string());
    snap.stream_url = Some(Platform::TikTok.channel_url(handle));
    snap.title = markup::first_text_where(&doc, &TITLE_SELECTORS, |t| !t.contains("TikTok"));
    snap.viewer_count = markup::first_count(&doc, &VIEWER_SELECTORS);
    Some(snap)
}

fn offline_snapshot(handle: &str) -> StatusSnapshot {
    let mut snap = StatusSnapshot::offline(Platform::TikTok);
    snap.platform_id = Some(handle.to_string());
    snap.stream_url = Some(Platform::TikTok.channel_url(handle));
    snap
}

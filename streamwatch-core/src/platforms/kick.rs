// File: src/platforms/kick.rs

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

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Extra wait after network idle; the player badge is script-rendered.
const RENDER_SETTLE_MS: u64 = 3_000;

const SITE_ORIGIN: &str = "https://kick.com/";

/// Words that mark a live page, unless "offline" also appears.
const LIVE_TEXT_MARKERS: [&str; 3] = ["live", "streaming", "online"];

static LIVE_CLASS_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [r#"[class*="live"]"#, r#"[data-live="true"]"#]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

static VIDEO_SELECTOR: Lazy<Vec<Selector>> =
    Lazy::new(|| vec![Selector::parse("video").unwrap()]);

static TITLE_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["h1", ".stream-title", r#"[data-testid="stream-title"]"#, "title"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

static VIEWER_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [".viewer-count", r#"[data-testid="viewer-count"]"#]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

static THUMBNAIL_SELECTORS: Lazy<Vec<(Selector, &'static str)>> = Lazy::new(|| {
    vec![
        (Selector::parse("video[poster]").unwrap(), "poster"),
        (Selector::parse(".stream-thumbnail img").unwrap(), "src"),
        (
            Selector::parse(r#"[data-testid="stream-thumbnail"] img"#).unwrap(),
            "src",
        ),
    ]
});

pub struct KickScraper {
    http: Arc<dyn HttpClient<Error = Error>>,
    browser: Arc<RenderedPageClient>,
}

impl KickScraper {
    pub fn new(http: Arc<dyn HttpClient<Error = Error>>, browser: Arc<RenderedPageClient>) -> Self {
        Self { http, browser }
    }

    /// Lightweight technique: plain GET of the channel page. A fetch failure
    /// is inconclusive (anti-bot wall or network trouble says nothing about
    /// the stream); markup with no live indicator is a definite offline.
    async fn probe_page(&self, handle: &str) -> LiveProbe {
        let url = Platform::Kick.channel_url(handle);
        let body = match self.http.get(url, page_headers()).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Kick page fetch failed for {handle}: {e}");
                return LiveProbe::Inconclusive;
            }
        };

        match read_page(handle, &body) {
            Some(snap) => LiveProbe::Live(snap),
            None => LiveProbe::Offline,
        }
    }

    /// Last-resort technique: rendered page through the shared browser
    /// handle, then the same selector heuristics. Always definite.
    async fn probe_rendered(&self, handle: &str) -> Result<StatusSnapshot, Error> {
        let url = Platform::Kick.channel_url(handle);
        let html = self.browser.content(&url, RENDER_SETTLE_MS).await?;
        Ok(read_page(handle, &html).unwrap_or_else(|| offline_snapshot(handle)))
    }
}

#[async_trait]
impl ScrapePlatform for KickScraper {
    fn platform(&self) -> Platform {
        Platform::Kick
    }

    async fn fetch_status(&self, handle: &str) -> Result<StatusSnapshot, Error> {
        match self.probe_page(handle).await {
            LiveProbe::Live(snap) => {
                debug!("Kick page check for {handle}: LIVE");
                Ok(snap)
            }
            LiveProbe::Offline => {
                debug!("Kick page check for {handle}: OFFLINE");
                Ok(offline_snapshot(handle))
            }
            LiveProbe::Inconclusive => {
                debug!("Kick page check for {handle} inconclusive, rendering");
                self.probe_rendered(handle).await
            }
        }
    }
}

fn page_headers() -> HashMap<String, String> {
    HashMap::from([
        ("User-Agent".to_string(), USER_AGENT.to_string()),
        (
            "Accept".to_string(),
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8".to_string(),
        ),
        ("Accept-Language".to_string(), "en-US,en;q=0.5".to_string()),
        ("Referer".to_string(), SITE_ORIGIN.to_string()),
    ])
}

/// Apply the live-indicator heuristics to channel-page markup. `Some` is a
/// live snapshot with whatever metadata the page yields, `None` is offline.
fn read_page(handle: &str, html: &str) -> Option<StatusSnapshot> {
    let doc = Html::parse_document(html);

    let text = markup::page_text(&doc);
    let has_live_text =
        LIVE_TEXT_MARKERS.iter().any(|m| text.contains(m)) && !text.contains("offline");
    let has_video = markup::any_match(&doc, &VIDEO_SELECTOR);
    let has_live_class = markup::any_match(&doc, &LIVE_CLASS_SELECTORS);

    if !(has_live_text || (has_video && has_live_class)) {
        return None;
    }

    let mut snap = StatusSnapshot::live(Platform::Kick);
    snap.platform_id = Some(handle.to_string());
    snap.stream_url = Some(Platform::Kick.channel_url(handle));
    snap.title = markup::first_text_where(&doc, &TITLE_SELECTORS, |t| t != "Kick");
    snap.viewer_count = markup::first_count(&doc, &VIEWER_SELECTORS);
    let thumb_pairs: Vec<(&Selector, &str)> =
        THUMBNAIL_SELECTORS.iter().map(|(s, a)| (s, *a)).collect();
    snap.thumbnail = markup::first_attr(&doc, &thumb_pairs)
        .and_then(|src| markup::absolutize(SITE_ORIGIN, &src));
    Some(snap)
}

fn offline_snapshot(handle: &str) -> StatusSnapshot {
    let mut snap = StatusSnapshot::offline(Platform::Kick);
    snap.platform_id = Some(handle.to_string());
    snap.stream_url = Some(Platform::Kick.channel_url(handle));
    snap
}

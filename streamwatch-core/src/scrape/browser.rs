// File: src/scrape/browser.rs

use std::time::Duration;

use serde_json::json;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::Error;

/// Shared handle to the headless-browser rendering service.
///
/// One instance is built at startup and passed to every strategy that needs
/// rendered markup. The underlying HTTP session is established lazily on
/// first use and torn down again whenever a call fails at the transport
/// layer, so a crashed or restarted browser service never leaves later calls
/// holding a stale session. All of that is invisible to callers: they ask
/// for rendered page content and either get markup or an `Error`.
pub struct RenderedPageClient {
    endpoint: String,
    token: Option<String>,
    call_timeout: Duration,
    session: Mutex<Option<reqwest::Client>>,
}

impl RenderedPageClient {
    pub fn new(endpoint: &str, token: Option<&str>, call_timeout_ms: u64) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: token.map(String::from),
            call_timeout: Duration::from_millis(call_timeout_ms),
            session: Mutex::new(None),
        }
    }

    /// Fetch fully-rendered markup for `url`: navigate, wait for network
    /// idle, then an extra `settle_ms` for late script-driven updates.
    pub async fn content(&self, url: &str, settle_ms: u64) -> Result<String, Error> {
        let client = self.session().await?;

        let mut endpoint = format!("{}/content", self.endpoint);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }

        let body = json!({
            "url": url,
            "gotoOptions": {
                "waitUntil": "networkidle0",
                "timeout": self.call_timeout.as_millis() as u64,
            },
            "waitForTimeout": settle_ms,
        });

        let resp = match client
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                // Transport failure: the session may be gone for good, drop
                // it so the next call re-establishes a fresh one.
                self.invalidate().await;
                return Err(Error::Scrape(format!("rendered fetch failed for {url}: {e}")));
            }
        };

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(Error::Scrape(format!(
                "rendered fetch for {url}: HTTP {status} => {message}"
            )));
        }

        Ok(resp.text().await?)
    }

    /// Explicit teardown; the next `content` call would lazily reconnect.
    pub async fn close(&self) {
        let mut guard = self.session.lock().await;
        if guard.take().is_some() {
            info!("rendered-page client closed");
        }
    }

    async fn session(&self) -> Result<reqwest::Client, Error> {
        let mut guard = self.session.lock().await;
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }
        let client = reqwest::Client::builder()
            .timeout(self.call_timeout)
            .build()
            .map_err(|e| Error::Scrape(format!("could not build rendering session: {e}")))?;
        info!("rendered-page client connected to {}", self.endpoint);
        *guard = Some(client.clone());
        Ok(client)
    }

    async fn invalidate(&self) {
        let mut guard = self.session.lock().await;
        if guard.take().is_some() {
            warn!("rendered-page session invalidated, will reconnect on next use");
        }
    }
}

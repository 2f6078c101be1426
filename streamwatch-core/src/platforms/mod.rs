// File: src/platforms/mod.rs

use async_trait::async_trait;
use streamwatch_common::models::{AccountIdentity, Platform, StatusSnapshot};

use crate::Error;

/// Outcome of the lightweight (plain HTTP) probe against a platform page.
///
/// `Inconclusive` means the page could not be fetched at all (network error,
/// anti-bot wall) and says nothing about the stream. It is distinct from
/// `Offline` on purpose: a blocked fetch must escalate to the rendered
/// technique rather than mislabel a live stream as offline. Only the
/// lightweight probe may be inconclusive; the rendered pass always settles
/// on live or offline.
#[derive(Debug, Clone)]
pub enum LiveProbe {
    Live(StatusSnapshot),
    Offline,
    Inconclusive,
}

/// One scrape-only platform strategy: two escalating techniques behind a
/// single call that always yields a definite snapshot or an error.
#[async_trait]
pub trait ScrapePlatform: Send + Sync {
    fn platform(&self) -> Platform;
    async fn fetch_status(&self, handle: &str) -> Result<StatusSnapshot, Error>;
}

/// Official live-status API for API-backed platforms, swappable per platform.
///
/// `Ok(None)` is a definite "account not found" and is never retried;
/// `Err` is a transient failure the caller may treat as "no information".
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LiveStatusApi: Send + Sync {
    async fn get_identity(&self, handle: &str) -> Result<Option<AccountIdentity>, Error>;
    async fn get_live_status(
        &self,
        platform_id: &str,
        handle: &str,
    ) -> Result<Option<StatusSnapshot>, Error>;
}

// Re-export submodules
pub mod kick;
pub mod tiktok;
pub mod twitch;
pub mod youtube;

// File: src/services/status_provider.rs

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::warn;

use streamwatch_common::models::{AccountIdentity, Platform, StatusSnapshot, TrackedAccount};

use crate::platforms::LiveStatusApi;
use crate::scrape::ScrapeOrchestrator;
use crate::Error;

/// Unifies the official API clients and the scrape orchestrator behind one
/// question: what is this account doing right now. Dispatch is an exhaustive
/// match on the platform, so adding a platform is a compile-time-checked
/// change.
pub struct StatusProviderService {
    twitch: Arc<dyn LiveStatusApi>,
    youtube: Arc<dyn LiveStatusApi>,
    scrapers: Arc<ScrapeOrchestrator>,
}

impl StatusProviderService {
    pub fn new(
        twitch: Arc<dyn LiveStatusApi>,
        youtube: Arc<dyn LiveStatusApi>,
        scrapers: Arc<ScrapeOrchestrator>,
    ) -> Self {
        Self {
            twitch,
            youtube,
            scrapers,
        }
    }

    /// `None` is "no information this cycle". That covers both a transient
    /// failure (already retried below this layer) and a definite not-found;
    /// the difference matters for operators and is logged here, but the
    /// monitor treats both the same: leave the account's state alone.
    pub async fn get_status(
        &self,
        platform: Platform,
        platform_id: &str,
        handle: &str,
    ) -> Option<StatusSnapshot> {
        match platform {
            Platform::Twitch => self.official(&*self.twitch, platform, platform_id, handle).await,
            Platform::YouTube => {
                self.official(&*self.youtube, platform, platform_id, handle).await
            }
            Platform::TikTok | Platform::Kick => self.scrapers.check_status(platform, handle).await,
        }
    }

    /// Identity lookup for the registration path. Scrape-only platforms
    /// have no identity API; the handle is the identity.
    pub async fn resolve_identity(
        &self,
        platform: Platform,
        handle: &str,
    ) -> Result<Option<AccountIdentity>, Error> {
        match platform {
            Platform::Twitch => self.twitch.get_identity(handle).await,
            Platform::YouTube => self.youtube.get_identity(handle).await,
            Platform::TikTok | Platform::Kick => Ok(Some(AccountIdentity {
                platform,
                platform_id: handle.to_string(),
                handle: handle.to_string(),
                display_name: handle.to_string(),
                avatar_url: None,
                followers: 0,
            })),
        }
    }

    /// One snapshot slot per account, input order preserved. API-backed
    /// accounts are checked concurrently; scrape-only accounts go through
    /// the orchestrator's batching so the scraped platforms see bounded
    /// concurrency.
    pub async fn get_statuses(&self, accounts: &[TrackedAccount]) -> Vec<Option<StatusSnapshot>> {
        let mut results: Vec<Option<StatusSnapshot>> = vec![None; accounts.len()];

        let mut api_idx = Vec::new();
        let mut api_checks = Vec::new();
        let mut scrape_idx = Vec::new();
        let mut scrape_targets = Vec::new();
        for (i, acct) in accounts.iter().enumerate() {
            if acct.platform.is_scraped() {
                scrape_idx.push(i);
                scrape_targets.push((acct.platform, acct.handle.clone()));
            } else {
                api_idx.push(i);
                api_checks.push(self.get_status(acct.platform, &acct.platform_id, &acct.handle));
            }
        }

        let (api_results, scrape_results) = tokio::join!(
            join_all(api_checks),
            self.scrapers.check_many(&scrape_targets),
        );

        for (i, snap) in api_idx.into_iter().zip(api_results) {
            results[i] = snap;
        }
        for (i, snap) in scrape_idx.into_iter().zip(scrape_results) {
            results[i] = snap;
        }
        results
    }

    async fn official(
        &self,
        api: &dyn LiveStatusApi,
        platform: Platform,
        platform_id: &str,
        handle: &str,
    ) -> Option<StatusSnapshot> {
        match api.get_live_status(platform_id, handle).await {
            Ok(Some(snap)) => Some(snap),
            Ok(None) => {
                warn!("{platform} reports no account for {handle} ({platform_id})");
                None
            }
            Err(e) => {
                warn!("could not fetch {platform} status for {handle}: {e}");
                None
            }
        }
    }
}

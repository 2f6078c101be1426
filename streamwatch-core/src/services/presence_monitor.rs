// File: src/services/presence_monitor.rs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use futures_util::future::join_all;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use streamwatch_common::models::{
    PresenceEvent, PresenceEventKind, StatusSnapshot, TrackedAccount,
};
use streamwatch_common::traits::repository_traits::{AccountRepository, PresenceEventRepository};

use crate::services::notification_service::NotificationService;
use crate::services::status_provider::StatusProviderService;

/// The scheduler's state machine. Each cycle takes one snapshot per tracked
/// account, diffs it against the account's last known state, persists any
/// transition as an event, and fans out go-live notifications.
///
/// Accounts are isolated from each other: one account's repository or
/// platform trouble never aborts the cycle for the rest. Checks for a single
/// account are strictly serialized across cycles, never concurrent.
pub struct PresenceMonitor {
    accounts: Arc<dyn AccountRepository>,
    events: Arc<dyn PresenceEventRepository>,
    provider: Arc<StatusProviderService>,
    notifier: Arc<NotificationService>,
    cycle_running: AtomicBool,
    in_flight: DashMap<Uuid, ()>,
}

impl PresenceMonitor {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        events: Arc<dyn PresenceEventRepository>,
        provider: Arc<StatusProviderService>,
        notifier: Arc<NotificationService>,
    ) -> Self {
        Self {
            accounts,
            events,
            provider,
            notifier,
            cycle_running: AtomicBool::new(false),
            in_flight: DashMap::new(),
        }
    }

    /// One full poll cycle. If the previous cycle is somehow still running
    /// (a cadence shorter than the slowest platform), this tick is skipped
    /// rather than stacked.
    pub async fn run_cycle(&self) {
        if self
            .cycle_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("previous poll cycle still running, skipping this tick");
            return;
        }
        self.run_cycle_inner().await;
        self.cycle_running.store(false, Ordering::SeqCst);
    }

    async fn run_cycle_inner(&self) {
        let accounts = match self.accounts.list_all().await {
            Ok(accounts) => accounts,
            Err(e) => {
                error!("could not enumerate tracked accounts: {e}");
                return;
            }
        };
        debug!("checking {} accounts for status updates", accounts.len());

        let snapshots = self.provider.get_statuses(&accounts).await;
        let work = accounts
            .into_iter()
            .zip(snapshots)
            .map(|(account, snapshot)| self.apply(account, snapshot));
        join_all(work).await;
    }

    /// Diff one account against its fresh snapshot and persist the result.
    /// All failures are logged and contained here.
    async fn apply(&self, account: TrackedAccount, snapshot: Option<StatusSnapshot>) {
        // Unknown means exactly that: keep the last known state untouched so
        // a transient scrape failure cannot fabricate an offline transition.
        let Some(snapshot) = snapshot else {
            debug!(
                "no status for {} ({}) this cycle",
                account.display_name, account.platform
            );
            return;
        };

        let account_id = account.account_id;
        if self.in_flight.insert(account_id, ()).is_some() {
            warn!("check already in flight for {}, skipping", account.handle);
            return;
        }
        self.apply_transitions(account, snapshot).await;
        self.in_flight.remove(&account_id);
    }

    async fn apply_transitions(&self, mut account: TrackedAccount, snapshot: StatusSnapshot) {
        let was_live = account.is_live;
        let now_live = snapshot.is_live;
        let now = Utc::now();

        account.last_checked_at = Some(now);
        account.updated_at = now;

        let mut event: Option<PresenceEvent> = None;
        let mut notify = false;

        if now_live {
            // Secondary fields are best-effort; only overwrite what the
            // snapshot actually carries.
            let title_changed =
                was_live && snapshot.title.is_some() && snapshot.title != account.last_title;
            account.is_live = true;
            if let Some(title) = &snapshot.title {
                account.last_title = Some(title.clone());
            }
            if let Some(url) = &snapshot.stream_url {
                account.last_stream_url = Some(url.clone());
            }
            if let Some(thumb) = &snapshot.thumbnail {
                account.last_thumbnail = Some(thumb.clone());
            }

            if !was_live {
                account.live_since = Some(snapshot.started_at.unwrap_or(now));
                event = Some(PresenceEvent::from_snapshot(
                    account.account_id,
                    PresenceEventKind::WentLive,
                    &snapshot,
                ));
                notify = true;
            } else if title_changed {
                event = Some(PresenceEvent::from_snapshot(
                    account.account_id,
                    PresenceEventKind::TitleChanged,
                    &snapshot,
                ));
            }
        } else if was_live {
            account.is_live = false;
            account.live_since = None;
            event = Some(PresenceEvent::from_snapshot(
                account.account_id,
                PresenceEventKind::WentOffline,
                &snapshot,
            ));
        }

        if let Err(e) = self.accounts.save(&account).await {
            error!("could not save status for {}: {e}", account.handle);
        }

        if let Some(event) = event {
            let kind = event.kind;
            if let Err(e) = self.events.append(&event).await {
                error!("could not append {kind:?} event for {}: {e}", account.handle);
            }
        }

        if notify {
            self.notifier.notify_went_live(&account, &snapshot).await;
        }

        if !was_live && now_live {
            info!(
                "{} ({}) went live: {}",
                account.display_name,
                account.platform,
                snapshot.title.as_deref().unwrap_or("(no title)")
            );
        } else if was_live && !now_live {
            info!("{} ({}) went offline", account.display_name, account.platform);
        }
    }
}


// File: streamwatch-core/tests/presence_monitor_tests.rs
//
// Transition-table behavior of the presence monitor against in-memory
// repositories and a scripted official API.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use streamwatch_common::models::{
    Platform, PresenceEvent, PresenceEventKind, StatusSnapshot, Subscription, TrackedAccount,
};
use streamwatch_common::traits::repository_traits::{
    AccountRepository, NotificationSink, NotifyDestination, PresenceEventRepository,
    SubscriptionRepository,
};
use streamwatch_core::platforms::{LiveStatusApi, ScrapePlatform};
use streamwatch_core::scrape::{RenderedPageClient, ScrapeConfig, ScrapeOrchestrator};
use streamwatch_core::services::{NotificationService, PresenceMonitor, StatusProviderService};
use streamwatch_core::tasks::MonitorRuntime;
use streamwatch_common::models::AccountIdentity;
use streamwatch_core::{Error, WatchConfig};

// ---------------------------------------------------------------------------
// In-memory collaborators
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryAccountRepo {
    data: Mutex<HashMap<(Platform, String), TrackedAccount>>,
}

impl MemoryAccountRepo {
    fn seed(&self, account: TrackedAccount) {
        self.data
            .lock()
            .unwrap()
            .insert((account.platform, account.platform_id.clone()), account);
    }

    fn snapshot_of(&self, platform: Platform, platform_id: &str) -> TrackedAccount {
        self.data
            .lock()
            .unwrap()
            .get(&(platform, platform_id.to_string()))
            .cloned()
            .expect("account should exist")
    }
}

#[async_trait]
impl AccountRepository for MemoryAccountRepo {
    async fn get(
        &self,
        platform: Platform,
        platform_id: &str,
    ) -> Result<Option<TrackedAccount>, Error> {
        Ok(self
            .data
            .lock()
            .unwrap()
            .get(&(platform, platform_id.to_string()))
            .cloned())
    }

    async fn list_all(&self) -> Result<Vec<TrackedAccount>, Error> {
        Ok(self.data.lock().unwrap().values().cloned().collect())
    }

    async fn save(&self, account: &TrackedAccount) -> Result<(), Error> {
        self.data.lock().unwrap().insert(
            (account.platform, account.platform_id.clone()),
            account.clone(),
        );
        Ok(())
    }
}

#[derive(Default)]
struct MemoryEventRepo {
    events: Mutex<Vec<PresenceEvent>>,
}

impl MemoryEventRepo {
    fn kinds(&self) -> Vec<PresenceEventKind> {
        self.events.lock().unwrap().iter().map(|e| e.kind).collect()
    }
}

#[async_trait]
impl PresenceEventRepository for MemoryEventRepo {
    async fn append(&self, event: &PresenceEvent) -> Result<(), Error> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

struct MemorySubscriptionRepo {
    subs: Vec<Subscription>,
}

#[async_trait]
impl SubscriptionRepository for MemorySubscriptionRepo {
    async fn list_active_for_account(&self, account_id: Uuid) -> Result<Vec<Subscription>, Error> {
        Ok(self
            .subs
            .iter()
            .filter(|s| s.account_id == account_id && s.is_active)
            .cloned()
            .collect())
    }
}

/// Records deliveries; refuses any destined for a channel named "broken".
#[derive(Default)]
struct RecordingSink {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, destination: &NotifyDestination, message: &str) -> Result<(), Error> {
        if destination.channel_id == "broken" {
            return Err(Error::Delivery("channel rejected the message".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((destination.channel_id.clone(), message.to_string()));
        Ok(())
    }
}

/// Official API that replays a fixed script of answers.
enum Step {
    Live(&'static str),
    Offline,
    Transient,
    NotFound,
}

struct ScriptedApi {
    steps: Mutex<VecDeque<Step>>,
}

impl ScriptedApi {
    fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
        })
    }

    fn empty() -> Arc<Self> {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl LiveStatusApi for ScriptedApi {
    async fn get_identity(&self, _handle: &str) -> Result<Option<AccountIdentity>, Error> {
        Ok(None)
    }

    async fn get_live_status(
        &self,
        platform_id: &str,
        handle: &str,
    ) -> Result<Option<StatusSnapshot>, Error> {
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .expect("status script exhausted");
        match step {
            Step::Live(title) => {
                let mut snap = StatusSnapshot::live(Platform::Twitch);
                snap.platform_id = Some(platform_id.to_string());
                snap.title = Some(title.to_string());
                snap.stream_url = Some(format!("https://twitch.tv/{handle}"));
                snap.viewer_count = Some(42);
                Ok(Some(snap))
            }
            Step::Offline => {
                let mut snap = StatusSnapshot::offline(Platform::Twitch);
                snap.platform_id = Some(platform_id.to_string());
                Ok(Some(snap))
            }
            Step::Transient => Err(Error::Platform("simulated outage".into())),
            Step::NotFound => Ok(None),
        }
    }
}

/// Scrape strategy that always fails, for exhaustion-path tests.
struct FailingStrategy {
    calls: AtomicUsize,
}

#[async_trait]
impl ScrapePlatform for FailingStrategy {
    fn platform(&self) -> Platform {
        Platform::Kick
    }

    async fn fetch_status(&self, _handle: &str) -> Result<StatusSnapshot, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::Scrape("simulated scrape failure".into()))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    accounts: Arc<MemoryAccountRepo>,
    events: Arc<MemoryEventRepo>,
    sink: Arc<RecordingSink>,
    orchestrator: Arc<ScrapeOrchestrator>,
    monitor: Arc<PresenceMonitor>,
}

async fn build_harness(
    twitch: Arc<dyn LiveStatusApi>,
    strategies: Vec<Arc<dyn ScrapePlatform>>,
    subs: Vec<Subscription>,
) -> Harness {
    let accounts = Arc::new(MemoryAccountRepo::default());
    let events = Arc::new(MemoryEventRepo::default());
    let sink = Arc::new(RecordingSink::default());

    let config = ScrapeConfig {
        max_retries: 3,
        retry_base_ms: 1,
        batch_pause_ms: 1,
        timeout_ms: 2_000,
        ..ScrapeConfig::default()
    };
    let browser = Arc::new(RenderedPageClient::new("http://localhost:3000", None, 1_000));
    let orchestrator = Arc::new(ScrapeOrchestrator::with_strategies(
        config, browser, strategies,
    ));
    orchestrator.init().await;

    let monitor = Arc::new(PresenceMonitor::new(
        accounts.clone(),
        events.clone(),
        Arc::new(StatusProviderService::new(
            twitch,
            ScriptedApi::empty(),
            orchestrator.clone(),
        )),
        Arc::new(NotificationService::new(
            Arc::new(MemorySubscriptionRepo { subs }),
            sink.clone(),
        )),
    ));

    Harness {
        accounts,
        events,
        sink,
        orchestrator,
        monitor,
    }
}

fn subscription_for(account: &TrackedAccount, channel_id: &str) -> Subscription {
    let now = Utc::now();
    Subscription {
        subscription_id: Uuid::new_v4(),
        guild_id: "guild".into(),
        channel_id: channel_id.into(),
        account_id: account.account_id,
        message_template: Some("{streamer} live on {platform}: {title} {url}".into()),
        mention_target: None,
        is_active: true,
        created_by: "op".into(),
        created_at: now,
        updated_at: now,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn four_poll_scenario_covers_the_whole_transition_table() {
    let account = TrackedAccount::new(Platform::Twitch, "123", "ana", "Ana");
    let api = ScriptedApi::new(vec![
        Step::Live("A"),
        Step::Live("B"),
        Step::Transient,
        Step::Offline,
    ]);
    let harness = build_harness(
        api,
        vec![],
        vec![subscription_for(&account, "general")],
    )
    .await;
    harness.accounts.seed(account);

    // Poll 1: goes live with title "A".
    harness.monitor.run_cycle().await;
    let state = harness.accounts.snapshot_of(Platform::Twitch, "123");
    assert!(state.is_live);
    assert!(state.live_since.is_some());
    assert_eq!(state.last_title.as_deref(), Some("A"));
    assert_eq!(harness.events.kinds(), vec![PresenceEventKind::WentLive]);
    {
        let sent = harness.sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("A"), "notification should carry the title");
    }

    // Poll 2: still live, new title.
    harness.monitor.run_cycle().await;
    let state = harness.accounts.snapshot_of(Platform::Twitch, "123");
    assert_eq!(state.last_title.as_deref(), Some("B"));
    assert_eq!(
        harness.events.kinds(),
        vec![PresenceEventKind::WentLive, PresenceEventKind::TitleChanged]
    );
    assert_eq!(harness.sink.sent.lock().unwrap().len(), 1, "no notice on title change");

    // Poll 3: unknown; nothing may move.
    let before = harness.accounts.snapshot_of(Platform::Twitch, "123");
    harness.monitor.run_cycle().await;
    let after = harness.accounts.snapshot_of(Platform::Twitch, "123");
    assert_eq!(after.is_live, before.is_live);
    assert_eq!(after.live_since, before.live_since);
    assert_eq!(after.last_title, before.last_title);
    assert_eq!(after.last_checked_at, before.last_checked_at);
    assert_eq!(harness.events.kinds().len(), 2);

    // Poll 4: offline.
    harness.monitor.run_cycle().await;
    let state = harness.accounts.snapshot_of(Platform::Twitch, "123");
    assert!(!state.is_live);
    assert!(state.live_since.is_none());
    assert_eq!(
        harness.events.kinds(),
        vec![
            PresenceEventKind::WentLive,
            PresenceEventKind::TitleChanged,
            PresenceEventKind::WentOffline,
        ]
    );
}

#[tokio::test]
async fn identical_snapshots_are_idempotent() {
    let account = TrackedAccount::new(Platform::Twitch, "123", "ana", "Ana");
    let api = ScriptedApi::new(vec![Step::Live("Chatting"), Step::Live("Chatting")]);
    let harness = build_harness(api, vec![], vec![]).await;
    harness.accounts.seed(account);

    harness.monitor.run_cycle().await;
    harness.monitor.run_cycle().await;

    assert_eq!(harness.events.kinds(), vec![PresenceEventKind::WentLive]);
}

#[tokio::test]
async fn went_live_events_alternate_with_went_offline() {
    let account = TrackedAccount::new(Platform::Twitch, "123", "ana", "Ana");
    let api = ScriptedApi::new(vec![
        Step::Live("A"),
        Step::Live("A"),
        Step::Offline,
        Step::Transient,
        Step::Live("A"),
    ]);
    let harness = build_harness(api, vec![], vec![]).await;
    harness.accounts.seed(account);

    for _ in 0..5 {
        harness.monitor.run_cycle().await;
    }

    let kinds = harness.events.kinds();
    assert_eq!(
        kinds,
        vec![
            PresenceEventKind::WentLive,
            PresenceEventKind::WentOffline,
            PresenceEventKind::WentLive,
        ]
    );
    // No two consecutive went-live events without a went-offline between.
    let lives_and_offs: Vec<_> = kinds
        .iter()
        .filter(|k| **k != PresenceEventKind::TitleChanged)
        .collect();
    for pair in lives_and_offs.windows(2) {
        assert_ne!(pair[0], pair[1], "event log must alternate");
    }
}

#[tokio::test]
async fn not_found_preserves_state_like_unknown() {
    let mut account = TrackedAccount::new(Platform::Twitch, "123", "ana", "Ana");
    account.is_live = true;
    account.live_since = Some(Utc::now());
    let api = ScriptedApi::new(vec![Step::NotFound]);
    let harness = build_harness(api, vec![], vec![]).await;
    harness.accounts.seed(account);

    harness.monitor.run_cycle().await;

    let state = harness.accounts.snapshot_of(Platform::Twitch, "123");
    assert!(state.is_live);
    assert!(state.live_since.is_some());
    assert!(harness.events.kinds().is_empty());
}

#[tokio::test]
async fn scrape_retry_exhaustion_leaves_account_untouched() {
    let mut account = TrackedAccount::new(Platform::Kick, "ana", "ana", "Ana");
    account.is_live = true;
    account.live_since = Some(Utc::now());
    let strategy = Arc::new(FailingStrategy {
        calls: AtomicUsize::new(0),
    });
    let harness = build_harness(ScriptedApi::empty(), vec![strategy.clone()], vec![]).await;
    harness.accounts.seed(account);

    harness.monitor.run_cycle().await;

    assert_eq!(strategy.calls.load(Ordering::SeqCst), 3, "all retries spent");
    let state = harness.accounts.snapshot_of(Platform::Kick, "ana");
    assert!(state.is_live, "exhausted retries must not read as offline");
    assert!(state.live_since.is_some());
    assert!(harness.events.kinds().is_empty());
}

#[tokio::test]
async fn runtime_shutdown_stops_scheduling_then_closes_scrapers() {
    let harness = build_harness(ScriptedApi::empty(), vec![], vec![]).await;
    let config = WatchConfig {
        warmup_delay_secs: 60,
        poll_interval_minutes: 1,
        ..WatchConfig::default()
    };

    let runtime = MonitorRuntime::start(
        harness.monitor.clone(),
        harness.orchestrator.clone(),
        &config,
    )
    .await;
    runtime.shutdown().await;

    assert!(!harness.orchestrator.is_running(), "scrapers closed last");
    assert!(harness.events.kinds().is_empty(), "no cycle ran before warm-up");
}

#[tokio::test]
async fn one_broken_subscriber_does_not_block_the_rest() {
    let account = TrackedAccount::new(Platform::Twitch, "123", "ana", "Ana");
    let subs = vec![
        subscription_for(&account, "broken"),
        subscription_for(&account, "general"),
    ];
    let api = ScriptedApi::new(vec![Step::Live("Chatting")]);
    let harness = build_harness(api, vec![], subs).await;
    harness.accounts.seed(account);

    harness.monitor.run_cycle().await;

    let sent = harness.sink.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "general");
    assert!(sent[0].1.contains("Ana live on Twitch: Chatting"));
}

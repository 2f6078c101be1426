// File: streamwatch-common/src/traits/repository_traits.rs

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Error;
use crate::models::account::TrackedAccount;
use crate::models::platform::Platform;
use crate::models::presence::PresenceEvent;
use crate::models::subscription::Subscription;

/// Read/write access to tracked accounts. The presence monitor only touches
/// the status fields via `save`; identity CRUD lives behind the external API
/// surface.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn get(&self, platform: Platform, platform_id: &str) -> Result<Option<TrackedAccount>, Error>;
    async fn list_all(&self) -> Result<Vec<TrackedAccount>, Error>;
    async fn save(&self, account: &TrackedAccount) -> Result<(), Error>;
}

/// Append-only event log; the core never reads it back.
#[async_trait]
pub trait PresenceEventRepository: Send + Sync {
    async fn append(&self, event: &PresenceEvent) -> Result<(), Error>;
}

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn list_active_for_account(&self, account_id: Uuid) -> Result<Vec<Subscription>, Error>;
}

/// Where a rendered notification ends up (guild + channel pair).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyDestination {
    pub guild_id: String,
    pub channel_id: String,
}

/// Abstracts the actual delivery channel (chat bot, webhook, ...). One failed
/// send must not poison the others; callers treat errors as isolated.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, destination: &NotifyDestination, message: &str) -> Result<(), Error>;
}

// File: streamwatch-common/src/models/subscription.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A destination registered to receive go-live notifications for one
/// tracked account. Owned and CRUD'd externally; the core only reads the
/// active ones at notification time.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Subscription {
    pub subscription_id: Uuid,
    pub guild_id: String,
    pub channel_id: String,
    pub account_id: Uuid,
    /// Overrides the default notification template when set. Placeholders:
    /// {streamer}, {platform}, {title}, {url}.
    pub message_template: Option<String>,
    /// Role id to mention ahead of the rendered message.
    pub mention_target: Option<String>,
    pub is_active: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// File: streamwatch-common/src/models/account.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::platform::Platform;

/// A tracked creator identity on one platform.
///
/// `(platform, platform_id)` is unique. The presence fields (`is_live`,
/// `last_*`, `live_since`, `last_checked_at`) are mutated only by the
/// presence monitor; identity fields belong to the external CRUD layer.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct TrackedAccount {
    pub account_id: Uuid,
    pub platform: Platform,
    /// Platform-native id ("user_id" on Twitch, channel id on YouTube,
    /// the handle itself on scrape-only platforms).
    pub platform_id: String,
    pub handle: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub followers: i64,

    pub is_live: bool,
    pub last_title: Option<String>,
    pub last_stream_url: Option<String>,
    pub last_thumbnail: Option<String>,
    /// Set exactly when `is_live` flips false -> true, cleared on true -> false.
    pub live_since: Option<DateTime<Utc>>,
    pub last_checked_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrackedAccount {
    pub fn new(platform: Platform, platform_id: &str, handle: &str, display_name: &str) -> Self {
        let now = Utc::now();
        Self {
            account_id: Uuid::new_v4(),
            platform,
            platform_id: platform_id.to_string(),
            handle: handle.to_string(),
            display_name: display_name.to_string(),
            avatar_url: None,
            followers: 0,
            is_live: false,
            last_title: None,
            last_stream_url: None,
            last_thumbnail: None,
            live_since: None,
            last_checked_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// File: streamwatch-common/src/models/presence.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::platform::Platform;

/// Kind of detected transition between two consecutive status snapshots.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
#[sqlx(rename_all = "snake_case")]
pub enum PresenceEventKind {
    WentLive,
    WentOffline,
    TitleChanged,
}

/// Immutable, append-only record of a detected transition. Created only by
/// the presence monitor; retention is an external concern.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct PresenceEvent {
    pub event_id: Uuid,
    pub account_id: Uuid,
    pub kind: PresenceEventKind,
    pub title: Option<String>,
    pub stream_url: Option<String>,
    pub thumbnail: Option<String>,
    pub viewer_count: Option<i64>,
    pub occurred_at: DateTime<Utc>,
}

impl PresenceEvent {
    pub fn from_snapshot(account_id: Uuid, kind: PresenceEventKind, snap: &StatusSnapshot) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            account_id,
            kind,
            title: snap.title.clone(),
            stream_url: snap.stream_url.clone(),
            thumbnail: snap.thumbnail.clone(),
            viewer_count: snap.viewer_count,
            occurred_at: Utc::now(),
        }
    }
}

/// One point-in-time best-effort status read for an account. Produced fresh
/// on every poll and never persisted by the core. All secondary fields are
/// individually optional: a missing title or viewer count never fails the
/// snapshot.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StatusSnapshot {
    pub platform: Platform,
    pub platform_id: Option<String>,
    pub is_live: bool,
    pub title: Option<String>,
    pub stream_url: Option<String>,
    pub thumbnail: Option<String>,
    pub viewer_count: Option<i64>,
    pub started_at: Option<DateTime<Utc>>,
    pub captured_at: DateTime<Utc>,
}

impl StatusSnapshot {
    pub fn offline(platform: Platform) -> Self {
        Self {
            platform,
            platform_id: None,
            is_live: false,
            title: None,
            stream_url: None,
            thumbnail: None,
            viewer_count: None,
            started_at: None,
            captured_at: Utc::now(),
        }
    }

    pub fn live(platform: Platform) -> Self {
        Self {
            is_live: true,
            ..Self::offline(platform)
        }
    }
}

/// Account identity as reported by an official API at registration time.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccountIdentity {
    pub platform: Platform,
    pub platform_id: String,
    pub handle: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub followers: i64,
}

// File: streamwatch-common/src/models/platform.rs

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

/// Add sqlx::Type so that SQLx knows how to decode this enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
#[sqlx(rename_all = "lowercase")]
pub enum Platform {
    Twitch,
    YouTube,
    TikTok,
    Kick,
}

impl Platform {
    /// Platforms with no official live-status API; these go through the
    /// scrape orchestrator instead of an API client.
    pub fn is_scraped(&self) -> bool {
        matches!(self, Platform::TikTok | Platform::Kick)
    }

    /// Canonical public page for an account handle, used as the stream URL
    /// when the platform does not report one.
    pub fn channel_url(&self, handle: &str) -> String {
        match self {
            Platform::Twitch => format!("https://twitch.tv/{handle}"),
            Platform::YouTube => format!("https://www.youtube.com/channel/{handle}/live"),
            Platform::TikTok => format!("https://www.tiktok.com/@{handle}/live"),
            Platform::Kick => format!("https://kick.com/{handle}"),
        }
    }

    /// Capitalized name for user-facing messages ("twitch" -> "Twitch").
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Twitch => "Twitch",
            Platform::YouTube => "YouTube",
            Platform::TikTok => "TikTok",
            Platform::Kick => "Kick",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Twitch => write!(f, "twitch"),
            Platform::YouTube => write!(f, "youtube"),
            Platform::TikTok => write!(f, "tiktok"),
            Platform::Kick => write!(f, "kick"),
        }
    }
}

impl FromStr for Platform {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "twitch" => Ok(Platform::Twitch),
            "youtube" => Ok(Platform::YouTube),
            "tiktok" => Ok(Platform::TikTok),
            "kick" => Ok(Platform::Kick),
            _ => Err(format!("Unknown platform: {}", s)),
        }
    }
}

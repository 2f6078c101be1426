// ========================================================
// File: src/platforms/twitch/client.rs
// ========================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client as ReqwestClient, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use streamwatch_common::models::{AccountIdentity, Platform, StatusSnapshot};

use crate::platforms::twitch::auth::AppTokenCache;
use crate::platforms::LiveStatusApi;
use crate::Error;

const HELIX_URL: &str = "https://api.twitch.tv/helix";

/// Bounded retry for transient failures only; definite answers never retry.
const TRANSIENT_ATTEMPTS: u32 = 2;
const TRANSIENT_PAUSE_MS: u64 = 500;

/// Response from "Get Streams" endpoint.
#[derive(Debug, Deserialize)]
struct StreamsResponse {
    data: Vec<StreamData>,
}

#[derive(Debug, Deserialize)]
struct StreamData {
    title: String,
    viewer_count: u32,
    started_at: String,
    thumbnail_url: String,
}

/// Response from "Get Users" endpoint.
#[derive(Debug, Deserialize)]
struct UsersResponse {
    data: Vec<UserData>,
}

#[derive(Debug, Deserialize)]
struct UserData {
    id: String,
    login: String,
    display_name: String,
    profile_image_url: String,
}

/// Response from "Get Channel Followers" endpoint.
#[derive(Debug, Deserialize)]
struct FollowersResponse {
    total: i64,
}

/// A small wrapper client for calling the Helix endpoints the monitor needs:
/// identity at registration time, live status plus stream metadata on every
/// poll.
pub struct TwitchHelixClient {
    http: ReqwestClient,
    client_id: String,
    auth: AppTokenCache,
}

impl TwitchHelixClient {
    pub fn new(client_id: &str, client_secret: &str) -> Self {
        Self {
            http: ReqwestClient::new(),
            client_id: client_id.to_string(),
            auth: AppTokenCache::new(client_id, client_secret),
        }
    }

    /// GET a Helix endpoint. `Ok(None)` means the platform answered with a
    /// definite "no such resource" (400/404); transient trouble is retried a
    /// bounded number of times before surfacing as `Err`.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>, Error> {
        let token = self.auth.bearer(&self.http).await?;

        let mut last_err: Option<Error> = None;
        for attempt in 1..=TRANSIENT_ATTEMPTS {
            let resp = match self
                .http
                .get(url)
                .header("Client-Id", &self.client_id)
                .header("Authorization", format!("Bearer {token}"))
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    last_err = Some(e.into());
                    tokio::time::sleep(Duration::from_millis(TRANSIENT_PAUSE_MS * attempt as u64))
                        .await;
                    continue;
                }
            };

            let status = resp.status();
            if status == StatusCode::BAD_REQUEST || status == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if status.is_server_error() {
                last_err = Some(Error::Platform(format!("Helix HTTP {status}")));
                tokio::time::sleep(Duration::from_millis(TRANSIENT_PAUSE_MS * attempt as u64))
                    .await;
                continue;
            }
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(Error::Platform(format!("Helix HTTP {status} => {body}")));
            }

            let body = resp.text().await?;
            let parsed = serde_json::from_str::<T>(&body)
                .map_err(|e| Error::Platform(format!("Helix parse error: {e}")))?;
            return Ok(Some(parsed));
        }

        Err(last_err.unwrap_or_else(|| Error::Platform("Helix request failed".into())))
    }

    async fn fetch_followers(&self, broadcaster_id: &str) -> Result<i64, Error> {
        let url = format!(
            "{HELIX_URL}/channels/followers?broadcaster_id={}",
            urlencoding::encode(broadcaster_id)
        );
        match self.get_json::<FollowersResponse>(&url).await? {
            Some(f) => Ok(f.total),
            None => Ok(0),
        }
    }
}

#[async_trait]
impl LiveStatusApi for TwitchHelixClient {
    async fn get_identity(&self, handle: &str) -> Result<Option<AccountIdentity>, Error> {
        let url = format!("{HELIX_URL}/users?login={}", urlencoding::encode(handle));
        let users: UsersResponse = match self.get_json(&url).await? {
            Some(u) => u,
            None => return Ok(None),
        };
        let Some(user) = users.data.into_iter().next() else {
            return Ok(None);
        };

        // Follower count is decoration; never fail identity over it.
        let followers = match self.fetch_followers(&user.id).await {
            Ok(n) => n,
            Err(e) => {
                warn!("could not fetch follower count for {}: {e}", user.login);
                0
            }
        };

        Ok(Some(AccountIdentity {
            platform: Platform::Twitch,
            platform_id: user.id,
            handle: user.login,
            display_name: user.display_name,
            avatar_url: Some(user.profile_image_url),
            followers,
        }))
    }

    async fn get_live_status(
        &self,
        platform_id: &str,
        handle: &str,
    ) -> Result<Option<StatusSnapshot>, Error> {
        let url = format!(
            "{HELIX_URL}/streams?user_id={}",
            urlencoding::encode(platform_id)
        );
        let streams: StreamsResponse = match self.get_json(&url).await? {
            Some(s) => s,
            None => return Ok(None),
        };

        let stream_url = Platform::Twitch.channel_url(handle);
        let snap = match streams.data.into_iter().next() {
            // Empty data is "user exists but is not streaming", not an error.
            None => {
                let mut snap = StatusSnapshot::offline(Platform::Twitch);
                snap.platform_id = Some(platform_id.to_string());
                snap.stream_url = Some(stream_url);
                snap
            }
            Some(stream) => {
                let mut snap = StatusSnapshot::live(Platform::Twitch);
                snap.platform_id = Some(platform_id.to_string());
                snap.title = Some(stream.title);
                snap.stream_url = Some(stream_url);
                snap.thumbnail = Some(
                    stream
                        .thumbnail_url
                        .replace("{width}", "1920")
                        .replace("{height}", "1080"),
                );
                snap.viewer_count = Some(stream.viewer_count as i64);
                snap.started_at = DateTime::parse_from_rfc3339(&stream.started_at)
                    .ok()
                    .map(|d| d.with_timezone(&Utc));
                snap
            }
        };
        Ok(Some(snap))
    }
}

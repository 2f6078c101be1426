// File: src/platforms/youtube/client.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client as ReqwestClient, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use streamwatch_common::models::{AccountIdentity, Platform, StatusSnapshot};

use crate::platforms::LiveStatusApi;
use crate::Error;

const DATA_API_URL: &str = "https://www.googleapis.com/youtube/v3";

const TRANSIENT_ATTEMPTS: u32 = 2;
const TRANSIENT_PAUSE_MS: u64 = 500;

#[derive(Debug, Deserialize)]
struct ChannelsResponse {
    #[serde(default)]
    items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
    id: String,
    snippet: ChannelSnippet,
    statistics: Option<ChannelStatistics>,
}

#[derive(Debug, Deserialize)]
struct ChannelSnippet {
    title: String,
    #[serde(rename = "customUrl")]
    custom_url: Option<String>,
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Deserialize)]
struct ChannelStatistics {
    #[serde(rename = "subscriberCount")]
    subscriber_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: SearchSnippet,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct SearchSnippet {
    title: String,
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    #[serde(rename = "liveStreamingDetails")]
    live_streaming_details: Option<LiveStreamingDetails>,
}

#[derive(Debug, Deserialize)]
struct LiveStreamingDetails {
    #[serde(rename = "actualStartTime")]
    actual_start_time: Option<String>,
    #[serde(rename = "concurrentViewers")]
    concurrent_viewers: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    high: Option<ThumbnailInfo>,
    default: Option<ThumbnailInfo>,
}

#[derive(Debug, Deserialize)]
struct ThumbnailInfo {
    url: String,
}

impl Thumbnails {
    fn best(&self) -> Option<String> {
        self.high
            .as_ref()
            .or(self.default.as_ref())
            .map(|t| t.url.clone())
    }
}

/// Data API v3 client. Key-based, so there is no token lifecycle here; the
/// live check is a `search` for an active broadcast on the channel followed
/// by a `videos` lookup for viewer count and start time.
pub struct YouTubeDataClient {
    http: ReqwestClient,
    api_key: String,
}

impl YouTubeDataClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            http: ReqwestClient::new(),
            api_key: api_key.to_string(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>, Error> {
        let mut last_err: Option<Error> = None;
        for attempt in 1..=TRANSIENT_ATTEMPTS {
            let resp = match self.http.get(url).send().await {
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
            if status == StatusCode::FORBIDDEN {
                return Err(Error::Auth("YouTube API key rejected or over quota".into()));
            }
            if status.is_server_error() {
                last_err = Some(Error::Platform(format!("YouTube HTTP {status}")));
                tokio::time::sleep(Duration::from_millis(TRANSIENT_PAUSE_MS * attempt as u64))
                    .await;
                continue;
            }
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(Error::Platform(format!("YouTube HTTP {status} => {body}")));
            }

            let body = resp.text().await?;
            let parsed = serde_json::from_str::<T>(&body)
                .map_err(|e| Error::Platform(format!("YouTube parse error: {e}")))?;
            return Ok(Some(parsed));
        }

        Err(last_err.unwrap_or_else(|| Error::Platform("YouTube request failed".into())))
    }
}

#[async_trait]
impl LiveStatusApi for YouTubeDataClient {
    async fn get_identity(&self, handle: &str) -> Result<Option<AccountIdentity>, Error> {
        // Channel ids start with "UC"; anything else is treated as a handle.
        let selector = if handle.starts_with("UC") {
            format!("id={}", urlencoding::encode(handle))
        } else {
            format!("forHandle={}", urlencoding::encode(handle.trim_start_matches('@')))
        };
        let url = format!(
            "{DATA_API_URL}/channels?part=snippet,statistics&{selector}&key={}",
            urlencoding::encode(&self.api_key)
        );
        let channels: ChannelsResponse = match self.get_json(&url).await? {
            Some(c) => c,
            None => return Ok(None),
        };
        let Some(channel) = channels.items.into_iter().next() else {
            return Ok(None);
        };

        let followers = channel
            .statistics
            .and_then(|s| s.subscriber_count)
            .and_then(|c| c.parse().ok())
            .unwrap_or(0);

        Ok(Some(AccountIdentity {
            platform: Platform::YouTube,
            platform_id: channel.id,
            handle: channel
                .snippet
                .custom_url
                .unwrap_or_else(|| handle.to_string()),
            display_name: channel.snippet.title,
            avatar_url: channel.snippet.thumbnails.and_then(|t| t.best()),
            followers,
        }))
    }

    async fn get_live_status(
        &self,
        platform_id: &str,
        handle: &str,
    ) -> Result<Option<StatusSnapshot>, Error> {
        let url = format!(
            "{DATA_API_URL}/search?part=snippet&channelId={}&eventType=live&type=video&maxResults=1&key={}",
            urlencoding::encode(platform_id),
            urlencoding::encode(&self.api_key)
        );
        let search: SearchResponse = match self.get_json(&url).await? {
            Some(s) => s,
            None => return Ok(None),
        };

        let Some(item) = search.items.into_iter().next() else {
            let mut snap = StatusSnapshot::offline(Platform::YouTube);
            snap.platform_id = Some(platform_id.to_string());
            snap.stream_url = Some(Platform::YouTube.channel_url(handle));
            return Ok(Some(snap));
        };

        let mut snap = StatusSnapshot::live(Platform::YouTube);
        snap.platform_id = Some(platform_id.to_string());
        snap.title = Some(item.snippet.title);
        snap.thumbnail = item.snippet.thumbnails.and_then(|t| t.best());
        snap.stream_url = Some(format!(
            "https://www.youtube.com/watch?v={}",
            item.id.video_id
        ));

        // Viewer count and start time live on the video resource; both are
        // decoration and must not fail the snapshot.
        let details_url = format!(
            "{DATA_API_URL}/videos?part=liveStreamingDetails&id={}&key={}",
            urlencoding::encode(&item.id.video_id),
            urlencoding::encode(&self.api_key)
        );
        if let Ok(Some(videos)) = self.get_json::<VideosResponse>(&details_url).await {
            if let Some(details) = videos
                .items
                .into_iter()
                .next()
                .and_then(|v| v.live_streaming_details)
            {
                snap.viewer_count = details.concurrent_viewers.and_then(|v| v.parse().ok());
                snap.started_at = details
                    .actual_start_time
                    .as_deref()
                    .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                    .map(|d| d.with_timezone(&Utc));
            }
        }

        Ok(Some(snap))
    }
}

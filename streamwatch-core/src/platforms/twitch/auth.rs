// File: src/platforms/twitch/auth.rs

use chrono::{DateTime, Duration, Utc};
use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::Error;

const TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";

/// Refresh this long before the reported expiry so in-flight requests never
/// race the token's actual death.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Deserialize)]
struct TwitchTokenResponse {
    access_token: String,
    expires_in: u64,
}

struct AppToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Process-wide cache for the Helix app access token (client-credentials
/// grant).
///
/// The async mutex is held across the whole check-and-refresh, which makes
/// the refresh single-flight: a second caller that hits an expired token
/// while a refresh is already running waits for that result instead of
/// issuing a duplicate grant.
pub struct AppTokenCache {
    client_id: String,
    client_secret: String,
    token: Mutex<Option<AppToken>>,
}

impl AppTokenCache {
    pub fn new(client_id: &str, client_secret: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            token: Mutex::new(None),
        }
    }

    pub async fn bearer(&self, http: &ReqwestClient) -> Result<String, Error> {
        let mut guard = self.token.lock().await;
        if let Some(tok) = guard.as_ref() {
            if Utc::now() < tok.expires_at {
                return Ok(tok.access_token.clone());
            }
        }

        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "client_credentials"),
        ];

        let resp = http
            .post(TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::Auth(format!("HTTP error fetching app token: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Auth(format!("Twitch token endpoint error: {e}")))?
            .json::<TwitchTokenResponse>()
            .await
            .map_err(|e| Error::Auth(format!("Parse error on token JSON: {e}")))?;

        let expires_at =
            Utc::now() + Duration::seconds(resp.expires_in as i64 - EXPIRY_MARGIN_SECS);
        debug!("refreshed Twitch app token, good until {expires_at}");

        let token = resp.access_token.clone();
        *guard = Some(AppToken {
            access_token: resp.access_token,
            expires_at,
        });
        Ok(token)
    }
}

//! HTTP client abstraction for the scrape strategies.
//!
//! The lightweight probe only ever needs "GET this page with these headers,
//! give me the markup". Putting that behind a trait lets the strategy tests
//! feed canned HTML instead of hitting real platform pages.
//!
//! Note that `get` fails on non-2xx responses. An anti-bot wall or rate-limit
//! page must surface as an error (so the probe reports inconclusive and the
//! caller escalates), never as parseable markup that would read as "offline".

use async_trait::async_trait;
use std::collections::HashMap;

use crate::Error;

/// A generic trait for fetching pages over HTTP.
#[async_trait]
pub trait HttpClient: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn get(&self, url: String, headers: HashMap<String, String>) -> Result<String, Self::Error>;
}

#[derive(Clone)]
pub struct DefaultHttpClient {
    client: reqwest::Client,
}

impl DefaultHttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for DefaultHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for DefaultHttpClient {
    type Error = Error;

    async fn get(&self, url: String, headers: HashMap<String, String>) -> Result<String, Self::Error> {
        let mut request = self.client.get(&url);
        for (key, value) in headers {
            request = request.header(&key, value);
        }
        let response = request
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(response)
    }
}

use crate::config::FetchConfig;
use crate::traits::FeedSource;
use crate::types::{DigestError, FeedPayload, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

/// Client for the RSS-to-JSON conversion service
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()?;

        Ok(Self { client, config })
    }

    /// Service URL for one feed, carrying the feed URL and the API key
    pub fn request_url(&self, source_url: &str) -> Result<Url> {
        let mut url = Url::parse(&self.config.endpoint)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("rss_url", source_url);
            if let Some(key) = &self.config.api_key {
                query.append_pair("api_key", key);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl FeedSource for Fetcher {
    async fn fetch(&self, source_url: &str) -> Result<FeedPayload> {
        let start_time = Instant::now();
        debug!("Fetching feed: {}", source_url);

        let response = self.client.get(self.request_url(source_url)?).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DigestError::FeedStatus {
                status: status.as_u16().to_string(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body = response.text().await?;
        let payload = parse_payload(&body)?;

        info!(
            "Fetched feed: {} ({} items, {} ms)",
            source_url,
            payload.items.len(),
            start_time.elapsed().as_millis()
        );
        Ok(payload)
    }
}

/// Decode a service response, turning a non-"ok" status into an error
pub fn parse_payload(body: &str) -> Result<FeedPayload> {
    let payload: FeedPayload = serde_json::from_str(body)?;
    if !payload.is_ok() {
        return Err(DigestError::FeedStatus {
            status: payload.status.clone(),
            message: payload.message.clone().unwrap_or_else(|| "no message".to_string()),
        });
    }
    Ok(payload)
}

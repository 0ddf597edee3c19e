use crate::types::{DigestError, Result};
use std::env;
use std::path::PathBuf;
use url::Url;

pub const DEFAULT_FEEDS: &[&str] = &[
    "https://www.theguardian.com/society/older-people/rss",
    "https://feeds.bbci.co.uk/news/health/ageing/rss.xml",
    "https://timesofindia.indiatimes.com/rssfeeds/2886704.cms",
    "https://indianexpress.com/section/india/rss",
    "https://www.deccanherald.com/rss/lifestyle/feedpage/rss/0,2-9,0.xml",
    "https://socialjustice.gov.in/cms/feed",
    "https://www.helpageindia.org/media-centre/news-and-updates/feed/",
    "https://www.apa.org/monitor/rss.xml",
    "https://www.sciencedaily.com/rss/mind_brain/aging_news.xml",
    "https://www.who.int/feeds/atom/en/index.html",
];

pub const DEFAULT_KEYWORDS: &[&str] = &[
    "elderly", "senior", "old age", "pension", "neglect", "abuse", "fraud",
    "loneliness", "abandoned", "isolated", "caregiver", "geriatric", "elder rights",
    "dementia", "Alzheimer", "care training", "volunteer", "elder welfare",
];

pub const DEFAULT_PLACEHOLDER: &str = "https://source.unsplash.com/random/800x400/?elderly,portrait";

/// Settings for the feed conversion service
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub user_agent: String,
    pub timeout_seconds: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.rss2json.com/v1/api.json".to_string(),
            api_key: None,
            user_agent: "News-Digest/1.0".to_string(),
            timeout_seconds: 30,
        }
    }
}

/// Settings for the image hosting service and the transform applied on upload
#[derive(Debug, Clone)]
pub struct PublishConfig {
    pub api_base: String,
    pub cloud_name: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub folder: String,
    pub width: u32,
    pub height: u32,
    pub timeout_seconds: u64,
}

impl PublishConfig {
    pub fn has_credentials(&self) -> bool {
        self.cloud_name.is_some() && self.api_key.is_some() && self.api_secret.is_some()
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.cloudinary.com/v1_1".to_string(),
            cloud_name: None,
            api_key: None,
            api_secret: None,
            folder: "daily-pulse".to_string(),
            width: 800,
            height: 400,
            timeout_seconds: 20,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DigestConfig {
    pub feeds: Vec<String>,
    pub keywords: Vec<String>,
    pub max_items: usize,
    pub placeholder_image: String,
    pub output_path: PathBuf,
    pub fetch: FetchConfig,
    pub publish: PublishConfig,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            feeds: DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect(),
            keywords: DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            max_items: 10,
            placeholder_image: DEFAULT_PLACEHOLDER.to_string(),
            output_path: PathBuf::from("news-today.json"),
            fetch: FetchConfig::default(),
            publish: PublishConfig::default(),
        }
    }
}

impl DigestConfig {
    /// Defaults plus credentials from the environment (and `.env`, if present)
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();
        config.fetch.api_key = non_empty_var("RSS2JSON_KEY");
        config.publish.cloud_name = non_empty_var("CLOUDINARY_CLOUD_NAME");
        config.publish.api_key = non_empty_var("API_KEY");
        config.publish.api_secret = non_empty_var("API_SECRET");
        config
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_items == 0 {
            return Err(DigestError::Config("max items must be at least 1".to_string()));
        }
        if self.feeds.is_empty() {
            return Err(DigestError::Config("no feeds configured".to_string()));
        }
        if self.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(DigestError::Config("no keywords configured".to_string()));
        }
        for feed in &self.feeds {
            let url = Url::parse(feed)
                .map_err(|e| DigestError::Config(format!("invalid feed URL {}: {}", feed, e)))?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(DigestError::Config(format!("feed URL must be http(s): {}", feed)));
            }
        }
        Url::parse(&self.placeholder_image)
            .map_err(|e| DigestError::Config(format!("invalid placeholder URL: {}", e)))?;
        Ok(())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

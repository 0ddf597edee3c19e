use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Payload returned by the feed conversion service for one source
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedPayload {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub feed: Option<FeedInfo>,
    // Entries stay undecoded so one malformed entry cannot sink the feed.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub items: Vec<Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl FeedPayload {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    /// Entries in feed order; `None` for an entry that does not decode
    pub fn entries(&self) -> impl Iterator<Item = Option<RawFeedItem>> + '_ {
        self.items.iter().map(RawFeedItem::from_value)
    }

    /// Display name of the feed, as stamped on every digest item it contributes
    pub fn source_name(&self) -> String {
        self.feed
            .as_ref()
            .and_then(|f| f.title.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("Unknown")
            .to_string()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

/// One entry as the conversion service reports it. Every field is optional on
/// the wire; `title` and `link` are checked by the pipeline.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFeedItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, rename = "pubDate")]
    pub pub_date: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    // The service sends `{}` or `[]` when an entry has no enclosure.
    #[serde(default)]
    pub enclosure: Option<Value>,
}

impl RawFeedItem {
    pub fn from_value(value: &Value) -> Option<Self> {
        Self::deserialize(value).ok()
    }

    pub fn enclosure_link(&self) -> Option<&str> {
        self.enclosure
            .as_ref()
            .and_then(|e| e.get("link"))
            .and_then(Value::as_str)
    }

    /// Title and link, both trimmed, or `None` if either is missing or blank
    pub fn required_fields(&self) -> Option<(&str, &str)> {
        let title = self.title.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
        let link = self.link.as_deref().map(str::trim).filter(|l| !l.is_empty())?;
        Some((title, link))
    }

    /// Text the keyword matcher runs over
    pub fn searchable_text(&self) -> String {
        format!(
            "{} {} {}",
            self.title.as_deref().unwrap_or(""),
            self.description.as_deref().unwrap_or(""),
            self.content.as_deref().unwrap_or("")
        )
    }
}

/// One entry of the published digest. Field names are the artifact's schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestItem {
    pub title: String,
    pub link: String,
    pub image: String,
    #[serde(rename = "pubDate")]
    pub pub_date: String,
    #[serde(rename = "pubDateString")]
    pub pub_date_string: String,
    pub source: String,
}

/// Counters for one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub sources_attempted: usize,
    pub sources_failed: usize,
    pub items_seen: usize,
    pub invalid: usize,
    pub duplicates: usize,
    pub irrelevant: usize,
    pub published: usize,
    pub placeholders: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed returned status {status:?}: {message}")]
    FeedStatus { status: String, message: String },

    #[error("Upload failed (HTTP {status}): {message}")]
    Upload { status: u16, message: String },

    #[error("Timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, DigestError>;

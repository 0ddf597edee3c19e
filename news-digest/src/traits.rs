use crate::types::{FeedPayload, Result};
use async_trait::async_trait;

/// Trait for pulling one feed's items from the conversion service
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the payload for a single source URL.
    /// A payload whose status is not "ok" is returned as an error.
    async fn fetch(&self, source_url: &str) -> Result<FeedPayload>;
}

/// Trait for re-hosting a source image and returning its durable URL
#[async_trait]
pub trait AssetPublisher: Send + Sync {
    /// One attempt, no retries. Errors are absorbed by the caller.
    async fn publish(&self, source_url: &str) -> Result<String>;
}

/// Finds the first image source in an HTML fragment
pub trait ImageLocator: Send + Sync {
    /// Raw `src` attribute of the first `<img>`, unresolved.
    fn first_image_src(&self, fragment: &str) -> Option<String>;
}

pub mod types;
pub mod config;
pub mod traits;
pub mod matcher;
pub mod image;
pub mod fetcher;
pub mod publisher;
pub mod pipeline;
pub mod digest;
pub mod aggregator;
pub mod utils;

pub use types::*;
pub use config::{DigestConfig, FetchConfig, PublishConfig};
pub use traits::{AssetPublisher, FeedSource, ImageLocator};
pub use matcher::KeywordSet;
pub use image::{HtmlImageLocator, ImageResolver};
pub use fetcher::Fetcher;
pub use publisher::CloudinaryPublisher;
pub use pipeline::{DigestPipeline, DigestRun};
pub use aggregator::NewsAggregator;

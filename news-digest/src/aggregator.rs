use crate::config::DigestConfig;
use crate::digest;
use crate::fetcher::Fetcher;
use crate::matcher::KeywordSet;
use crate::pipeline::{DigestPipeline, DigestRun};
use crate::publisher::CloudinaryPublisher;
use crate::traits::{AssetPublisher, FeedSource};
use crate::types::Result;
use std::path::PathBuf;
use tracing::{info, warn};

/// Wires the configured services into a pipeline and writes the digest
pub struct NewsAggregator {
    pipeline: DigestPipeline,
    output_path: PathBuf,
}

impl NewsAggregator {
    pub fn new(config: &DigestConfig) -> Result<Self> {
        config.validate()?;

        if config.fetch.api_key.is_none() {
            warn!("RSS2JSON_KEY not set, using the keyless tier of the feed service");
        }
        if !config.publish.has_credentials() {
            warn!("Image hosting credentials not set, every item will use the placeholder image");
        }

        let fetcher = Fetcher::new(config.fetch.clone())?;
        let publisher = CloudinaryPublisher::new(config.publish.clone())?;
        Ok(Self::with_services(config, Box::new(fetcher), Box::new(publisher)))
    }

    /// Build against arbitrary service implementations
    pub fn with_services(
        config: &DigestConfig,
        fetcher: Box<dyn FeedSource>,
        publisher: Box<dyn AssetPublisher>,
    ) -> Self {
        let pipeline = DigestPipeline::new(
            config.feeds.clone(),
            KeywordSet::new(&config.keywords),
            fetcher,
            publisher,
        )
        .with_max_items(config.max_items)
        .with_placeholder(config.placeholder_image.clone());

        Self {
            pipeline,
            output_path: config.output_path.clone(),
        }
    }

    /// Aggregate, rank and write. Only the write can fail.
    pub async fn run(&self) -> Result<DigestRun> {
        let mut run = self.pipeline.run().await;
        run.items = digest::finalize(&self.output_path, run.items)?;
        info!("News built and saved: {} items -> {}", run.items.len(), self.output_path.display());
        Ok(run)
    }
}

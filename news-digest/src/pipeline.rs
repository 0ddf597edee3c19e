use crate::image::ImageResolver;
use crate::matcher::KeywordSet;
use crate::traits::{AssetPublisher, FeedSource};
use crate::types::{DigestItem, RawFeedItem, RunStats};
use crate::utils::{text::normalize_title, time};
use std::collections::HashSet;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Aggregation pipeline: fetches sources in priority order and accepts
/// matching, previously unseen items until the cap is reached.
pub struct DigestPipeline {
    sources: Vec<String>,
    keywords: KeywordSet,
    max_items: usize,
    placeholder_image: String,
    fetcher: Box<dyn FeedSource>,
    publisher: Box<dyn AssetPublisher>,
    resolver: ImageResolver,
}

/// Result of one pipeline run, before ranking
#[derive(Debug, Clone)]
pub struct DigestRun {
    pub run_id: Uuid,
    pub items: Vec<DigestItem>,
    pub stats: RunStats,
}

/// State owned by a single run
struct RunState {
    seen_titles: HashSet<String>,
    items: Vec<DigestItem>,
    stats: RunStats,
}

impl DigestPipeline {
    pub fn new(
        sources: Vec<String>,
        keywords: KeywordSet,
        fetcher: Box<dyn FeedSource>,
        publisher: Box<dyn AssetPublisher>,
    ) -> Self {
        Self {
            sources,
            keywords,
            max_items: 10,
            placeholder_image: crate::config::DEFAULT_PLACEHOLDER.to_string(),
            fetcher,
            publisher,
            resolver: ImageResolver::default(),
        }
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    pub fn with_placeholder(mut self, placeholder_image: impl Into<String>) -> Self {
        self.placeholder_image = placeholder_image.into();
        self
    }

    pub fn with_resolver(mut self, resolver: ImageResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub async fn run(&self) -> DigestRun {
        let run_id = Uuid::new_v4();
        let span = info_span!("digest_run", %run_id);
        let mut state = RunState {
            seen_titles: HashSet::new(),
            items: Vec::new(),
            stats: RunStats::default(),
        };

        async {
            info!("Aggregating {} sources (cap {})", self.sources.len(), self.max_items);
            for source in &self.sources {
                if state.items.len() >= self.max_items {
                    break;
                }
                self.process_source(source, &mut state).await;
            }
            info!(
                "Collected {} items ({} sources tried, {} failed, {} duplicates, {} irrelevant, {} placeholders)",
                state.items.len(),
                state.stats.sources_attempted,
                state.stats.sources_failed,
                state.stats.duplicates,
                state.stats.irrelevant,
                state.stats.placeholders
            );
        }
        .instrument(span)
        .await;

        DigestRun {
            run_id,
            items: state.items,
            stats: state.stats,
        }
    }

    async fn process_source(&self, source: &str, state: &mut RunState) {
        state.stats.sources_attempted += 1;
        let payload = match self.fetcher.fetch(source).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Error fetching feed {}: {}", source, e);
                state.stats.sources_failed += 1;
                return;
            }
        };

        let source_name = payload.source_name();
        for entry in payload.entries() {
            if state.items.len() >= self.max_items {
                debug!("Cap reached, leaving {} early", source);
                break;
            }
            state.stats.items_seen += 1;
            match entry {
                Some(raw) => self.process_item(&raw, &source_name, state).await,
                None => {
                    debug!("Skipping undecodable item from {}", source);
                    state.stats.invalid += 1;
                }
            }
        }
    }

    async fn process_item(&self, raw: &RawFeedItem, source_name: &str, state: &mut RunState) {
        let Some((title, link)) = raw.required_fields() else {
            debug!("Skipping item without title or link from {}", source_name);
            state.stats.invalid += 1;
            return;
        };

        let key = normalize_title(title);
        if state.seen_titles.contains(&key) {
            debug!("Skipping duplicate title: {}", key);
            state.stats.duplicates += 1;
            return;
        }

        let Some(keyword) = self.keywords.first_match(&raw.searchable_text()) else {
            state.stats.irrelevant += 1;
            return;
        };
        debug!("Accepting {:?} (matched {:?})", key, keyword);
        state.seen_titles.insert(key);

        let image = self.image_for(raw, title, state).await;
        let pub_date = raw.pub_date.clone().unwrap_or_default();
        let pub_date_string = time::format_short_date(time::parse_pub_date(&pub_date));

        state.items.push(DigestItem {
            title: title.to_string(),
            link: link.to_string(),
            image,
            pub_date,
            pub_date_string,
            source: source_name.to_string(),
        });
    }

    async fn image_for(&self, raw: &RawFeedItem, title: &str, state: &mut RunState) -> String {
        let Some(candidate) = self.resolver.resolve(raw) else {
            state.stats.placeholders += 1;
            return self.placeholder_image.clone();
        };

        match self.publisher.publish(&candidate).await {
            Ok(hosted) => {
                state.stats.published += 1;
                hosted
            }
            Err(e) => {
                warn!("Failed to upload image for {:?}: {}", title, e);
                state.stats.placeholders += 1;
                self.placeholder_image.clone()
            }
        }
    }
}

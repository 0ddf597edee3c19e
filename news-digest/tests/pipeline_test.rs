use async_trait::async_trait;
use news_digest::{
    fetcher::parse_payload, utils::time::parse_pub_date, AssetPublisher, DigestConfig, DigestError,
    DigestItem, DigestPipeline, FeedPayload, FeedSource, ImageLocator, ImageResolver, KeywordSet,
    NewsAggregator, Result,
};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, Once};
use tracing::info;
use uuid::Uuid;

const PLACEHOLDER: &str = "https://placeholder.example.com/elderly.jpg";

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .try_init()
            .ok();
    });
}

/// Serves canned service responses and records every requested source
#[derive(Clone, Default)]
struct FakeFeeds {
    bodies: HashMap<String, String>,
    requested: Arc<Mutex<Vec<String>>>,
}

impl FakeFeeds {
    fn with_feed(mut self, url: &str, title: &str, items: Vec<Value>) -> Self {
        let body = json!({ "status": "ok", "feed": { "title": title }, "items": items });
        self.bodies.insert(url.to_string(), body.to_string());
        self
    }

    fn with_body(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(url.to_string(), body.to_string());
        self
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedSource for FakeFeeds {
    async fn fetch(&self, source_url: &str) -> Result<FeedPayload> {
        self.requested.lock().unwrap().push(source_url.to_string());
        match self.bodies.get(source_url) {
            Some(body) => parse_payload(body),
            None => Err(DigestError::General(format!("connection refused: {}", source_url))),
        }
    }
}

/// Publishes to `https://hosted.example.com/<n>` unless the source is marked failing
#[derive(Clone, Default)]
struct FakePublisher {
    failing: HashSet<String>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakePublisher {
    fn failing_on(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetPublisher for FakePublisher {
    async fn publish(&self, source_url: &str) -> Result<String> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(source_url.to_string());
        if self.failing.contains(source_url) {
            return Err(DigestError::Upload {
                status: 400,
                message: "Resource not found".to_string(),
            });
        }
        Ok(format!("https://hosted.example.com/{}", calls.len()))
    }
}

fn news(title: &str, description: &str, pub_date: &str) -> Value {
    let slug = title.to_lowercase().replace(' ', "-");
    json!({
        "title": title,
        "link": format!("https://example.com/news/{}", slug),
        "description": description,
        "content": "",
        "pubDate": pub_date,
        "thumbnail": "",
        "enclosure": {}
    })
}

fn pipeline(sources: &[&str], feeds: &FakeFeeds, publisher: &FakePublisher) -> DigestPipeline {
    DigestPipeline::new(
        sources.iter().map(|s| s.to_string()).collect(),
        KeywordSet::new(["elderly", "pension", "dementia"]),
        Box::new(feeds.clone()),
        Box::new(publisher.clone()),
    )
    .with_placeholder(PLACEHOLDER)
}

fn titles(items: &[DigestItem]) -> Vec<&str> {
    items.iter().map(|i| i.title.as_str()).collect()
}

#[tokio::test]
async fn test_duplicate_title_across_sources_keeps_first() {
    init_tracing();

    let feeds = FakeFeeds::default()
        .with_feed("https://a.example/rss", "Feed A", vec![
            news("Pension rise announced", "Good news for pensioners", "2024-05-01 08:00:00"),
        ])
        .with_feed("https://b.example/rss", "Feed B", vec![
            news("  Pension rise announced ", "Same story, other outlet", "2024-05-02 08:00:00"),
            news("Dementia care funding", "New money", "2024-05-03 08:00:00"),
        ]);
    let publisher = FakePublisher::default();

    let run = pipeline(&["https://a.example/rss", "https://b.example/rss"], &feeds, &publisher)
        .run()
        .await;

    assert_eq!(titles(&run.items), vec!["Pension rise announced", "Dementia care funding"]);
    assert_eq!(run.items[0].source, "Feed A");
    assert_eq!(run.stats.duplicates, 1);
}

#[tokio::test]
async fn test_failing_source_does_not_stop_later_sources() {
    init_tracing();

    let feeds = FakeFeeds::default()
        .with_body("https://down.example/rss", r#"{"status":"error","message":"Cannot download"}"#)
        .with_body("https://garbage.example/rss", "<html>not json</html>")
        .with_feed("https://up.example/rss", "Up", vec![
            news("Elderly volunteers honoured", "", "2024-05-01 08:00:00"),
        ]);
    let publisher = FakePublisher::default();
    let sources = [
        "https://down.example/rss",
        "https://missing.example/rss",
        "https://garbage.example/rss",
        "https://up.example/rss",
    ];

    let run = pipeline(&sources, &feeds, &publisher).run().await;

    assert_eq!(feeds.requested(), sources.to_vec());
    assert_eq!(titles(&run.items), vec!["Elderly volunteers honoured"]);
    assert_eq!(run.stats.sources_attempted, 4);
    assert_eq!(run.stats.sources_failed, 3);
}

#[tokio::test]
async fn test_cap_reached_skips_remaining_sources() {
    init_tracing();

    let first: Vec<Value> = (0..6)
        .map(|i| news(&format!("Elderly story {}", i), "", "2024-05-01 08:00:00"))
        .collect();
    let second: Vec<Value> = (0..6)
        .map(|i| news(&format!("Pension story {}", i), "", "2024-05-02 08:00:00"))
        .collect();
    let feeds = FakeFeeds::default()
        .with_feed("https://one.example/rss", "One", first)
        .with_feed("https://two.example/rss", "Two", second)
        .with_feed("https://three.example/rss", "Three", vec![
            news("Dementia story", "", "2024-05-03 08:00:00"),
        ]);
    let publisher = FakePublisher::default();

    let run = pipeline(
        &["https://one.example/rss", "https://two.example/rss", "https://three.example/rss"],
        &feeds,
        &publisher,
    )
    .run()
    .await;

    assert_eq!(run.items.len(), 10);
    assert_eq!(feeds.requested(), vec!["https://one.example/rss", "https://two.example/rss"]);
    // First-come wins: the last two items of the second feed never make it in.
    assert_eq!(run.items[9].title, "Pension story 3");
}

#[tokio::test]
async fn test_cap_is_configurable() {
    init_tracing();

    let items: Vec<Value> = (0..5)
        .map(|i| news(&format!("Elderly story {}", i), "", "2024-05-01 08:00:00"))
        .collect();
    let feeds = FakeFeeds::default().with_feed("https://one.example/rss", "One", items);
    let publisher = FakePublisher::default();

    let run = pipeline(&["https://one.example/rss"], &feeds, &publisher)
        .with_max_items(3)
        .run()
        .await;

    assert_eq!(run.items.len(), 3);
    assert_eq!(run.stats.items_seen, 3);
}

#[tokio::test]
async fn test_irrelevant_items_never_fill_the_digest() {
    init_tracing();

    let feeds = FakeFeeds::default().with_feed("https://one.example/rss", "One", vec![
        news("Football results", "Local team wins", "2024-05-01 08:00:00"),
        news("Stock market surge", "Tech stocks up", "2024-05-01 09:00:00"),
        json!({
            "title": "Quiet headline",
            "link": "https://example.com/quiet",
            "description": "<p>Nothing here</p>",
            "content": "<p>Support for people living with DEMENTIA</p>",
            "pubDate": "2024-05-01 10:00:00"
        }),
    ]);
    let publisher = FakePublisher::default();

    let run = pipeline(&["https://one.example/rss"], &feeds, &publisher).run().await;

    assert_eq!(titles(&run.items), vec!["Quiet headline"]);
    assert_eq!(run.stats.irrelevant, 2);
    assert!(publisher.calls().is_empty());
}

#[tokio::test]
async fn test_items_missing_title_or_link_are_skipped() {
    init_tracing();

    let feeds = FakeFeeds::default().with_feed("https://one.example/rss", "One", vec![
        json!({ "link": "https://example.com/no-title", "description": "elderly" }),
        json!({ "title": "Elderly without link", "description": "elderly" }),
        json!({ "title": "", "link": "https://example.com/blank", "description": "elderly" }),
        news("Elderly with everything", "", "2024-05-01 08:00:00"),
    ]);
    let publisher = FakePublisher::default();

    let run = pipeline(&["https://one.example/rss"], &feeds, &publisher).run().await;

    assert_eq!(titles(&run.items), vec!["Elderly with everything"]);
    assert_eq!(run.stats.invalid, 3);
}

#[tokio::test]
async fn test_image_selection_and_fallbacks() {
    init_tracing();

    let mut with_relative_img = news("Elderly art class", r#"<img src="/pics/a.jpg">"#, "2024-05-01 08:00:00");
    with_relative_img["link"] = json!("https://example.com/news/1");

    let mut with_thumbnail = news("Pension payout", "", "2024-05-02 08:00:00");
    with_thumbnail["thumbnail"] = json!("https://cdn.example.com/broken.jpg");

    let mut no_image = news("Dementia study", "<<<not <img html", "2024-05-03 08:00:00");
    no_image["content"] = json!("</p></div");
    no_image["enclosure"] = json!([]);

    let feeds = FakeFeeds::default().with_feed("https://one.example/rss", "One", vec![
        with_relative_img,
        with_thumbnail,
        no_image,
    ]);
    let publisher = FakePublisher::default().failing_on("https://cdn.example.com/broken.jpg");

    let run = pipeline(&["https://one.example/rss"], &feeds, &publisher).run().await;
    let by_title: HashMap<&str, &DigestItem> = run.items.iter().map(|i| (i.title.as_str(), i)).collect();

    // The hosted URL replaces the resolved candidate.
    assert_eq!(by_title["Elderly art class"].image, "https://hosted.example.com/1");
    // Upload failure degrades to the placeholder but keeps the item.
    assert_eq!(by_title["Pension payout"].image, PLACEHOLDER);
    // Nothing to upload at all.
    assert_eq!(by_title["Dementia study"].image, PLACEHOLDER);

    assert_eq!(
        publisher.calls(),
        vec!["https://example.com/pics/a.jpg", "https://cdn.example.com/broken.jpg"]
    );
    assert_eq!(run.stats.published, 1);
    assert_eq!(run.stats.placeholders, 2);
}

#[tokio::test]
async fn test_aggregator_writes_ranked_digest() {
    init_tracing();

    let output_path = std::env::temp_dir().join(format!("news-digest-{}.json", Uuid::new_v4()));
    let config = DigestConfig {
        feeds: vec!["https://one.example/rss".to_string(), "https://two.example/rss".to_string()],
        keywords: vec!["elderly".to_string()],
        placeholder_image: PLACEHOLDER.to_string(),
        output_path: output_path.clone(),
        ..Default::default()
    };

    let feeds = FakeFeeds::default()
        .with_feed("https://one.example/rss", "One", vec![
            news("Elderly oldest", "", "2024-01-01 08:00:00"),
            news("Elderly undated", "", "sometime"),
        ])
        .with_feed("https://two.example/rss", "Two", vec![
            news("Elderly newest", "", "Fri, 01 Mar 2024 08:00:00 +0000"),
            news("Elderly middle", "", "2024-02-01 08:00:00"),
        ]);

    let aggregator = NewsAggregator::with_services(
        &config,
        Box::new(feeds),
        Box::new(FakePublisher::default()),
    );
    let run = aggregator.run().await.unwrap();

    let written: Vec<DigestItem> =
        serde_json::from_str(&std::fs::read_to_string(&output_path).unwrap()).unwrap();
    assert_eq!(written, run.items);
    assert_eq!(
        titles(&written),
        vec!["Elderly newest", "Elderly middle", "Elderly oldest", "Elderly undated"]
    );

    let dated: Vec<_> = written.iter().filter_map(|i| parse_pub_date(&i.pub_date)).collect();
    assert!(dated.windows(2).all(|w| w[0] >= w[1]));

    assert_eq!(written[0].pub_date, "Fri, 01 Mar 2024 08:00:00 +0000");
    assert_eq!(written[0].pub_date_string, "3/1/2024");
    assert_eq!(written[3].pub_date_string, "Invalid Date");
    assert!(written.iter().all(|i| i.image == PLACEHOLDER));

    info!("Digest written to {}", output_path.display());
    std::fs::remove_file(&output_path).ok();
}

#[tokio::test]
async fn test_aggregator_write_failure_is_reported() {
    init_tracing();

    let config = DigestConfig {
        feeds: vec!["https://one.example/rss".to_string()],
        output_path: std::env::temp_dir().join(Uuid::new_v4().to_string()).join("digest.json"),
        ..Default::default()
    };
    let aggregator = NewsAggregator::with_services(
        &config,
        Box::new(FakeFeeds::default()),
        Box::new(FakePublisher::default()),
    );

    assert!(matches!(aggregator.run().await, Err(DigestError::Io(_))));
}

#[tokio::test]
async fn test_runs_are_independent() {
    init_tracing();

    let feeds = FakeFeeds::default().with_feed("https://one.example/rss", "One", vec![
        news("Elderly story", "", "2024-05-01 08:00:00"),
    ]);
    let publisher = FakePublisher::default();
    let pipeline = pipeline(&["https://one.example/rss"], &feeds, &publisher);

    let first = pipeline.run().await;
    let second = pipeline.run().await;

    assert_eq!(first.items.len(), 1);
    assert_eq!(second.items.len(), 1);
    assert_ne!(first.run_id, second.run_id);
}

#[tokio::test]
async fn test_rejected_titles_are_not_marked_seen() {
    init_tracing();

    let feeds = FakeFeeds::default()
        .with_feed("https://a.example/rss", "A", vec![
            news("Weekly roundup", "Sports and weather", "2024-05-01 08:00:00"),
        ])
        .with_feed("https://b.example/rss", "B", vec![
            news("Weekly roundup", "Pension changes explained", "2024-05-02 08:00:00"),
        ]);
    let publisher = FakePublisher::default();

    let run = pipeline(&["https://a.example/rss", "https://b.example/rss"], &feeds, &publisher)
        .run()
        .await;

    assert_eq!(run.items.len(), 1);
    assert_eq!(run.items[0].source, "B");
    assert_eq!(run.stats.duplicates, 0);
}

#[tokio::test]
async fn test_malformed_entry_only_skips_itself() {
    init_tracing();

    let body = r#"{
        "status": "ok",
        "feed": { "title": "Mixed" },
        "items": [
            { "title": { "t": "Elderly broken" }, "link": "https://example.com/broken" },
            { "title": "Elderly fine", "link": "https://example.com/fine" }
        ]
    }"#;
    let feeds = FakeFeeds::default()
        .with_body("https://mixed.example/rss", body)
        .with_body("https://empty.example/rss", r#"{"status":"ok","items":null}"#);
    let publisher = FakePublisher::default();

    let run = pipeline(&["https://mixed.example/rss", "https://empty.example/rss"], &feeds, &publisher)
        .run()
        .await;

    assert_eq!(titles(&run.items), vec!["Elderly fine"]);
    assert_eq!(run.items[0].source, "Mixed");
    assert_eq!(run.stats.invalid, 1);
    assert_eq!(run.stats.sources_failed, 0);
}

/// Returns a fixed `src` for any fragment mentioning "figure"
struct FixedLocator;

impl ImageLocator for FixedLocator {
    fn first_image_src(&self, fragment: &str) -> Option<String> {
        fragment.contains("figure").then(|| "../media/fixed.png".to_string())
    }
}

#[tokio::test]
async fn test_custom_image_locator_is_used() {
    init_tracing();

    let mut item = news("Elderly gardeners", "<figure>no img tag at all</figure>", "2024-05-01 08:00:00");
    item["link"] = json!("https://example.com/news/garden/1");
    let feeds = FakeFeeds::default().with_feed("https://one.example/rss", "One", vec![item]);
    let publisher = FakePublisher::default();

    let run = pipeline(&["https://one.example/rss"], &feeds, &publisher)
        .with_resolver(ImageResolver::new(Box::new(FixedLocator)))
        .run()
        .await;

    assert_eq!(publisher.calls(), vec!["https://example.com/news/media/fixed.png"]);
    assert_eq!(run.items[0].image, "https://hosted.example.com/1");
}

use crate::traits::ImageLocator;
use crate::types::RawFeedItem;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

/// `ImageLocator` backed by an HTML5 parser.
///
/// The parser recovers from broken markup, so a fragment that cannot be
/// read simply yields no image.
#[derive(Debug, Clone)]
pub struct HtmlImageLocator {
    selector: Option<Selector>,
}

impl HtmlImageLocator {
    pub fn new() -> Self {
        Self {
            selector: Selector::parse("img[src]").ok(),
        }
    }
}

impl Default for HtmlImageLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageLocator for HtmlImageLocator {
    fn first_image_src(&self, fragment: &str) -> Option<String> {
        let selector = self.selector.as_ref()?;
        let document = Html::parse_fragment(fragment);
        let src = document
            .select(selector)
            .filter_map(|img| img.value().attr("src"))
            .map(str::trim)
            .find(|src| !src.is_empty())
            .map(str::to_string);
        src
    }
}

/// Picks a representative image for a feed item, trying in order: the
/// explicit thumbnail, the enclosure, the first `<img>` of the description,
/// the first `<img>` of the content.
pub struct ImageResolver {
    locator: Box<dyn ImageLocator>,
}

impl ImageResolver {
    pub fn new(locator: Box<dyn ImageLocator>) -> Self {
        Self { locator }
    }

    pub fn resolve(&self, item: &RawFeedItem) -> Option<String> {
        if let Some(thumbnail) = non_blank(item.thumbnail.as_deref()) {
            return Some(thumbnail.to_string());
        }
        if let Some(enclosure) = non_blank(item.enclosure_link()) {
            return Some(enclosure.to_string());
        }

        let base = item.link.as_deref().map(str::trim).unwrap_or("");
        [item.description.as_deref(), item.content.as_deref()]
            .into_iter()
            .flatten()
            .find_map(|fragment| self.from_fragment(fragment, base))
    }

    fn from_fragment(&self, fragment: &str, base: &str) -> Option<String> {
        if fragment.trim().is_empty() {
            return None;
        }
        let src = self.locator.first_image_src(fragment)?;
        match absolutize(&src, base) {
            Some(url) => Some(url),
            None => {
                debug!("Dropping unresolvable image source {:?} (base {:?})", src, base);
                None
            }
        }
    }
}

impl Default for ImageResolver {
    fn default() -> Self {
        Self::new(Box::new(HtmlImageLocator::new()))
    }
}

/// Resolve `src` against `base`. An absolute `src` stands on its own; a
/// relative one needs a parseable base.
pub fn absolutize(src: &str, base: &str) -> Option<String> {
    match Url::parse(src) {
        Ok(url) => Some(url.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse(base).ok()?;
            base.join(src).ok().map(|u| u.to_string())
        }
        Err(_) => None,
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// src/sources/mod.rs
pub mod devto;
pub mod ganjoor;
pub mod hackernews;
pub mod quran;
pub mod rss;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;

/// Ephemeral value produced by a content source. Never persisted directly;
/// only its fingerprint and title survive into the published-post record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateItem {
    pub title: String,
    pub body: Option<String>,
    /// Canonical URL; preferred fingerprint key when present.
    pub url: Option<String>,
    /// Provider label, e.g. "HackerNews" or "Design Milk".
    pub provenance: String,
}

/// One external provider. `fetch` returns at most one candidate, picked at
/// random among the provider's freshly retrieved items. Provider errors,
/// timeouts and empty result sets all map to `None`; the pipeline treats
/// `None` as "try the next topic", never as fatal.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(&self) -> Option<CandidateItem>;
    fn name(&self) -> &'static str;
}

/// Shared client for provider calls: bounded timeout so a slow feed cannot
/// stall a pipeline run past its tick.
pub fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent("feed-autoposter/0.1 (+github.com/feed-autoposter)")
        .connect_timeout(Duration::from_secs(4))
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .expect("reqwest client")
}

/// Normalize a feed-supplied title: entity decode, strip tags, collapse
/// whitespace, cap length.
pub fn normalize_title(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > 300 {
        out = out.chars().take(300).collect();
    }
    out
}

/// Topic key → content source. Built once at startup; the pipeline drops
/// subscribed topics that have no registered source.
pub struct SourceRegistry {
    sources: BTreeMap<&'static str, Box<dyn ContentSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self {
            sources: BTreeMap::new(),
        }
    }

    pub fn register(mut self, topic_key: &'static str, source: Box<dyn ContentSource>) -> Self {
        self.sources.insert(topic_key, source);
        self
    }

    pub fn get(&self, topic_key: &str) -> Option<&dyn ContentSource> {
        self.sources.get(topic_key).map(|b| b.as_ref())
    }

    pub fn contains(&self, topic_key: &str) -> bool {
        self.sources.contains_key(topic_key)
    }

    /// Production wiring: one source per topic in the static table.
    pub fn with_default_sources(timeout_secs: u64) -> Self {
        let client = http_client(timeout_secs);
        Self::new()
            .register(
                "programming",
                Box::new(hackernews::ProgrammingSource::new(client.clone())),
            )
            .register(
                "ai",
                Box::new(rss::RssSource::from_url(
                    "AI News",
                    "https://www.artificialintelligence-news.com/feed/",
                    client.clone(),
                )),
            )
            .register(
                "design",
                Box::new(rss::RssSource::from_url(
                    "Design Milk",
                    "https://design-milk.com/feed/",
                    client.clone(),
                )),
            )
            .register("poetry", Box::new(ganjoor::GanjoorSource::new(client.clone())))
            .register("religious", Box::new(quran::QuranSource::new(client)))
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Test double: always yields the same candidate (or nothing), counting
/// fetches. Available outside cfg(test) so integration tests can wire a
/// pipeline.
pub struct StaticSource {
    item: Option<CandidateItem>,
    fetches: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

impl StaticSource {
    pub fn yielding(item: CandidateItem) -> Self {
        Self {
            item: Some(item),
            fetches: Default::default(),
        }
    }

    pub fn empty() -> Self {
        Self {
            item: None,
            fetches: Default::default(),
        }
    }

    /// Handle to the fetch counter, usable after the source moves into a
    /// registry.
    pub fn fetch_counter(&self) -> std::sync::Arc<std::sync::atomic::AtomicUsize> {
        self.fetches.clone()
    }
}

#[async_trait]
impl ContentSource for StaticSource {
    async fn fetch(&self) -> Option<CandidateItem> {
        self.fetches
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.item.clone()
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

// src/sources/hackernews.rs
use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use tracing::debug;

use super::devto::DevToSource;
use super::{normalize_title, CandidateItem, ContentSource};

const TOP_STORIES_URL: &str = "https://hacker-news.firebaseio.com/v0/topstories.json";
/// Random pick window over the head of the top-stories list.
const TOP_WINDOW: usize = 20;

#[derive(Debug, Deserialize)]
struct HnItem {
    title: Option<String>,
    url: Option<String>,
}

pub struct HackerNewsSource {
    mode: Mode,
}

enum Mode {
    Http { client: reqwest::Client },
    Fixture { item: String },
}

impl HackerNewsSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            mode: Mode::Http { client },
        }
    }

    /// Fixture payload is a single item JSON object, as returned by
    /// `/v0/item/{id}.json`.
    pub fn from_fixture(item_json: &str) -> Self {
        Self {
            mode: Mode::Fixture {
                item: item_json.to_string(),
            },
        }
    }

    fn item_from_payload(s: &str) -> Option<CandidateItem> {
        let it: HnItem = serde_json::from_str(s).ok()?;
        let title = normalize_title(it.title.as_deref()?);
        if title.is_empty() {
            return None;
        }
        Some(CandidateItem {
            title,
            body: None,
            url: it.url,
            provenance: "HackerNews".to_string(),
        })
    }
}

#[async_trait]
impl ContentSource for HackerNewsSource {
    async fn fetch(&self) -> Option<CandidateItem> {
        match &self.mode {
            Mode::Fixture { item } => Self::item_from_payload(item),
            Mode::Http { client } => {
                let ids: Vec<u64> = match client.get(TOP_STORIES_URL).send().await {
                    Ok(resp) => resp.error_for_status().ok()?.json().await.ok()?,
                    Err(e) => {
                        debug!(error = ?e, provider = "HackerNews", "topstories fetch failed");
                        return None;
                    }
                };
                if ids.is_empty() {
                    return None;
                }
                let idx = rand::thread_rng().gen_range(0..ids.len().min(TOP_WINDOW));
                let id = ids[idx];
                let url = format!("https://hacker-news.firebaseio.com/v0/item/{id}.json");
                let body = match client.get(&url).send().await {
                    Ok(resp) => resp.error_for_status().ok()?.text().await.ok()?,
                    Err(e) => {
                        debug!(error = ?e, provider = "HackerNews", id, "item fetch failed");
                        return None;
                    }
                };
                Self::item_from_payload(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "HackerNews"
    }
}

/// The `programming` topic source: flips a coin between Hacker News and
/// Dev.to per fetch so one provider's dry spell does not starve the topic.
pub struct ProgrammingSource {
    hn: HackerNewsSource,
    devto: DevToSource,
}

impl ProgrammingSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            hn: HackerNewsSource::new(client.clone()),
            devto: DevToSource::new(client),
        }
    }
}

#[async_trait]
impl ContentSource for ProgrammingSource {
    async fn fetch(&self) -> Option<CandidateItem> {
        let pick_hn = rand::thread_rng().gen_bool(0.5);
        if pick_hn {
            self.hn.fetch().await
        } else {
            self.devto.fetch().await
        }
    }

    fn name(&self) -> &'static str {
        "Programming"
    }
}

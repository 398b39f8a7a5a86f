// src/sources/devto.rs
use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use tracing::debug;

use super::{normalize_title, CandidateItem, ContentSource};

const ARTICLES_URL: &str = "https://dev.to/api/articles?per_page=20";

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
    url: Option<String>,
}

pub struct DevToSource {
    mode: Mode,
}

enum Mode {
    Http { client: reqwest::Client },
    Fixture { articles: String },
}

impl DevToSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            mode: Mode::Http { client },
        }
    }

    /// Fixture payload is the articles listing JSON array.
    pub fn from_fixture(articles_json: &str) -> Self {
        Self {
            mode: Mode::Fixture {
                articles: articles_json.to_string(),
            },
        }
    }

    fn pick_from_payload(s: &str) -> Option<CandidateItem> {
        let articles: Vec<Article> = serde_json::from_str(s).ok()?;
        if articles.is_empty() {
            return None;
        }
        let idx = rand::thread_rng().gen_range(0..articles.len());
        let art = &articles[idx];
        let title = normalize_title(art.title.as_deref()?);
        if title.is_empty() {
            return None;
        }
        Some(CandidateItem {
            title,
            body: None,
            url: art.url.clone(),
            provenance: "Dev.to".to_string(),
        })
    }
}

#[async_trait]
impl ContentSource for DevToSource {
    async fn fetch(&self) -> Option<CandidateItem> {
        match &self.mode {
            Mode::Fixture { articles } => Self::pick_from_payload(articles),
            Mode::Http { client } => {
                let body = match client.get(ARTICLES_URL).send().await {
                    Ok(resp) => resp.error_for_status().ok()?.text().await.ok()?,
                    Err(e) => {
                        debug!(error = ?e, provider = "Dev.to", "articles fetch failed");
                        return None;
                    }
                };
                Self::pick_from_payload(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "Dev.to"
    }
}

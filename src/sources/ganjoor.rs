// src/sources/ganjoor.rs
//! Random classical poem from the Ganjoor API (`poetry` topic).

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{normalize_title, CandidateItem, ContentSource};

const RANDOM_POEM_URL: &str = "https://api.ganjoor.net/api/ganjoor/poems/random";

#[derive(Debug, Deserialize)]
struct Poem {
    #[serde(rename = "poetName")]
    poet_name: Option<String>,
    #[serde(rename = "plainText")]
    plain_text: Option<String>,
    url: Option<String>,
}

pub struct GanjoorSource {
    mode: Mode,
}

enum Mode {
    Http { client: reqwest::Client },
    Fixture(String),
}

impl GanjoorSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            mode: Mode::Http { client },
        }
    }

    pub fn from_fixture(poem_json: &str) -> Self {
        Self {
            mode: Mode::Fixture(poem_json.to_string()),
        }
    }

    fn candidate_from_payload(s: &str) -> Option<CandidateItem> {
        let poem: Poem = serde_json::from_str(s).ok()?;
        let poet = normalize_title(poem.poet_name.as_deref()?);
        if poet.is_empty() {
            return None;
        }
        Some(CandidateItem {
            title: format!("A poem by {poet}"),
            body: poem.plain_text,
            url: poem.url,
            provenance: "Ganjoor".to_string(),
        })
    }
}

#[async_trait]
impl ContentSource for GanjoorSource {
    async fn fetch(&self) -> Option<CandidateItem> {
        match &self.mode {
            Mode::Fixture(s) => Self::candidate_from_payload(s),
            Mode::Http { client } => {
                let body = match client.get(RANDOM_POEM_URL).send().await {
                    Ok(resp) => resp.error_for_status().ok()?.text().await.ok()?,
                    Err(e) => {
                        debug!(error = ?e, provider = "Ganjoor", "random poem fetch failed");
                        return None;
                    }
                };
                Self::candidate_from_payload(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "Ganjoor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn poem_maps_to_candidate_with_body() {
        let payload =
            r#"{"poetName":"Hafez","plainText":"line one\nline two","url":"/hafez/ghazal/1"}"#;
        let src = GanjoorSource::from_fixture(payload);
        let item = src.fetch().await.expect("candidate");
        assert_eq!(item.title, "A poem by Hafez");
        assert_eq!(item.body.as_deref(), Some("line one\nline two"));
        assert_eq!(item.url.as_deref(), Some("/hafez/ghazal/1"));
    }

    #[tokio::test]
    async fn missing_poet_yields_none() {
        let src = GanjoorSource::from_fixture(r#"{"plainText":"x"}"#);
        assert!(src.fetch().await.is_none());
    }
}

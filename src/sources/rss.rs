// src/sources/rss.rs
//! Generic RSS source used by the `ai` and `design` topics.

use async_trait::async_trait;
use quick_xml::de::from_str;
use rand::Rng;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};
use tracing::debug;

use super::{normalize_title, CandidateItem, ContentSource};

/// Feeds routinely keep months of history; only items near the head of the
/// timeline are eligible for the random pick.
const FRESH_WINDOW_SECS: u64 = 7 * 24 * 3600;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

fn parse_rfc2822_to_unix(ts: &str) -> u64 {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|x| u64::try_from(x).ok())
        .unwrap_or(0)
}

/// Indices eligible for the random pick: items within the fresh window of
/// the newest dated item. A feed with no parseable dates keeps every item
/// eligible.
fn fresh_indices(items: &[Item]) -> Vec<usize> {
    let stamps: Vec<u64> = items
        .iter()
        .map(|it| it.pub_date.as_deref().map_or(0, parse_rfc2822_to_unix))
        .collect();
    let newest = stamps.iter().copied().max().unwrap_or(0);
    if newest == 0 {
        return (0..items.len()).collect();
    }
    stamps
        .iter()
        .enumerate()
        .filter(|(_, ts)| **ts > 0 && newest - **ts <= FRESH_WINDOW_SECS)
        .map(|(i, _)| i)
        .collect()
}

pub struct RssSource {
    provenance: &'static str,
    mode: Mode,
}

enum Mode {
    Http {
        url: &'static str,
        client: reqwest::Client,
    },
    Fixture(String),
}

impl RssSource {
    pub fn from_url(provenance: &'static str, url: &'static str, client: reqwest::Client) -> Self {
        Self {
            provenance,
            mode: Mode::Http { url, client },
        }
    }

    pub fn from_fixture(provenance: &'static str, xml: &str) -> Self {
        Self {
            provenance,
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    fn pick_from_xml(&self, xml: &str) -> Option<CandidateItem> {
        let cleaned = scrub_html_entities_for_xml(xml);
        let rss: Rss = match from_str(&cleaned) {
            Ok(r) => r,
            Err(e) => {
                debug!(error = ?e, provider = self.provenance, "rss parse failed");
                return None;
            }
        };
        let pool = fresh_indices(&rss.channel.item);
        if pool.is_empty() {
            return None;
        }
        let idx = pool[rand::thread_rng().gen_range(0..pool.len())];
        let it = &rss.channel.item[idx];
        let title = normalize_title(it.title.as_deref()?);
        if title.is_empty() {
            return None;
        }
        Some(CandidateItem {
            title,
            body: None,
            url: it.link.clone(),
            provenance: self.provenance.to_string(),
        })
    }
}

#[async_trait]
impl ContentSource for RssSource {
    async fn fetch(&self) -> Option<CandidateItem> {
        match &self.mode {
            Mode::Fixture(xml) => self.pick_from_xml(xml),
            Mode::Http { url, client } => {
                let body = match client.get(*url).send().await {
                    Ok(resp) => resp.error_for_status().ok()?.text().await.ok()?,
                    Err(e) => {
                        debug!(error = ?e, provider = self.provenance, "feed fetch failed");
                        return None;
                    }
                };
                self.pick_from_xml(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        self.provenance
    }
}

/// RSS feeds in the wild carry bare HTML entities that are not valid XML.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

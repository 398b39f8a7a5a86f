// src/sources/quran.rs
//! Random verse from the AlQuran Cloud API (`religious` topic).

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{CandidateItem, ContentSource};

const RANDOM_AYAH_URL: &str = "https://api.alquran.cloud/v1/ayah/random/fa.fooladvand";

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Option<Ayah>,
}

#[derive(Debug, Deserialize)]
struct Ayah {
    #[serde(rename = "numberInSurah")]
    number_in_surah: u32,
    text: String,
    surah: Surah,
}

#[derive(Debug, Deserialize)]
struct Surah {
    number: u32,
    #[serde(rename = "englishName")]
    english_name: String,
}

pub struct QuranSource {
    mode: Mode,
}

enum Mode {
    Http { client: reqwest::Client },
    Fixture(String),
}

impl QuranSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            mode: Mode::Http { client },
        }
    }

    pub fn from_fixture(envelope_json: &str) -> Self {
        Self {
            mode: Mode::Fixture(envelope_json.to_string()),
        }
    }

    fn candidate_from_payload(s: &str) -> Option<CandidateItem> {
        let env: Envelope = serde_json::from_str(s).ok()?;
        let ayah = env.data?;
        Some(CandidateItem {
            title: format!(
                "Verse {} of Surah {}",
                ayah.number_in_surah, ayah.surah.english_name
            ),
            body: Some(ayah.text),
            url: Some(format!(
                "https://quran.com/{}/{}",
                ayah.surah.number, ayah.number_in_surah
            )),
            provenance: "AlQuran".to_string(),
        })
    }
}

#[async_trait]
impl ContentSource for QuranSource {
    async fn fetch(&self) -> Option<CandidateItem> {
        match &self.mode {
            Mode::Fixture(s) => Self::candidate_from_payload(s),
            Mode::Http { client } => {
                let body = match client.get(RANDOM_AYAH_URL).send().await {
                    Ok(resp) => resp.error_for_status().ok()?.text().await.ok()?,
                    Err(e) => {
                        debug!(error = ?e, provider = "AlQuran", "random ayah fetch failed");
                        return None;
                    }
                };
                Self::candidate_from_payload(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "AlQuran"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ayah_maps_to_candidate_with_canonical_url() {
        let payload = r#"{
            "code": 200,
            "status": "OK",
            "data": {
                "numberInSurah": 255,
                "text": "...",
                "surah": {"number": 2, "englishName": "Al-Baqara"}
            }
        }"#;
        let src = QuranSource::from_fixture(payload);
        let item = src.fetch().await.expect("candidate");
        assert_eq!(item.title, "Verse 255 of Surah Al-Baqara");
        assert_eq!(item.url.as_deref(), Some("https://quran.com/2/255"));
        assert_eq!(item.provenance, "AlQuran");
    }

    #[tokio::test]
    async fn missing_data_yields_none() {
        let src = QuranSource::from_fixture(r#"{"code":404,"status":"NOT FOUND"}"#);
        assert!(src.fetch().await.is_none());
    }
}

// src/rewrite.rs
//! Content rewriter: turns a candidate item plus a topic style directive into
//! publishable text, or signals that the material is not worth publishing.
//!
//! Two distinct non-success paths, surfaced differently by the pipeline:
//! a transport/provider failure is an `Err` (logged at warn), a stylistic
//! rejection via the sentinel token is `Ok(Rewrite::Rejected)` (logged at
//! info).

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::sources::CandidateItem;
use crate::topics::Topic;

/// Literal token the rewrite service emits to mark low-value material.
pub const REJECT_SENTINEL: &str = "STOP";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    Text(String),
    Rejected,
}

#[async_trait]
pub trait Rewriter: Send + Sync {
    /// `Err` means the provider itself failed; `Ok(Rejected)` means it judged
    /// the material not worth publishing.
    async fn rewrite(&self, item: &CandidateItem, topic: &Topic) -> Result<Rewrite>;
    fn provider_name(&self) -> &'static str;
}

pub type DynRewriter = Arc<dyn Rewriter>;

/// Build a rewriter from the configured key. A missing key yields a disabled
/// rewriter that fails every call, so an unkeyed deployment still boots and
/// the scheduler keeps ticking.
pub fn build_rewriter(api_key: Option<String>, model: &str) -> DynRewriter {
    match api_key {
        Some(key) if !key.is_empty() => Arc::new(OpenRouterRewriter::new(key, model)),
        _ => {
            warn!("no OPENROUTER_API_KEY set; rewriter disabled, nothing will publish");
            Arc::new(DisabledRewriter)
        }
    }
}

/// Detect the rejection sentinel anywhere in the generated output.
fn outcome_from_text(raw: &str) -> Rewrite {
    let text = raw.trim();
    if text.contains(REJECT_SENTINEL) {
        Rewrite::Rejected
    } else {
        Rewrite::Text(text.to_string())
    }
}

fn build_prompt(item: &CandidateItem, topic: &Topic) -> String {
    let mut prompt = format!("{}\n\nOriginal title/text:\n{}", topic.style, item.title);
    if let Some(body) = &item.body {
        prompt.push_str("\n\nFull text:\n");
        prompt.push_str(body);
    }
    prompt.push_str("\n\nSource:\n");
    prompt.push_str(&item.provenance);
    prompt
}

// ------------------------------------------------------------
// OpenRouter provider
// ------------------------------------------------------------

pub struct OpenRouterRewriter {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenRouterRewriter {
    pub fn new(api_key: String, model: &str) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("feed-autoposter/0.1 (+github.com/feed-autoposter)")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl Rewriter for OpenRouterRewriter {
    async fn rewrite(&self, item: &CandidateItem, topic: &Topic) -> Result<Rewrite> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let prompt = build_prompt(item, topic);
        let req = Req {
            model: &self.model,
            messages: vec![Msg {
                role: "user",
                content: &prompt,
            }],
        };

        let resp = self
            .http
            .post("https://openrouter.ai/api/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("openrouter request")?;

        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("openrouter returned {status}"));
        }

        let body: Resp = resp.json().await.context("openrouter response body")?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or("");
        if content.trim().is_empty() {
            return Err(anyhow!("openrouter returned an empty completion"));
        }
        Ok(outcome_from_text(content))
    }

    fn provider_name(&self) -> &'static str {
        "openrouter"
    }
}

// ------------------------------------------------------------
// Disabled + mock variants
// ------------------------------------------------------------

/// Fails every call; used when no API key is configured.
pub struct DisabledRewriter;

#[async_trait]
impl Rewriter for DisabledRewriter {
    async fn rewrite(&self, _item: &CandidateItem, _topic: &Topic) -> Result<Rewrite> {
        Err(anyhow!("rewriter disabled (no API key)"))
    }

    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic rewriter for tests. Available outside cfg(test) so
/// integration tests can wire a pipeline.
#[derive(Clone)]
pub enum MockRewriter {
    /// Echo a fixed reply for every call.
    Fixed(String),
    /// Reject every call via the sentinel path.
    RejectAll,
    /// Fail every call as a provider error.
    FailAll,
}

#[async_trait]
impl Rewriter for MockRewriter {
    async fn rewrite(&self, item: &CandidateItem, _topic: &Topic) -> Result<Rewrite> {
        match self {
            MockRewriter::Fixed(reply) => Ok(outcome_from_text(reply)),
            MockRewriter::RejectAll => Ok(outcome_from_text(&format!(
                "{REJECT_SENTINEL} ({})",
                item.title
            ))),
            MockRewriter::FailAll => Err(anyhow!("mock provider failure")),
        }
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

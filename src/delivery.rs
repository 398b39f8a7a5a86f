// src/delivery.rs
//! Delivery channel: one outbound call per successful pipeline run. The
//! Telegram client also exposes the long-poll update stream that feeds the
//! reactions ledger and destination bookkeeping.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

#[async_trait]
pub trait Delivery: Send + Sync {
    /// Deliver text to a destination; returns the provider message id used
    /// as the published post's identity.
    async fn send(&self, destination: i64, text: &str) -> Result<i64>;
    fn name(&self) -> &'static str;
}

// ------------------------------------------------------------
// Telegram Bot API wire types
// ------------------------------------------------------------

/// Standard Bot API envelope.
#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageResult {
    message_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message_reaction: Option<MessageReactionUpdated>,
    #[serde(default)]
    pub my_chat_member: Option<ChatMemberUpdated>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageReactionUpdated {
    pub chat: Chat,
    pub message_id: i64,
    #[serde(default)]
    pub new_reaction: Vec<ReactionType>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReactionType {
    #[serde(default)]
    pub emoji: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMemberUpdated {
    pub chat: Chat,
    pub new_chat_member: ChatMember,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMember {
    pub status: String,
}

// ------------------------------------------------------------
// Telegram client
// ------------------------------------------------------------

/// Long-poll window requested from getUpdates, seconds.
const POLL_TIMEOUT_SECS: u64 = 30;

pub struct TelegramClient {
    bot_token: String,
    send_timeout: Duration,
    http: reqwest::Client,
}

impl TelegramClient {
    pub fn new(bot_token: String, send_timeout_secs: u64) -> Self {
        // Client-level timeout sized for long polls; sends override it.
        let http = reqwest::Client::builder()
            .user_agent("feed-autoposter/0.1 (+github.com/feed-autoposter)")
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 20))
            .build()
            .expect("reqwest client");
        Self {
            bot_token,
            send_timeout: Duration::from_secs(send_timeout_secs),
            http,
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{}", self.bot_token, method)
    }

    /// sendMessage with HTML parse mode.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64> {
        let resp = self
            .http
            .post(self.api_url("sendMessage"))
            .timeout(self.send_timeout)
            .json(&serde_json::json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "HTML",
            }))
            .send()
            .await
            .context("telegram sendMessage request")?;

        let body: TelegramResponse<MessageResult> = resp
            .json()
            .await
            .context("telegram sendMessage response")?;
        if !body.ok {
            anyhow::bail!(
                "telegram API error: {}",
                body.description.unwrap_or_default()
            );
        }
        Ok(body.result.map(|r| r.message_id).unwrap_or(0))
    }

    /// Long-poll getUpdates, restricted to the update kinds this service
    /// consumes. Returns raw updates; offset bookkeeping is the caller's.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let resp = self
            .http
            .post(self.api_url("getUpdates"))
            .json(&serde_json::json!({
                "offset": offset,
                "timeout": POLL_TIMEOUT_SECS,
                "allowed_updates": ["message_reaction", "my_chat_member"],
            }))
            .send()
            .await
            .context("telegram getUpdates request")?;

        let body: TelegramResponse<Vec<Update>> = resp
            .json()
            .await
            .context("telegram getUpdates response")?;
        if !body.ok {
            anyhow::bail!(
                "telegram API error: {}",
                body.description.unwrap_or_default()
            );
        }
        Ok(body.result.unwrap_or_default())
    }
}

#[async_trait]
impl Delivery for TelegramClient {
    async fn send(&self, destination: i64, text: &str) -> Result<i64> {
        self.send_message(destination, text).await
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}

// ------------------------------------------------------------
// Mock delivery
// ------------------------------------------------------------

/// Records sends instead of performing them. Available outside cfg(test) so
/// integration tests can wire a pipeline.
pub struct MockDelivery {
    sent: Mutex<Vec<(i64, String)>>,
    attempts: AtomicI64,
    next_id: AtomicI64,
    fail: bool,
}

impl MockDelivery {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            attempts: AtomicI64::new(0),
            next_id: AtomicI64::new(1),
            fail: false,
        }
    }

    /// Every send fails, as a destination-level error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().expect("mock mutex poisoned").clone()
    }

    /// Send attempts, successful or not.
    pub fn attempts(&self) -> i64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Default for MockDelivery {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Delivery for MockDelivery {
    async fn send(&self, destination: i64, text: &str) -> Result<i64> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("mock delivery refused");
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.sent
            .lock()
            .expect("mock mutex poisoned")
            .push((destination, text.to_string()));
        Ok(id)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

// src/reactions.rs
//! Engagement ledger feed: classifies inbound reaction events and applies
//! them to published-post counters, plus the long-poll update loop that
//! also keeps the destination registry in sync with chat membership.

use std::sync::Arc;

use metrics::counter;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::delivery::{TelegramClient, Update};
use crate::store::Store;

/// Affirming symbols; any of them present marks the event positive.
pub const POSITIVE_SYMBOLS: &[&str] = &["👍", "🔥", "❤️"];
/// Disapproving symbols; any of them present marks the event negative.
pub const NEGATIVE_SYMBOLS: &[&str] = &["👎"];

/// Presence-based per-event classification: any positive symbol counts as
/// one positive, any negative symbol as one negative. Unclassified symbols
/// are ignored.
pub fn classify<'a>(symbols: impl IntoIterator<Item = &'a str>) -> (u32, u32) {
    let mut positive = false;
    let mut negative = false;
    for s in symbols {
        positive |= POSITIVE_SYMBOLS.contains(&s);
        negative |= NEGATIVE_SYMBOLS.contains(&s);
    }
    (positive as u32, negative as u32)
}

/// Apply one reaction event. Events with no classified symbol, or
/// referencing a message this service never published, are a no-op.
pub fn apply_reaction_event(
    store: &Store,
    destination: i64,
    message_id: i64,
    symbols: impl IntoIterator<Item = impl AsRef<str>>,
) -> bool {
    let owned: Vec<String> = symbols.into_iter().map(|s| s.as_ref().to_string()).collect();
    let (positive, negative) = classify(owned.iter().map(String::as_str));
    if positive == 0 && negative == 0 {
        return false;
    }
    let applied = store.record_feedback(destination, message_id, positive, negative);
    if applied {
        crate::metrics::ensure_described();
        counter!("autopost_reaction_events_total").increment(1);
        debug!(destination, message_id, positive, negative, "reaction recorded");
    } else {
        debug!(destination, message_id, "reaction for unknown message ignored");
    }
    applied
}

/// Handle one inbound update: reaction events feed the ledger, membership
/// changes drive registry bookkeeping (grant → upsert, loss → cascade).
pub fn handle_update(store: &Store, update: &Update) {
    if let Some(reaction) = &update.message_reaction {
        let symbols = reaction
            .new_reaction
            .iter()
            .filter_map(|r| r.emoji.as_deref());
        apply_reaction_event(store, reaction.chat.id, reaction.message_id, symbols);
    }

    if let Some(member) = &update.my_chat_member {
        let chat = &member.chat;
        match member.new_chat_member.status.as_str() {
            "administrator" | "member" => {
                let title = chat.title.as_deref().unwrap_or("Private");
                store.upsert_destination(chat.id, title);
                info!(destination = chat.id, title, "destination registered");
            }
            "left" | "kicked" => {
                store.remove_destination(chat.id);
                info!(destination = chat.id, "destination removed");
            }
            other => {
                debug!(destination = chat.id, status = other, "membership change ignored");
            }
        }
    }
}

/// Long-poll loop over getUpdates. Errors back off and retry; the loop only
/// ends with the process.
pub fn spawn_update_loop(client: Arc<TelegramClient>, store: Arc<Store>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut offset: i64 = 0;
        loop {
            match client.get_updates(offset).await {
                Ok(updates) => {
                    for update in &updates {
                        offset = offset.max(update.update_id + 1);
                        handle_update(&store, update);
                    }
                }
                Err(e) => {
                    warn!(error = ?e, "getUpdates failed, backing off");
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PublishedPost;

    fn store_with_post(destination: i64, message: i64) -> Store {
        let store = Store::in_memory();
        store.upsert_destination(destination, "Chat");
        store.commit_published(PublishedPost {
            destination_id: destination,
            message_id: message,
            provenance: "Test".into(),
            title: "t".into(),
            fingerprint: format!("fp-{destination}-{message}"),
            positive: 0,
            negative: 0,
            created_ts: 1,
        });
        store
    }

    #[test]
    fn classification_is_presence_based() {
        let (p, n) = classify(["👍", "🔥", "👎"]);
        assert_eq!((p, n), (1, 1));
        let (p, n) = classify(["🔥"]);
        assert_eq!((p, n), (1, 0));
        let (p, n) = classify(["🤷"]);
        assert_eq!((p, n), (0, 0));
    }

    #[test]
    fn event_applies_deltas_to_the_matching_post() {
        let store = store_with_post(-1, 5);
        assert!(apply_reaction_event(&store, -1, 5, ["👍", "❤️", "👎"]));
        let post = &store.posts(Some(-1))[0];
        assert_eq!(post.positive, 1);
        assert_eq!(post.negative, 1);
    }

    #[test]
    fn unknown_message_is_a_noop() {
        let store = store_with_post(-1, 5);
        assert!(!apply_reaction_event(&store, -1, 999, ["👍"]));
        assert!(!apply_reaction_event(&store, -2, 5, ["👍"]));
    }

    #[test]
    fn unclassified_symbols_do_not_touch_the_store() {
        let store = store_with_post(-1, 5);
        assert!(!apply_reaction_event(&store, -1, 5, ["🤷", "🎉"]));
        let post = &store.posts(Some(-1))[0];
        assert_eq!((post.positive, post.negative), (0, 0));
    }
}

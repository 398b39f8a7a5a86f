// src/pipeline.rs
//! Publication pipeline: one invocation per due destination per tick.
//!
//! First viable candidate wins, exhaust before giving up: topics are tried
//! in a randomized order and each non-fatal miss (no candidate, duplicate,
//! rejection, generation failure) moves on to the next topic. Delivery
//! failure is destination-level and ends the run immediately. External
//! calls are bounded by at most one fetch/rewrite/send per subscribed topic.

use std::sync::Arc;

use metrics::counter;
use rand::seq::SliceRandom;
use tracing::{debug, error, info, warn};

use crate::delivery::Delivery;
use crate::fingerprint::fingerprint;
use crate::rewrite::{Rewrite, Rewriter};
use crate::sources::SourceRegistry;
use crate::store::{DestinationSettings, PublishedPost, Store};
use crate::topics::{self, Topic};

/// Terminal status of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Destination disabled (or removed mid-tick); no side effects.
    Disabled,
    /// Delivered and committed; reports which topic won.
    Success { topic: &'static str },
    /// Destination-level delivery failure; remaining topics are not tried.
    SendError,
    /// Every topic in the permutation was exhausted without a delivery.
    AllFailed,
}

pub struct Pipeline {
    store: Arc<Store>,
    sources: Arc<SourceRegistry>,
    rewriter: Arc<dyn Rewriter>,
    delivery: Arc<dyn Delivery>,
}

impl Pipeline {
    pub fn new(
        store: Arc<Store>,
        sources: Arc<SourceRegistry>,
        rewriter: Arc<dyn Rewriter>,
        delivery: Arc<dyn Delivery>,
    ) -> Self {
        Self {
            store,
            sources,
            rewriter,
            delivery,
        }
    }

    /// Run the state machine for one destination. `now` becomes the
    /// created timestamp of a committed post.
    pub async fn publish_once(&self, destination: i64, now: u64) -> PublishOutcome {
        crate::metrics::ensure_described();
        counter!("autopost_runs_total").increment(1);

        let Some(settings) = self.store.settings(destination) else {
            debug!(destination, "unknown destination, skipping run");
            return PublishOutcome::Disabled;
        };
        if !settings.enabled {
            return PublishOutcome::Disabled;
        }

        for topic in self.topic_order(&settings) {
            let Some(source) = self.sources.get(topic.key) else {
                continue;
            };

            let Some(item) = source.fetch().await else {
                debug!(destination, topic = topic.key, "no candidate from source");
                counter!("autopost_skips_total").increment(1);
                continue;
            };

            let fp = fingerprint(&item);
            if self.store.fingerprint_exists(&fp) {
                debug!(destination, topic = topic.key, "candidate already published");
                counter!("autopost_skips_total").increment(1);
                continue;
            }

            let text = match self.rewriter.rewrite(&item, topic).await {
                Err(e) => {
                    warn!(destination, topic = topic.key, error = ?e, "rewrite failed");
                    counter!("autopost_skips_total").increment(1);
                    continue;
                }
                Ok(Rewrite::Rejected) => {
                    info!(destination, topic = topic.key, "rewrite rejected candidate");
                    counter!("autopost_skips_total").increment(1);
                    continue;
                }
                Ok(Rewrite::Text(t)) => t,
            };

            match self.delivery.send(destination, &text).await {
                Err(e) => {
                    error!(destination, topic = topic.key, error = ?e, "delivery failed");
                    counter!("autopost_send_errors_total").increment(1);
                    return PublishOutcome::SendError;
                }
                Ok(message_id) => {
                    let committed = self.store.commit_published(PublishedPost {
                        destination_id: destination,
                        message_id,
                        provenance: item.provenance.clone(),
                        title: item.title.clone(),
                        fingerprint: fp,
                        positive: 0,
                        negative: 0,
                        created_ts: now,
                    });
                    if committed {
                        counter!("autopost_published_total").increment(1);
                        info!(destination, topic = topic.key, message_id, "published");
                        return PublishOutcome::Success { topic: topic.key };
                    }
                    // A concurrent run for another destination committed the
                    // same fingerprint between our check and our delivery;
                    // this side is a duplicate.
                    warn!(destination, topic = topic.key, "lost fingerprint race");
                    counter!("autopost_skips_total").increment(1);
                    continue;
                }
            }
        }

        PublishOutcome::AllFailed
    }

    /// Randomized permutation of the destination's subscribed topics,
    /// restricted to topics that exist and have a registered source.
    /// Unknown keys are dropped silently; an empty result falls back to the
    /// default topic.
    fn topic_order(&self, settings: &DestinationSettings) -> Vec<&'static Topic> {
        let mut list: Vec<&'static Topic> = settings
            .topics
            .iter()
            .filter_map(|key| topics::get(key))
            .filter(|t| self.sources.contains(t.key))
            .collect();
        if list.is_empty() {
            list.push(topics::default_topic());
        }
        list.shuffle(&mut rand::thread_rng());
        list
    }
}

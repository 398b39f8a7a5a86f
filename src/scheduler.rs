// src/scheduler.rs
//! Trigger loop: a fixed-tick scan over the destination registry that
//! dispatches the publication pipeline for every destination whose interval
//! has elapsed. Dispatch is fire-and-forget; the loop never blocks on a
//! run and never dies from one.

use std::sync::Arc;

use metrics::{counter, gauge};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::pipeline::{Pipeline, PublishOutcome};
use crate::store::Store;

#[derive(Clone, Copy, Debug)]
pub struct SchedulerCfg {
    pub tick_secs: u64,
}

impl Default for SchedulerCfg {
    fn default() -> Self {
        Self { tick_secs: 10 }
    }
}

/// Collect destinations whose elapsed time has reached their interval,
/// stamping the new last-publish timestamp BEFORE returning them. Stamping
/// ahead of dispatch is what suppresses a double dispatch when a pipeline
/// run outlives the tick; do not reorder it after the run.
pub fn take_due(store: &Store, now: u64) -> Vec<i64> {
    let mut due = Vec::new();
    for dest in store.destinations() {
        let elapsed = now.saturating_sub(dest.settings.last_publish_ts);
        if elapsed >= dest.settings.interval_secs {
            store.set_last_publish(dest.id, now);
            due.push(dest.id);
        }
    }
    due
}

pub fn spawn_scheduler(
    cfg: SchedulerCfg,
    store: Arc<Store>,
    pipeline: Arc<Pipeline>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(cfg.tick_secs));
        loop {
            ticker.tick().await;
            let now = chrono::Utc::now().timestamp().max(0) as u64;

            crate::metrics::ensure_described();
            counter!("autopost_ticks_total").increment(1);
            gauge!("autopost_last_tick_ts").set(now as f64);

            for id in take_due(&store, now) {
                let pipeline = pipeline.clone();
                tokio::spawn(async move {
                    match pipeline.publish_once(id, now).await {
                        PublishOutcome::Success { topic } => {
                            info!(destination = id, topic, "tick published")
                        }
                        PublishOutcome::Disabled => {
                            debug!(destination = id, "destination disabled")
                        }
                        PublishOutcome::SendError => {
                            warn!(destination = id, "delivery failed for this tick")
                        }
                        PublishOutcome::AllFailed => {
                            warn!(destination = id, "no topic produced a post")
                        }
                    }
                });
            }
        }
    })
}

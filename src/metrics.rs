// src/metrics.rs
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("autopost_ticks_total", "Trigger-loop ticks.");
        describe_counter!("autopost_runs_total", "Pipeline runs started.");
        describe_counter!(
            "autopost_published_total",
            "Posts delivered and committed to the ledger."
        );
        describe_counter!(
            "autopost_skips_total",
            "Per-topic skips: no candidate, duplicate, rejected, or generation failure."
        );
        describe_counter!(
            "autopost_send_errors_total",
            "Destination-level delivery failures."
        );
        describe_counter!(
            "autopost_reaction_events_total",
            "Reaction events applied to the engagement ledger."
        );
        describe_gauge!("autopost_last_tick_ts", "Unix ts of the last trigger-loop tick.");
        describe_gauge!("autopost_tick_interval_secs", "Configured trigger-loop period.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and publish the static tick-interval
    /// gauge. Call once, from the binary.
    pub fn init(tick_secs: u64) -> Self {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("prometheus: install recorder");
        ensure_described();
        gauge!("autopost_tick_interval_secs").set(tick_secs as f64);
        Self { handle }
    }

    /// Router exposing `/metrics` in Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

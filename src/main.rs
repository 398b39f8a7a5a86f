//! Feed autoposter binary entrypoint.
//! Boots the trigger loop, the Telegram update loop and the Axum HTTP
//! surface (health, metrics, webhook, debug).

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feed_autoposter::api::{self, AppState};
use feed_autoposter::config;
use feed_autoposter::delivery::TelegramClient;
use feed_autoposter::metrics::Metrics;
use feed_autoposter::pipeline::Pipeline;
use feed_autoposter::reactions;
use feed_autoposter::rewrite;
use feed_autoposter::scheduler::{self, SchedulerCfg};
use feed_autoposter::sources::SourceRegistry;
use feed_autoposter::store::Store;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = config::load();
    let token = config::telegram_token().context("TELEGRAM_BOT_TOKEN is required")?;

    let store = Arc::new(Store::open(&cfg.state_path)?);
    info!(destinations = store.destination_count(), "store loaded");

    let sources = Arc::new(SourceRegistry::with_default_sources(cfg.http_timeout_secs));
    let rewriter = rewrite::build_rewriter(config::openrouter_key(), &cfg.model);
    let telegram = Arc::new(TelegramClient::new(token, cfg.http_timeout_secs));

    let pipeline = Arc::new(Pipeline::new(
        store.clone(),
        sources,
        rewriter,
        telegram.clone(),
    ));

    let metrics = Metrics::init(cfg.tick_secs);
    scheduler::spawn_scheduler(
        SchedulerCfg {
            tick_secs: cfg.tick_secs,
        },
        store.clone(),
        pipeline,
    );
    reactions::spawn_update_loop(telegram, store.clone());

    let router = api::create_router(AppState { store }).merge(metrics.router());
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("binding {}", cfg.bind_addr))?;
    info!(addr = %cfg.bind_addr, "http surface listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}

/// xrank-live: X Rank leaderboard + schedule scraper
///
/// What it does:
///   1. Pulls the X Battle rotation schedule and appends new rotations
///   2. Picks the rotation(s) to scrape for "now" (current, plus the one that
///      just ended during the first 15 minutes of an even hour)
///   3. Walks every leaderboard page for both regions and stores the standings
///   4. Sleeps XRANK_POLL_INTERVAL_SECS, repeat (or exit if XRANK_RUN_ONCE)
///
/// Run:
///   cargo run --bin xrank-live

use anyhow::{Context, Result};
use dotenv::dotenv;
use logger::{now_iso, send_ntfy_alert, EventLogger, PlayerScrapeEvent, RunFailedEvent, ScheduleSyncEvent};
use splatnet_query::{HttpQueryClient, HttpQueryConfig};
use std::env;
use std::fs::File;
use tokio::time::sleep;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use xrank_scraper::{SqliteStore, XRankScraper};

mod config;
use config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cfg = AppConfig::from_env().context("load config")?;

    info!("=== xrank-live ===");
    info!("DB: {}", cfg.db_path);
    info!("Logs: {}/", cfg.log_dir);

    // Single instance lock
    let lock_file_path = env::temp_dir().join("xrank_live.lock");
    let lock_file = match File::create(&lock_file_path) {
        Ok(f) => f,
        Err(e) => {
            warn!("Failed to create lock file at {:?}: {}", lock_file_path, e);
            return Ok(());
        }
    };

    let mut lock = fd_lock::RwLock::new(lock_file);
    let _write_guard = match lock.try_write() {
        Ok(guard) => {
            info!("Acquired single-instance lock.");
            guard
        }
        Err(_) => {
            warn!("Another xrank-live instance is already running! Exiting.");
            return Ok(());
        }
    };

    let events = EventLogger::new(&cfg.log_dir);

    loop {
        info!("--- scrape cycle ---");

        if let Err(e) = run_cycle(&cfg, &events).await {
            error!("cycle failed: {:#}", e);
            if let Some(topic) = &cfg.ntfy_topic {
                send_ntfy_alert(topic, &format!("{e:#}"), "xrank-live run failed").await;
            }
        }

        if cfg.run_once {
            break;
        }
        sleep(cfg.poll_interval).await;
    }

    Ok(())
}

/// One scheduled run: schedule first, then the players it selects.
async fn run_cycle(cfg: &AppConfig, events: &EventLogger) -> Result<()> {
    let mut http = HttpQueryConfig::new(&cfg.graphql_url, &cfg.bearer_token);
    http.timeout = cfg.http_timeout;
    let client = HttpQueryClient::new(http).context("build query client")?;
    let store = SqliteStore::open(&cfg.db_path)
        .with_context(|| format!("open db at {}", cfg.db_path))?;

    let mut scraper = XRankScraper::new(client, store);
    let now = scraper.timestamp();

    match scraper.update_schedule().await {
        Ok(inserted) => {
            let _ = events.log(&ScheduleSyncEvent { ts: now_iso(), event: "SCHEDULE_SYNC", inserted });
        }
        Err(e) => {
            record_failure(events, "schedule", &e);
            return Err(e).context("update schedule");
        }
    }

    match scraper.update_players(now).await {
        Ok(inserted) => {
            let _ = events.log(&PlayerScrapeEvent {
                ts:            now_iso(),
                event:         "PLAYER_SCRAPE",
                run_timestamp: now.to_rfc3339(),
                inserted,
            });
            info!("run {} stored {} new player rows", now, inserted);
        }
        Err(e) => {
            record_failure(events, "players", &e);
            return Err(e).context("update players");
        }
    }

    Ok(())
}

fn record_failure(events: &EventLogger, stage: &str, err: &xrank_scraper::ScrapeError) {
    let _ = events.log(&RunFailedEvent {
        ts:    now_iso(),
        event: "RUN_FAILED",
        stage: stage.to_string(),
        error: err.to_string(),
    });
}

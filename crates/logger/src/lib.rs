/// xrank-live: logger
/// JSONL run journal, ntfy alerts

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct EventLogger {
    log_dir: PathBuf,
}

impl EventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let dir = log_dir.into();
        fs::create_dir_all(&dir).ok();
        Self { log_dir: dir }
    }

    pub fn dir(&self) -> &Path {
        &self.log_dir
    }

    /// Appends one JSON line to today's (UTC) file.
    pub fn log<T: Serialize>(&self, event: &T) -> Result<()> {
        let date  = Utc::now().format("%Y-%m-%d").to_string();
        let path  = self.log_dir.join(format!("{date}.jsonl"));
        let line  = serde_json::to_string(event)?;
        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ── Event types ───────────────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
pub struct ScheduleSyncEvent {
    pub ts:        String,
    pub event:     &'static str,   // "SCHEDULE_SYNC"
    pub inserted:  usize,
}

#[derive(Serialize, Debug)]
pub struct PlayerScrapeEvent {
    pub ts:             String,
    pub event:          &'static str,   // "PLAYER_SCRAPE"
    pub run_timestamp:  String,         // shared by every row of the run
    pub inserted:       usize,
}

#[derive(Serialize, Debug)]
pub struct RunFailedEvent {
    pub ts:      String,
    pub event:   &'static str,   // "RUN_FAILED"
    pub stage:   String,         // "schedule" | "players"
    pub error:   String,
}

/// Push a readable alert to ntfy.sh/<topic>. Failures are only logged.
pub async fn send_ntfy_alert(topic: &str, msg: &str, title: &str) {
    let client = reqwest::Client::new();
    match client
        .post(format!("https://ntfy.sh/{topic}"))
        .header("Title", title)
        .header("Priority", "high")
        .header("Tags", "warning")
        .body(msg.to_string())
        .send()
        .await
    {
        Ok(_)  => tracing::info!("ntfy sent: {}", title),
        Err(e) => tracing::warn!("ntfy failed: {}", e),
    }
}

//! Scrape orchestration: regions × modes, rotation selection, persistence.

use chrono::{DateTime, Timelike, Utc};
use serde_json::json;
use splatnet_query::{path, QueryClient};
use tracing::{debug, info, warn};

use crate::model::{Mode, PlayerRecord, Region, ScheduleRecord};
use crate::pagination::collect_players;
use crate::parser::parse_schedule_entry;
use crate::store::XRankStore;
use crate::{Result, ScrapeError};

pub const SEASON_QUERY: &str = "XRankingQuery";
pub const SCHEDULE_QUERY: &str = "StageScheduleQuery";

/// Minutes after an even-hour rotation change during which the outgoing
/// rotation is still scraped once more.
pub const ROTATION_TAIL_MINUTES: u32 = 15;

pub struct XRankScraper<Q, S> {
    client: Q,
    store: S,
    timestamp: DateTime<Utc>,
}

impl<Q: QueryClient, S: XRankStore> XRankScraper<Q, S> {
    /// Captures the run timestamp; every record from this scraper shares it.
    pub fn new(client: Q, store: S) -> Self {
        Self::with_timestamp(client, store, Utc::now())
    }

    pub fn with_timestamp(client: Q, store: S, timestamp: DateTime<Utc>) -> Self {
        Self {
            client,
            store,
            timestamp,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn client(&self) -> &Q {
        &self.client
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Season ids roll over, so this is asked every time.
    pub async fn current_season(&self, region: Region) -> Result<String> {
        let resp = self
            .client
            .query(SEASON_QUERY, json!({ "region": region.api_name() }))
            .await?;
        Ok(resp
            .str_at(path!["xRanking", "currentSeason", "id"])?
            .to_string())
    }

    /// Full leaderboard of `mode` for both regions, Tentatek first.
    pub async fn scrape_mode(&self, mode: Mode, timestamp: DateTime<Utc>) -> Result<Vec<PlayerRecord>> {
        let mut out = Vec::new();

        for region in Region::ALL {
            let season_id = self.current_season(region).await?;
            let ranked = collect_players(&self.client, &season_id, mode).await?;

            info!(
                mode = mode.display_name(),
                region = region.display_name(),
                season = %season_id,
                players = ranked.len(),
                "leaderboard scraped"
            );

            out.extend(
                ranked
                    .into_iter()
                    .map(|p| PlayerRecord::from_ranked(p, mode, region, timestamp)),
            );
        }

        Ok(out)
    }

    pub async fn fetch_schedule(&self) -> Result<Vec<ScheduleRecord>> {
        let resp = self.client.query(SCHEDULE_QUERY, json!({})).await?;
        resp.array_at(path!["xSchedules", "nodes"])?
            .iter()
            .map(parse_schedule_entry)
            .collect()
    }

    /// Rotations whose leaderboards should be scraped at `now`.
    ///
    /// Always the current rotation. In the first minutes of an even UTC hour the
    /// rotation that just ended is included too (first), so its final standings
    /// are captured. Rotations are assumed to change on even hours only.
    pub fn modes_needing_update(&self, now: DateTime<Utc>) -> Result<Vec<ScheduleRecord>> {
        let mut out = Vec::with_capacity(2);

        if in_rotation_tail(now) {
            match self.store.previous_rotation(now)? {
                Some(prev) => out.push(prev),
                None => warn!(%now, "no previous rotation stored"),
            }
        }

        match self.store.current_rotation(now)? {
            Some(cur) => out.push(cur),
            None => warn!(%now, "no rotation covers now, schedule may be stale"),
        }

        Ok(out)
    }

    /// Scrape every rotation selected by [`Self::modes_needing_update`] and store
    /// the whole batch in one transaction. Returns the number of new rows.
    pub async fn update_players(&mut self, now: DateTime<Utc>) -> Result<usize> {
        self.store.ensure_player_table()?;

        let mut players = Vec::new();
        for rotation in self.modes_needing_update(now)? {
            let Some(name) = rotation.mode.as_deref() else {
                info!(start = %rotation.start_time, "splatfest rotation, no X Rankings to scrape");
                continue;
            };
            let mode = Mode::from_display_name(name).ok_or_else(|| ScrapeError::UnknownMode {
                name: name.to_string(),
            })?;

            let scraped = self.scrape_mode(mode, self.timestamp).await?;
            debug!(mode = mode.code(), rows = scraped.len(), "rotation scraped");
            players.extend(
                scraped
                    .into_iter()
                    .map(|p| p.with_rotation_start(rotation.start_time)),
            );
        }

        let inserted = self.store.upsert_players(&players)?;
        info!(scraped = players.len(), inserted, timestamp = %self.timestamp, "player update done");
        Ok(inserted)
    }

    pub async fn update_schedule(&mut self) -> Result<usize> {
        let rotations = self.fetch_schedule().await?;
        self.store.ensure_schedule_table()?;
        let inserted = self.store.upsert_schedules(&rotations)?;
        info!(fetched = rotations.len(), inserted, "schedule update done");
        Ok(inserted)
    }
}

/// True in the first `ROTATION_TAIL_MINUTES` of an even UTC hour.
pub fn in_rotation_tail(now: DateTime<Utc>) -> bool {
    now.minute() < ROTATION_TAIL_MINUTES && now.hour() % 2 == 0
}
